use crate::common::*;

/// A kernel size, stride, dilation or padding given either as a scalar
/// or as one value per spatial dimension.
pub trait SpatialParam
where
    Self: Clone,
{
    fn dim(&self) -> Option<usize>;

    fn usize_iter(&self) -> Box<dyn Iterator<Item = usize> + '_>;

    /// Expands the parameter to exactly `N` values. Scalars are repeated.
    fn to_ntuple<const N: usize>(&self) -> Result<[usize; N]> {
        let values: Vec<usize> = match self.dim() {
            None => {
                let value = self
                    .usize_iter()
                    .next()
                    .ok_or_else(|| format_err!("scalar parameter yields no value"))?;
                vec![value; N]
            }
            Some(dim) => {
                ensure!(dim == N, "expect {} values, but get {}", N, dim);
                self.usize_iter().collect()
            }
        };
        let mut tuple = [0; N];
        tuple.copy_from_slice(&values);
        Ok(tuple)
    }

    fn to_3tuple(&self) -> Result<[usize; 3]> {
        self.to_ntuple::<3>()
    }
}

impl SpatialParam for usize {
    fn dim(&self) -> Option<usize> {
        None
    }

    fn usize_iter(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(iter::once(*self))
    }
}

impl<const DIM: usize> SpatialParam for [usize; DIM] {
    fn dim(&self) -> Option<usize> {
        Some(DIM)
    }

    fn usize_iter(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(self.iter().cloned())
    }
}

impl SpatialParam for Vec<usize> {
    fn dim(&self) -> Option<usize> {
        Some(self.len())
    }

    fn usize_iter(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(self.iter().cloned())
    }
}

impl SpatialParam for &[usize] {
    fn dim(&self) -> Option<usize> {
        Some(self.len())
    }

    fn usize_iter(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(self.iter().cloned())
    }
}

pub(crate) fn ensure_positive(name: &str, values: &[usize]) -> Result<()> {
    ensure!(
        values.iter().all(|&val| val > 0),
        "{} must be positive, but get {:?}",
        name,
        values
    );
    Ok(())
}

pub(crate) fn to_i64_vec(values: &[usize]) -> Vec<i64> {
    values.iter().map(|&val| val as i64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_is_repeated() {
        assert_eq!(3usize.to_3tuple().unwrap(), [3, 3, 3]);
        assert_eq!(2usize.to_ntuple::<2>().unwrap(), [2, 2]);
    }

    #[test]
    fn sequence_is_kept() {
        assert_eq!([1usize, 2, 3].to_3tuple().unwrap(), [1, 2, 3]);
        assert_eq!(vec![4usize, 5, 6].to_3tuple().unwrap(), [4, 5, 6]);
        let slice: &[usize] = &[7, 8, 9];
        assert_eq!(slice.to_3tuple().unwrap(), [7, 8, 9]);
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!([1usize, 2].to_3tuple().is_err());
        assert!(vec![1usize, 2, 3, 4].to_3tuple().is_err());
    }

    #[test]
    fn non_positive_values_are_rejected() {
        assert!(ensure_positive("stride", &[1, 2, 3]).is_ok());
        assert!(ensure_positive("stride", &[1, 0, 3]).is_err());
    }
}
