use crate::common::*;

/// Pads the last `N` dimensions with a constant value.
///
/// The padding slice follows libtorch `pad` order, that is, the last
/// dimension comes first: `[last_before, last_after, ..., first_before, first_after]`.
#[derive(Debug, Clone)]
pub struct ConstantPadND<const N: usize> {
    padding: Vec<i64>,
    value: f64,
}

pub type ConstantPad3D = ConstantPadND<3>;

impl<const N: usize> ConstantPadND<N> {
    pub fn new(padding: &[usize], value: f64) -> Result<Self> {
        ensure!(
            padding.len() == N * 2,
            "expect padding slice length {}, but get {}",
            N * 2,
            padding.len()
        );
        ensure!(!value.is_nan(), "padding value must not be NaN");

        let padding: Vec<_> = padding.iter().map(|&pad| pad as i64).collect();

        Ok(Self { padding, value })
    }

    pub fn zeros(padding: &[usize]) -> Result<Self> {
        Self::new(padding, 0.0)
    }

    pub fn padding(&self) -> &[i64] {
        &self.padding
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_noop(&self) -> bool {
        self.padding.iter().all(|&pad| pad == 0)
    }

    pub fn f_forward(&self, xs: &Tensor) -> Result<Tensor> {
        let Self { ref padding, value } = *self;
        ensure!(
            xs.dim() >= N,
            "expect input with at least {} dimensions, but get {}",
            N,
            xs.dim()
        );

        if self.is_noop() {
            return Ok(xs.shallow_clone());
        }

        let padded = xs.f_constant_pad_nd(padding)?;
        if value == 0.0 {
            return Ok(padded);
        }

        // pad a tensor of ones to locate the border
        let border = xs.f_ones_like()?.f_constant_pad_nd(padding)?.f_lt(0.5)?;
        let padded = padded.f_masked_fill(&border, value)?;
        Ok(padded)
    }
}

impl<const N: usize> nn::Module for ConstantPadND<N> {
    fn forward(&self, xs: &Tensor) -> Tensor {
        self.f_forward(xs).unwrap()
    }
}
