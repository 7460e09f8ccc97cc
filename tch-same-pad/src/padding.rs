//! Padding arithmetic for TensorFlow-like "SAME" sizing.

use crate::{common::*, constant_pad_nd::ConstantPadND, ntuple::SpatialParam};

/// Total padding so that the output length equals `ceil(input / stride)`.
pub fn same_padding(input: usize, ksize: usize, stride: usize, dilation: usize) -> usize {
    debug_assert!(input > 0 && ksize > 0 && stride > 0 && dilation > 0);
    let output = (input + stride - 1) / stride;
    let required = (output - 1) * stride + (ksize - 1) * dilation + 1;
    required.saturating_sub(input)
}

/// The symmetric padding libtorch modules use by default.
pub fn symmetric_padding(ksize: usize, stride: usize, dilation: usize) -> usize {
    ((stride - 1) + dilation * (ksize - 1)) / 2
}

/// Whether symmetric padding is able to reproduce "SAME" sizing.
pub fn is_static_pad(ksize: usize, stride: usize, dilation: usize) -> bool {
    stride == 1 && (dilation * (ksize - 1)) % 2 == 0
}

/// Splits the "SAME" padding of each dimension into `(before, after)`.
/// The odd element goes to the trailing side.
pub fn same_padding_pairs<const N: usize>(
    input_size: &[i64],
    ksize: &[usize; N],
    stride: &[usize; N],
    dilation: &[usize; N],
) -> Result<[(usize, usize); N]> {
    ensure!(
        input_size.len() == N,
        "expect {} spatial dimensions, but get {}",
        N,
        input_size.len()
    );

    let mut pairs = [(0, 0); N];
    for (pair, &input, &k, &s, &d) in izip!(&mut pairs, input_size, ksize, stride, dilation) {
        ensure!(input > 0, "spatial size must be positive, but get {}", input);
        let total = same_padding(input as usize, k, s, d);
        *pair = (total / 2, total - total / 2);
    }
    Ok(pairs)
}

/// The "SAME" padding in libtorch `pad` order, last dimension first.
pub fn same_pad_arg<const N: usize>(
    input_size: &[i64],
    ksize: &[usize; N],
    stride: &[usize; N],
    dilation: &[usize; N],
) -> Result<Vec<usize>> {
    let pairs = same_padding_pairs(input_size, ksize, stride, dilation)?;
    let arg = pairs
        .iter()
        .rev()
        .flat_map(|&(before, after)| [before, after])
        .collect();
    Ok(arg)
}

/// Pads the last `N` dimensions of `xs` for "SAME" sizing, filling with `value`.
pub fn pad_same<const N: usize>(
    xs: &Tensor,
    ksize: &[usize; N],
    stride: &[usize; N],
    dilation: &[usize; N],
    value: f64,
) -> Result<Tensor> {
    let size = xs.size();
    ensure!(
        size.len() >= N,
        "expect input with at least {} dimensions, but get {}",
        N,
        size.len()
    );
    let spatial_size = &size[(size.len() - N)..];
    let pad_arg = same_pad_arg(spatial_size, ksize, stride, dilation)?;
    ConstantPadND::<N>::new(&pad_arg, value)?.f_forward(xs)
}

/// The requested padding policy of a convolution or pooling layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaddingSpec {
    /// Symmetric padding derived from kernel size, stride and dilation.
    Default,
    /// Symmetric padding given per dimension, or a single value for all.
    Explicit(Vec<usize>),
    Valid,
    Same,
}

impl Default for PaddingSpec {
    fn default() -> Self {
        Self::Default
    }
}

impl From<usize> for PaddingSpec {
    fn from(padding: usize) -> Self {
        Self::Explicit(vec![padding])
    }
}

impl<const N: usize> From<[usize; N]> for PaddingSpec {
    fn from(padding: [usize; N]) -> Self {
        Self::Explicit(padding.into())
    }
}

impl FromStr for PaddingSpec {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let spec = match text.to_lowercase().as_str() {
            "" => Self::Default,
            "same" => Self::Same,
            "valid" => Self::Valid,
            _ => bail!("unrecognized padding policy '{}'", text),
        };
        Ok(spec)
    }
}

impl Display for PaddingSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Explicit(padding) => write!(f, "{:?}", padding),
            Self::Valid => write!(f, "valid"),
            Self::Same => write!(f, "same"),
        }
    }
}

/// Resolved padding of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPadding<const N: usize> {
    /// Symmetric padding passed to the native primitive.
    pub padding: [usize; N],
    /// The layer must pad the input on each call to get "SAME" sizing.
    pub is_dynamic: bool,
}

/// Decides between a static symmetric padding and dynamic "SAME" padding.
pub fn resolve_padding<const N: usize>(
    spec: &PaddingSpec,
    ksize: &[usize; N],
    stride: &[usize; N],
    dilation: &[usize; N],
) -> Result<ResolvedPadding<N>> {
    let symmetric = || {
        let mut padding = [0; N];
        for (pad, &k, &s, &d) in izip!(&mut padding, ksize, stride, dilation) {
            *pad = symmetric_padding(k, s, d);
        }
        padding
    };

    let resolved = match spec {
        PaddingSpec::Explicit(padding) => {
            let padding = match padding.as_slice() {
                &[pad] => pad.to_ntuple::<N>()?,
                padding => padding.to_ntuple::<N>()?,
            };
            ResolvedPadding {
                padding,
                is_dynamic: false,
            }
        }
        PaddingSpec::Default => ResolvedPadding {
            padding: symmetric(),
            is_dynamic: false,
        },
        PaddingSpec::Valid => ResolvedPadding {
            padding: [0; N],
            is_dynamic: false,
        },
        PaddingSpec::Same => {
            let is_static =
                izip!(ksize, stride, dilation).all(|(&k, &s, &d)| is_static_pad(k, s, d));

            if is_static {
                ResolvedPadding {
                    padding: symmetric(),
                    is_dynamic: false,
                }
            } else {
                ResolvedPadding {
                    padding: [0; N],
                    is_dynamic: true,
                }
            }
        }
    };

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use tch::kind::FLOAT_CPU;

    fn output_size(
        input: usize,
        padding: usize,
        ksize: usize,
        stride: usize,
        dilation: usize,
    ) -> usize {
        (input + padding - dilation * (ksize - 1) - 1) / stride + 1
    }

    #[test]
    fn same_padding_output_size_test() {
        for input in 1..=20 {
            for ksize in 1..=5 {
                for stride in 1..=4 {
                    for dilation in 1..=3 {
                        let padding = same_padding(input, ksize, stride, dilation);
                        let expect = (input + stride - 1) / stride;
                        assert_eq!(
                            output_size(input, padding, ksize, stride, dilation),
                            expect,
                            "input={} ksize={} stride={} dilation={}",
                            input,
                            ksize,
                            stride,
                            dilation
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn same_padding_pairs_test() {
        let pairs = same_padding_pairs(&[16, 16, 16], &[3; 3], &[2; 3], &[1; 3]).unwrap();
        assert_eq!(pairs, [(0, 1); 3]);

        let pairs = same_padding_pairs(&[15, 8, 7], &[3, 4, 5], &[1, 1, 2], &[1, 1, 1]).unwrap();
        assert_eq!(pairs, [(1, 1), (1, 2), (2, 2)]);

        assert!(same_padding_pairs(&[16, 16], &[3; 3], &[2; 3], &[1; 3]).is_err());
    }

    #[test]
    fn same_pad_arg_order_test() {
        // depth needs 2, height needs 0, width needs 1
        let arg = same_pad_arg(&[8, 8, 8], &[3, 1, 2], &[1, 1, 1], &[1, 1, 1]).unwrap();
        assert_eq!(arg, [0, 1, 0, 0, 1, 1]);
    }

    #[test]
    fn static_same_agrees_with_dynamic_test() {
        let mut rng = rand::thread_rng();

        for _ in 0..100 {
            let ksize = rng.gen_range(1..=7);
            let dilation = rng.gen_range(1..=4);
            let input = rng.gen_range(1..=32);

            let resolved =
                resolve_padding(&PaddingSpec::Same, &[ksize; 3], &[1; 3], &[dilation; 3]).unwrap();

            if (dilation * (ksize - 1)) % 2 == 0 {
                assert!(!resolved.is_dynamic);
                let pairs =
                    same_padding_pairs(&[input; 3], &[ksize; 3], &[1; 3], &[dilation; 3]).unwrap();
                for (&pad, &(before, after)) in resolved.padding.iter().zip(&pairs) {
                    assert_eq!(before, after);
                    assert_eq!(pad, before);
                }
            } else {
                assert!(resolved.is_dynamic);
            }
        }
    }

    #[test]
    fn strided_same_is_dynamic_test() {
        for stride in 2..=4 {
            for ksize in 1..=5 {
                let resolved =
                    resolve_padding(&PaddingSpec::Same, &[ksize; 3], &[stride; 3], &[1; 3])
                        .unwrap();
                assert!(resolved.is_dynamic);
                assert_eq!(resolved.padding, [0; 3]);
            }
        }

        // a single strided dimension is enough
        let resolved =
            resolve_padding(&PaddingSpec::Same, &[3; 3], &[1, 1, 2], &[1; 3]).unwrap();
        assert!(resolved.is_dynamic);
    }

    #[test]
    fn resolve_other_policies_test() {
        let resolved =
            resolve_padding(&PaddingSpec::Valid, &[3; 3], &[2; 3], &[1; 3]).unwrap();
        assert_eq!(
            resolved,
            ResolvedPadding {
                padding: [0; 3],
                is_dynamic: false
            }
        );

        let resolved = resolve_padding(&PaddingSpec::from(2), &[3; 3], &[2; 3], &[1; 3]).unwrap();
        assert_eq!(resolved.padding, [2; 3]);
        assert!(!resolved.is_dynamic);

        let resolved =
            resolve_padding(&PaddingSpec::from([0, 1, 2]), &[3; 3], &[1; 3], &[1; 3]).unwrap();
        assert_eq!(resolved.padding, [0, 1, 2]);

        assert!(resolve_padding(&PaddingSpec::from([1, 2]), &[3; 3], &[1; 3], &[1; 3]).is_err());
        assert!(resolve_padding(
            &PaddingSpec::Explicit(vec![1, 2, 3, 4]),
            &[3; 3],
            &[1; 3],
            &[1; 3]
        )
        .is_err());

        let resolved =
            resolve_padding(&PaddingSpec::Default, &[3, 5, 4], &[2, 1, 1], &[1, 1, 2]).unwrap();
        assert_eq!(resolved.padding, [1, 2, 3]);
        assert!(!resolved.is_dynamic);
    }

    #[test]
    fn parse_padding_spec_test() {
        assert_eq!("".parse::<PaddingSpec>().unwrap(), PaddingSpec::Default);
        assert_eq!("same".parse::<PaddingSpec>().unwrap(), PaddingSpec::Same);
        assert_eq!("SAME".parse::<PaddingSpec>().unwrap(), PaddingSpec::Same);
        assert_eq!("Valid".parse::<PaddingSpec>().unwrap(), PaddingSpec::Valid);
        assert!("full".parse::<PaddingSpec>().is_err());
    }

    #[test]
    fn pad_same_test() {
        let input = Tensor::randn(&[1, 3, 16, 16, 16], FLOAT_CPU);
        let output = pad_same(&input, &[3; 3], &[2; 3], &[1; 3], 0.0).unwrap();
        assert_eq!(output.size(), [1, 3, 17, 17, 17]);

        // the original content sits at the leading corner
        let inner = output.narrow(2, 0, 16).narrow(3, 0, 16).narrow(4, 0, 16);
        assert!(inner.equal(&input));
        assert_eq!(f64::from(output.narrow(4, 16, 1).abs().sum(Kind::Float)), 0.0);

        // no padding is needed here
        let output = pad_same(&input, &[1; 3], &[1; 3], &[1; 3], 0.0).unwrap();
        assert!(output.equal(&input));
    }
}
