use crate::{
    common::*,
    module::Module,
    ntuple::{ensure_positive, to_i64_vec},
    padding::{pad_same, resolve_padding, PaddingSpec, ResolvedPadding},
};

pub use pool_3d_::*;
pub use pool_3d_same::*;
pub use pool_init::*;

/// Builds a 3D pooling layer honoring the padding policy in `init`.
pub fn create_pool3d(kind: PoolKind, init: Pool3DInit) -> Result<Module> {
    let ResolvedPadding {
        padding,
        is_dynamic,
    } = init.resolve(kind)?;

    let module: Module = match (kind, is_dynamic) {
        (PoolKind::Avg, true) => {
            debug!("build AvgPool3DSame for padding policy {}", init.padding);
            init.build_avg_same()?.into()
        }
        (PoolKind::Max, true) => {
            debug!("build MaxPool3DSame for padding policy {}", init.padding);
            init.build_max_same()?.into()
        }
        (PoolKind::Avg, false) => {
            debug!(
                "build AvgPool3D with static padding {:?} for padding policy {}",
                padding, init.padding
            );
            init.build_avg()?.into()
        }
        (PoolKind::Max, false) => {
            debug!(
                "build MaxPool3D with static padding {:?} for padding policy {}",
                padding, init.padding
            );
            init.build_max()?.into()
        }
    };

    Ok(module)
}

/// Applies "SAME" padding with zeros and then 3D average pooling with zero padding.
///
/// The padded zeros are counted as regular elements when `count_include_pad`
/// is set, which differs from libtorch's own padding on the border.
pub fn avg_pool3d_same(
    xs: &Tensor,
    ksize: &[usize; 3],
    stride: &[usize; 3],
    ceil_mode: bool,
    count_include_pad: bool,
) -> Result<Tensor> {
    let xs = pad_same(xs, ksize, stride, &[1; 3], 0.0)?;
    let output = xs.f_avg_pool3d(
        &to_i64_vec(ksize),
        &to_i64_vec(stride),
        &[0, 0, 0],
        ceil_mode,
        count_include_pad,
        None::<i64>,
    )?;
    Ok(output)
}

/// Applies "SAME" padding with negative infinity and then 3D max pooling with
/// zero padding, so that padded elements are never selected.
pub fn max_pool3d_same(
    xs: &Tensor,
    ksize: &[usize; 3],
    stride: &[usize; 3],
    dilation: &[usize; 3],
    ceil_mode: bool,
) -> Result<Tensor> {
    let xs = pad_same(xs, ksize, stride, dilation, f64::NEG_INFINITY)?;
    let output = xs.f_max_pool3d(
        &to_i64_vec(ksize),
        &to_i64_vec(stride),
        &[0, 0, 0],
        &to_i64_vec(dilation),
        ceil_mode,
    )?;
    Ok(output)
}

mod pool_init {
    use super::*;

    #[derive(
        Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumString, Serialize, Deserialize,
    )]
    #[strum(serialize_all = "lowercase")]
    #[serde(rename_all = "lowercase")]
    pub enum PoolKind {
        Avg,
        Max,
    }

    impl PoolKind {
        /// Parses a pool type name, which is either "avg" or "max".
        pub fn parse(name: &str) -> Result<Self> {
            name.parse()
                .map_err(|_| format_err!("unsupported pool type '{}'", name))
        }
    }

    #[derive(Debug, Clone)]
    pub struct Pool3DInit {
        pub ksize: [usize; 3],
        /// Defaults to the kernel size if not set.
        pub stride: Option<[usize; 3]>,
        pub padding: PaddingSpec,
        /// Only max pooling supports dilation.
        pub dilation: [usize; 3],
        pub ceil_mode: bool,
        /// Only used by average pooling.
        pub count_include_pad: bool,
    }

    impl Pool3DInit {
        pub fn new(ksize: usize) -> Self {
            Self {
                ksize: [ksize; 3],
                stride: None,
                padding: PaddingSpec::Default,
                dilation: [1; 3],
                ceil_mode: false,
                count_include_pad: true,
            }
        }

        pub fn stride(&self) -> [usize; 3] {
            self.stride.unwrap_or(self.ksize)
        }

        pub fn resolve(&self, kind: PoolKind) -> Result<ResolvedPadding<3>> {
            let Self {
                ksize,
                ref padding,
                dilation,
                ..
            } = *self;
            let stride = self.stride();

            ensure_positive("ksize", &ksize)?;
            ensure_positive("stride", &stride)?;
            ensure_positive("dilation", &dilation)?;
            ensure!(
                kind == PoolKind::Max || dilation == [1; 3],
                "{} pooling does not support dilation {:?}",
                kind.as_ref(),
                dilation
            );

            resolve_padding(padding, &ksize, &stride, &dilation)
        }

        pub fn build_avg(self) -> Result<AvgPool3D> {
            let ResolvedPadding { padding, .. } = self.resolve(PoolKind::Avg)?;
            let stride = self.stride();
            let Self {
                ksize,
                ceil_mode,
                count_include_pad,
                ..
            } = self;

            Ok(AvgPool3D {
                ksize,
                stride,
                padding,
                ceil_mode,
                count_include_pad,
            })
        }

        pub fn build_max(self) -> Result<MaxPool3D> {
            let ResolvedPadding { padding, .. } = self.resolve(PoolKind::Max)?;
            let stride = self.stride();
            let Self {
                ksize,
                dilation,
                ceil_mode,
                ..
            } = self;

            Ok(MaxPool3D {
                ksize,
                stride,
                padding,
                dilation,
                ceil_mode,
            })
        }

        pub fn build_avg_same(self) -> Result<AvgPool3DSame> {
            self.resolve(PoolKind::Avg)?;
            let stride = self.stride();
            let Self {
                ksize,
                ceil_mode,
                count_include_pad,
                ..
            } = self;

            Ok(AvgPool3DSame {
                ksize,
                stride,
                ceil_mode,
                count_include_pad,
            })
        }

        pub fn build_max_same(self) -> Result<MaxPool3DSame> {
            self.resolve(PoolKind::Max)?;
            let stride = self.stride();
            let Self {
                ksize,
                dilation,
                ceil_mode,
                ..
            } = self;

            Ok(MaxPool3DSame {
                ksize,
                stride,
                dilation,
                ceil_mode,
            })
        }
    }
}

mod pool_3d_ {
    use super::*;

    #[derive(Debug, Clone)]
    pub struct AvgPool3D {
        pub(super) ksize: [usize; 3],
        pub(super) stride: [usize; 3],
        pub(super) padding: [usize; 3],
        pub(super) ceil_mode: bool,
        pub(super) count_include_pad: bool,
    }

    impl AvgPool3D {
        pub fn padding(&self) -> &[usize; 3] {
            &self.padding
        }

        pub fn f_forward(&self, xs: &Tensor) -> Result<Tensor> {
            let Self {
                ref ksize,
                ref stride,
                ref padding,
                ceil_mode,
                count_include_pad,
            } = *self;

            let output = xs.f_avg_pool3d(
                &to_i64_vec(ksize),
                &to_i64_vec(stride),
                &to_i64_vec(padding),
                ceil_mode,
                count_include_pad,
                None::<i64>,
            )?;
            Ok(output)
        }
    }

    impl nn::Module for AvgPool3D {
        fn forward(&self, xs: &Tensor) -> Tensor {
            self.f_forward(xs).unwrap()
        }
    }

    #[derive(Debug, Clone)]
    pub struct MaxPool3D {
        pub(super) ksize: [usize; 3],
        pub(super) stride: [usize; 3],
        pub(super) padding: [usize; 3],
        pub(super) dilation: [usize; 3],
        pub(super) ceil_mode: bool,
    }

    impl MaxPool3D {
        pub fn padding(&self) -> &[usize; 3] {
            &self.padding
        }

        pub fn f_forward(&self, xs: &Tensor) -> Result<Tensor> {
            let Self {
                ref ksize,
                ref stride,
                ref padding,
                ref dilation,
                ceil_mode,
            } = *self;

            let output = xs.f_max_pool3d(
                &to_i64_vec(ksize),
                &to_i64_vec(stride),
                &to_i64_vec(padding),
                &to_i64_vec(dilation),
                ceil_mode,
            )?;
            Ok(output)
        }
    }

    impl nn::Module for MaxPool3D {
        fn forward(&self, xs: &Tensor) -> Tensor {
            self.f_forward(xs).unwrap()
        }
    }
}

mod pool_3d_same {
    use super::*;

    /// TensorFlow-like "SAME" 3D average pooling.
    #[derive(Debug, Clone)]
    pub struct AvgPool3DSame {
        pub(super) ksize: [usize; 3],
        pub(super) stride: [usize; 3],
        pub(super) ceil_mode: bool,
        pub(super) count_include_pad: bool,
    }

    impl AvgPool3DSame {
        pub fn f_forward(&self, xs: &Tensor) -> Result<Tensor> {
            let Self {
                ref ksize,
                ref stride,
                ceil_mode,
                count_include_pad,
            } = *self;
            avg_pool3d_same(xs, ksize, stride, ceil_mode, count_include_pad)
        }
    }

    impl nn::Module for AvgPool3DSame {
        fn forward(&self, xs: &Tensor) -> Tensor {
            self.f_forward(xs).unwrap()
        }
    }

    /// TensorFlow-like "SAME" 3D max pooling.
    #[derive(Debug, Clone)]
    pub struct MaxPool3DSame {
        pub(super) ksize: [usize; 3],
        pub(super) stride: [usize; 3],
        pub(super) dilation: [usize; 3],
        pub(super) ceil_mode: bool,
    }

    impl MaxPool3DSame {
        pub fn f_forward(&self, xs: &Tensor) -> Result<Tensor> {
            let Self {
                ref ksize,
                ref stride,
                ref dilation,
                ceil_mode,
            } = *self;
            max_pool3d_same(xs, ksize, stride, dilation, ceil_mode)
        }
    }

    impl nn::Module for MaxPool3DSame {
        fn forward(&self, xs: &Tensor) -> Tensor {
            self.f_forward(xs).unwrap()
        }
    }
}
