use crate::{
    common::*,
    config::LayerConfig,
    constant_pad_nd::ConstantPad3D,
    module::Module,
    ntuple::{ensure_positive, to_i64_vec},
    padding::{pad_same, resolve_padding, same_pad_arg, PaddingSpec, ResolvedPadding},
};

pub use conv_3d_::*;
pub use conv_3d_same::*;
pub use conv_3d_same_export::*;
pub use conv_init::*;

/// Builds a 3D convolution honoring the padding policy in `init`.
///
/// A native [Conv3D] is returned whenever symmetric padding is able to express
/// the policy. Otherwise the input is padded on each call by [Conv3DSame], or by
/// [Conv3DSameExport] when `config` asks for export-friendly convolutions.
pub fn create_conv3d_pad<'a>(
    path: impl Borrow<nn::Path<'a>>,
    in_dim: usize,
    out_dim: usize,
    init: Conv3DInit,
    config: &LayerConfig,
) -> Result<Module> {
    let ResolvedPadding {
        padding,
        is_dynamic,
    } = init.resolve()?;

    let module: Module = if is_dynamic {
        if config.use_export_conv() {
            ensure!(
                !config.scriptable,
                "export-friendly same padding convolution does not support scripting"
            );
            debug!("build Conv3DSameExport for padding policy {}", init.padding);
            init.build_same_export(path, in_dim, out_dim)?.into()
        } else {
            debug!("build Conv3DSame for padding policy {}", init.padding);
            init.build_same(path, in_dim, out_dim)?.into()
        }
    } else {
        debug!(
            "build Conv3D with static padding {:?} for padding policy {}",
            padding, init.padding
        );
        init.build(path, in_dim, out_dim)?.into()
    };

    Ok(module)
}

/// Applies "SAME" padding with zeros and then a 3D convolution with zero padding.
pub fn conv3d_same(
    xs: &Tensor,
    weight: &Tensor,
    bias: Option<&Tensor>,
    stride: &[usize; 3],
    dilation: &[usize; 3],
    groups: usize,
) -> Result<Tensor> {
    let ksize = match *weight.size().as_slice() {
        [_, _, kd, kh, kw] => [kd as usize, kh as usize, kw as usize],
        ref size => bail!("expect 5 dimensional weight, but get {:?}", size),
    };
    let xs = pad_same(xs, &ksize, stride, dilation, 0.0)?;
    let output = xs.f_conv3d(
        weight,
        bias,
        &to_i64_vec(stride),
        &[0, 0, 0],
        &to_i64_vec(dilation),
        groups as i64,
    )?;
    Ok(output)
}

mod conv_init {
    use super::*;

    #[derive(Debug, Clone)]
    pub struct Conv3DInit {
        pub ksize: [usize; 3],
        pub stride: [usize; 3],
        pub padding: PaddingSpec,
        pub dilation: [usize; 3],
        pub groups: usize,
        pub bias: bool,
        pub ws_init: nn::Init,
        pub bs_init: nn::Init,
    }

    impl Conv3DInit {
        pub fn new(ksize: usize) -> Self {
            Self {
                ksize: [ksize; 3],
                stride: [1; 3],
                padding: PaddingSpec::Default,
                dilation: [1; 3],
                groups: 1,
                bias: false,
                ws_init: nn::Init::KaimingUniform,
                bs_init: nn::Init::Const(0.0),
            }
        }

        pub fn resolve(&self) -> Result<ResolvedPadding<3>> {
            let Self {
                ksize,
                stride,
                ref padding,
                dilation,
                ..
            } = *self;

            ensure_positive("ksize", &ksize)?;
            ensure_positive("stride", &stride)?;
            ensure_positive("dilation", &dilation)?;
            resolve_padding(padding, &ksize, &stride, &dilation)
        }

        /// Builds a native convolution with the resolved symmetric padding.
        pub fn build<'a>(
            self,
            path: impl Borrow<nn::Path<'a>>,
            in_dim: usize,
            out_dim: usize,
        ) -> Result<Conv3D> {
            let ResolvedPadding { padding, .. } = self.resolve()?;
            self.build_with_padding(path, in_dim, out_dim, padding)
        }

        pub fn build_same<'a>(
            self,
            path: impl Borrow<nn::Path<'a>>,
            in_dim: usize,
            out_dim: usize,
        ) -> Result<Conv3DSame> {
            self.resolve()?;
            let conv = self.build_with_padding(path, in_dim, out_dim, [0; 3])?;
            Ok(Conv3DSame { conv })
        }

        pub fn build_same_export<'a>(
            self,
            path: impl Borrow<nn::Path<'a>>,
            in_dim: usize,
            out_dim: usize,
        ) -> Result<Conv3DSameExport> {
            self.resolve()?;
            let conv = self.build_with_padding(path, in_dim, out_dim, [0; 3])?;
            Ok(Conv3DSameExport { conv, cache: None })
        }

        fn build_with_padding<'a>(
            self,
            path: impl Borrow<nn::Path<'a>>,
            in_dim: usize,
            out_dim: usize,
            padding: [usize; 3],
        ) -> Result<Conv3D> {
            let Self {
                ksize,
                stride,
                dilation,
                groups,
                bias,
                ws_init,
                bs_init,
                ..
            } = self;

            ensure!(
                groups > 0 && in_dim % groups == 0,
                "in_dim must be multiple of group"
            );
            ensure!(out_dim % groups == 0, "out_dim must be multiple of group");

            let path = path.borrow();
            let in_dim = in_dim as i64;
            let out_dim = out_dim as i64;
            let groups_i64 = groups as i64;

            let bs = bias.then(|| path.var("bias", &[out_dim], bs_init));
            let ws = {
                let weight_size: Vec<i64> = vec![out_dim, in_dim / groups_i64]
                    .into_iter()
                    .chain(to_i64_vec(&ksize))
                    .collect();
                path.var("weight", weight_size.as_slice(), ws_init)
            };

            Ok(Conv3D {
                ksize,
                stride,
                padding,
                dilation,
                groups,
                weight: ws,
                bias: bs,
            })
        }
    }
}

mod conv_3d_ {
    use super::*;

    /// 3D convolution with symmetric padding.
    #[derive(Debug)]
    pub struct Conv3D {
        pub(super) ksize: [usize; 3],
        pub(super) stride: [usize; 3],
        pub(super) padding: [usize; 3],
        pub(super) dilation: [usize; 3],
        pub(super) groups: usize,
        pub(super) weight: Tensor,
        pub(super) bias: Option<Tensor>,
    }

    impl Conv3D {
        pub fn ksize(&self) -> &[usize; 3] {
            &self.ksize
        }

        pub fn stride(&self) -> &[usize; 3] {
            &self.stride
        }

        pub fn padding(&self) -> &[usize; 3] {
            &self.padding
        }

        pub fn dilation(&self) -> &[usize; 3] {
            &self.dilation
        }

        pub fn groups(&self) -> usize {
            self.groups
        }

        pub fn weight(&self) -> &Tensor {
            &self.weight
        }

        pub fn bias(&self) -> Option<&Tensor> {
            self.bias.as_ref()
        }

        pub fn f_forward(&self, xs: &Tensor) -> Result<Tensor> {
            let Self {
                ref stride,
                ref padding,
                ref dilation,
                groups,
                ref weight,
                ref bias,
                ..
            } = *self;

            let output = xs.f_conv3d(
                weight,
                bias.as_ref(),
                &to_i64_vec(stride),
                &to_i64_vec(padding),
                &to_i64_vec(dilation),
                groups as i64,
            )?;
            Ok(output)
        }
    }

    impl nn::Module for Conv3D {
        fn forward(&self, xs: &Tensor) -> Tensor {
            self.f_forward(xs).unwrap()
        }
    }
}

mod conv_3d_same {
    use super::*;

    /// TensorFlow-like "SAME" 3D convolution.
    ///
    /// The padding is recomputed from the input size on every call.
    #[derive(Debug)]
    pub struct Conv3DSame {
        pub(super) conv: Conv3D,
    }

    impl Conv3DSame {
        pub fn conv(&self) -> &Conv3D {
            &self.conv
        }

        pub fn f_forward(&self, xs: &Tensor) -> Result<Tensor> {
            let Conv3D {
                ref stride,
                ref dilation,
                groups,
                ref weight,
                ref bias,
                ..
            } = self.conv;

            conv3d_same(xs, weight, bias.as_ref(), stride, dilation, groups)
        }
    }

    impl nn::Module for Conv3DSame {
        fn forward(&self, xs: &Tensor) -> Tensor {
            self.f_forward(xs).unwrap()
        }
    }
}

mod conv_3d_same_export {
    use super::*;

    /// TensorFlow-like "SAME" 3D convolution with a shape-fixed padding.
    ///
    /// The padding is computed on the first call and reused afterwards, even
    /// when later inputs have a different spatial size. The module is not
    /// compatible with script-mode compilation.
    #[derive(Debug)]
    pub struct Conv3DSameExport {
        pub(super) conv: Conv3D,
        pub(super) cache: Option<PadCache>,
    }

    #[derive(Debug)]
    pub(super) struct PadCache {
        pad: ConstantPad3D,
        input_size: [i64; 3],
        stale_warned: bool,
    }

    impl Conv3DSameExport {
        pub fn conv(&self) -> &Conv3D {
            &self.conv
        }

        /// The cached padding in libtorch `pad` order, if any.
        pub fn pad_arg(&self) -> Option<&[i64]> {
            self.cache.as_ref().map(|cache| cache.pad.padding())
        }

        /// The input size the padding was computed for.
        pub fn pad_input_size(&self) -> Option<[i64; 3]> {
            self.cache.as_ref().map(|cache| cache.input_size)
        }

        /// Whether a stale padding has already been reported for this layer.
        pub fn is_stale_warned(&self) -> bool {
            self.cache.as_ref().map_or(false, |cache| cache.stale_warned)
        }

        pub fn forward(&mut self, xs: &Tensor) -> Result<Tensor> {
            let size = xs.size();
            ensure!(
                size.len() >= 3,
                "expect at least 3 dimensions, but get input size {:?}",
                size
            );
            let input_size = [
                size[size.len() - 3],
                size[size.len() - 2],
                size[size.len() - 1],
            ];
            let Self { conv, cache } = self;

            let cache = match cache {
                Some(cache) => {
                    if cache.input_size != input_size && !cache.stale_warned {
                        warn!(
                            "Conv3DSameExport reuses padding {:?} computed for input size {:?} on input size {:?}",
                            cache.pad.padding(),
                            cache.input_size,
                            input_size
                        );
                        cache.stale_warned = true;
                    }
                    cache
                }
                None => {
                    let pad_arg =
                        same_pad_arg(&input_size, &conv.ksize, &conv.stride, &conv.dilation)?;
                    debug!(
                        "Conv3DSameExport caches padding {:?} for input size {:?}",
                        pad_arg, input_size
                    );
                    cache.insert(PadCache {
                        pad: ConstantPad3D::zeros(&pad_arg)?,
                        input_size,
                        stale_warned: false,
                    })
                }
            };

            let xs = cache.pad.f_forward(xs)?;
            conv.f_forward(&xs)
        }
    }
}
