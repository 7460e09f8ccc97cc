use crate::{
    common::*,
    conv_3d::{Conv3D, Conv3DSame, Conv3DSameExport},
    pool_3d::{AvgPool3D, AvgPool3DSame, MaxPool3D, MaxPool3DSame},
};

pub use module_::*;
mod module_ {

    use super::*;

    /// A layer built by the factories.
    #[derive(Debug, AsRefStr)]
    pub enum Module {
        Conv3D(Conv3D),
        Conv3DSame(Conv3DSame),
        Conv3DSameExport(Conv3DSameExport),
        AvgPool3D(AvgPool3D),
        AvgPool3DSame(AvgPool3DSame),
        MaxPool3D(MaxPool3D),
        MaxPool3DSame(MaxPool3DSame),
    }

    impl From<Conv3D> for Module {
        fn from(v: Conv3D) -> Self {
            Self::Conv3D(v)
        }
    }

    impl From<Conv3DSame> for Module {
        fn from(v: Conv3DSame) -> Self {
            Self::Conv3DSame(v)
        }
    }

    impl From<Conv3DSameExport> for Module {
        fn from(v: Conv3DSameExport) -> Self {
            Self::Conv3DSameExport(v)
        }
    }

    impl From<AvgPool3D> for Module {
        fn from(v: AvgPool3D) -> Self {
            Self::AvgPool3D(v)
        }
    }

    impl From<AvgPool3DSame> for Module {
        fn from(v: AvgPool3DSame) -> Self {
            Self::AvgPool3DSame(v)
        }
    }

    impl From<MaxPool3D> for Module {
        fn from(v: MaxPool3D) -> Self {
            Self::MaxPool3D(v)
        }
    }

    impl From<MaxPool3DSame> for Module {
        fn from(v: MaxPool3DSame) -> Self {
            Self::MaxPool3DSame(v)
        }
    }

    impl Module {
        pub fn forward(&mut self, xs: &Tensor) -> Result<Tensor> {
            let output = match self {
                Self::Conv3D(module) => module.f_forward(xs)?,
                Self::Conv3DSame(module) => module.f_forward(xs)?,
                Self::Conv3DSameExport(module) => module.forward(xs)?,
                Self::AvgPool3D(module) => module.f_forward(xs)?,
                Self::AvgPool3DSame(module) => module.f_forward(xs)?,
                Self::MaxPool3D(module) => module.f_forward(xs)?,
                Self::MaxPool3DSame(module) => module.f_forward(xs)?,
            };
            Ok(output)
        }

        /// Whether the layer pads its input on each call.
        pub fn is_same_padding(&self) -> bool {
            matches!(
                self,
                Self::Conv3DSame(_)
                    | Self::Conv3DSameExport(_)
                    | Self::AvgPool3DSame(_)
                    | Self::MaxPool3DSame(_)
            )
        }

        pub fn as_conv_3d(&self) -> Option<&Conv3D> {
            match self {
                Self::Conv3D(module) => Some(module),
                Self::Conv3DSame(module) => Some(module.conv()),
                Self::Conv3DSameExport(module) => Some(module.conv()),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        conv_3d::{create_conv3d_pad, Conv3DInit},
        padding::PaddingSpec,
        pool_3d::{create_pool3d, Pool3DInit, PoolKind},
        LayerConfig,
    };
    use tch::kind::FLOAT_CPU;

    #[test]
    fn module_forward_test() {
        let vs = nn::VarStore::new(Device::Cpu);
        let root = vs.root();
        let config = LayerConfig::default();

        let mut modules = vec![
            create_conv3d_pad(
                &root / "conv",
                3,
                8,
                Conv3DInit {
                    stride: [2; 3],
                    padding: "same".parse().unwrap(),
                    bias: true,
                    ..Conv3DInit::new(3)
                },
                &config,
            )
            .unwrap(),
            create_pool3d(
                PoolKind::parse("max").unwrap(),
                Pool3DInit {
                    stride: Some([2; 3]),
                    padding: PaddingSpec::Same,
                    ..Pool3DInit::new(3)
                },
            )
            .unwrap(),
            create_pool3d(
                PoolKind::Avg,
                Pool3DInit {
                    stride: Some([1; 3]),
                    padding: PaddingSpec::Same,
                    ..Pool3DInit::new(3)
                },
            )
            .unwrap(),
        ];

        assert_eq!(modules[0].as_ref(), "Conv3DSame");
        assert_eq!(modules[1].as_ref(), "MaxPool3DSame");
        assert_eq!(modules[2].as_ref(), "AvgPool3D");
        assert!(modules[0].is_same_padding());
        assert!(!modules[2].is_same_padding());
        assert!(modules[0].as_conv_3d().is_some());
        assert!(modules[1].as_conv_3d().is_none());

        let input = Tensor::randn(&[2, 3, 16, 16, 16], FLOAT_CPU);
        let output = modules
            .iter_mut()
            .try_fold(input, |xs, module| module.forward(&xs))
            .unwrap();
        assert_eq!(output.size(), [2, 8, 4, 4, 4]);
    }
}
