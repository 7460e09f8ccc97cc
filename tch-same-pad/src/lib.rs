//! "SAME"-padded 3D convolution and pooling modules for tch.
//!
//! libtorch only accepts symmetric padding, so TensorFlow-like "SAME" sizing
//! (`output = ceil(input / stride)`) is reproduced by padding the input
//! explicitly and calling the native primitive with zero padding.

mod common;
pub mod config;
pub mod constant_pad_nd;
pub mod conv_3d;
pub mod module;
pub mod ntuple;
pub mod padding;
pub mod pool_3d;

pub use config::*;
pub use constant_pad_nd::*;
pub use conv_3d::*;
pub use module::*;
pub use ntuple::*;
pub use padding::*;
pub use pool_3d::*;
