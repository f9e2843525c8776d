//! Layers - Neural Network Layer Implementations
//!
//! @version 0.1.0
//! @author Ceras Development Team

pub mod activation;
pub mod conv;
pub mod dense;
pub mod dropout;
pub mod norm;
pub mod pooling;
pub mod reshape;

pub use activation::{LeakyReLU, ReLU, Sigmoid, Softmax, Softplus, Tanh, ELU, GELU, SELU};
pub use conv::Conv2D;
pub use dense::Dense;
pub use dropout::Dropout;
pub use norm::{BatchNormalization, InstanceNormalization};
pub use pooling::{AveragePooling2D, MaxPooling2D, UpSampling2D};
pub use reshape::{Flatten, Reshape};
