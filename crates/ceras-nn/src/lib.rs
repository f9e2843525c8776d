//! Ceras NN - Layers for Building Expression-Graph Models
//!
//! Layers own learnable variables and turn an input expression into an
//! output expression; nothing is evaluated until the resulting graph is
//! run.
//!
//! # Key Components
//!
//! - **Layer trait**: Core interface for all layers
//! - **Sequential**: Container for chaining layers
//! - **Layers**: Dense, Conv2D, normalization, dropout, pooling, reshaping
//! - **Activations**: ReLU, LeakyReLU, ELU, SELU, GELU, Sigmoid, Tanh, Softmax, Softplus
//! - **Initialization**: Glorot, He, uniform, normal
//!
//! # Example
//!
//! ```rust
//! use ceras_nn::prelude::*;
//! use ceras_tensor::Tensor;
//!
//! let x = input();
//! let hidden = Dense::new(2, 4).unwrap().forward(&x).unwrap();
//! let y = Sigmoid.forward(&hidden).unwrap();
//!
//! x.as_place_holder().unwrap().bind(Tensor::ones(&[3, 2]));
//! assert_eq!(y.forward().unwrap().shape(), &[3, 4]);
//! ```
//!
//! @version 0.1.0
//! @author Ceras Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// ML/tensor-specific allowances
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::float_cmp)]
#![allow(clippy::new_without_default)]

// =============================================================================
// Modules
// =============================================================================

pub mod init;
pub mod layer;
pub mod layers;
pub mod sequential;

// =============================================================================
// Re-exports
// =============================================================================

pub use layer::{input, Layer};
pub use layers::*;
pub use sequential::Sequential;

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for building models.
pub mod prelude {
    pub use crate::layer::{input, Layer};
    pub use crate::layers::{
        AveragePooling2D, BatchNormalization, Conv2D, Dense, Dropout, Flatten, InstanceNormalization,
        LeakyReLU, MaxPooling2D, ReLU, Reshape, Sigmoid, Softmax, Softplus, Tanh, UpSampling2D, ELU,
        GELU, SELU,
    };
    pub use crate::sequential::Sequential;
    pub use ceras_autograd::functions::Padding;
}
