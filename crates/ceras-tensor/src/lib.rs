//! Ceras Tensor - N-Dimensional Arrays for the Ceras Autograd Library
//!
//! This crate provides the `Tensor` type that flows through every node of
//! a Ceras expression graph. A tensor is a shape and an offset over a
//! shared, contiguous buffer: clones and views are cheap and see each
//! other's writes, and `deep_copy` detaches.
//!
//! # Key Features
//! - N-dimensional tensors with shallow clones and offset views
//! - `NumPy` broadcasting for element-wise arithmetic
//! - Matrix multiply, reductions, softmax, concatenation
//! - Non-owning `View2d`/`View3d`/`View4d` windows for image kernels
//! - Plain-text and JSON persistence
//!
//! # Example
//! ```rust
//! use ceras_tensor::{ones, zeros, Tensor};
//!
//! let a = zeros::<f32>(&[2, 3]);
//! let b = ones::<f32>(&[2, 3]);
//!
//! let c = a.add(&b).unwrap();
//! c.mul_scalar_(2.0);
//! assert_eq!(c.sum_all(), 12.0);
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
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::float_cmp)]
#![allow(clippy::type_complexity)]

// =============================================================================
// Modules
// =============================================================================

pub mod creation;
pub mod io;
pub mod shape;
pub mod tensor;
pub mod view;

// =============================================================================
// Re-exports
// =============================================================================

pub use ceras_core::{DType, Error, Result};
pub use creation::*;
pub use io::{load_tensor, read_tensor, save_tensor, write_tensor, TensorData};
pub use shape::{Shape, Strides};
pub use tensor::Tensor;
pub use view::{View2d, View3d, View4d};

// =============================================================================
// Prelude
// =============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::shape::{Shape, Strides};
    pub use crate::tensor::Tensor;
    pub use crate::view::{View2d, View3d, View4d};
    pub use crate::{
        arange, as_tensor, full, glorot_uniform, linspace, ones, ones_like, random, randn,
        zeros, zeros_like,
    };
    pub use ceras_core::{DType, Error, Result};
}
