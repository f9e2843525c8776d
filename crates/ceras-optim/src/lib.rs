//! Ceras Optim - Optimization Algorithms
//!
//! Optimizers that minimize a loss expression by updating the trainable
//! variables reachable from it.
//!
//! # Optimizers
//!
//! - **Sgd** - Stochastic Gradient Descent with momentum, Nesterov and decay
//! - **Adagrad** - Adaptive gradient
//! - **RmsProp** - Root Mean Square Propagation
//! - **Adadelta** - Adaptive learning rate from update history
//! - **Adam** - Adaptive Moment Estimation, optionally `AMSGrad`
//! - **GradientDescent** - Plain gradient descent with optional momentum
//!
//! Every learning rate is divided by the batch size at construction.
//!
//! # Example
//!
//! ```rust
//! use ceras_autograd::prelude::*;
//! use ceras_optim::prelude::*;
//!
//! let w = Variable::new(Tensor::from_vec(vec![4.0], &[1]).unwrap());
//! let loss = square(&Expression::from(&w));
//! let mut optimizer = Sgd::new(&loss, 1, 0.1).unwrap();
//!
//! for _ in 0..50 {
//!     loss.forward().unwrap();
//!     optimizer.step().unwrap();
//! }
//! assert!(w.data().to_vec()[0].abs() < 1e-3);
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
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::float_cmp)]

// =============================================================================
// Modules
// =============================================================================

pub mod adadelta;
pub mod adagrad;
pub mod adam;
pub mod optimizer;
pub mod rmsprop;
pub mod sgd;

// =============================================================================
// Re-exports
// =============================================================================

pub use adadelta::Adadelta;
pub use adagrad::Adagrad;
pub use adam::Adam;
pub use optimizer::Optimizer;
pub use rmsprop::RmsProp;
pub use sgd::{GradientDescent, Sgd};

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for optimization.
pub mod prelude {
    pub use crate::{Adadelta, Adagrad, Adam, GradientDescent, Optimizer, RmsProp, Sgd};
}
