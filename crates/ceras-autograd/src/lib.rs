//! Ceras Autograd - Expression Graphs with Reverse-Mode Differentiation
//!
//! Graphs are built from leaves (variables, place holders, constants and
//! scalar values) combined by differentiable operations. Building a graph
//! computes nothing; `forward` evaluates it and caches what the backward
//! pass needs, and `backward` accumulates gradients into the variables.
//!
//! # Key Features
//! - Lazily evaluated, shareable expression graphs
//! - Arithmetic, linear algebra, convolution, pooling, normalization
//! - Activations and losses with exact analytical gradients
//! - Finite-difference gradient checking
//! - Sessions that bind inputs and save or restore variables
//!
//! # Example
//! ```rust
//! use ceras_autograd::prelude::*;
//!
//! let x = PlaceHolder::new();
//! let w = Variable::new(Tensor::from_vec(vec![2.0, 3.0], &[2, 1]).unwrap());
//! let loss = sum_reduce(&square(&(Expression::from(&x) * Expression::from(&w))));
//!
//! let mut session = Session::new();
//! session.bind(&x, Tensor::from_vec(vec![1.0, 1.0], &[1, 2]).unwrap());
//! assert_eq!(session.run(&loss).unwrap().to_vec(), vec![25.0]);
//!
//! loss.backward(&Tensor::ones(&[1])).unwrap();
//! assert_eq!(w.gradient().to_vec(), vec![10.0, 10.0]);
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
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::float_cmp)]

// =============================================================================
// Modules
// =============================================================================

pub mod backward;
pub mod constant;
pub mod expression;
pub mod functions;
pub mod graph;
pub mod metric;
pub mod operator;
pub mod place_holder;
pub mod session;
pub mod variable;

// =============================================================================
// Re-exports
// =============================================================================

pub use backward::{gradcheck, numerical_gradient};
pub use constant::{Constant, Value};
pub use expression::{Expression, NodeKind};
pub use graph::topological_order;
pub use metric::binary_accuracy;
pub use operator::{BinaryFunction, BinaryOperator, UnaryFunction, UnaryOperator};
pub use place_holder::PlaceHolder;
pub use session::Session;
pub use variable::Variable;

// =============================================================================
// Prelude
// =============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::functions::*;
    pub use crate::metric::binary_accuracy;
    pub use crate::{Constant, Expression, PlaceHolder, Session, Value, Variable};
    pub use ceras_core::config::{LearningPhase, LearningPhaseGuard};
    pub use ceras_core::{Error, Result};
    pub use ceras_tensor::Tensor;
}
