//! Ceras Core - Foundation Layer for the Ceras Autograd Library
//!
//! This crate provides the abstractions every other Ceras crate builds on:
//! the error type, the scalar type system, the shared storage buffer behind
//! tensors, unique ids for graph nodes, and the runtime configuration
//! (learning phase, epsilon, random source).
//!
//! # Key Features
//! - Unified `Error`/`Result` types
//! - Type-safe scalar traits (f32, f64, u8)
//! - Reference-counted, lock-protected storage with shallow clones
//! - Thread-local learning phase with RAII guards
//! - Seedable global random generator
//!
//! # Example
//! ```rust
//! use ceras_core::{Storage, config};
//!
//! let storage = Storage::<f32>::zeros(16);
//! assert_eq!(storage.len(), 16);
//! assert!(config::is_training());
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
#![allow(clippy::unreadable_literal)]
#![allow(clippy::float_cmp)]

// =============================================================================
// Modules
// =============================================================================

pub mod config;
pub mod dtype;
pub mod error;
pub mod id;
pub mod storage;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{LearningPhase, LearningPhaseGuard, EPSILON};
pub use dtype::{DType, Float, Numeric, Scalar};
pub use error::{Error, Result};
pub use id::generate_uid;
pub use storage::Storage;

// =============================================================================
// Prelude
// =============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::config::{LearningPhase, LearningPhaseGuard};
    pub use crate::dtype::{DType, Float, Numeric, Scalar};
    pub use crate::error::{Error, Result};
    pub use crate::storage::Storage;
}
