//! # Ceras - Keras-Style Deep Learning on Expression Graphs
//!
//! Ceras builds models as lazily evaluated expression graphs over dense
//! tensors. Layers produce expressions, optimizers differentiate a loss
//! expression in reverse mode, and a compiled model drives training over
//! batched data.
//!
//! ## Crates
//!
//! - [`core`]: errors, dtypes, learning phase and random seeding
//! - [`tensor`]: dense row-major tensors, creation functions and I/O
//! - [`autograd`]: expressions, operations, losses, sessions
//! - [`optim`]: SGD, Adagrad, RMSprop, Adadelta, Adam
//! - [`nn`]: layers, `Sequential` and weight initializers
//! - [`model`]: `Model` and `CompiledModel`
//! - [`dataset`]: MNIST loader
//!
//! # Quick Start
//!
//! ```rust
//! use ceras::prelude::*;
//!
//! let x = input();
//! let hidden = Dense::new(2, 8).unwrap().forward(&x).unwrap();
//! let y = sigmoid(&Dense::new(8, 1).unwrap().forward(&relu(&hidden)).unwrap());
//!
//! let model = Model::new(&x, &y).unwrap();
//! let mut compiled = model.compile(mse, |loss| Adam::new(loss, 4, 0.1)).unwrap();
//!
//! let inputs = Tensor::from_vec(vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0], &[4, 2]).unwrap();
//! let targets = Tensor::from_vec(vec![0.0, 1.0, 1.0, 0.0], &[4, 1]).unwrap();
//! let (training, _) = compiled.fit(&inputs, &targets, 4, 10, false, 0.0).unwrap();
//! assert_eq!(training.len(), 10);
//!
//! let prediction = compiled.predict(&inputs).unwrap();
//! assert_eq!(prediction.shape(), &[4, 1]);
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
#![allow(clippy::doc_markdown)]
#![allow(clippy::float_cmp)]

// =============================================================================
// Crate Re-exports
// =============================================================================

pub use ceras_autograd as autograd;
pub use ceras_core as core;
pub use ceras_nn as nn;
pub use ceras_optim as optim;
pub use ceras_tensor as tensor;

// =============================================================================
// Modules
// =============================================================================

pub mod dataset;
pub mod model;

pub use model::{CompiledModel, Model};

// =============================================================================
// Prelude
// =============================================================================

/// Everything needed to build, train and run a model.
///
/// Graph operations are exported by their function names; the layer types
/// of the same names (`Softmax`, `Reshape`, ...) come from [`ceras_nn`].
pub mod prelude {
    pub use ceras_core::config::{set_random_seed, LearningPhase, LearningPhaseGuard};
    pub use ceras_core::{Error, Result};

    pub use ceras_tensor::{glorot_uniform, ones, randn, random, truncated_normal, zeros, Tensor};

    pub use ceras_autograd::functions::{
        abs, abs_loss, average_pooling_2d, batch_normalization, clip, concatenate, conv2d, cropping_2d,
        cross_entropy, cross_entropy_loss, drop_out, elementwise_divide, elementwise_product, elu, exp,
        flatten, gelu, hadamard_product, hinge_loss, hypot, identity, img2col, instance_normalization,
        leaky_relu, log, mae, max_pooling_2d, mean_absolute_error, mean_reduce, mean_squared_error,
        minus, mse, multiply, negative, plus, relu, reshape, selu, sigmoid, softmax, softplus, sqrt,
        square, squared_loss, sum_reduce, tanh, transpose, up_sampling_2d, zero_padding_2d,
        Complex, Conv2dConfig, Img2ColConfig, Margins, Padding,
    };
    pub use ceras_autograd::{
        binary_accuracy, gradcheck, numerical_gradient, Constant, Expression, PlaceHolder, Session,
        Value, Variable,
    };

    pub use ceras_optim::{Adadelta, Adagrad, Adam, GradientDescent, Optimizer, RmsProp, Sgd};

    pub use ceras_nn::{
        input, AveragePooling2D, BatchNormalization, Conv2D, Dense, Dropout, Flatten, InstanceNormalization,
        Layer, LeakyReLU, MaxPooling2D, ReLU, Reshape, Sequential, Sigmoid, Softmax, Softplus, Tanh,
        UpSampling2D, ELU, GELU, SELU,
    };

    pub use crate::model::{CompiledModel, Model};
}
