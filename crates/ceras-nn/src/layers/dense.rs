//! Dense Layer - Fully Connected Layer
//!
//! Applies an affine transformation: `y = x W + b`.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_autograd::functions::{multiply, plus};
use ceras_autograd::{Expression, Variable};
use ceras_core::error::{Error, Result};
use ceras_tensor::Tensor;

use crate::init::{glorot_uniform, zeros};
use crate::layer::Layer;

// =============================================================================
// Dense
// =============================================================================

/// Fully connected layer.
///
/// # Shape
/// - Input: `[batch, input_size]`
/// - Weight: `[input_size, output_size]`, Glorot uniform
/// - Bias: `[1, output_size]`, zeros
/// - Output: `[batch, output_size]`
///
/// # Example
/// ```rust
/// use ceras_autograd::prelude::*;
/// use ceras_nn::prelude::*;
///
/// let x = input();
/// let layer = Dense::new(3, 2).unwrap();
/// let y = layer.forward(&x).unwrap();
///
/// x.as_place_holder().unwrap().bind(Tensor::ones(&[4, 3]));
/// assert_eq!(y.forward().unwrap().shape(), &[4, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct Dense {
    /// Weight matrix.
    pub weight: Variable,
    /// Bias row.
    pub bias: Variable,
}

impl Dense {
    /// Creates a dense layer mapping `input_size` features to `output_size`.
    pub fn new(input_size: usize, output_size: usize) -> Result<Self> {
        if input_size == 0 || output_size == 0 {
            return Err(Error::invalid_operation(format!(
                "dense layer needs positive sizes, got {input_size} -> {output_size}"
            )));
        }
        Ok(Self {
            weight: Variable::new(glorot_uniform(&[input_size, output_size])?),
            bias: Variable::new(zeros(&[1, output_size])),
        })
    }

    /// Creates a dense layer from existing weights `[in, out]` and bias `[1, out]`.
    pub fn from_weights(weight: Tensor<f32>, bias: Tensor<f32>) -> Result<Self> {
        let &[_, output_size] = weight.shape() else {
            return Err(Error::invalid_operation(format!(
                "dense weight must be 2-D, got {:?}",
                weight.shape()
            )));
        };
        if bias.shape() != [1, output_size] {
            return Err(Error::shape_mismatch(&[1, output_size], bias.shape()));
        }
        Ok(Self {
            weight: Variable::new(weight),
            bias: Variable::new(bias),
        })
    }

    /// Number of input features.
    pub fn input_size(&self) -> usize {
        self.weight.shape()[0]
    }

    /// Number of output features.
    pub fn output_size(&self) -> usize {
        self.weight.shape()[1]
    }
}

impl Layer for Dense {
    fn forward(&self, input: &Expression) -> Result<Expression> {
        let product = multiply(input, &Expression::from(&self.weight));
        Ok(plus(&product, &Expression::from(&self.bias)))
    }

    fn variables(&self) -> Vec<Variable> {
        vec![self.weight.clone(), self.bias.clone()]
    }

    fn name(&self) -> &'static str {
        "Dense"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ceras_autograd::Expression;

    #[test]
    fn test_dense_creation() {
        let layer = Dense::new(10, 5).unwrap();
        assert_eq!(layer.input_size(), 10);
        assert_eq!(layer.output_size(), 5);
        assert_eq!(layer.bias.shape(), vec![1, 5]);
        assert_eq!(layer.num_parameters(), 55);
        assert!(Dense::new(0, 5).is_err());
    }

    #[test]
    fn test_dense_forward() {
        let weight = Tensor::from_vec(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0], &[3, 2]).unwrap();
        let bias = Tensor::from_vec(vec![0.5, -0.5], &[1, 2]).unwrap();
        let layer = Dense::from_weights(weight, bias).unwrap();

        let x = Expression::constant(Tensor::from_vec(vec![1.0, 2.0, 3.0], &[1, 3]).unwrap());
        let y = layer.forward(&x).unwrap().forward().unwrap();
        assert_eq!(y.to_vec(), vec![4.5, 4.5]);
    }

    #[test]
    fn test_dense_shared_variables() {
        let layer = Dense::new(2, 2).unwrap();
        let a = layer.forward(&Expression::constant(Tensor::ones(&[1, 2]))).unwrap();
        let b = layer.forward(&Expression::constant(Tensor::ones(&[3, 2]))).unwrap();
        assert_eq!(a.variables()[0].id(), b.variables()[0].id());

        layer.set_trainable(false);
        assert!(a.trainable_variables().is_empty());
    }
}
