//! Linear Algebra and Shape Functions
//!
//! Matrix product, transpose, reshape, flatten and concatenation.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_core::error::{Error, Result};
use ceras_tensor::shape::numel;
use ceras_tensor::Tensor;

use crate::expression::Expression;
use crate::operator::{BinaryFunction, UnaryFunction};

// =============================================================================
// Multiply
// =============================================================================

/// Matrix product of `[m, k]` and `[k, n]`.
///
/// d/dA(A·B) = G·Bᵀ, d/dB(A·B) = Aᵀ·G
#[derive(Debug, Clone, Copy, Default)]
pub struct Multiply;

impl BinaryFunction for Multiply {
    fn forward(&self, lhs: &Tensor<f32>, rhs: &Tensor<f32>) -> Result<Tensor<f32>> {
        lhs.gemm(rhs)
    }

    fn backward(
        &self,
        lhs: &Tensor<f32>,
        rhs: &Tensor<f32>,
        _output: &Tensor<f32>,
        grad: &Tensor<f32>,
    ) -> Result<(Tensor<f32>, Tensor<f32>)> {
        let lhs_grad = grad.gemm(&rhs.transpose()?)?;
        let rhs_grad = lhs.transpose()?.gemm(grad)?;
        Ok((lhs_grad, rhs_grad))
    }

    fn name(&self) -> &'static str {
        "Multiply"
    }
}

/// Matrix product `lhs · rhs`.
#[must_use]
pub fn multiply(lhs: &Expression, rhs: &Expression) -> Expression {
    Expression::binary(Multiply, lhs, rhs)
}

// =============================================================================
// Transpose
// =============================================================================

/// 2-D transpose.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transpose;

impl UnaryFunction for Transpose {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        input.transpose()
    }

    fn backward(&self, _input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        grad.transpose()
    }

    fn name(&self) -> &'static str {
        "Transpose"
    }
}

/// Transposes a 2-D expression.
#[must_use]
pub fn transpose(ex: &Expression) -> Expression {
    Expression::unary(Transpose, ex)
}

// =============================================================================
// Reshape and Flatten
// =============================================================================

/// Reshape, optionally keeping a leading batch dimension.
#[derive(Debug, Clone)]
pub struct Reshape {
    shape: Vec<usize>,
    include_batch: bool,
}

impl UnaryFunction for Reshape {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        let sample = numel(&self.shape);
        if !self.include_batch {
            return input.deep_copy().reshape_to(&self.shape);
        }
        if sample == 0 || input.size() % sample != 0 {
            return Err(Error::shape_mismatch(&self.shape, input.shape()));
        }
        let mut shape = Vec::with_capacity(self.shape.len() + 1);
        shape.push(input.size() / sample);
        shape.extend_from_slice(&self.shape);
        input.deep_copy().reshape_to(&shape)
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        grad.deep_copy().reshape_to(input.shape())
    }

    fn name(&self) -> &'static str {
        "Reshape"
    }
}

/// Reshapes `ex` to `shape`, or to `[batch, ..shape]` with `include_batch`.
pub fn reshape(ex: &Expression, shape: &[usize], include_batch: bool) -> Result<Expression> {
    if shape.is_empty() || shape.contains(&0) {
        return Err(Error::invalid_operation(format!(
            "cannot reshape to {shape:?}"
        )));
    }
    Ok(Expression::unary(
        Reshape {
            shape: shape.to_vec(),
            include_batch,
        },
        ex,
    ))
}

/// Collapses everything after the batch dimension.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flatten;

impl UnaryFunction for Flatten {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        if input.ndim() < 2 {
            return Err(Error::invalid_operation(format!(
                "flatten expects at least 2 dimensions, got {:?}",
                input.shape()
            )));
        }
        let batch = input.shape()[0];
        input.deep_copy().reshape_to(&[batch, input.size() / batch])
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        grad.deep_copy().reshape_to(input.shape())
    }

    fn name(&self) -> &'static str {
        "Flatten"
    }
}

/// Flattens `ex` to `[batch, rest]`.
#[must_use]
pub fn flatten(ex: &Expression) -> Expression {
    Expression::unary(Flatten, ex)
}

// =============================================================================
// Concatenate
// =============================================================================

/// Joins two tensors along an axis.
#[derive(Debug, Clone, Copy)]
pub struct Concatenate {
    axis: i64,
}

impl BinaryFunction for Concatenate {
    fn forward(&self, lhs: &Tensor<f32>, rhs: &Tensor<f32>) -> Result<Tensor<f32>> {
        lhs.concatenate(rhs, self.axis)
    }

    fn backward(
        &self,
        lhs: &Tensor<f32>,
        _rhs: &Tensor<f32>,
        _output: &Tensor<f32>,
        grad: &Tensor<f32>,
    ) -> Result<(Tensor<f32>, Tensor<f32>)> {
        let axis = ceras_tensor::shape::normalize_dim(self.axis, lhs.ndim())?;
        grad.split_at(self.axis, lhs.shape()[axis])
    }

    fn name(&self) -> &'static str {
        "Concatenate"
    }
}

/// Joins `lhs` and `rhs` along `axis`; negative axes count from the end.
#[must_use]
pub fn concatenate(lhs: &Expression, rhs: &Expression, axis: i64) -> Expression {
    Expression::binary(Concatenate { axis }, lhs, rhs)
}

// =============================================================================
// Tests
// =============================================================================
