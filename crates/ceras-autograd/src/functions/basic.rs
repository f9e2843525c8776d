//! Basic Functions - Arithmetic, Reductions and Element-wise Math
//!
//! Broadcasting binary arithmetic, whole-tensor reductions and the
//! element-wise maths used by losses. Binary gradients are reduced back to
//! the shape of each operand.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_core::error::{Error, Result};
use ceras_tensor::Tensor;

use super::reduce_to_shape;
use crate::expression::Expression;
use crate::operator::{BinaryFunction, UnaryFunction};

// =============================================================================
// Plus
// =============================================================================

/// Broadcasting addition.
///
/// d/dx(x + y) = 1, d/dy(x + y) = 1
#[derive(Debug, Clone, Copy, Default)]
pub struct Plus;

impl BinaryFunction for Plus {
    fn forward(&self, lhs: &Tensor<f32>, rhs: &Tensor<f32>) -> Result<Tensor<f32>> {
        lhs.add(rhs)
    }

    fn backward(
        &self,
        lhs: &Tensor<f32>,
        rhs: &Tensor<f32>,
        _output: &Tensor<f32>,
        grad: &Tensor<f32>,
    ) -> Result<(Tensor<f32>, Tensor<f32>)> {
        Ok((
            reduce_to_shape(grad, lhs.shape())?,
            reduce_to_shape(grad, rhs.shape())?,
        ))
    }

    fn name(&self) -> &'static str {
        "Plus"
    }
}

/// `lhs + rhs` with broadcasting.
#[must_use]
pub fn plus(lhs: &Expression, rhs: &Expression) -> Expression {
    Expression::binary(Plus, lhs, rhs)
}

/// `lhs - rhs` with broadcasting.
#[must_use]
pub fn minus(lhs: &Expression, rhs: &Expression) -> Expression {
    plus(lhs, &negative(rhs))
}

// =============================================================================
// Negative
// =============================================================================

/// Element-wise negation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Negative;

impl UnaryFunction for Negative {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(input.neg())
    }

    fn backward(&self, _input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(grad.neg())
    }

    fn name(&self) -> &'static str {
        "Negative"
    }
}

/// `-ex`.
#[must_use]
pub fn negative(ex: &Expression) -> Expression {
    Expression::unary(Negative, ex)
}

// =============================================================================
// Element-wise Product and Quotient
// =============================================================================

/// Broadcasting element-wise product.
///
/// d/dx(x * y) = y, d/dy(x * y) = x
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementwiseProduct;

impl BinaryFunction for ElementwiseProduct {
    fn forward(&self, lhs: &Tensor<f32>, rhs: &Tensor<f32>) -> Result<Tensor<f32>> {
        lhs.mul(rhs)
    }

    fn backward(
        &self,
        lhs: &Tensor<f32>,
        rhs: &Tensor<f32>,
        _output: &Tensor<f32>,
        grad: &Tensor<f32>,
    ) -> Result<(Tensor<f32>, Tensor<f32>)> {
        Ok((
            reduce_to_shape(&grad.mul(rhs)?, lhs.shape())?,
            reduce_to_shape(&grad.mul(lhs)?, rhs.shape())?,
        ))
    }

    fn name(&self) -> &'static str {
        "ElementwiseProduct"
    }
}

/// Element-wise `lhs * rhs` with broadcasting.
#[must_use]
pub fn elementwise_product(lhs: &Expression, rhs: &Expression) -> Expression {
    Expression::binary(ElementwiseProduct, lhs, rhs)
}

/// Alias of [`elementwise_product`].
#[must_use]
pub fn hadamard_product(lhs: &Expression, rhs: &Expression) -> Expression {
    elementwise_product(lhs, rhs)
}

/// Broadcasting element-wise quotient.
///
/// d/dx(x / y) = 1 / y, d/dy(x / y) = -x / y^2
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementwiseDivide;

impl BinaryFunction for ElementwiseDivide {
    fn forward(&self, lhs: &Tensor<f32>, rhs: &Tensor<f32>) -> Result<Tensor<f32>> {
        lhs.div(rhs)
    }

    fn backward(
        &self,
        lhs: &Tensor<f32>,
        rhs: &Tensor<f32>,
        _output: &Tensor<f32>,
        grad: &Tensor<f32>,
    ) -> Result<(Tensor<f32>, Tensor<f32>)> {
        let lhs_grad = grad.div(rhs)?;
        let rhs_grad = grad.mul(lhs)?.div(&rhs.square())?.neg();
        Ok((
            reduce_to_shape(&lhs_grad, lhs.shape())?,
            reduce_to_shape(&rhs_grad, rhs.shape())?,
        ))
    }

    fn name(&self) -> &'static str {
        "ElementwiseDivide"
    }
}

/// Element-wise `lhs / rhs` with broadcasting.
#[must_use]
pub fn elementwise_divide(lhs: &Expression, rhs: &Expression) -> Expression {
    Expression::binary(ElementwiseDivide, lhs, rhs)
}

// =============================================================================
// Reductions
// =============================================================================

/// Sum of every element, as a `[1]` tensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumReduce;

impl UnaryFunction for SumReduce {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(Tensor::scalar(input.sum_all()))
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(Tensor::full(input.shape(), grad.sum_all()))
    }

    fn name(&self) -> &'static str {
        "SumReduce"
    }
}

/// Sums every element of `ex` into a `[1]` tensor.
#[must_use]
pub fn sum_reduce(ex: &Expression) -> Expression {
    Expression::unary(SumReduce, ex)
}

/// Mean of every element, as a `[1]` tensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanReduce;

impl UnaryFunction for MeanReduce {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(Tensor::scalar(input.mean_all()?))
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(Tensor::full(input.shape(), grad.sum_all() / input.size() as f32))
    }

    fn name(&self) -> &'static str {
        "MeanReduce"
    }
}

/// Averages every element of `ex` into a `[1]` tensor.
#[must_use]
pub fn mean_reduce(ex: &Expression) -> Expression {
    Expression::unary(MeanReduce, ex)
}

// =============================================================================
// Element-wise Math
// =============================================================================

/// Natural logarithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct Log;

impl UnaryFunction for Log {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(input.ln())
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        grad.div(input)
    }

    fn name(&self) -> &'static str {
        "Log"
    }
}

/// Element-wise `ln(ex)`.
#[must_use]
pub fn log(ex: &Expression) -> Expression {
    Expression::unary(Log, ex)
}

/// Exponential.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exp;

impl UnaryFunction for Exp {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(input.exp())
    }

    fn backward(&self, _input: &Tensor<f32>, output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        grad.mul(output)
    }

    fn name(&self) -> &'static str {
        "Exp"
    }
}

/// Element-wise `e^ex`.
#[must_use]
pub fn exp(ex: &Expression) -> Expression {
    Expression::unary(Exp, ex)
}

/// Square.
#[derive(Debug, Clone, Copy, Default)]
pub struct Square;

impl UnaryFunction for Square {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(input.square())
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        input.zip_map(grad, |x, g| 2.0 * x * g)
    }

    fn name(&self) -> &'static str {
        "Square"
    }
}

/// Element-wise `ex^2`.
#[must_use]
pub fn square(ex: &Expression) -> Expression {
    Expression::unary(Square, ex)
}

/// Absolute value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Abs;

impl UnaryFunction for Abs {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(input.abs())
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        input.zip_map(grad, |x, g| if x > 0.0 { g } else { -g })
    }

    fn name(&self) -> &'static str {
        "Abs"
    }
}

/// Element-wise `|ex|`.
#[must_use]
pub fn abs(ex: &Expression) -> Expression {
    Expression::unary(Abs, ex)
}

/// Square root.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqrt;

impl UnaryFunction for Sqrt {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(input.sqrt())
    }

    fn backward(&self, _input: &Tensor<f32>, output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        grad.zip_map(output, |g, o| g / (2.0 * o))
    }

    fn name(&self) -> &'static str {
        "Sqrt"
    }
}

/// Element-wise square root.
#[must_use]
pub fn sqrt(ex: &Expression) -> Expression {
    Expression::unary(Sqrt, ex)
}

/// Clamp into `[lower, upper]`; the gradient is blocked outside the range.
#[derive(Debug, Clone, Copy)]
pub struct Clip {
    lower: f32,
    upper: f32,
}

impl UnaryFunction for Clip {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(input.clip(self.lower, self.upper))
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        let (lower, upper) = (self.lower, self.upper);
        input.zip_map(grad, |x, g| if x < lower || x > upper { 0.0 } else { g })
    }

    fn name(&self) -> &'static str {
        "Clip"
    }
}

/// Clamps `ex` into `[lower, upper]`.
pub fn clip(ex: &Expression, lower: f32, upper: f32) -> Result<Expression> {
    if lower > upper {
        return Err(Error::invalid_operation(format!(
            "clip lower bound {lower} is above upper bound {upper}"
        )));
    }
    Ok(Expression::unary(Clip { lower, upper }, ex))
}

/// Identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl UnaryFunction for Identity {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(input.clone())
    }

    fn backward(&self, _input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(grad.clone())
    }

    fn name(&self) -> &'static str {
        "Identity"
    }
}

/// Passes `ex` through unchanged.
#[must_use]
pub fn identity(ex: &Expression) -> Expression {
    Expression::unary(Identity, ex)
}

// =============================================================================
// Tests
// =============================================================================
