//! Complex Expressions - Pairs of Real Graphs
//!
//! A `Complex` value is a real and an imaginary expression evaluated side
//! by side. Arithmetic on complex values builds ordinary graph nodes, so
//! gradients flow into both parts through the usual backward pass.
//!
//! As for real expressions, `*` is the matrix product: the product of two
//! complex values uses three matrix products,
//! `(a + ib)(c + id) = (ac - bd) + i((a + b)(c + d) - ac - bd)`.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use core::ops::{Add, Mul, Neg, Sub};

use ceras_core::error::Result;
use ceras_tensor::Tensor;

use crate::expression::Expression;
use crate::operator::BinaryFunction;

// =============================================================================
// Hypot
// =============================================================================

/// Element-wise `sqrt(x² + y²)` of two tensors of the same shape.
///
/// d/dx = x / o, d/dy = y / o; both are zero where `o` is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hypot;

impl BinaryFunction for Hypot {
    fn forward(&self, lhs: &Tensor<f32>, rhs: &Tensor<f32>) -> Result<Tensor<f32>> {
        lhs.zip_map(rhs, f32::hypot)
    }

    fn backward(
        &self,
        lhs: &Tensor<f32>,
        rhs: &Tensor<f32>,
        output: &Tensor<f32>,
        grad: &Tensor<f32>,
    ) -> Result<(Tensor<f32>, Tensor<f32>)> {
        let scale = output.zip_map(grad, |o, g| if o == 0.0 { 0.0 } else { g / o })?;
        Ok((lhs.zip_map(&scale, |x, s| x * s)?, rhs.zip_map(&scale, |y, s| y * s)?))
    }

    fn name(&self) -> &'static str {
        "Hypot"
    }
}

/// Element-wise `sqrt(lhs² + rhs²)`.
#[must_use]
pub fn hypot(lhs: &Expression, rhs: &Expression) -> Expression {
    Expression::binary(Hypot, lhs, rhs)
}

// =============================================================================
// Complex
// =============================================================================

/// A complex-valued expression.
#[derive(Debug, Clone)]
pub struct Complex {
    /// Real part.
    pub real: Expression,
    /// Imaginary part.
    pub imag: Expression,
}

impl Complex {
    /// Pairs a real and an imaginary expression.
    pub fn new(real: impl Into<Expression>, imag: impl Into<Expression>) -> Self {
        Self {
            real: real.into(),
            imag: imag.into(),
        }
    }

    /// The real part.
    pub fn real(&self) -> &Expression {
        &self.real
    }

    /// The imaginary part.
    pub fn imag(&self) -> &Expression {
        &self.imag
    }

    /// Magnitude, element-wise `hypot(real, imag)`.
    #[must_use]
    pub fn abs(&self) -> Expression {
        hypot(&self.real, &self.imag)
    }

    /// Evaluates both parts.
    pub fn forward(&self) -> Result<(Tensor<f32>, Tensor<f32>)> {
        Ok((self.real.forward()?, self.imag.forward()?))
    }
}

impl From<(Expression, Expression)> for Complex {
    fn from((real, imag): (Expression, Expression)) -> Self {
        Self { real, imag }
    }
}

// =============================================================================
// Complex with Complex
// =============================================================================

impl Neg for &Complex {
    type Output = Complex;

    fn neg(self) -> Complex {
        Complex::from((-&self.real, -&self.imag))
    }
}

impl Neg for Complex {
    type Output = Complex;

    fn neg(self) -> Complex {
        -&self
    }
}

impl Add for &Complex {
    type Output = Complex;

    fn add(self, rhs: Self) -> Complex {
        Complex::from((&self.real + &rhs.real, &self.imag + &rhs.imag))
    }
}

impl Add for Complex {
    type Output = Complex;

    fn add(self, rhs: Self) -> Complex {
        &self + &rhs
    }
}

impl Sub for &Complex {
    type Output = Complex;

    fn sub(self, rhs: Self) -> Complex {
        Complex::from((&self.real - &rhs.real, &self.imag - &rhs.imag))
    }
}

impl Sub for Complex {
    type Output = Complex;

    fn sub(self, rhs: Self) -> Complex {
        &self - &rhs
    }
}

impl Mul for &Complex {
    type Output = Complex;

    fn mul(self, rhs: Self) -> Complex {
        let (a, b) = (&self.real, &self.imag);
        let (c, d) = (&rhs.real, &rhs.imag);
        let ac = a * c;
        let bd = b * d;
        let abcd = &(a + b) * &(c + d);
        Complex::from((&ac - &bd, &(&abcd - &ac) - &bd))
    }
}

impl Mul for Complex {
    type Output = Complex;

    fn mul(self, rhs: Self) -> Complex {
        &self * &rhs
    }
}

// =============================================================================
// Complex with Real
// =============================================================================

impl Add<&Expression> for &Complex {
    type Output = Complex;

    fn add(self, rhs: &Expression) -> Complex {
        Complex::from((&self.real + rhs, self.imag.clone()))
    }
}

impl Add<&Complex> for &Expression {
    type Output = Complex;

    fn add(self, rhs: &Complex) -> Complex {
        rhs + self
    }
}

impl Sub<&Expression> for &Complex {
    type Output = Complex;

    fn sub(self, rhs: &Expression) -> Complex {
        Complex::from((&self.real - rhs, self.imag.clone()))
    }
}

impl Sub<&Complex> for &Expression {
    type Output = Complex;

    fn sub(self, rhs: &Complex) -> Complex {
        Complex::from((self - &rhs.real, -&rhs.imag))
    }
}

/// Matrix product with a real right operand.
impl Mul<&Expression> for &Complex {
    type Output = Complex;

    fn mul(self, rhs: &Expression) -> Complex {
        Complex::from((&self.real * rhs, &self.imag * rhs))
    }
}

/// Matrix product with a real left operand.
impl Mul<&Complex> for &Expression {
    type Output = Complex;

    fn mul(self, rhs: &Complex) -> Complex {
        Complex::from((self * &rhs.real, self * &rhs.imag))
    }
}

// =============================================================================
// Tests
// =============================================================================
