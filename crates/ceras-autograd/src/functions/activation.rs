//! Activation Functions
//!
//! Softmax over the last dimension and the usual element-wise
//! non-linearities. Backward passes read the cached input or output,
//! whichever gives the cheaper derivative.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_core::error::{Error, Result};
use ceras_tensor::Tensor;

use crate::expression::Expression;
use crate::operator::UnaryFunction;

const SELU_ALPHA: f32 = 1.673_263_2;
const SELU_LAMBDA: f32 = 1.050_701;
const GELU_COEFF: f32 = 0.044_715;

fn sigmoid_scalar(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

// =============================================================================
// Softmax
// =============================================================================

/// Softmax over the last dimension.
///
/// Backward is the Jacobian-vector product `o * (g - sum(g * o))` per row.
#[derive(Debug, Clone, Copy, Default)]
pub struct Softmax;

impl UnaryFunction for Softmax {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        input.softmax()
    }

    fn backward(&self, _input: &Tensor<f32>, output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        let cols = *output.shape().last().ok_or(Error::EmptyTensor)?;
        let o = output.to_vec();
        let g = grad.to_vec();
        let mut ans = Vec::with_capacity(o.len());
        for (o_row, g_row) in o.chunks(cols).zip(g.chunks(cols)) {
            let dot: f32 = o_row.iter().zip(g_row).map(|(a, b)| a * b).sum();
            ans.extend(o_row.iter().zip(g_row).map(|(&ov, &gv)| ov * (gv - dot)));
        }
        Tensor::from_vec(ans, output.shape())
    }

    fn name(&self) -> &'static str {
        "Softmax"
    }
}

/// Softmax over the last dimension of `ex`.
#[must_use]
pub fn softmax(ex: &Expression) -> Expression {
    Expression::unary(Softmax, ex)
}

// =============================================================================
// Sigmoid and Tanh
// =============================================================================

/// Logistic sigmoid.
///
/// d/dx(sigmoid(x)) = o * (1 - o)
#[derive(Debug, Clone, Copy, Default)]
pub struct Sigmoid;

impl UnaryFunction for Sigmoid {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(input.map(sigmoid_scalar))
    }

    fn backward(&self, _input: &Tensor<f32>, output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        output.zip_map(grad, |o, g| g * o * (1.0 - o))
    }

    fn name(&self) -> &'static str {
        "Sigmoid"
    }
}

/// Element-wise logistic sigmoid.
#[must_use]
pub fn sigmoid(ex: &Expression) -> Expression {
    Expression::unary(Sigmoid, ex)
}

/// Hyperbolic tangent.
///
/// d/dx(tanh(x)) = 1 - o^2
#[derive(Debug, Clone, Copy, Default)]
pub struct Tanh;

impl UnaryFunction for Tanh {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(input.map(f32::tanh))
    }

    fn backward(&self, _input: &Tensor<f32>, output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        output.zip_map(grad, |o, g| g * (1.0 - o * o))
    }

    fn name(&self) -> &'static str {
        "Tanh"
    }
}

/// Element-wise hyperbolic tangent.
#[must_use]
pub fn tanh(ex: &Expression) -> Expression {
    Expression::unary(Tanh, ex)
}

// =============================================================================
// Rectifiers
// =============================================================================

/// Rectified linear unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Relu;

impl UnaryFunction for Relu {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(input.map(|x| x.max(0.0)))
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        input.zip_map(grad, |x, g| if x > 0.0 { g } else { 0.0 })
    }

    fn name(&self) -> &'static str {
        "Relu"
    }
}

/// Element-wise `max(x, 0)`.
#[must_use]
pub fn relu(ex: &Expression) -> Expression {
    Expression::unary(Relu, ex)
}

/// Leaky rectifier `max(x, factor * x)`.
#[derive(Debug, Clone, Copy)]
pub struct LeakyRelu {
    factor: f32,
}

impl UnaryFunction for LeakyRelu {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        let f = self.factor;
        Ok(input.map(|x| if x > 0.0 { x } else { f * x }))
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        let f = self.factor;
        input.zip_map(grad, |x, g| if x > 0.0 { g } else { f * g })
    }

    fn name(&self) -> &'static str {
        "LeakyRelu"
    }
}

/// Leaky ReLU with slope `factor` for negative inputs; `0 < factor < 1`.
pub fn leaky_relu(ex: &Expression, factor: f32) -> Result<Expression> {
    if !(factor > 0.0 && factor < 1.0) {
        return Err(Error::invalid_operation(format!(
            "leaky relu factor must lie in (0, 1), got {factor}"
        )));
    }
    Ok(Expression::unary(LeakyRelu { factor }, ex))
}

/// `ln(1 + e^x)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Softplus;

impl UnaryFunction for Softplus {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(input.map(|x| x.max(0.0) + (-x.abs()).exp().ln_1p()))
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        input.zip_map(grad, |x, g| g * sigmoid_scalar(x))
    }

    fn name(&self) -> &'static str {
        "Softplus"
    }
}

/// Element-wise softplus.
#[must_use]
pub fn softplus(ex: &Expression) -> Expression {
    Expression::unary(Softplus, ex)
}

/// Exponential linear unit, optionally scaled (SELU).
#[derive(Debug, Clone, Copy)]
pub struct Elu {
    alpha: f32,
    scale: f32,
}

impl UnaryFunction for Elu {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        let (alpha, scale) = (self.alpha, self.scale);
        Ok(input.map(|x| scale * if x > 0.0 { x } else { alpha * x.exp_m1() }))
    }

    fn backward(&self, input: &Tensor<f32>, output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        let (alpha, scale) = (self.alpha, self.scale);
        let (x, o, g) = (input.to_vec(), output.to_vec(), grad.to_vec());
        let ans: Vec<f32> = x
            .iter()
            .zip(o.iter())
            .zip(g.iter())
            .map(|((&x, &o), &g)| if x > 0.0 { scale * g } else { g * (o + scale * alpha) })
            .collect();
        Tensor::from_vec(ans, input.shape())
    }

    fn name(&self) -> &'static str {
        if self.scale == 1.0 {
            "Elu"
        } else {
            "Selu"
        }
    }
}

/// `x` for positive inputs, `alpha * (e^x - 1)` otherwise.
#[must_use]
pub fn elu(ex: &Expression, alpha: f32) -> Expression {
    Expression::unary(Elu { alpha, scale: 1.0 }, ex)
}

/// Self-normalizing ELU with the standard constants.
#[must_use]
pub fn selu(ex: &Expression) -> Expression {
    Expression::unary(
        Elu {
            alpha: SELU_ALPHA,
            scale: SELU_LAMBDA,
        },
        ex,
    )
}

/// Gaussian error linear unit, tanh approximation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gelu;

impl Gelu {
    fn inner(x: f32) -> f32 {
        (2.0 / std::f32::consts::PI).sqrt() * (x + GELU_COEFF * x * x * x)
    }
}

impl UnaryFunction for Gelu {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        Ok(input.map(|x| 0.5 * x * (1.0 + Self::inner(x).tanh())))
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        let k = (2.0 / std::f32::consts::PI).sqrt();
        input.zip_map(grad, |x, g| {
            let t = Self::inner(x).tanh();
            let d_inner = k * (1.0 + 3.0 * GELU_COEFF * x * x);
            g * (0.5 * (1.0 + t) + 0.5 * x * (1.0 - t * t) * d_inner)
        })
    }

    fn name(&self) -> &'static str {
        "Gelu"
    }
}

/// Element-wise GELU.
#[must_use]
pub fn gelu(ex: &Expression) -> Expression {
    Expression::unary(Gelu, ex)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backward::{gradcheck, numerical_gradient};
    use crate::functions::{elementwise_product, sum_reduce};
    use crate::variable::Variable;

    fn input() -> Variable {
        Variable::new(Tensor::from_vec(vec![-1.5, -0.2, 0.3, 2.0, 0.7, -0.9], &[2, 3]).unwrap())
    }

    fn weights() -> Expression {
        Expression::constant(Tensor::from_vec(vec![0.5, -1.0, 2.0, 1.5, 0.3, -0.4], &[2, 3]).unwrap())
    }

    fn check(build: impl Fn(&Expression) -> Expression) {
        let v = input();
        let loss = sum_reduce(&elementwise_product(&build(&Expression::from(&v)), &weights()));
        let numerical = numerical_gradient(&loss, &v, 1e-3).unwrap();
        loss.forward().unwrap();
        loss.backward(&Tensor::ones(&[1])).unwrap();
        assert!(
            gradcheck(&v.gradient(), &numerical, 1e-2, 1e-2),
            "analytical {:?} vs numerical {:?}",
            v.gradient().to_vec(),
            numerical.to_vec()
        );
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let y = softmax(&Expression::from(&input()));
        let out = y.forward().unwrap().to_vec();
        assert!((out[..3].iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!((out[3..].iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_gradients_match_numerical() {
        check(softmax);
        check(sigmoid);
        check(tanh);
        check(softplus);
        check(selu);
        check(gelu);
        check(|e| elu(e, 1.0));
        check(|e| leaky_relu(e, 0.2).unwrap());
        check(relu);
    }

    #[test]
    fn test_relu_and_leaky_relu_values() {
        let x = Expression::constant(Tensor::from_vec(vec![-2.0, 3.0], &[2]).unwrap());
        assert_eq!(relu(&x).forward().unwrap().to_vec(), vec![0.0, 3.0]);
        let leaky = leaky_relu(&x, 0.1).unwrap().forward().unwrap().to_vec();
        assert!((leaky[0] + 0.2).abs() < 1e-6);
        assert!(leaky_relu(&x, 1.5).is_err());
    }

    #[test]
    fn test_sigmoid_is_stable() {
        let x = Expression::constant(Tensor::from_vec(vec![-100.0, 0.0, 100.0], &[3]).unwrap());
        let out = sigmoid(&x).forward().unwrap().to_vec();
        assert!(out[0] >= 0.0 && out[0] < 1e-20);
        assert_eq!(out[1], 0.5);
        assert_eq!(out[2], 1.0);
    }
}
