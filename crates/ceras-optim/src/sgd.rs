//! SGD Optimizer - Stochastic Gradient Descent
//!
//! Implements SGD with optional momentum, Nesterov acceleration and time
//! decay of the learning rate, plus the bare `GradientDescent` rule.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_autograd::Expression;
use ceras_core::error::Result;

use crate::optimizer::{contexts, scaled_learning_rate, Optimizer, Target};

// =============================================================================
// SGD
// =============================================================================

/// Stochastic Gradient Descent optimizer.
///
/// Update rule:
/// ```text
/// lr_t  = lr / (1 + decay * t)
/// m     = momentum * m - lr_t * grad
/// param = param + momentum * m - lr_t * grad    (plain)
/// param = param + m                             (nesterov)
/// ```
#[derive(Debug)]
pub struct Sgd {
    target: Target,
    lr: f32,
    momentum: f32,
    decay: f32,
    nesterov: bool,
    iterations: usize,
}

impl Sgd {
    /// Default learning rate.
    pub const DEFAULT_LEARNING_RATE: f32 = 0.1;

    /// Creates an SGD optimizer for `loss`; the learning rate is divided by
    /// `batch_size`.
    pub fn new(loss: &Expression, batch_size: usize, lr: f32) -> Result<Self> {
        Ok(Self {
            target: Target::new(loss),
            lr: scaled_learning_rate(lr, batch_size)?,
            momentum: 0.0,
            decay: 0.0,
            nesterov: false,
            iterations: 0,
        })
    }

    /// Builder method to set momentum; negative values are clamped to zero.
    #[must_use]
    pub fn momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum.max(0.0);
        self
    }

    /// Builder method to set the learning rate decay.
    #[must_use]
    pub fn decay(mut self, decay: f32) -> Self {
        self.decay = decay.max(0.0);
        self
    }

    /// Builder method to enable Nesterov momentum.
    #[must_use]
    pub fn nesterov(mut self, nesterov: bool) -> Self {
        self.nesterov = nesterov;
        self
    }
}

impl Optimizer for Sgd {
    fn step(&mut self) -> Result<()> {
        let lr = self.lr / (1.0 + self.decay * self.iterations as f32);
        let (momentum, nesterov) = (self.momentum, self.nesterov);

        for variable in self.target.backpropagate()? {
            let ctx = contexts(variable, 1);
            let (data, grad) = (variable.data(), variable.gradient());
            let grad = grad.as_slice();
            let mut data = data.as_slice_mut();
            let mut moments = ctx[0].as_slice_mut();

            for ((d, m), &g) in data.iter_mut().zip(moments.iter_mut()).zip(grad.iter()) {
                *m = momentum * *m - lr * g;
                if nesterov {
                    *d += *m;
                } else {
                    *d += momentum * *m - lr * g;
                }
            }
        }

        self.iterations += 1;
        tracing::trace!(iterations = self.iterations, lr, "sgd step");
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn iterations(&self) -> usize {
        self.iterations
    }
}

// =============================================================================
// Gradient Descent
// =============================================================================

/// Plain gradient descent with optional momentum.
///
/// ```text
/// param = param - lr * grad                         (no momentum)
/// v = momentum * v - lr * grad; param = param + v   (momentum)
/// ```
#[derive(Debug)]
pub struct GradientDescent {
    target: Target,
    lr: f32,
    momentum: f32,
    iterations: usize,
}

impl GradientDescent {
    /// Default learning rate.
    pub const DEFAULT_LEARNING_RATE: f32 = 1.0e-3;

    /// Creates a gradient descent optimizer for `loss`.
    pub fn new(loss: &Expression, batch_size: usize, lr: f32) -> Result<Self> {
        Ok(Self {
            target: Target::new(loss),
            lr: scaled_learning_rate(lr, batch_size)?,
            momentum: 0.0,
            iterations: 0,
        })
    }

    /// Builder method to set momentum.
    #[must_use]
    pub fn momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum.max(0.0);
        self
    }
}

impl Optimizer for GradientDescent {
    fn step(&mut self) -> Result<()> {
        let (lr, momentum) = (self.lr, self.momentum);

        for variable in self.target.backpropagate()? {
            let (data, grad) = (variable.data(), variable.gradient());
            if momentum == 0.0 {
                let grad = grad.as_slice();
                let mut data = data.as_slice_mut();
                for (d, &g) in data.iter_mut().zip(grad.iter()) {
                    *d -= lr * g;
                }
                continue;
            }

            let ctx = contexts(variable, 1);
            let grad = grad.as_slice();
            let mut data = data.as_slice_mut();
            let mut velocity = ctx[0].as_slice_mut();
            for ((d, v), &g) in data.iter_mut().zip(velocity.iter_mut()).zip(grad.iter()) {
                *v = momentum * *v - lr * g;
                *d += *v;
            }
        }

        self.iterations += 1;
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn iterations(&self) -> usize {
        self.iterations
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ceras_autograd::functions::{square, sum_reduce};
    use ceras_autograd::Variable;
    use ceras_tensor::Tensor;

    /// `sum(v^2)` with `v = [1, 2, 3]`; its gradient is `2v`.
    fn quadratic() -> (Variable, Expression) {
        let v = Variable::new(Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap());
        let loss = sum_reduce(&square(&Expression::from(&v)));
        (v, loss)
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_sgd_creation() {
        let (_, loss) = quadratic();
        let optimizer = Sgd::new(&loss, 4, 0.1).unwrap();
        assert!((optimizer.learning_rate() - 0.025).abs() < 1e-7);
        assert_eq!(optimizer.iterations(), 0);
        assert!(Sgd::new(&loss, 0, 0.1).is_err());
    }

    #[test]
    fn test_sgd_step() {
        let (v, loss) = quadratic();
        let mut optimizer = Sgd::new(&loss, 1, 0.1).unwrap();
        loss.forward().unwrap();
        optimizer.step().unwrap();
        assert_close(&v.data().to_vec(), &[0.8, 1.6, 2.4]);
        assert_eq!(optimizer.iterations(), 1);
    }

    #[test]
    fn test_sgd_nesterov_uses_moments() {
        let (v, loss) = quadratic();
        let mut optimizer = Sgd::new(&loss, 1, 0.1).unwrap().momentum(0.5).nesterov(true);
        loss.forward().unwrap();
        optimizer.step().unwrap();
        // m = -0.1 * 2v, data += m
        assert_close(&v.data().to_vec(), &[0.8, 1.6, 2.4]);
        assert_close(&v.contexts()[0].to_vec(), &[-0.2, -0.4, -0.6]);
    }

    #[test]
    fn test_sgd_skips_frozen_variables() {
        let (v, loss) = quadratic();
        v.set_trainable(false);
        let mut optimizer = Sgd::new(&loss, 1, 0.1).unwrap();
        loss.forward().unwrap();
        optimizer.step().unwrap();
        assert_eq!(v.data().to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_gradient_descent_step() {
        let (v, loss) = quadratic();
        let mut optimizer = GradientDescent::new(&loss, 2, 0.1).unwrap();
        loss.forward().unwrap();
        optimizer.step().unwrap();
        assert_close(&v.data().to_vec(), &[0.9, 1.8, 2.7]);
    }

    #[test]
    fn test_gradient_descent_converges() {
        let (v, loss) = quadratic();
        let mut optimizer = GradientDescent::new(&loss, 1, 0.1).unwrap().momentum(0.5);
        for _ in 0..100 {
            loss.forward().unwrap();
            optimizer.step().unwrap();
        }
        assert!(loss.forward().unwrap().to_vec()[0] < 1e-4);
        assert!(v.data().to_vec().iter().all(|x| x.abs() < 1e-2));
    }
}
