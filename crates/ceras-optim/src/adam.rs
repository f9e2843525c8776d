//! Adam Optimizer - Adaptive Moment Estimation
//!
//! Implements Adam and its `AMSGrad` variant.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_autograd::Expression;
use ceras_core::config::EPSILON;
use ceras_core::error::Result;

use crate::optimizer::{contexts, scaled_learning_rate, Optimizer, Target};

// =============================================================================
// Adam
// =============================================================================

/// Adam optimizer.
///
/// Maintains per-variable first and second moment estimates of the
/// gradient in the variable's contexts.
///
/// Update rule:
/// ```text
/// m_t   = beta1 * m_{t-1} + (1 - beta1) * grad
/// v_t   = beta2 * v_{t-1} + (1 - beta2) * grad^2
/// v_hat = max(v_hat, v_t)                      (amsgrad only)
/// lr_t  = lr * sqrt(1 - beta2^(t+1)) / (1 - beta1^(t+1))
/// param = param - lr_t * m_t / (eps + sqrt(v_t or v_hat))
/// ```
#[derive(Debug)]
pub struct Adam {
    target: Target,
    lr: f32,
    beta1: f32,
    beta2: f32,
    amsgrad: bool,
    iterations: usize,
}

impl Adam {
    /// Default learning rate.
    pub const DEFAULT_LEARNING_RATE: f32 = 0.1;

    /// Creates an Adam optimizer for `loss` with betas `(0.9, 0.999)`.
    pub fn new(loss: &Expression, batch_size: usize, lr: f32) -> Result<Self> {
        Ok(Self {
            target: Target::new(loss),
            lr: scaled_learning_rate(lr, batch_size)?,
            beta1: 0.9,
            beta2: 0.999,
            amsgrad: false,
            iterations: 0,
        })
    }

    /// Builder method to set betas.
    #[must_use]
    pub fn betas(mut self, betas: (f32, f32)) -> Self {
        self.beta1 = betas.0;
        self.beta2 = betas.1;
        self
    }

    /// Builder method to enable `AMSGrad`.
    #[must_use]
    pub fn amsgrad(mut self, amsgrad: bool) -> Self {
        self.amsgrad = amsgrad;
        self
    }
}

impl Optimizer for Adam {
    fn step(&mut self) -> Result<()> {
        let (beta1, beta2, amsgrad) = (self.beta1, self.beta2, self.amsgrad);
        let t = self.iterations as i32 + 1;
        let lr = self.lr * (1.0 - beta2.powi(t)).sqrt() / (1.0 - beta1.powi(t));
        let eps = EPSILON as f32;

        for variable in self.target.backpropagate()? {
            let ctx = contexts(variable, if amsgrad { 3 } else { 2 });
            let (data, grad) = (variable.data(), variable.gradient());
            let grad = grad.as_slice();
            let mut data = data.as_slice_mut();
            let mut m = ctx[0].as_slice_mut();
            let mut v = ctx[1].as_slice_mut();

            for i in 0..data.len() {
                let g = grad[i];
                m[i] = beta1 * m[i] + (1.0 - beta1) * g;
                v[i] = beta2 * v[i] + (1.0 - beta2) * g * g;
            }

            if amsgrad {
                let mut v_hat = ctx[2].as_slice_mut();
                for i in 0..data.len() {
                    v_hat[i] = v_hat[i].max(v[i]);
                    data[i] -= lr * m[i] / (eps + v_hat[i].sqrt());
                }
            } else {
                for i in 0..data.len() {
                    data[i] -= lr * m[i] / (eps + v[i].sqrt());
                }
            }
        }

        self.iterations += 1;
        tracing::trace!(iterations = self.iterations, lr, "adam step");
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

    fn quadratic(start: Vec<f32>) -> (Variable, Expression) {
        let n = start.len();
        let v = Variable::new(Tensor::from_vec(start, &[n]).unwrap());
        let loss = sum_reduce(&square(&Expression::from(&v)));
        (v, loss)
    }

    #[test]
    fn test_adam_first_step() {
        let (v, loss) = quadratic(vec![1.0, -1.0]);
        let mut optimizer = Adam::new(&loss, 1, 0.1).unwrap();
        loss.forward().unwrap();
        optimizer.step().unwrap();
        // the bias-corrected first step moves each coordinate by about lr
        let data = v.data().to_vec();
        assert!((data[0] - 0.9).abs() < 1e-3);
        assert!((data[1] + 0.9).abs() < 1e-3);
        assert_eq!(v.contexts().len(), 2);
    }

    #[test]
    fn test_adam_amsgrad_keeps_max() {
        let (v, loss) = quadratic(vec![2.0]);
        let mut optimizer = Adam::new(&loss, 1, 0.1).unwrap().amsgrad(true);
        for _ in 0..5 {
            loss.forward().unwrap();
            optimizer.step().unwrap();
        }
        let ctx = v.contexts();
        assert_eq!(ctx.len(), 3);
        assert!(ctx[2].to_vec()[0] >= ctx[1].to_vec()[0]);
    }

    #[test]
    fn test_adam_converges() {
        let (v, loss) = quadratic(vec![1.5, -0.5, 0.8]);
        let mut optimizer = Adam::new(&loss, 1, 0.05).unwrap();
        for _ in 0..300 {
            loss.forward().unwrap();
            optimizer.step().unwrap();
        }
        assert!(v.data().to_vec().iter().all(|x| x.abs() < 0.1));
    }
}
