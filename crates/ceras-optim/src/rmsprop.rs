//! RMSprop Optimizer - Root Mean Square Propagation
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_autograd::Expression;
use ceras_core::config::EPSILON;
use ceras_core::error::Result;

use crate::optimizer::{contexts, scaled_learning_rate, Optimizer, Target};

// =============================================================================
// RMSprop
// =============================================================================

/// RMSprop optimizer.
///
/// Update rule:
/// ```text
/// lr_t  = lr / (1 + decay * t)
/// m     = grad^2                          (first step)
/// m     = rho * m + (1 - rho) * grad^2    (afterwards)
/// param = param - lr_t * grad / (eps + sqrt(m))
/// ```
#[derive(Debug)]
pub struct RmsProp {
    target: Target,
    lr: f32,
    rho: f32,
    decay: f32,
    iterations: usize,
}

impl RmsProp {
    /// Default learning rate.
    pub const DEFAULT_LEARNING_RATE: f32 = 0.1;

    /// Creates an RMSprop optimizer for `loss`.
    pub fn new(loss: &Expression, batch_size: usize, lr: f32) -> Result<Self> {
        Ok(Self {
            target: Target::new(loss),
            lr: scaled_learning_rate(lr, batch_size)?,
            rho: 0.9,
            decay: 0.0,
            iterations: 0,
        })
    }

    /// Builder method to set the smoothing constant.
    #[must_use]
    pub fn rho(mut self, rho: f32) -> Self {
        self.rho = rho;
        self
    }

    /// Builder method to set the learning rate decay.
    #[must_use]
    pub fn decay(mut self, decay: f32) -> Self {
        self.decay = decay.max(0.0);
        self
    }
}

impl Optimizer for RmsProp {
    fn step(&mut self) -> Result<()> {
        let lr = self.lr / (1.0 + self.decay * self.iterations as f32);
        let (rho, first) = (self.rho, self.iterations == 0);
        let eps = EPSILON as f32;

        for variable in self.target.backpropagate()? {
            let ctx = contexts(variable, 1);
            let (data, grad) = (variable.data(), variable.gradient());
            let grad = grad.as_slice();
            let mut data = data.as_slice_mut();
            let mut moments = ctx[0].as_slice_mut();

            for ((d, m), &g) in data.iter_mut().zip(moments.iter_mut()).zip(grad.iter()) {
                *m = if first { g * g } else { rho * *m + (1.0 - rho) * g * g };
                *d -= lr * g / (eps + m.sqrt());
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

    #[test]
    fn test_rmsprop_moments() {
        let v = Variable::new(Tensor::from_vec(vec![1.0], &[1]).unwrap());
        let loss = sum_reduce(&square(&Expression::from(&v)));
        let mut optimizer = RmsProp::new(&loss, 1, 0.1).unwrap().rho(0.5);

        loss.forward().unwrap();
        optimizer.step().unwrap();
        // g = 2, m = 4, step = 0.1
        assert!((v.data().to_vec()[0] - 0.9).abs() < 1e-5);
        assert!((v.contexts()[0].to_vec()[0] - 4.0).abs() < 1e-5);

        loss.forward().unwrap();
        optimizer.step().unwrap();
        // g = 1.8, m = 0.5 * 4 + 0.5 * 3.24
        assert!((v.contexts()[0].to_vec()[0] - 3.62).abs() < 1e-4);
        assert_eq!(optimizer.iterations(), 2);
    }

    #[test]
    fn test_rmsprop_converges() {
        let v = Variable::new(Tensor::from_vec(vec![3.0, -3.0], &[2]).unwrap());
        let loss = sum_reduce(&square(&Expression::from(&v)));
        let mut optimizer = RmsProp::new(&loss, 1, 0.05).unwrap();
        for _ in 0..200 {
            loss.forward().unwrap();
            optimizer.step().unwrap();
        }
        assert!(v.data().to_vec().iter().all(|x| x.abs() < 0.2));
    }
}
