//! Adadelta Optimizer - Learning-Rate-Free Adaptive Updates
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_autograd::Expression;
use ceras_core::config::EPSILON;
use ceras_core::error::Result;

use crate::optimizer::{contexts, scaled_learning_rate, Optimizer, Target};

/// Adadelta optimizer.
///
/// Keeps running averages of squared gradients (`m`) and of squared
/// updates (`d`) in two separate contexts:
/// ```text
/// m     = rho * m + (1 - rho) * grad^2
/// delta = lr * grad * sqrt((d + eps) / (m + eps))
/// param = param - delta
/// d     = rho * d + (1 - rho) * delta^2
/// ```
/// The learning rate is fixed to `1 / batch_size`.
#[derive(Debug)]
pub struct Adadelta {
    target: Target,
    lr: f32,
    rho: f32,
    iterations: usize,
}

impl Adadelta {
    /// Creates an Adadelta optimizer for `loss`.
    pub fn new(loss: &Expression, batch_size: usize) -> Result<Self> {
        Ok(Self {
            target: Target::new(loss),
            lr: scaled_learning_rate(1.0, batch_size)?,
            rho: 0.9,
            iterations: 0,
        })
    }

    /// Builder method to set the decay constant.
    #[must_use]
    pub fn rho(mut self, rho: f32) -> Self {
        self.rho = rho;
        self
    }
}

impl Optimizer for Adadelta {
    fn step(&mut self) -> Result<()> {
        let (lr, rho) = (self.lr, self.rho);
        let eps = EPSILON as f32;

        for variable in self.target.backpropagate()? {
            let ctx = contexts(variable, 2);
            let (data, grad) = (variable.data(), variable.gradient());
            let grad = grad.as_slice();
            let mut data = data.as_slice_mut();
            let mut moments = ctx[0].as_slice_mut();
            let mut deltas = ctx[1].as_slice_mut();

            for (((x, m), d), &g) in data
                .iter_mut()
                .zip(moments.iter_mut())
                .zip(deltas.iter_mut())
                .zip(grad.iter())
            {
                *m = rho * *m + (1.0 - rho) * g * g;
                let delta = g * lr * ((*d + eps) / (*m + eps)).sqrt();
                *x -= delta;
                *d = rho * *d + (1.0 - rho) * delta * delta;
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

#[cfg(test)]
mod tests {
    use super::*;
    use ceras_autograd::functions::{square, sum_reduce};
    use ceras_autograd::Variable;
    use ceras_tensor::Tensor;

    #[test]
    fn test_adadelta_keeps_two_contexts() {
        let v = Variable::new(Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap());
        let loss = sum_reduce(&square(&Expression::from(&v)));
        let mut optimizer = Adadelta::new(&loss, 2).unwrap();
        assert_eq!(optimizer.learning_rate(), 0.5);

        loss.forward().unwrap();
        optimizer.step().unwrap();

        let ctx = v.contexts();
        assert_eq!(ctx.len(), 2);
        // m = 0.1 * g^2
        assert!((ctx[0].to_vec()[0] - 0.4).abs() < 1e-5);
        assert!(ctx[1].to_vec()[0] > 0.0);
        drop(ctx);

        let data = v.data().to_vec();
        assert!(data[0] < 1.0 && data[1] < 2.0);
    }
}
