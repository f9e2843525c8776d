//! Adagrad Optimizer - Adaptive Gradient
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_autograd::Expression;
use ceras_core::config::EPSILON;
use ceras_core::error::Result;

use crate::optimizer::{contexts, scaled_learning_rate, Optimizer, Target};

/// Adagrad optimizer.
///
/// Scales each coordinate by the root of its accumulated squared gradients:
/// ```text
/// lr_t  = lr / (1 + decay * t)
/// m     = m + grad^2
/// param = param - lr_t * grad / (eps + sqrt(m))
/// ```
#[derive(Debug)]
pub struct Adagrad {
    target: Target,
    lr: f32,
    decay: f32,
    iterations: usize,
}

impl Adagrad {
    /// Default learning rate.
    pub const DEFAULT_LEARNING_RATE: f32 = 0.1;

    /// Creates an Adagrad optimizer for `loss`.
    pub fn new(loss: &Expression, batch_size: usize, lr: f32) -> Result<Self> {
        Ok(Self {
            target: Target::new(loss),
            lr: scaled_learning_rate(lr, batch_size)?,
            decay: 0.0,
            iterations: 0,
        })
    }

    /// Builder method to set the learning rate decay.
    #[must_use]
    pub fn decay(mut self, decay: f32) -> Self {
        self.decay = decay.max(0.0);
        self
    }
}

impl Optimizer for Adagrad {
    fn step(&mut self) -> Result<()> {
        let lr = self.lr / (1.0 + self.decay * self.iterations as f32);
        let eps = EPSILON as f32;

        for variable in self.target.backpropagate()? {
            let ctx = contexts(variable, 1);
            let (data, grad) = (variable.data(), variable.gradient());
            let grad = grad.as_slice();
            let mut data = data.as_slice_mut();
            let mut moments = ctx[0].as_slice_mut();

            for ((d, m), &g) in data.iter_mut().zip(moments.iter_mut()).zip(grad.iter()) {
                *m += g * g;
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

#[cfg(test)]
mod tests {
    use super::*;
    use ceras_autograd::functions::{square, sum_reduce};
    use ceras_autograd::Variable;
    use ceras_tensor::Tensor;

    #[test]
    fn test_adagrad_first_step_is_normalized() {
        let v = Variable::new(Tensor::from_vec(vec![1.0, -2.0], &[2]).unwrap());
        let loss = sum_reduce(&square(&Expression::from(&v)));
        let mut optimizer = Adagrad::new(&loss, 1, 0.1).unwrap();
        loss.forward().unwrap();
        optimizer.step().unwrap();
        // g / sqrt(g^2) = sign(g)
        let data = v.data().to_vec();
        assert!((data[0] - 0.9).abs() < 1e-5);
        assert!((data[1] + 1.9).abs() < 1e-5);
        assert_eq!(v.contexts()[0].to_vec(), vec![4.0, 16.0]);
    }
}
