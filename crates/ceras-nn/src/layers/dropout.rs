//! Dropout Layer - Regularization via Random Zeroing
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_autograd::functions::drop_out;
use ceras_autograd::Expression;
use ceras_core::error::{Error, Result};

use crate::layer::Layer;

/// During training, zeros elements with probability `rate` and rescales the
/// rest; in the prediction phase the input passes through unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Dropout {
    rate: f32,
}

impl Dropout {
    /// Creates a dropout layer; `rate` must lie strictly between 0 and 1.
    pub fn new(rate: f32) -> Result<Self> {
        if !(rate > 0.0 && rate < 1.0) {
            return Err(Error::invalid_operation(format!(
                "dropout rate must lie in (0, 1), got {rate}"
            )));
        }
        Ok(Self { rate })
    }

    /// The drop probability.
    pub fn rate(&self) -> f32 {
        self.rate
    }
}

impl Layer for Dropout {
    fn forward(&self, input: &Expression) -> Result<Expression> {
        drop_out(input, self.rate)
    }

    fn name(&self) -> &'static str {
        "Dropout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ceras_core::config::LearningPhaseGuard;
    use ceras_tensor::Tensor;

    #[test]
    fn test_dropout_layer() {
        assert!(Dropout::new(0.0).is_err());
        let layer = Dropout::new(0.25).unwrap();
        assert_eq!(layer.rate(), 0.25);

        let x = Expression::constant(Tensor::ones(&[8, 8]));
        let y = layer.forward(&x).unwrap();
        let _guard = LearningPhaseGuard::prediction();
        assert_eq!(y.forward().unwrap().to_vec(), vec![1.0; 64]);
    }
}
