//! Activation Layers - Non-linear Activation Functions
//!
//! Activation functions wrapped as layers for use in `Sequential`.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_autograd::functions::{elu, gelu, leaky_relu, relu, selu, sigmoid, softmax, softplus, tanh};
use ceras_autograd::Expression;
use ceras_core::error::Result;

use crate::layer::Layer;

// =============================================================================
// Parameter-Free Activations
// =============================================================================

macro_rules! activation_layer {
    ($(#[$doc:meta])* $layer:ident, $function:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $layer;

        impl Layer for $layer {
            fn forward(&self, input: &Expression) -> Result<Expression> {
                Ok($function(input))
            }

            fn name(&self) -> &'static str {
                stringify!($layer)
            }
        }
    };
}

activation_layer!(
    /// `max(0, x)` element-wise.
    ReLU,
    relu
);
activation_layer!(
    /// `1 / (1 + exp(-x))` element-wise.
    Sigmoid,
    sigmoid
);
activation_layer!(
    /// Hyperbolic tangent element-wise.
    Tanh,
    tanh
);
activation_layer!(
    /// Softmax over the last dimension.
    Softmax,
    softmax
);
activation_layer!(
    /// `ln(1 + exp(x))` element-wise.
    Softplus,
    softplus
);
activation_layer!(
    /// Scaled ELU with the self-normalizing constants.
    SELU,
    selu
);
activation_layer!(
    /// Gaussian error linear unit, tanh approximation.
    GELU,
    gelu
);

// =============================================================================
// LeakyReLU
// =============================================================================

/// `max(x, factor * x)` element-wise, with `0 < factor < 1`.
#[derive(Debug, Clone, Copy)]
pub struct LeakyReLU {
    factor: f32,
}

impl LeakyReLU {
    /// Creates a leaky ReLU with the default factor of 0.2.
    pub fn new() -> Self {
        Self { factor: 0.2 }
    }

    /// Creates a leaky ReLU with a custom factor.
    pub fn with_factor(factor: f32) -> Self {
        Self { factor }
    }
}

impl Default for LeakyReLU {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for LeakyReLU {
    fn forward(&self, input: &Expression) -> Result<Expression> {
        leaky_relu(input, self.factor)
    }

    fn name(&self) -> &'static str {
        "LeakyReLU"
    }
}

// =============================================================================
// ELU
// =============================================================================

/// `x` for positive inputs, `alpha * (exp(x) - 1)` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct ELU {
    alpha: f32,
}

impl ELU {
    /// Creates an ELU with the given `alpha`.
    pub fn new(alpha: f32) -> Self {
        Self { alpha }
    }
}

impl Default for ELU {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Layer for ELU {
    fn forward(&self, input: &Expression) -> Result<Expression> {
        Ok(elu(input, self.alpha))
    }

    fn name(&self) -> &'static str {
        "ELU"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ceras_tensor::Tensor;

    fn input() -> Expression {
        Expression::constant(Tensor::from_vec(vec![-1.0, 0.0, 2.0], &[1, 3]).unwrap())
    }

    #[test]
    fn test_relu() {
        let y = ReLU.forward(&input()).unwrap().forward().unwrap();
        assert_eq!(y.to_vec(), vec![0.0, 0.0, 2.0]);
        assert_eq!(ReLU.name(), "ReLU");
    }

    #[test]
    fn test_sigmoid() {
        let y = Sigmoid.forward(&input()).unwrap().forward().unwrap().to_vec();
        assert!((y[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_softmax() {
        let y = Softmax.forward(&input()).unwrap().forward().unwrap().to_vec();
        assert!((y.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_leaky_relu() {
        let y = LeakyReLU::new().forward(&input()).unwrap().forward().unwrap().to_vec();
        assert!((y[0] + 0.2).abs() < 1e-6);
        assert!(LeakyReLU::with_factor(1.5).forward(&input()).is_err());
    }

    #[test]
    fn test_elu() {
        let y = ELU::default().forward(&input()).unwrap().forward().unwrap().to_vec();
        assert!((y[0] - ((-1.0f32).exp() - 1.0)).abs() < 1e-6);
        assert_eq!(y[2], 2.0);
    }
}
