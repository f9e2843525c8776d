//! Layer Trait - Neural Network Layer Interface
//!
//! A layer owns its variables, created when the layer is constructed, and
//! turns an input expression into an output expression. Applying a layer
//! twice builds two graph branches that share the same variables.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_autograd::{Expression, PlaceHolder, Variable};
use ceras_core::error::Result;

// =============================================================================
// Layer Trait
// =============================================================================

/// Core trait for all layers.
pub trait Layer {
    /// Applies the layer to `input`.
    fn forward(&self, input: &Expression) -> Result<Expression>;

    /// The variables owned by this layer.
    fn variables(&self) -> Vec<Variable> {
        Vec::new()
    }

    /// Number of scalar weights in trainable variables.
    fn num_parameters(&self) -> usize {
        self.variables()
            .iter()
            .filter(|v| v.trainable())
            .map(|v| v.data().size())
            .sum()
    }

    /// Freezes or unfreezes every variable of the layer.
    fn set_trainable(&self, trainable: bool) {
        for variable in self.variables() {
            variable.set_trainable(trainable);
        }
    }

    /// The layer name for debugging.
    fn name(&self) -> &'static str;
}

// =============================================================================
// Input
// =============================================================================

/// A fresh place holder expression to feed a model.
pub fn input() -> Expression {
    Expression::from(PlaceHolder::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_is_place_holder() {
        let x = input();
        assert!(x.as_place_holder().is_some());
        assert_ne!(x.id(), input().id());
    }
}
