//! Optimizer Trait - Core Optimizer Interface
//!
//! An optimizer is bound to a loss expression. Each `step` back-propagates
//! a unit gradient from the loss (whose forward pass must already have
//! run) and updates every trainable variable below it. Per-variable state
//! such as momentum lives in the variable's `contexts`, so it follows the
//! variable rather than the optimizer.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use parking_lot::RwLockWriteGuard;

use ceras_autograd::{Expression, Variable};
use ceras_core::error::{Error, Result};
use ceras_tensor::Tensor;

// =============================================================================
// Optimizer Trait
// =============================================================================

/// Trait for all optimizers.
pub trait Optimizer {
    /// Back-propagates from the loss and updates the trainable variables.
    ///
    /// Expects the loss to have been evaluated since the last update.
    fn step(&mut self) -> Result<()>;

    /// The learning rate, already divided by the batch size.
    fn learning_rate(&self) -> f32;

    /// Sets the learning rate.
    fn set_learning_rate(&mut self, lr: f32);

    /// Number of completed steps.
    fn iterations(&self) -> usize;
}

// =============================================================================
// Shared State
// =============================================================================

/// The loss an optimizer minimizes and the variables below it.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    loss: Expression,
    variables: Vec<Variable>,
}

impl Target {
    pub(crate) fn new(loss: &Expression) -> Self {
        Self {
            loss: loss.clone(),
            variables: loss.variables(),
        }
    }

    /// Runs the backward pass and returns the variables to update.
    pub(crate) fn backpropagate(&self) -> Result<impl Iterator<Item = &Variable>> {
        self.loss.backward(&Tensor::ones(&[1]))?;
        tracing::trace!(variables = self.variables.len(), "optimizer back-propagated loss");
        Ok(self.variables.iter().filter(|v| v.trainable()))
    }
}

/// Divides `learning_rate` by `batch_size`, which must be positive.
pub(crate) fn scaled_learning_rate(learning_rate: f32, batch_size: usize) -> Result<f32> {
    if batch_size == 0 {
        return Err(Error::invalid_operation("batch size must be positive"));
    }
    Ok(learning_rate / batch_size as f32)
}

/// The variable's optimizer state, with `count` zero tensors shaped like its
/// data created on first use.
pub(crate) fn contexts(variable: &Variable, count: usize) -> RwLockWriteGuard<'_, Vec<Tensor<f32>>> {
    let mut contexts = variable.contexts();
    if contexts.len() < count {
        let shape = variable.shape();
        contexts.resize_with(count, || Tensor::zeros(&shape));
    }
    contexts
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_learning_rate() {
        assert_eq!(scaled_learning_rate(0.1, 4).unwrap(), 0.025);
        assert!(scaled_learning_rate(0.1, 0).is_err());
    }

    #[test]
    fn test_contexts_created_once() {
        let v = Variable::new(Tensor::ones(&[2, 2]));
        {
            let ctx = contexts(&v, 2);
            assert_eq!(ctx.len(), 2);
            assert_eq!(ctx[1].shape(), &[2, 2]);
            ctx[0].reset(5.0);
        }
        let ctx = contexts(&v, 2);
        assert_eq!(ctx[0].to_vec(), vec![5.0; 4]);
    }
}
