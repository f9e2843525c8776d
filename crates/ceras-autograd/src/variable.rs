//! Variable - Learnable Tensor with Gradient Storage
//!
//! A `Variable` is a graph leaf that holds learnable data together with the
//! gradient accumulated for it during the backward pass. Optimizers read
//! that gradient and update the data in place; the per-variable optimizer
//! state (momentum, squared-gradient averages, ...) lives in the variable's
//! `contexts`.
//!
//! Cloning a variable is shallow: every clone refers to the same data,
//! gradient and contexts.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockWriteGuard};

use ceras_core::error::{Error, Result};
use ceras_core::generate_uid;
use ceras_tensor::Tensor;

// =============================================================================
// Variable Struct
// =============================================================================

#[derive(Debug)]
struct VariableState {
    id: u64,
    data: RwLock<Tensor<f32>>,
    gradient: RwLock<Tensor<f32>>,
    old_gradient: RwLock<Tensor<f32>>,
    trainable: AtomicBool,
    contexts: RwLock<Vec<Tensor<f32>>>,
}

/// A learnable tensor in the expression graph.
#[derive(Debug, Clone)]
pub struct Variable {
    inner: Arc<VariableState>,
}

impl Variable {
    /// Creates a trainable variable holding `data`.
    #[must_use]
    pub fn new(data: Tensor<f32>) -> Self {
        Self::with_trainable(data, true)
    }

    /// Creates a variable with an explicit trainable flag.
    #[must_use]
    pub fn with_trainable(data: Tensor<f32>, trainable: bool) -> Self {
        let gradient = Tensor::zeros(data.shape());
        let old_gradient = Tensor::zeros(data.shape());
        Self {
            inner: Arc::new(VariableState {
                id: generate_uid(),
                data: RwLock::new(data),
                gradient: RwLock::new(gradient),
                old_gradient: RwLock::new(old_gradient),
                trainable: AtomicBool::new(trainable),
                contexts: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Unique id of this variable.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The variable's data (shallow; writes are visible to the variable).
    #[must_use]
    pub fn data(&self) -> Tensor<f32> {
        self.inner.data.read().clone()
    }

    /// Shape of the data.
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.inner.data.read().shape().to_vec()
    }

    /// Replaces the data tensor.
    pub fn set_data(&self, data: Tensor<f32>) {
        *self.inner.data.write() = data;
    }

    /// The gradient accumulated by the last backward pass.
    #[must_use]
    pub fn gradient(&self) -> Tensor<f32> {
        self.inner.gradient.read().clone()
    }

    /// The gradient from the pass before the last reset.
    #[must_use]
    pub fn old_gradient(&self) -> Tensor<f32> {
        self.inner.old_gradient.read().clone()
    }

    /// Adds `grad` into the stored gradient.
    pub fn accumulate_gradient(&self, grad: &Tensor<f32>) -> Result<()> {
        let gradient = self.inner.gradient.read();
        if gradient.size() != grad.size() {
            return Err(Error::gradient(format!(
                "gradient of shape {:?} does not fit variable {} of shape {:?}",
                grad.shape(),
                self.id(),
                gradient.shape()
            )));
        }
        let grad = grad.reshape_to(gradient.shape())?;
        gradient.add_(&grad)
    }

    /// Moves the current gradient to `old_gradient` and starts a fresh,
    /// zeroed gradient shaped like the data.
    pub fn reset_gradient(&self) {
        let shape = self.shape();
        let mut gradient = self.inner.gradient.write();
        let fresh = Tensor::zeros(&shape);
        let previous = std::mem::replace(&mut *gradient, fresh);
        *self.inner.old_gradient.write() = previous;
    }

    /// Whether optimizers update this variable.
    #[must_use]
    pub fn trainable(&self) -> bool {
        self.inner.trainable.load(Ordering::Relaxed)
    }

    /// Freezes or unfreezes the variable.
    pub fn set_trainable(&self, trainable: bool) {
        self.inner.trainable.store(trainable, Ordering::Relaxed);
    }

    /// Optimizer state tensors attached to this variable.
    pub fn contexts(&self) -> RwLockWriteGuard<'_, Vec<Tensor<f32>>> {
        self.inner.contexts.write()
    }

    /// Returns true if both handles refer to the same variable.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_variable() {
        let v = Variable::new(Tensor::from_vec(vec![1.0, 2.0], &[1, 2]).unwrap());
        assert!(v.trainable());
        assert_eq!(v.shape(), vec![1, 2]);
        assert_eq!(v.gradient().to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_clone_shares_state() {
        let v = Variable::new(Tensor::zeros(&[2]));
        let w = v.clone();
        w.data().reset(3.0);
        w.set_trainable(false);
        assert_eq!(v.data().to_vec(), vec![3.0, 3.0]);
        assert!(!v.trainable());
        assert_eq!(v.id(), w.id());
        assert!(v.ptr_eq(&w));
    }

    #[test]
    fn test_accumulate_and_reset() {
        let v = Variable::new(Tensor::zeros(&[2, 2]));
        let g = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        v.accumulate_gradient(&g).unwrap();
        v.accumulate_gradient(&g).unwrap();
        assert_eq!(v.gradient().to_vec(), vec![2.0, 4.0, 6.0, 8.0]);

        v.reset_gradient();
        assert_eq!(v.gradient().sum_all(), 0.0);
        assert_eq!(v.old_gradient().to_vec(), vec![2.0, 4.0, 6.0, 8.0]);

        let wrong = Tensor::zeros(&[3]);
        assert!(v.accumulate_gradient(&wrong).is_err());
    }

    #[test]
    fn test_contexts() {
        let v = Variable::new(Tensor::zeros(&[3]));
        assert!(v.contexts().is_empty());
        v.contexts().push(Tensor::ones(&[3]));
        assert_eq!(v.contexts().len(), 1);
    }
}
