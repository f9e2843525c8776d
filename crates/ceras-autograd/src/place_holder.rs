//! Place Holder - Graph Input Slot
//!
//! A `PlaceHolder` is a leaf whose tensor is supplied at run time, usually
//! through a `Session`. Evaluating a graph with an unbound place holder is
//! an error rather than a panic.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use std::sync::Arc;

use parking_lot::RwLock;

use ceras_core::error::{Error, Result};
use ceras_core::generate_uid;
use ceras_tensor::Tensor;

#[derive(Debug)]
struct PlaceHolderState {
    id: u64,
    data: RwLock<Option<Tensor<f32>>>,
}

/// Input slot of an expression graph.
#[derive(Debug, Clone)]
pub struct PlaceHolder {
    inner: Arc<PlaceHolderState>,
}

impl PlaceHolder {
    /// Creates an unbound place holder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(PlaceHolderState {
                id: generate_uid(),
                data: RwLock::new(None),
            }),
        }
    }

    /// Unique id of this place holder.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Binds `tensor`, replacing any previous binding.
    pub fn bind(&self, tensor: Tensor<f32>) {
        *self.inner.data.write() = Some(tensor);
    }

    /// Removes the binding.
    pub fn reset(&self) {
        *self.inner.data.write() = None;
    }

    /// Returns true if a tensor is bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner.data.read().is_some()
    }

    /// The bound tensor.
    pub fn data(&self) -> Result<Tensor<f32>> {
        self.inner
            .data
            .read()
            .clone()
            .ok_or(Error::UnboundPlaceHolder { id: self.id() })
    }
}

impl Default for PlaceHolder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_reset() {
        let p = PlaceHolder::new();
        assert!(!p.is_bound());
        assert!(matches!(p.data(), Err(Error::UnboundPlaceHolder { .. })));

        p.bind(Tensor::ones(&[2]));
        assert_eq!(p.data().unwrap().to_vec(), vec![1.0, 1.0]);

        p.reset();
        assert!(p.data().is_err());
    }
}
