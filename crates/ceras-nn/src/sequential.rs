//! Sequential - Sequential Container for Layers
//!
//! A container that applies layers in sequence, passing the output
//! expression of each layer as the input of the next.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_autograd::{Expression, Variable};
use ceras_core::error::Result;

use crate::layer::Layer;

// =============================================================================
// Sequential
// =============================================================================

/// A sequential container that chains layers together.
///
/// # Example
/// ```rust
/// use ceras_nn::prelude::*;
///
/// let model = Sequential::new()
///     .add(Dense::new(4, 8).unwrap())
///     .add(ReLU)
///     .add(Dense::new(8, 1).unwrap());
///
/// let x = input();
/// let y = model.forward(&x).unwrap();
/// assert_eq!(y.variables().len(), 4);
/// ```
#[derive(Default)]
pub struct Sequential {
    layers: Vec<Box<dyn Layer>>,
}

impl Sequential {
    /// Creates a new empty Sequential container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer (builder pattern).
    #[must_use]
    pub fn add<L: Layer + 'static>(mut self, layer: L) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    /// Pushes a layer (non-builder pattern).
    pub fn push<L: Layer + 'static>(&mut self, layer: L) {
        self.layers.push(Box::new(layer));
    }

    /// Returns the number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns an iterator over the layers.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Layer> {
        self.layers.iter().map(AsRef::as_ref)
    }
}

impl std::fmt::Debug for Sequential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter().map(|l| l.name())).finish()
    }
}

impl Layer for Sequential {
    fn forward(&self, input: &Expression) -> Result<Expression> {
        let mut x = input.clone();
        for layer in &self.layers {
            x = layer.forward(&x)?;
        }
        Ok(x)
    }

    fn variables(&self) -> Vec<Variable> {
        self.layers.iter().flat_map(|l| l.variables()).collect()
    }

    fn name(&self) -> &'static str {
        "Sequential"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{Dense, Flatten, ReLU};
    use ceras_tensor::Tensor;

    #[test]
    fn test_sequential_creation() {
        let model = Sequential::new().add(Flatten).add(Dense::new(6, 3).unwrap()).add(ReLU);
        assert_eq!(model.len(), 3);
        assert!(!model.is_empty());
        assert_eq!(model.variables().len(), 2);
        assert_eq!(format!("{model:?}"), "[\"Flatten\", \"Dense\", \"ReLU\"]");
    }

    #[test]
    fn test_sequential_forward() {
        let model = Sequential::new().add(Flatten).add(Dense::new(6, 3).unwrap());
        let x = Expression::constant(Tensor::ones(&[5, 2, 3]));
        let y = model.forward(&x).unwrap().forward().unwrap();
        assert_eq!(y.shape(), &[5, 3]);
    }
}
