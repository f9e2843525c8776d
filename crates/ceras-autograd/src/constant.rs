//! Constant and Value - Fixed Graph Leaves
//!
//! A `Constant` is a fixed tensor; a `Value` is a fixed scalar that takes
//! the shape of whatever it is combined with. Neither receives gradients.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_core::generate_uid;
use ceras_tensor::Tensor;

// =============================================================================
// Constant
// =============================================================================

/// A tensor that never changes and never receives gradients.
#[derive(Debug, Clone)]
pub struct Constant {
    id: u64,
    data: Tensor<f32>,
}

impl Constant {
    /// Wraps `data` as a constant.
    #[must_use]
    pub fn new(data: Tensor<f32>) -> Self {
        Self {
            id: generate_uid(),
            data,
        }
    }

    /// Unique id of this constant.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The constant tensor.
    #[must_use]
    pub fn data(&self) -> Tensor<f32> {
        self.data.clone()
    }
}

// =============================================================================
// Value
// =============================================================================

/// A scalar that broadcasts to the shape of its partner operand.
#[derive(Debug, Clone, Copy)]
pub struct Value {
    id: u64,
    data: f32,
}

impl Value {
    /// Wraps the scalar `data`.
    #[must_use]
    pub fn new(data: f32) -> Self {
        Self {
            id: generate_uid(),
            data,
        }
    }

    /// Unique id of this value.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The scalar.
    #[must_use]
    pub fn data(&self) -> f32 {
        self.data
    }

    /// Evaluates to `data` shaped like `reference`, or to a `[1]` tensor.
    #[must_use]
    pub fn forward(&self, reference: Option<&Tensor<f32>>) -> Tensor<f32> {
        match reference {
            Some(r) => Tensor::full(r.shape(), self.data),
            None => Tensor::scalar(self.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_takes_reference_shape() {
        let v = Value::new(2.5);
        let r = Tensor::zeros(&[2, 3]);
        let out = v.forward(Some(&r));
        assert_eq!(out.shape(), &[2, 3]);
        assert!(out.to_vec().iter().all(|&x| x == 2.5));
        assert_eq!(v.forward(None).shape(), &[1]);
    }

    #[test]
    fn test_constant_is_shared() {
        let t = Tensor::ones(&[2]);
        let c = Constant::new(t.clone());
        assert!(c.data().shares_storage(&t));
    }
}
