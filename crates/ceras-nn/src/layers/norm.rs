//! Normalization Layers - Batch and Instance Normalization
//!
//! Both layers standardize their input with an internal normalization
//! operator and apply a learned scale (`gamma`, initialized to ones) and
//! shift (`beta`, initialized to zeros) shaped like one sample.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_autograd::functions::{batch_normalization, instance_normalization, DEFAULT_MOMENTUM};
use ceras_autograd::{Expression, Variable};
use ceras_core::error::{Error, Result};

use crate::init::{ones, zeros};
use crate::layer::Layer;

fn check(shape: &[usize], momentum: f32) -> Result<()> {
    if shape.is_empty() || shape.contains(&0) {
        return Err(Error::invalid_operation(format!(
            "normalization needs a non-empty sample shape, got {shape:?}"
        )));
    }
    if !(0.0..=1.0).contains(&momentum) {
        return Err(Error::invalid_operation(format!(
            "normalization momentum must lie in [0, 1], got {momentum}"
        )));
    }
    Ok(())
}

// =============================================================================
// BatchNormalization
// =============================================================================

/// Normalizes every feature over the batch.
///
/// `shape` is the shape of one sample, for example `[features]` or
/// `[rows, cols, channels]`.
#[derive(Debug, Clone)]
pub struct BatchNormalization {
    /// Learned scale.
    pub gamma: Variable,
    /// Learned shift.
    pub beta: Variable,
    momentum: f32,
}

impl BatchNormalization {
    /// Creates a batch normalization layer for samples of `shape`.
    pub fn new(shape: &[usize], momentum: f32) -> Result<Self> {
        check(shape, momentum)?;
        Ok(Self {
            gamma: Variable::new(ones(shape)),
            beta: Variable::new(zeros(shape)),
            momentum,
        })
    }

    /// Creates a batch normalization layer with the default momentum.
    pub fn with_shape(shape: &[usize]) -> Result<Self> {
        Self::new(shape, DEFAULT_MOMENTUM)
    }
}

impl Layer for BatchNormalization {
    fn forward(&self, input: &Expression) -> Result<Expression> {
        batch_normalization(
            input,
            &Expression::from(&self.gamma),
            &Expression::from(&self.beta),
            self.momentum,
        )
    }

    fn variables(&self) -> Vec<Variable> {
        vec![self.gamma.clone(), self.beta.clone()]
    }

    fn name(&self) -> &'static str {
        "BatchNormalization"
    }
}

// =============================================================================
// InstanceNormalization
// =============================================================================

/// Normalizes every spatial position over the batch and the channels.
///
/// Expects inputs of at least three dimensions, `[batch, ..., channels]`.
#[derive(Debug, Clone)]
pub struct InstanceNormalization {
    /// Learned scale.
    pub gamma: Variable,
    /// Learned shift.
    pub beta: Variable,
    momentum: f32,
}

impl InstanceNormalization {
    /// Creates an instance normalization layer for samples of `shape`.
    pub fn new(shape: &[usize], momentum: f32) -> Result<Self> {
        check(shape, momentum)?;
        Ok(Self {
            gamma: Variable::new(ones(shape)),
            beta: Variable::new(zeros(shape)),
            momentum,
        })
    }
}

impl Layer for InstanceNormalization {
    fn forward(&self, input: &Expression) -> Result<Expression> {
        instance_normalization(
            input,
            &Expression::from(&self.gamma),
            &Expression::from(&self.beta),
            self.momentum,
        )
    }

    fn variables(&self) -> Vec<Variable> {
        vec![self.gamma.clone(), self.beta.clone()]
    }

    fn name(&self) -> &'static str {
        "InstanceNormalization"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ceras_tensor::Tensor;

    #[test]
    fn test_batch_normalization_standardizes() {
        let layer = BatchNormalization::with_shape(&[2]).unwrap();
        let x = Expression::constant(Tensor::from_vec(vec![1.0, 10.0, 3.0, 30.0], &[2, 2]).unwrap());
        let y = layer.forward(&x).unwrap().forward().unwrap().to_vec();
        assert!((y[0] + 1.0).abs() < 1e-3);
        assert!((y[2] - 1.0).abs() < 1e-3);
        assert!((y[1] + 1.0).abs() < 1e-3);
        assert_eq!(layer.variables().len(), 2);
    }

    #[test]
    fn test_instance_normalization_shape() {
        let layer = InstanceNormalization::new(&[2, 2, 3], 0.9).unwrap();
        let x = Expression::constant(Tensor::from_vec((0..24).map(|v| v as f32).collect(), &[2, 2, 2, 3]).unwrap());
        let y = layer.forward(&x).unwrap().forward().unwrap();
        assert_eq!(y.shape(), &[2, 2, 2, 3]);
    }

    #[test]
    fn test_normalization_arguments_validated() {
        assert!(BatchNormalization::new(&[], 0.9).is_err());
        assert!(BatchNormalization::new(&[4], 1.5).is_err());
        assert!(InstanceNormalization::new(&[4, 0], 0.5).is_err());
    }
}
