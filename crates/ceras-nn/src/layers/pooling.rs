//! Pooling Layers - Spatial Down- and Up-Sampling
//!
//! All three layers work on NHWC batches with a square, non-overlapping
//! window whose side is the stride.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_autograd::functions::{average_pooling_2d, max_pooling_2d, up_sampling_2d};
use ceras_autograd::Expression;
use ceras_core::error::Result;

use crate::layer::Layer;

// =============================================================================
// MaxPooling2D
// =============================================================================

/// Keeps the maximum of every `stride x stride` window.
#[derive(Debug, Clone, Copy)]
pub struct MaxPooling2D {
    stride: usize,
}

impl MaxPooling2D {
    /// Creates a max pooling layer.
    pub fn new(stride: usize) -> Self {
        Self { stride }
    }
}

impl Layer for MaxPooling2D {
    fn forward(&self, input: &Expression) -> Result<Expression> {
        max_pooling_2d(input, self.stride)
    }

    fn name(&self) -> &'static str {
        "MaxPooling2D"
    }
}

// =============================================================================
// AveragePooling2D
// =============================================================================

/// Averages every `stride x stride` window.
#[derive(Debug, Clone, Copy)]
pub struct AveragePooling2D {
    stride: usize,
}

impl AveragePooling2D {
    /// Creates an average pooling layer.
    pub fn new(stride: usize) -> Self {
        Self { stride }
    }
}

impl Layer for AveragePooling2D {
    fn forward(&self, input: &Expression) -> Result<Expression> {
        average_pooling_2d(input, self.stride)
    }

    fn name(&self) -> &'static str {
        "AveragePooling2D"
    }
}

// =============================================================================
// UpSampling2D
// =============================================================================

/// Repeats every pixel into a `stride x stride` block.
#[derive(Debug, Clone, Copy)]
pub struct UpSampling2D {
    stride: usize,
}

impl UpSampling2D {
    /// Creates an up-sampling layer.
    pub fn new(stride: usize) -> Self {
        Self { stride }
    }
}

impl Layer for UpSampling2D {
    fn forward(&self, input: &Expression) -> Result<Expression> {
        up_sampling_2d(input, self.stride)
    }

    fn name(&self) -> &'static str {
        "UpSampling2D"
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
    fn test_pooling_shapes() {
        let x = Expression::constant(Tensor::ones(&[2, 4, 6, 3]));
        let max = MaxPooling2D::new(2).forward(&x).unwrap().forward().unwrap();
        assert_eq!(max.shape(), &[2, 2, 3, 3]);

        let avg = AveragePooling2D::new(2).forward(&x).unwrap().forward().unwrap();
        assert_eq!(avg.shape(), &[2, 2, 3, 3]);

        let up = UpSampling2D::new(3).forward(&x).unwrap().forward().unwrap();
        assert_eq!(up.shape(), &[2, 12, 18, 3]);
    }

    #[test]
    fn test_unit_stride_rejected() {
        let x = Expression::constant(Tensor::ones(&[1, 2, 2, 1]));
        assert!(MaxPooling2D::new(1).forward(&x).is_err());
    }
}
