//! Convolution Layer - 2D Convolution over NHWC Batches
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_autograd::functions::{conv2d, plus, Conv2dConfig, Padding};
use ceras_autograd::{Expression, Variable};
use ceras_core::error::{Error, Result};

use crate::init::{glorot_uniform, zeros};
use crate::layer::Layer;

// =============================================================================
// Conv2D
// =============================================================================

/// Applies a 2D convolution followed by a per-channel bias.
///
/// # Shape
/// - Input: `[batch, rows, cols, in_channels]`
/// - Kernel: `[out_channels, kernel_rows, kernel_cols, in_channels]`, Glorot uniform
/// - Bias: `[1, 1, out_channels]`, zeros
/// - Output: `[batch, out_rows, out_cols, out_channels]`
#[derive(Debug, Clone)]
pub struct Conv2D {
    /// Convolution kernel.
    pub kernel: Variable,
    /// Per-channel bias.
    pub bias: Variable,
    config: Conv2dConfig,
}

impl Conv2D {
    /// Creates a convolution with `out_channels` filters of size
    /// `kernel = (rows, cols)` over inputs of `input = (rows, cols, channels)`.
    ///
    /// Unit stride, no dilation and valid padding until changed with the
    /// builder methods.
    pub fn new(out_channels: usize, kernel: (usize, usize), input: (usize, usize, usize)) -> Result<Self> {
        let (kr, kc) = kernel;
        let (rows, cols, in_channels) = input;
        if out_channels == 0 || kr == 0 || kc == 0 || in_channels == 0 {
            return Err(Error::invalid_operation(format!(
                "conv2d needs positive channels and kernel, got {out_channels} x {kernel:?} x {in_channels}"
            )));
        }
        Ok(Self {
            kernel: Variable::new(glorot_uniform(&[out_channels, kr, kc, in_channels])?),
            bias: Variable::new(zeros(&[1, 1, out_channels])),
            config: Conv2dConfig::new(rows, cols),
        })
    }

    /// Builder method to set the stride.
    #[must_use]
    pub fn stride(mut self, rows: usize, cols: usize) -> Self {
        self.config = self.config.stride(rows, cols);
        self
    }

    /// Builder method to set the dilation.
    #[must_use]
    pub fn dilation(mut self, rows: usize, cols: usize) -> Self {
        self.config = self.config.dilation(rows, cols);
        self
    }

    /// Builder method to set the padding mode.
    #[must_use]
    pub fn padding(mut self, padding: Padding) -> Self {
        self.config = self.config.padding(padding);
        self
    }

    /// The convolution geometry.
    pub fn config(&self) -> Conv2dConfig {
        self.config
    }
}

impl Layer for Conv2D {
    fn forward(&self, input: &Expression) -> Result<Expression> {
        let convolved = conv2d(input, &self.kernel, self.config)?;
        Ok(plus(&convolved, &Expression::from(&self.bias)))
    }

    fn variables(&self) -> Vec<Variable> {
        vec![self.kernel.clone(), self.bias.clone()]
    }

    fn name(&self) -> &'static str {
        "Conv2D"
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
    fn test_conv2d_creation() {
        let layer = Conv2D::new(8, (3, 3), (28, 28, 1)).unwrap();
        assert_eq!(layer.kernel.shape(), vec![8, 3, 3, 1]);
        assert_eq!(layer.bias.shape(), vec![1, 1, 8]);
        assert_eq!(layer.num_parameters(), 80);
        assert!(Conv2D::new(0, (3, 3), (28, 28, 1)).is_err());
    }

    #[test]
    fn test_conv2d_output_shapes() {
        let x = Expression::constant(Tensor::ones(&[2, 6, 6, 3]));

        let valid = Conv2D::new(4, (3, 3), (6, 6, 3)).unwrap();
        assert_eq!(valid.forward(&x).unwrap().forward().unwrap().shape(), &[2, 4, 4, 4]);

        let same = Conv2D::new(4, (3, 3), (6, 6, 3)).unwrap().padding(Padding::Same);
        assert_eq!(same.forward(&x).unwrap().forward().unwrap().shape(), &[2, 6, 6, 4]);

        let strided = Conv2D::new(4, (2, 2), (6, 6, 3)).unwrap().stride(2, 2);
        assert_eq!(strided.forward(&x).unwrap().forward().unwrap().shape(), &[2, 3, 3, 4]);
    }

    #[test]
    fn test_conv2d_bias_is_added_per_channel() {
        let layer = Conv2D::new(2, (1, 1), (2, 2, 1)).unwrap();
        layer.kernel.data().reset(0.0);
        layer.bias.set_data(Tensor::from_vec(vec![1.0, -1.0], &[1, 1, 2]).unwrap());
        let x = Expression::constant(Tensor::ones(&[1, 2, 2, 1]));
        let y = layer.forward(&x).unwrap().forward().unwrap();
        assert_eq!(y.to_vec(), vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0]);
    }
}
