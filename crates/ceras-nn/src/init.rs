//! Weight Initialization - Variable Initialization Strategies
//!
//! Every initializer takes the full weight shape. Fan-in and fan-out are
//! derived from it the same way for all of them: a matrix `[in, out]`
//! uses its two dimensions, a convolution kernel `[out, rows, cols, in]`
//! multiplies both by the receptive field.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_core::error::Result;
use ceras_tensor::{fans, Tensor};

// =============================================================================
// Basic Initializers
// =============================================================================

/// Creates a tensor filled with zeros.
pub fn zeros(shape: &[usize]) -> Tensor<f32> {
    ceras_tensor::zeros(shape)
}

/// Creates a tensor filled with ones.
pub fn ones(shape: &[usize]) -> Tensor<f32> {
    ceras_tensor::ones(shape)
}

/// Creates a tensor filled with a constant value.
pub fn constant(shape: &[usize], value: f32) -> Tensor<f32> {
    ceras_tensor::full(shape, value)
}

// =============================================================================
// Random Initializers
// =============================================================================

/// Uniform random values in `[low, high)`.
pub fn uniform(shape: &[usize], low: f32, high: f32) -> Result<Tensor<f32>> {
    ceras_tensor::random(shape, low, high)
}

/// Normal random values with the given mean and standard deviation.
pub fn normal(shape: &[usize], mean: f32, std: f32) -> Result<Tensor<f32>> {
    ceras_tensor::randn(shape, mean, std)
}

/// Normal random values redrawn when further than two standard deviations
/// from the mean.
pub fn truncated_normal(shape: &[usize], mean: f32, std: f32) -> Result<Tensor<f32>> {
    ceras_tensor::truncated_normal(shape, mean, std)
}

// =============================================================================
// Xavier/Glorot Initialization
// =============================================================================

/// Glorot uniform: `U(-a, a)` with `a = sqrt(6 / (fan_in + fan_out))`.
pub fn glorot_uniform(shape: &[usize]) -> Result<Tensor<f32>> {
    ceras_tensor::glorot_uniform(shape)
}

/// Glorot normal: `N(0, std)` with `std = sqrt(2 / (fan_in + fan_out))`.
pub fn glorot_normal(shape: &[usize]) -> Result<Tensor<f32>> {
    let (fan_in, fan_out) = fans(shape);
    let std = (2.0 / (fan_in + fan_out).max(1) as f32).sqrt();
    normal(shape, 0.0, std)
}

// =============================================================================
// Kaiming/He Initialization
// =============================================================================

/// He normal: `N(0, std)` with `std = sqrt(2 / fan_in)`.
///
/// Designed for layers followed by ReLU activations.
pub fn he_normal(shape: &[usize]) -> Result<Tensor<f32>> {
    let (fan_in, _) = fans(shape);
    let std = (2.0 / fan_in.max(1) as f32).sqrt();
    normal(shape, 0.0, std)
}

/// He uniform: `U(-a, a)` with `a = sqrt(6 / fan_in)`.
pub fn he_uniform(shape: &[usize]) -> Result<Tensor<f32>> {
    let (fan_in, _) = fans(shape);
    let bound = (6.0 / fan_in.max(1) as f32).sqrt();
    uniform(shape, -bound, bound)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_initializers() {
        assert_eq!(zeros(&[2, 2]).to_vec(), vec![0.0; 4]);
        assert_eq!(ones(&[3]).to_vec(), vec![1.0; 3]);
        assert_eq!(constant(&[2], 0.5).to_vec(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_glorot_uniform_bounds() {
        let w = glorot_uniform(&[10, 20]).unwrap();
        let limit = (6.0f32 / 30.0).sqrt();
        assert_eq!(w.shape(), &[10, 20]);
        assert!(w.to_vec().iter().all(|x| x.abs() <= limit));
    }

    #[test]
    fn test_he_uniform_uses_receptive_field() {
        // kernel [out, rows, cols, in]: fan_in = 3 * 3 * 4
        let w = he_uniform(&[8, 3, 3, 4]).unwrap();
        let bound = (6.0f32 / 36.0).sqrt();
        assert!(w.to_vec().iter().all(|x| x.abs() <= bound));
    }

    #[test]
    fn test_normal_initializers_spread() {
        let w = he_normal(&[200, 50]).unwrap();
        let data = w.to_vec();
        let mean = data.iter().sum::<f32>() / data.len() as f32;
        let var = data.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / data.len() as f32;
        assert!(mean.abs() < 0.02);
        assert!((var - 0.01).abs() < 0.002);

        let g = glorot_normal(&[4, 4]).unwrap();
        assert_eq!(g.shape(), &[4, 4]);
    }

    #[test]
    fn test_truncated_normal_bounds() {
        let w = truncated_normal(&[1000], 0.0, 1.0).unwrap();
        assert!(w.to_vec().iter().all(|x| x.abs() <= 2.0));
    }
}
