//! Tensor Creation Functions
//!
//! Factory functions for filled, random and ranged tensors. Random tensors
//! draw from the seeded global generator in `ceras_core::config`, so a
//! call to `set_random_seed` makes weight initialization reproducible.
//!
//! # Key Features
//! - Zero/one/constant initialization
//! - Uniform, normal and truncated normal sampling
//! - Glorot (Xavier) uniform initialization
//! - Range and linspace functions
//!
//! @version 0.1.0
//! @author Ceras Development Team

use rand::distributions::uniform::SampleUniform;
use rand::distributions::Distribution;
use rand_distr::{Normal, StandardNormal, Uniform};

use ceras_core::config::with_rng;
use ceras_core::dtype::{Float, Numeric, Scalar};
use ceras_core::error::{Error, Result};

use crate::shape::numel;
use crate::tensor::Tensor;

// =============================================================================
// Zero and One Initialization
// =============================================================================

/// Creates a tensor filled with zeros.
///
/// # Example
/// ```rust
/// use ceras_tensor::zeros;
/// let t = zeros::<f32>(&[2, 3]);
/// assert_eq!(t.size(), 6);
/// ```
#[must_use]
pub fn zeros<T: Scalar>(shape: &[usize]) -> Tensor<T> {
    Tensor::zeros(shape)
}

/// Creates a tensor filled with ones.
#[must_use]
pub fn ones<T: Numeric>(shape: &[usize]) -> Tensor<T> {
    Tensor::ones(shape)
}

/// Creates a tensor filled with a specific value.
pub fn full<T: Scalar>(shape: &[usize], value: T) -> Tensor<T> {
    Tensor::full(shape, value)
}

/// Creates a tensor with the same shape as another, filled with zeros.
#[must_use]
pub fn zeros_like<T: Scalar>(other: &Tensor<T>) -> Tensor<T> {
    zeros(other.shape())
}

/// Creates a tensor with the same shape as another, filled with ones.
#[must_use]
pub fn ones_like<T: Numeric>(other: &Tensor<T>) -> Tensor<T> {
    ones(other.shape())
}

/// Creates a tensor with the same shape as another, filled with a value.
pub fn full_like<T: Scalar>(other: &Tensor<T>, value: T) -> Tensor<T> {
    full(other.shape(), value)
}

/// Wraps a single value into a tensor of shape `[1]`.
pub fn as_tensor<T: Scalar>(value: T) -> Tensor<T> {
    Tensor::scalar(value)
}

// =============================================================================
// Random Initialization
// =============================================================================

/// Samples uniformly from `[min, max)`.
pub fn random<T>(shape: &[usize], min: T, max: T) -> Result<Tensor<T>>
where
    T: Float + SampleUniform,
{
    if min >= max {
        return Err(Error::invalid_operation(format!(
            "uniform range is empty: [{min}, {max})"
        )));
    }
    let dist = Uniform::new(min, max);
    let data: Vec<T> = with_rng(|rng| (0..numel(shape)).map(|_| dist.sample(rng)).collect());
    Tensor::from_vec(data, shape)
}

/// Samples uniformly from `[min, max)` with the shape of `other`.
pub fn random_like<T>(other: &Tensor<T>, min: T, max: T) -> Result<Tensor<T>>
where
    T: Float + SampleUniform,
{
    random(other.shape(), min, max)
}

/// Samples from a normal distribution.
pub fn randn<T>(shape: &[usize], mean: T, stddev: T) -> Result<Tensor<T>>
where
    T: Float,
    StandardNormal: Distribution<T>,
{
    let dist = Normal::new(mean, stddev)
        .map_err(|e| Error::invalid_operation(format!("invalid normal distribution: {e}")))?;
    let data: Vec<T> = with_rng(|rng| (0..numel(shape)).map(|_| dist.sample(rng)).collect());
    Tensor::from_vec(data, shape)
}

/// Samples from a normal distribution, redrawing values that fall more
/// than two standard deviations from the mean.
pub fn truncated_normal<T>(shape: &[usize], mean: T, stddev: T) -> Result<Tensor<T>>
where
    T: Float,
    StandardNormal: Distribution<T>,
{
    let dist = Normal::new(mean, stddev)
        .map_err(|e| Error::invalid_operation(format!("invalid normal distribution: {e}")))?;
    let bound = stddev * T::from_f64(2.0);
    let data: Vec<T> = with_rng(|rng| {
        (0..numel(shape))
            .map(|_| loop {
                let x = dist.sample(rng);
                if (x - mean).abs() <= bound {
                    break x;
                }
            })
            .collect()
    });
    Tensor::from_vec(data, shape)
}

/// Fan-in and fan-out of a weight shape.
///
/// For a 2-D shape these are the two dimensions; for a convolution kernel
/// `[out, rows, cols, in]` the receptive field multiplies both.
#[must_use]
pub fn fans(shape: &[usize]) -> (usize, usize) {
    match shape {
        [] => (1, 1),
        [n] => (*n, *n),
        [fan_in, fan_out] => (*fan_in, *fan_out),
        [out, field @ .., inp] => {
            let receptive: usize = field.iter().product();
            (inp * receptive, out * receptive)
        }
    }
}

/// Glorot (Xavier) uniform initialization: `U(-l, l)` with
/// `l = sqrt(6 / (fan_in + fan_out))`.
pub fn glorot_uniform<T>(shape: &[usize]) -> Result<Tensor<T>>
where
    T: Float + SampleUniform,
{
    let (fan_in, fan_out) = fans(shape);
    let limit = T::from_f64((6.0 / (fan_in + fan_out).max(1) as f64).sqrt());
    random(shape, -limit, limit)
}

// =============================================================================
// Ranges
// =============================================================================

/// Creates a 1-D tensor of values from `start` up to `end` (exclusive).
pub fn arange<T: Float>(start: T, end: T, step: T) -> Result<Tensor<T>> {
    if step == T::zero() {
        return Err(Error::invalid_operation("arange step must not be zero"));
    }
    let count = ((end - start) / step).ceil();
    let count = if count > T::zero() {
        count.to_f64_lossless() as usize
    } else {
        0
    };
    let data: Vec<T> = (0..count)
        .map(|i| start + step * T::from_f64(i as f64))
        .collect();
    Tensor::from_vec(data, &[count])
}

/// Creates a 1-D tensor of `num` evenly spaced values over `[start, stop]`.
pub fn linspace<T: Float>(start: T, stop: T, num: usize) -> Tensor<T> {
    let data: Vec<T> = match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / T::from_f64((num - 1) as f64);
            (0..num)
                .map(|i| start + step * T::from_f64(i as f64))
                .collect()
        }
    };
    Tensor::from_vec_unchecked(data, &[num])
}

// =============================================================================
// Tests
// =============================================================================
