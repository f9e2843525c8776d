//! Normalization - Batch and Instance Normalization
//!
//! Both normalizations view their input as `[A, M, L]` and standardize each
//! of the `M` groups over its `A * L` elements:
//!
//! - batch normalization: `A` is the batch, `M` every other element, `L = 1`;
//! - instance normalization: `A` is the batch, `M` the dimensions between
//!   the batch and the last one, `L` the last dimension.
//!
//! In the training phase the statistics of the current input are used and
//! folded into running statistics with `running = running * momentum +
//! current * (1 - momentum)`. In the prediction phase the running statistics
//! are used instead, so a single sample can be normalized.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use parking_lot::RwLock;

use ceras_core::config::{is_training, EPSILON};
use ceras_core::error::{Error, Result};
use ceras_tensor::{Tensor, View3d};

use super::{elementwise_product, plus};
use crate::expression::Expression;
use crate::operator::UnaryFunction;

/// Default momentum of the running statistics.
pub const DEFAULT_MOMENTUM: f32 = 0.98;

// =============================================================================
// Grouping
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grouping {
    Batch,
    Instance,
}

impl Grouping {
    /// Splits `shape` into `[A, M, L]`.
    fn layout(self, shape: &[usize]) -> Result<(usize, usize, usize)> {
        match self {
            Self::Batch if shape.len() >= 2 => {
                let a = shape[0];
                Ok((a, shape[1..].iter().product(), 1))
            }
            Self::Instance if shape.len() >= 3 => {
                let a = shape[0];
                let l = shape[shape.len() - 1];
                Ok((a, shape[1..shape.len() - 1].iter().product(), l))
            }
            Self::Batch => Err(Error::invalid_operation(format!(
                "batch normalization expects at least 2 dimensions, got {shape:?}"
            ))),
            Self::Instance => Err(Error::invalid_operation(format!(
                "instance normalization expects at least 3 dimensions, got {shape:?}"
            ))),
        }
    }
}

// =============================================================================
// Normalization Function
// =============================================================================

#[derive(Debug, Default)]
struct Statistics {
    running_mean: Vec<f32>,
    running_variance: Vec<f32>,
    inv_std: Vec<f32>,
    trained: bool,
}

/// Standardization of `M` groups with running statistics.
#[derive(Debug)]
pub struct Normalization {
    grouping: Grouping,
    momentum: f32,
    stats: RwLock<Statistics>,
}

impl Normalization {
    fn new(grouping: Grouping, momentum: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&momentum) {
            return Err(Error::invalid_operation(format!(
                "normalization momentum must lie in [0, 1], got {momentum}"
            )));
        }
        Ok(Self {
            grouping,
            momentum,
            stats: RwLock::new(Statistics::default()),
        })
    }

    /// Running mean and variance per group.
    #[must_use]
    pub fn running_statistics(&self) -> (Vec<f32>, Vec<f32>) {
        let stats = self.stats.read();
        (stats.running_mean.clone(), stats.running_variance.clone())
    }
}

impl UnaryFunction for Normalization {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        let (a, m, l) = self.grouping.layout(input.shape())?;
        let eps = EPSILON as f32;
        let x = View3d::new(input.as_slice(), a, m, l)?;
        let mut stats = self.stats.write();

        if stats.running_mean.len() != m {
            stats.running_mean = vec![0.0; m];
            stats.running_variance = vec![1.0; m];
        }

        let (mean, variance) = if is_training() {
            let count = (a * l) as f32;
            let mut mean = vec![0.0f32; m];
            let mut variance = vec![0.0f32; m];
            for i in 0..a {
                for j in 0..m {
                    mean[j] += x.row(i, j).iter().sum::<f32>();
                }
            }
            mean.iter_mut().for_each(|v| *v /= count);
            for i in 0..a {
                for j in 0..m {
                    variance[j] += x.row(i, j).iter().map(|v| (v - mean[j]).powi(2)).sum::<f32>();
                }
            }
            variance.iter_mut().for_each(|v| *v /= count);

            let momentum = self.momentum;
            for j in 0..m {
                stats.running_mean[j] = stats.running_mean[j] * momentum + mean[j] * (1.0 - momentum);
                stats.running_variance[j] =
                    stats.running_variance[j] * momentum + variance[j] * (1.0 - momentum);
            }
            stats.trained = true;
            (mean, variance)
        } else {
            stats.trained = false;
            (stats.running_mean.clone(), stats.running_variance.clone())
        };

        stats.inv_std = variance.iter().map(|v| 1.0 / (v + eps).sqrt()).collect();

        let mut out = Vec::with_capacity(input.size());
        for i in 0..a {
            for j in 0..m {
                let (mu, inv) = (mean[j], stats.inv_std[j]);
                out.extend(x.row(i, j).iter().map(|v| (v - mu) * inv));
            }
        }
        drop(x);
        Tensor::from_vec(out, input.shape())
    }

    fn backward(&self, input: &Tensor<f32>, output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        let (a, m, l) = self.grouping.layout(input.shape())?;
        let stats = self.stats.read();
        if stats.inv_std.len() != m {
            return Err(Error::gradient("normalization backward without a matching forward"));
        }

        let g = View3d::new(grad.as_slice(), a, m, l)?;
        let mut ans = vec![0.0f32; input.size()];

        if !stats.trained {
            // fixed statistics: the map is affine
            let mut at = 0;
            for i in 0..a {
                for j in 0..m {
                    for &gv in g.row(i, j) {
                        ans[at] = gv * stats.inv_std[j];
                        at += 1;
                    }
                }
            }
            drop(g);
            return Tensor::from_vec(ans, input.shape());
        }

        // dx = inv_std * (g - mean(g) - x_hat * mean(g * x_hat)) per group
        let x_hat = View3d::new(output.as_slice(), a, m, l)?;
        let count = (a * l) as f32;
        let mut g_mean = vec![0.0f32; m];
        let mut gx_mean = vec![0.0f32; m];
        for i in 0..a {
            for j in 0..m {
                for (&gv, &xv) in g.row(i, j).iter().zip(x_hat.row(i, j)) {
                    g_mean[j] += gv;
                    gx_mean[j] += gv * xv;
                }
            }
        }
        g_mean.iter_mut().for_each(|v| *v /= count);
        gx_mean.iter_mut().for_each(|v| *v /= count);

        let mut at = 0;
        for i in 0..a {
            for j in 0..m {
                for (&gv, &xv) in g.row(i, j).iter().zip(x_hat.row(i, j)) {
                    ans[at] = stats.inv_std[j] * (gv - g_mean[j] - xv * gx_mean[j]);
                    at += 1;
                }
            }
        }
        drop(g);
        drop(x_hat);
        Tensor::from_vec(ans, input.shape())
    }

    fn name(&self) -> &'static str {
        match self.grouping {
            Grouping::Batch => "NormalizationBatch",
            Grouping::Instance => "NormalizationInstance",
        }
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Standardizes every feature over the batch.
pub fn normalization_batch(ex: &Expression, momentum: f32) -> Result<Expression> {
    Ok(Expression::unary(Normalization::new(Grouping::Batch, momentum)?, ex))
}

/// Batch normalization followed by the learned scale `gamma` and shift `beta`.
pub fn batch_normalization(
    ex: &Expression,
    gamma: &Expression,
    beta: &Expression,
    momentum: f32,
) -> Result<Expression> {
    let normalized = normalization_batch(ex, momentum)?;
    Ok(plus(&elementwise_product(&normalized, gamma), beta))
}

/// Standardizes every position over the batch and the last dimension.
pub fn normalization_instance(ex: &Expression, momentum: f32) -> Result<Expression> {
    Ok(Expression::unary(Normalization::new(Grouping::Instance, momentum)?, ex))
}

/// Instance normalization followed by the learned scale `gamma` and shift `beta`.
pub fn instance_normalization(
    ex: &Expression,
    gamma: &Expression,
    beta: &Expression,
    momentum: f32,
) -> Result<Expression> {
    let normalized = normalization_instance(ex, momentum)?;
    Ok(plus(&elementwise_product(&normalized, gamma), beta))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backward::{gradcheck, numerical_gradient};
    use crate::functions::sum_reduce;
    use crate::variable::Variable;
    use ceras_core::config::LearningPhaseGuard;

    fn batch() -> Tensor<f32> {
        Tensor::from_vec(vec![1.0, 10.0, 3.0, 20.0, 5.0, 30.0, 7.0, 40.0], &[4, 2]).unwrap()
    }

    #[test]
    fn test_batch_statistics() {
        let x = Expression::constant(batch());
        let y = normalization_batch(&x, DEFAULT_MOMENTUM).unwrap();
        let out = y.forward().unwrap();
        let out = out.to_vec();
        for col in 0..2 {
            let column: Vec<f32> = out.iter().skip(col).step_by(2).copied().collect();
            let mean: f32 = column.iter().sum::<f32>() / 4.0;
            let var: f32 = column.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / 4.0;
            assert!(mean.abs() < 1e-5);
            assert!((var - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_running_statistics_used_for_prediction() {
        let x = Expression::constant(batch());
        let y = normalization_batch(&x, 0.0).unwrap();
        y.forward().unwrap();

        let _guard = LearningPhaseGuard::prediction();
        let out = y.forward().unwrap().to_vec();
        // momentum 0 copies the batch statistics, so prediction matches training
        assert!((out[0] + 1.341_640_8).abs() < 1e-3);
    }

    #[test]
    fn test_batch_gradient_matches_numerical() {
        let v = Variable::new(batch());
        let weights = Expression::constant(Tensor::from_vec(vec![0.3, -1.0, 2.0, 0.5, -0.7, 1.5, 0.1, 0.9], &[4, 2]).unwrap());
        let y = normalization_batch(&Expression::from(&v), DEFAULT_MOMENTUM).unwrap();
        let loss = sum_reduce(&elementwise_product(&y, &weights));

        let numerical = numerical_gradient(&loss, &v, 1e-2).unwrap();
        loss.forward().unwrap();
        loss.backward(&Tensor::ones(&[1])).unwrap();
        assert!(gradcheck(&v.gradient(), &numerical, 5e-2, 5e-3));
    }

    #[test]
    fn test_instance_grouping() {
        // [BS=2, M=1, L=3]: each position is standardized over batch and channels
        let x = Expression::constant(Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 1, 3]).unwrap());
        let y = normalization_instance(&x, DEFAULT_MOMENTUM).unwrap();
        let out = y.forward().unwrap();
        assert!(out.sum_all().abs() < 1e-5);
        assert!(normalization_instance(&Expression::constant(Tensor::ones(&[2, 3])), 0.9)
            .unwrap()
            .forward()
            .is_err());
    }

    #[test]
    fn test_affine_batch_normalization() {
        let x = Expression::constant(batch());
        let gamma = Variable::new(Tensor::full(&[2], 2.0));
        let beta = Variable::new(Tensor::full(&[2], 1.0));
        let y = batch_normalization(&x, &Expression::from(&gamma), &Expression::from(&beta), 0.9).unwrap();
        let out = y.forward().unwrap();
        assert_eq!(out.shape(), &[4, 2]);
        assert!((out.sum_all() - 8.0).abs() < 1e-4);

        y.backward(&Tensor::ones(&[4, 2])).unwrap();
        assert_eq!(beta.gradient().to_vec(), vec![4.0, 4.0]);
    }

    #[test]
    fn test_momentum_is_validated() {
        let x = Expression::constant(batch());
        assert!(normalization_batch(&x, 1.5).is_err());
    }
}
