//! Loss Functions
//!
//! Every loss takes `(prediction, ground_truth)` and reduces to a `[1]`
//! tensor. Most are compositions of graph operations; the softmax
//! cross-entropy is a fused operator for numerical stability.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_core::config::EPSILON;
use ceras_core::error::{Error, Result};
use ceras_tensor::Tensor;

use super::{abs, elementwise_product, log, mean_reduce, minus, negative, relu, square, sum_reduce};
use crate::expression::Expression;
use crate::operator::BinaryFunction;

// =============================================================================
// Composite Losses
// =============================================================================

/// Sum of squared differences.
#[must_use]
pub fn squared_loss(prediction: &Expression, ground_truth: &Expression) -> Expression {
    sum_reduce(&square(&minus(prediction, ground_truth)))
}

/// Mean of squared differences.
#[must_use]
pub fn mean_squared_error(prediction: &Expression, ground_truth: &Expression) -> Expression {
    mean_reduce(&square(&minus(prediction, ground_truth)))
}

/// Alias of [`mean_squared_error`].
#[must_use]
pub fn mse(prediction: &Expression, ground_truth: &Expression) -> Expression {
    mean_squared_error(prediction, ground_truth)
}

/// Sum of absolute differences.
#[must_use]
pub fn abs_loss(prediction: &Expression, ground_truth: &Expression) -> Expression {
    sum_reduce(&abs(&minus(prediction, ground_truth)))
}

/// Mean of absolute differences.
#[must_use]
pub fn mean_absolute_error(prediction: &Expression, ground_truth: &Expression) -> Expression {
    mean_reduce(&abs(&minus(prediction, ground_truth)))
}

/// Alias of [`mean_absolute_error`].
#[must_use]
pub fn mae(prediction: &Expression, ground_truth: &Expression) -> Expression {
    mean_absolute_error(prediction, ground_truth)
}

/// `-sum(ground_truth * ln(prediction))` for probabilities in `prediction`.
#[must_use]
pub fn cross_entropy(prediction: &Expression, ground_truth: &Expression) -> Expression {
    negative(&sum_reduce(&elementwise_product(ground_truth, &log(prediction))))
}

/// `mean(max(0, 1 - prediction * ground_truth))` for labels in `{-1, 1}`.
#[must_use]
pub fn hinge_loss(prediction: &Expression, ground_truth: &Expression) -> Expression {
    let margin = minus(&Expression::value(1.0), &elementwise_product(prediction, ground_truth));
    mean_reduce(&relu(&margin))
}

// =============================================================================
// Softmax Cross-Entropy
// =============================================================================

/// Softmax followed by cross-entropy, averaged over the batch.
///
/// The lhs holds raw scores (logits), the rhs one-hot or soft targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    fn batch(prediction: &Tensor<f32>, ground_truth: &Tensor<f32>) -> Result<f32> {
        if prediction.shape() != ground_truth.shape() {
            return Err(Error::shape_mismatch(ground_truth.shape(), prediction.shape()));
        }
        let batch = *prediction.shape().first().ok_or(Error::EmptyTensor)?;
        if batch == 0 {
            return Err(Error::EmptyTensor);
        }
        Ok(batch as f32)
    }
}

impl BinaryFunction for CrossEntropyLoss {
    fn forward(&self, prediction: &Tensor<f32>, ground_truth: &Tensor<f32>) -> Result<Tensor<f32>> {
        let batch = Self::batch(prediction, ground_truth)?;
        let eps = EPSILON as f32;
        let sm = prediction.softmax()?;
        let total: f32 = sm
            .to_vec()
            .iter()
            .zip(ground_truth.to_vec().iter())
            .map(|(&s, &t)| -t * s.max(eps).ln())
            .sum();
        Ok(Tensor::scalar(total / batch))
    }

    fn backward(
        &self,
        prediction: &Tensor<f32>,
        ground_truth: &Tensor<f32>,
        _output: &Tensor<f32>,
        grad: &Tensor<f32>,
    ) -> Result<(Tensor<f32>, Tensor<f32>)> {
        let batch = Self::batch(prediction, ground_truth)?;
        let scale = grad.sum_all() / batch;
        let eps = EPSILON as f32;
        let sm = prediction.softmax()?;
        let prediction_grad = sm.zip_map(ground_truth, |s, t| (s - t) * scale)?;
        let truth_grad = sm.map(|s| -s.max(eps).ln() * scale);
        Ok((prediction_grad, truth_grad))
    }

    fn name(&self) -> &'static str {
        "CrossEntropyLoss"
    }
}

/// Softmax cross-entropy between logits and targets, averaged over the batch.
#[must_use]
pub fn cross_entropy_loss(prediction: &Expression, ground_truth: &Expression) -> Expression {
    Expression::binary(CrossEntropyLoss, prediction, ground_truth)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backward::{gradcheck, numerical_gradient};
    use crate::variable::Variable;

    fn tensor(data: Vec<f32>, shape: &[usize]) -> Tensor<f32> {
        Tensor::from_vec(data, shape).unwrap()
    }

    #[test]
    fn test_squared_and_absolute_losses() {
        let p = Expression::constant(tensor(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]));
        let t = Expression::constant(tensor(vec![0.0, 2.0, 5.0, 4.0], &[2, 2]));
        assert_eq!(squared_loss(&p, &t).forward().unwrap().to_vec(), vec![5.0]);
        assert_eq!(mse(&p, &t).forward().unwrap().to_vec(), vec![1.25]);
        assert_eq!(abs_loss(&p, &t).forward().unwrap().to_vec(), vec![3.0]);
        assert_eq!(mae(&p, &t).forward().unwrap().to_vec(), vec![0.75]);
    }

    #[test]
    fn test_mse_gradient() {
        let p = Variable::new(tensor(vec![1.0, 3.0], &[2, 1]));
        let t = Expression::constant(tensor(vec![0.0, 0.0], &[2, 1]));
        let loss = mean_squared_error(&Expression::from(&p), &t);
        loss.forward().unwrap();
        loss.backward(&Tensor::ones(&[1])).unwrap();
        assert_eq!(p.gradient().to_vec(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_cross_entropy() {
        let p = Expression::constant(tensor(vec![0.25, 0.75], &[1, 2]));
        let t = Expression::constant(tensor(vec![0.0, 1.0], &[1, 2]));
        let value = cross_entropy(&p, &t).forward().unwrap().to_vec()[0];
        assert!((value + 0.75f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn test_cross_entropy_loss_value() {
        // equal logits: softmax is uniform, loss is ln(2)
        let p = Expression::constant(tensor(vec![0.0, 0.0, 3.0, 3.0], &[2, 2]));
        let t = Expression::constant(tensor(vec![1.0, 0.0, 0.0, 1.0], &[2, 2]));
        let value = cross_entropy_loss(&p, &t).forward().unwrap().to_vec()[0];
        assert!((value - std::f32::consts::LN_2).abs() < 1e-6);
    }

    #[test]
    fn test_cross_entropy_loss_gradient() {
        let logits = Variable::new(tensor(vec![0.2, -1.0, 0.5, 1.5, 0.3, -0.7], &[2, 3]));
        let t = Expression::constant(tensor(vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0], &[2, 3]));
        let loss = cross_entropy_loss(&Expression::from(&logits), &t);
        let numerical = numerical_gradient(&loss, &logits, 1e-3).unwrap();
        loss.forward().unwrap();
        loss.backward(&Tensor::ones(&[1])).unwrap();
        assert!(gradcheck(&logits.gradient(), &numerical, 1e-2, 1e-3));
    }

    #[test]
    fn test_cross_entropy_loss_shape_mismatch() {
        let p = Expression::constant(Tensor::ones(&[2, 3]));
        let t = Expression::constant(Tensor::ones(&[2, 2]));
        assert!(cross_entropy_loss(&p, &t).forward().is_err());
    }

    #[test]
    fn test_hinge_loss() {
        let p = Expression::constant(tensor(vec![0.5, -2.0, 2.0, 0.0], &[4]));
        let t = Expression::constant(tensor(vec![1.0, -1.0, -1.0, 1.0], &[4]));
        // margins: 0.5, 0, 3, 1
        assert_eq!(hinge_loss(&p, &t).forward().unwrap().to_vec(), vec![1.125]);
    }
}
