//! Metrics - Evaluation Scores Computed Outside the Graph
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_core::error::{Error, Result};
use ceras_tensor::Tensor;

/// Default decision threshold of [`binary_accuracy`].
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Fraction of elements on which `prediction` and `ground_truth` fall on the
/// same side of `threshold`.
pub fn binary_accuracy(prediction: &Tensor<f32>, ground_truth: &Tensor<f32>, threshold: f32) -> Result<f32> {
    if prediction.size() != ground_truth.size() {
        return Err(Error::shape_mismatch(ground_truth.shape(), prediction.shape()));
    }
    if prediction.size() == 0 {
        return Err(Error::EmptyTensor);
    }
    let p = prediction.as_slice();
    let t = ground_truth.as_slice();
    let hits = p
        .iter()
        .zip(t.iter())
        .filter(|(&p, &t)| (p > threshold) == (t > threshold))
        .count();
    Ok(hits as f32 / p.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_accuracy() {
        let p = Tensor::from_vec(vec![0.9, 0.2, 0.7, 0.4], &[4, 1]).unwrap();
        let t = Tensor::from_vec(vec![1.0, 0.0, 0.0, 0.0], &[4, 1]).unwrap();
        assert_eq!(binary_accuracy(&p, &t, DEFAULT_THRESHOLD).unwrap(), 0.75);
        assert_eq!(binary_accuracy(&p, &t, 0.8).unwrap(), 1.0);
    }

    #[test]
    fn test_binary_accuracy_size_mismatch() {
        let p = Tensor::<f32>::zeros(&[3]);
        let t = Tensor::<f32>::zeros(&[4]);
        assert!(binary_accuracy(&p, &t, DEFAULT_THRESHOLD).is_err());
    }
}
