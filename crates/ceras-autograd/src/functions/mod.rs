//! Differentiable Functions - Graph Operations
//!
//! Every operation that can appear in an expression graph. Each operation
//! is a small struct implementing `UnaryFunction` or `BinaryFunction` plus
//! a builder function that wraps it into an `Expression` node.
//!
//! @version 0.1.0
//! @author Ceras Development Team

mod activation;
mod basic;
mod complex;
mod conv;
mod dropout;
mod linalg;
mod loss;
mod norm;
mod pooling;

pub use activation::*;
pub use basic::*;
pub use complex::*;
pub use conv::*;
pub use dropout::*;
pub use linalg::*;
pub use loss::*;
pub use norm::*;
pub use pooling::*;

use ceras_core::error::Result;
use ceras_tensor::Tensor;

// =============================================================================
// Helper Functions
// =============================================================================

/// Sums a broadcast gradient back down to `shape`.
///
/// Extra leading dimensions are summed away, then every axis where `shape`
/// has extent 1 is summed with the axis kept.
pub(crate) fn reduce_to_shape(grad: &Tensor<f32>, shape: &[usize]) -> Result<Tensor<f32>> {
    if grad.shape() == shape {
        return Ok(grad.clone());
    }
    if grad.ndim() < shape.len() {
        return grad.reshape_to(shape);
    }

    let mut reduced = grad.clone();
    while reduced.ndim() > shape.len() {
        reduced = reduced.sum_along(0, false)?;
    }
    for (axis, &dim) in shape.iter().enumerate() {
        if dim == 1 && reduced.shape()[axis] != 1 {
            reduced = reduced.sum_along(axis as i64, true)?;
        }
    }
    reduced.reshape_to(shape)
}

/// Splits an NHWC shape into its four extents.
pub(crate) fn nhwc(shape: &[usize], op: &str) -> Result<(usize, usize, usize, usize)> {
    match *shape {
        [n, h, w, c] => Ok((n, h, w, c)),
        _ => Err(ceras_core::Error::invalid_operation(format!(
            "{op} expects a 4-D [batch, rows, cols, channels] tensor, got {shape:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_to_shape_leading_and_unit_axes() {
        let grad = Tensor::ones(&[2, 3, 4]);
        let reduced = reduce_to_shape(&grad, &[1, 4]).unwrap();
        assert_eq!(reduced.shape(), &[1, 4]);
        assert_eq!(reduced.to_vec(), vec![6.0; 4]);

        let reduced = reduce_to_shape(&grad, &[3, 1]).unwrap();
        assert_eq!(reduced.to_vec(), vec![8.0; 3]);
    }

    #[test]
    fn test_reduce_to_shape_identity() {
        let grad = Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap();
        let reduced = reduce_to_shape(&grad, &[2]).unwrap();
        assert!(reduced.shares_storage(&grad));
    }
}
