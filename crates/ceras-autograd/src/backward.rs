//! Backward Pass - Gradient Computation
//!
//! Reverse-mode differentiation over an evaluated expression graph. The
//! graph is walked in reverse topological order; gradients reaching a node
//! from several parents are summed before the node propagates them to its
//! inputs, and variables receive whatever arrives at them.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use std::collections::HashMap;

use ceras_core::error::Result;
use ceras_tensor::Tensor;

use crate::expression::{Expression, NodeKind};
use crate::graph::topological_order;
use crate::variable::Variable;

// =============================================================================
// Backward Function
// =============================================================================

fn accumulate(grads: &mut HashMap<u64, Tensor<f32>>, node: &Expression, grad: Tensor<f32>) -> Result<()> {
    // constants, values and place holders have nowhere to send a gradient
    if !node.is_operator() && node.as_variable().is_none() {
        return Ok(());
    }
    match grads.remove(&node.id()) {
        Some(existing) => {
            let grad = grad.reshape_to(existing.shape())?;
            grads.insert(node.id(), existing.add(&grad)?);
        }
        None => {
            grads.insert(node.id(), grad);
        }
    }
    Ok(())
}

impl Expression {
    /// Back-propagates `grad`, the gradient of the loss with respect to this
    /// expression, into every variable below it.
    ///
    /// Uses the caches of the latest `forward`; an operator that has never
    /// been evaluated yields `Error::GradientError`.
    pub fn backward(&self, grad: &Tensor<f32>) -> Result<()> {
        let order = topological_order(self);
        let mut grads: HashMap<u64, Tensor<f32>> = HashMap::new();
        grads.insert(self.id(), grad.clone());

        for node in order.iter().rev() {
            let Some(grad) = grads.remove(&node.id()) else {
                continue;
            };
            match node.kind() {
                NodeKind::Variable(v) => {
                    if cfg!(debug_assertions) && grad.has_nan() {
                        tracing::warn!(variable = v.id(), "backward pass produced NaN gradient");
                    }
                    v.accumulate_gradient(&grad)?;
                }
                NodeKind::Unary(op) => {
                    let input_grad = op.backward(&grad)?;
                    accumulate(&mut grads, op.child(), input_grad)?;
                }
                NodeKind::Binary(op) => {
                    let (lhs_grad, rhs_grad) = op.backward(&grad)?;
                    accumulate(&mut grads, op.lhs(), lhs_grad)?;
                    accumulate(&mut grads, op.rhs(), rhs_grad)?;
                }
                NodeKind::PlaceHolder(_) | NodeKind::Constant(_) | NodeKind::Value(_) => {}
            }
        }

        Ok(())
    }
}

// =============================================================================
// Gradient Checking
// =============================================================================

/// Central-difference estimate of the gradient of `loss` (summed to a
/// scalar) with respect to `variable`.
///
/// The variable's data is perturbed in place and restored afterwards. Each
/// evaluation is an ordinary forward pass, so variable gradients are reset
/// along the way in the training phase.
pub fn numerical_gradient(loss: &Expression, variable: &Variable, eps: f32) -> Result<Tensor<f32>> {
    let data = variable.data();
    let original = data.to_vec();
    let mut grad = vec![0.0f32; original.len()];

    for (i, g) in grad.iter_mut().enumerate() {
        data.as_slice_mut()[i] = original[i] + eps;
        let plus = loss.forward()?.sum_all();

        data.as_slice_mut()[i] = original[i] - eps;
        let minus = loss.forward()?.sum_all();

        data.as_slice_mut()[i] = original[i];
        *g = (plus - minus) / (2.0 * eps);
    }

    Tensor::from_vec(grad, data.shape())
}

/// Checks if analytical and numerical gradients match.
///
/// # Arguments
/// * `analytical` - Analytically computed gradient
/// * `numerical` - Numerically computed gradient
/// * `rtol` - Relative tolerance
/// * `atol` - Absolute tolerance
#[must_use]
pub fn gradcheck(analytical: &Tensor<f32>, numerical: &Tensor<f32>, rtol: f32, atol: f32) -> bool {
    if analytical.size() != numerical.size() {
        return false;
    }

    let a = analytical.to_vec();
    let n = numerical.to_vec();
    a.iter()
        .zip(n.iter())
        .all(|(&av, &nv)| (av - nv).abs() <= atol + rtol * nv.abs())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{elementwise_product, square, sum_reduce};
    use ceras_core::error::Error;

    fn var(data: Vec<f32>, shape: &[usize]) -> Variable {
        Variable::new(Tensor::from_vec(data, shape).unwrap())
    }

    #[test]
    fn test_simple_backward() {
        // y = x^2, dy/dx = 2x
        let x = var(vec![3.0], &[1]);
        let y = square(&Expression::from(&x));
        y.forward().unwrap();
        y.backward(&Tensor::ones(&[1])).unwrap();
        assert!((x.gradient().to_vec()[0] - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_node_accumulates() {
        // y = x*x + x*x built from one shared product
        let x = var(vec![2.0], &[1]);
        let ex = Expression::from(&x);
        let p = elementwise_product(&ex, &ex);
        let y = &p + &p;
        y.forward().unwrap();
        y.backward(&Tensor::ones(&[1])).unwrap();
        assert!((x.gradient().to_vec()[0] - 8.0).abs() < 1e-5);
    }

    #[test]
    fn test_forward_resets_gradient() {
        let x = var(vec![1.0, 2.0], &[2]);
        let y = sum_reduce(&square(&Expression::from(&x)));
        y.forward().unwrap();
        y.backward(&Tensor::ones(&[1])).unwrap();
        y.backward(&Tensor::ones(&[1])).unwrap();
        assert_eq!(x.gradient().to_vec(), vec![4.0, 8.0]);

        y.forward().unwrap();
        assert_eq!(x.gradient().to_vec(), vec![0.0, 0.0]);
        assert_eq!(x.old_gradient().to_vec(), vec![4.0, 8.0]);
    }

    #[test]
    fn test_backward_before_forward_fails() {
        let x = var(vec![1.0], &[1]);
        let y = square(&Expression::from(&x));
        assert!(matches!(
            y.backward(&Tensor::ones(&[1])),
            Err(Error::GradientError { .. })
        ));
    }

    #[test]
    fn test_numerical_gradient() {
        let x = var(vec![2.0, 3.0], &[2]);
        let y = sum_reduce(&square(&Expression::from(&x)));
        let numerical = numerical_gradient(&y, &x, 1e-2).unwrap();
        let expected = [4.0, 6.0];
        for (n, e) in numerical.to_vec().iter().zip(expected.iter()) {
            assert!((n - e).abs() < 1e-2, "got {n}, expected {e}");
        }
        assert_eq!(x.data().to_vec(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_gradcheck() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
        let b = Tensor::from_vec(vec![1.001, 2.001, 3.001], &[3]).unwrap();

        assert!(gradcheck(&a, &b, 0.01, 0.01));
        assert!(!gradcheck(&a, &b, 0.0001, 0.0001));
    }
}
