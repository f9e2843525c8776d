//! Graph Traversal - Topological Order and Forward Evaluation
//!
//! Evaluation walks the graph below a root in topological order and
//! computes every node exactly once, even when it is shared by several
//! parents. Operator nodes cache their inputs and output for the backward
//! pass.
//!
//! In the training phase a variable's gradient is reset when the variable
//! is evaluated, so each forward pass starts a fresh accumulation.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ceras_core::config::is_training;
use ceras_core::error::{Error, Result};
use ceras_tensor::Tensor;

use crate::expression::{Expression, NodeKind};
use crate::place_holder::PlaceHolder;
use crate::variable::Variable;

// =============================================================================
// Topological Order
// =============================================================================

/// Returns every node below `root` with each node after all of its inputs.
#[must_use]
pub fn topological_order(root: &Expression) -> Vec<Expression> {
    let mut order = Vec::new();
    let mut visited: HashSet<u64> = HashSet::new();
    let mut stack = vec![(root.clone(), false)];

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        if !visited.insert(node.id()) {
            continue;
        }
        stack.push((node.clone(), true));
        for child in node.children().into_iter().rev() {
            if !visited.contains(&child.id()) {
                stack.push((child, false));
            }
        }
    }

    order
}

fn fetch(values: &HashMap<u64, Tensor<f32>>, node: &Expression) -> Result<Tensor<f32>> {
    values
        .get(&node.id())
        .cloned()
        .ok_or_else(|| Error::internal(format!("{node:?} evaluated out of order")))
}

// =============================================================================
// Forward Evaluation
// =============================================================================

impl Expression {
    /// Evaluates the graph below this expression.
    pub fn forward(&self) -> Result<Tensor<f32>> {
        let order = topological_order(self);
        let training = is_training();
        let mut values: HashMap<u64, Tensor<f32>> = HashMap::with_capacity(order.len());

        for node in &order {
            let output = match node.kind() {
                NodeKind::Variable(v) => {
                    if training {
                        v.reset_gradient();
                    }
                    v.data()
                }
                NodeKind::PlaceHolder(p) => p.data()?,
                NodeKind::Constant(c) => c.data(),
                NodeKind::Value(v) => v.forward(None),
                NodeKind::Unary(op) => {
                    let input = fetch(&values, op.child())?;
                    op.forward(input)?
                }
                NodeKind::Binary(op) => {
                    let (lhs, rhs) = (op.lhs(), op.rhs());
                    // a value operand takes the shape of its partner
                    let (lhs_t, rhs_t) = match (lhs.as_value(), rhs.as_value()) {
                        (Some(l), None) => {
                            let r = fetch(&values, rhs)?;
                            (l.forward(Some(&r)), r)
                        }
                        (None, Some(r)) => {
                            let l = fetch(&values, lhs)?;
                            let r = r.forward(Some(&l));
                            (l, r)
                        }
                        _ => (fetch(&values, lhs)?, fetch(&values, rhs)?),
                    };
                    op.forward(lhs_t, rhs_t)?
                }
            };

            if cfg!(debug_assertions) && output.has_nan() {
                tracing::warn!(node = ?node, "forward pass produced NaN");
            }
            values.insert(node.id(), output);
        }

        fetch(&values, self)
    }

    // =========================================================================
    // Graph Queries
    // =========================================================================

    /// Every variable below this expression, in topological order.
    #[must_use]
    pub fn variables(&self) -> Vec<Variable> {
        topological_order(self)
            .iter()
            .filter_map(|node| node.as_variable().cloned())
            .collect()
    }

    /// Every trainable variable below this expression.
    #[must_use]
    pub fn trainable_variables(&self) -> Vec<Variable> {
        self.variables().into_iter().filter(Variable::trainable).collect()
    }

    /// Every place holder below this expression.
    #[must_use]
    pub fn place_holders(&self) -> Vec<PlaceHolder> {
        topological_order(self)
            .iter()
            .filter_map(|node| node.as_place_holder().cloned())
            .collect()
    }

    /// Rebuilds the graph with `place_holder` replaced by `replacement`.
    ///
    /// Leaves and operation objects are shared with the original graph, so
    /// both graphs train the same variables; operator caches are not shared.
    #[must_use]
    pub fn replace_place_holder(&self, place_holder: &PlaceHolder, replacement: &Expression) -> Self {
        let mut rebuilt: HashMap<u64, Expression> = HashMap::new();

        for node in topological_order(self) {
            let new_node = match node.kind() {
                NodeKind::PlaceHolder(p) if p.id() == place_holder.id() => replacement.clone(),
                NodeKind::Unary(op) => {
                    let child = rebuilt
                        .get(&op.child().id())
                        .cloned()
                        .unwrap_or_else(|| op.child().clone());
                    Expression::unary_shared(Arc::clone(op.function()), &child)
                }
                NodeKind::Binary(op) => {
                    let lhs = rebuilt
                        .get(&op.lhs().id())
                        .cloned()
                        .unwrap_or_else(|| op.lhs().clone());
                    let rhs = rebuilt
                        .get(&op.rhs().id())
                        .cloned()
                        .unwrap_or_else(|| op.rhs().clone());
                    Expression::binary_shared(Arc::clone(op.function()), &lhs, &rhs)
                }
                _ => node.clone(),
            };
            rebuilt.insert(node.id(), new_node);
        }

        rebuilt.remove(&self.id()).unwrap_or_else(|| self.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{plus, square};

    #[test]
    fn test_topological_order_shared_node() {
        let a = Expression::constant(Tensor::ones(&[1]));
        let b = square(&a);
        let c = plus(&b, &b);
        let order = topological_order(&c);
        assert_eq!(order.len(), 3);
        assert_eq!(order[0].id(), a.id());
        assert_eq!(order[1].id(), b.id());
        assert_eq!(order[2].id(), c.id());
    }

    #[test]
    fn test_forward_with_value_broadcast() {
        let a = Expression::constant(Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap());
        let b = &a + 1.0;
        assert_eq!(b.forward().unwrap().to_vec(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_unbound_place_holder_fails() {
        let p = PlaceHolder::new();
        let e = square(&Expression::from(&p));
        assert!(matches!(e.forward(), Err(Error::UnboundPlaceHolder { .. })));
    }

    #[test]
    fn test_variable_queries() {
        let w = Variable::new(Tensor::ones(&[1]));
        let frozen = Variable::with_trainable(Tensor::ones(&[1]), false);
        let x = PlaceHolder::new();
        let e = plus(
            &plus(&Expression::from(&w), &Expression::from(&frozen)),
            &plus(&Expression::from(&x), &Expression::from(&w)),
        );
        assert_eq!(e.variables().len(), 2);
        assert_eq!(e.trainable_variables().len(), 1);
        assert_eq!(e.place_holders().len(), 1);
    }

    #[test]
    fn test_replace_place_holder() {
        let x = PlaceHolder::new();
        let w = Variable::new(Tensor::from_vec(vec![2.0], &[1]).unwrap());
        let y = plus(&Expression::from(&x), &Expression::from(&w));

        let c = Expression::constant(Tensor::from_vec(vec![5.0], &[1]).unwrap());
        let z = y.replace_place_holder(&x, &c);
        assert_eq!(z.forward().unwrap().to_vec(), vec![7.0]);
        assert!(z.place_holders().is_empty());
        assert_eq!(z.variables()[0].id(), w.id());
    }
}
