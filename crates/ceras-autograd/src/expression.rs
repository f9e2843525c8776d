//! Expression - Handle on a Node of the Computation Graph
//!
//! An `Expression` is a cheap, clonable handle on a graph node. Leaves are
//! variables, place holders, constants and values; inner nodes are unary
//! and binary operators. Expressions are built eagerly but evaluated
//! lazily: nothing is computed until `forward` is called on a root.
//!
//! # Example
//! ```rust
//! use ceras_autograd::prelude::*;
//! use ceras_tensor::Tensor;
//!
//! let x = PlaceHolder::new();
//! let w = Variable::new(Tensor::ones(&[2, 1]));
//! let y = Expression::from(&x) * Expression::from(&w);
//!
//! x.bind(Tensor::from_vec(vec![1.0, 2.0], &[1, 2]).unwrap());
//! assert_eq!(y.forward().unwrap().to_vec(), vec![3.0]);
//! ```
//!
//! @version 0.1.0
//! @author Ceras Development Team

use core::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::Arc;

use ceras_core::generate_uid;
use ceras_tensor::Tensor;

use crate::constant::{Constant, Value};
use crate::operator::{BinaryFunction, BinaryOperator, UnaryFunction, UnaryOperator};
use crate::place_holder::PlaceHolder;
use crate::variable::Variable;

// =============================================================================
// Node Types
// =============================================================================

/// The kind of a graph node.
#[derive(Debug)]
pub enum NodeKind {
    /// Learnable leaf.
    Variable(Variable),
    /// Input slot leaf.
    PlaceHolder(PlaceHolder),
    /// Fixed tensor leaf.
    Constant(Constant),
    /// Fixed scalar leaf.
    Value(Value),
    /// One-input operator.
    Unary(UnaryOperator),
    /// Two-input operator.
    Binary(BinaryOperator),
}

#[derive(Debug)]
struct Node {
    id: u64,
    kind: NodeKind,
}

/// Handle on a node of the computation graph.
#[derive(Clone)]
pub struct Expression {
    node: Arc<Node>,
}

impl Expression {
    fn from_kind(id: u64, kind: NodeKind) -> Self {
        Self {
            node: Arc::new(Node { id, kind }),
        }
    }

    /// Applies `function` to `child`.
    pub fn unary<F: UnaryFunction + 'static>(function: F, child: &Expression) -> Self {
        Self::unary_shared(Arc::new(function), child)
    }

    /// Applies an already shared `function` to `child`.
    pub fn unary_shared(function: Arc<dyn UnaryFunction>, child: &Expression) -> Self {
        Self::from_kind(
            generate_uid(),
            NodeKind::Unary(UnaryOperator::new(function, child.clone())),
        )
    }

    /// Applies `function` to `lhs` and `rhs`.
    pub fn binary<F: BinaryFunction + 'static>(function: F, lhs: &Expression, rhs: &Expression) -> Self {
        Self::binary_shared(Arc::new(function), lhs, rhs)
    }

    /// Applies an already shared `function` to `lhs` and `rhs`.
    pub fn binary_shared(
        function: Arc<dyn BinaryFunction>,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Self {
        Self::from_kind(
            generate_uid(),
            NodeKind::Binary(BinaryOperator::new(function, lhs.clone(), rhs.clone())),
        )
    }

    /// Wraps a tensor as a constant leaf.
    #[must_use]
    pub fn constant(data: Tensor<f32>) -> Self {
        Self::from(Constant::new(data))
    }

    /// Wraps a scalar as a value leaf.
    #[must_use]
    pub fn value(data: f32) -> Self {
        Self::from(Value::new(data))
    }

    /// Node id; leaves share the id of the leaf they wrap.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.node.id
    }

    /// The node kind.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.node.kind
    }

    /// Short name of the node, for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match &self.node.kind {
            NodeKind::Variable(_) => "Variable",
            NodeKind::PlaceHolder(_) => "PlaceHolder",
            NodeKind::Constant(_) => "Constant",
            NodeKind::Value(_) => "Value",
            NodeKind::Unary(op) => op.function().name(),
            NodeKind::Binary(op) => op.function().name(),
        }
    }

    /// The wrapped variable, if this is a variable leaf.
    #[must_use]
    pub fn as_variable(&self) -> Option<&Variable> {
        match &self.node.kind {
            NodeKind::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// The wrapped place holder, if this is a place holder leaf.
    #[must_use]
    pub fn as_place_holder(&self) -> Option<&PlaceHolder> {
        match &self.node.kind {
            NodeKind::PlaceHolder(p) => Some(p),
            _ => None,
        }
    }

    /// The wrapped value, if this is a value leaf.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match &self.node.kind {
            NodeKind::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Returns true for unary and binary operator nodes.
    #[must_use]
    pub fn is_operator(&self) -> bool {
        matches!(self.node.kind, NodeKind::Unary(_) | NodeKind::Binary(_))
    }

    /// Direct inputs of this node.
    #[must_use]
    pub fn children(&self) -> Vec<Expression> {
        match &self.node.kind {
            NodeKind::Unary(op) => vec![op.child().clone()],
            NodeKind::Binary(op) => vec![op.lhs().clone(), op.rhs().clone()],
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({}#{})", self.name(), self.id())
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<Variable> for Expression {
    fn from(v: Variable) -> Self {
        Self::from_kind(v.id(), NodeKind::Variable(v))
    }
}

impl From<&Variable> for Expression {
    fn from(v: &Variable) -> Self {
        Self::from(v.clone())
    }
}

impl From<PlaceHolder> for Expression {
    fn from(p: PlaceHolder) -> Self {
        Self::from_kind(p.id(), NodeKind::PlaceHolder(p))
    }
}

impl From<&PlaceHolder> for Expression {
    fn from(p: &PlaceHolder) -> Self {
        Self::from(p.clone())
    }
}

impl From<Constant> for Expression {
    fn from(c: Constant) -> Self {
        Self::from_kind(c.id(), NodeKind::Constant(c))
    }
}

impl From<Value> for Expression {
    fn from(v: Value) -> Self {
        Self::from_kind(v.id(), NodeKind::Value(v))
    }
}

impl From<f32> for Expression {
    fn from(v: f32) -> Self {
        Self::value(v)
    }
}

// =============================================================================
// Operator Overloads
// =============================================================================

impl Add for &Expression {
    type Output = Expression;

    fn add(self, rhs: Self) -> Expression {
        crate::functions::plus(self, rhs)
    }
}

impl Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Self) -> Expression {
        crate::functions::plus(&self, &rhs)
    }
}

impl Add<f32> for &Expression {
    type Output = Expression;

    fn add(self, rhs: f32) -> Expression {
        crate::functions::plus(self, &Expression::value(rhs))
    }
}

impl Sub for &Expression {
    type Output = Expression;

    fn sub(self, rhs: Self) -> Expression {
        crate::functions::minus(self, rhs)
    }
}

impl Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Self) -> Expression {
        crate::functions::minus(&self, &rhs)
    }
}

impl Sub<Expression> for f32 {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        crate::functions::minus(&Expression::value(self), &rhs)
    }
}

/// Matrix product.
impl Mul for &Expression {
    type Output = Expression;

    fn mul(self, rhs: Self) -> Expression {
        crate::functions::multiply(self, rhs)
    }
}

/// Matrix product.
impl Mul for Expression {
    type Output = Expression;

    fn mul(self, rhs: Self) -> Expression {
        crate::functions::multiply(&self, &rhs)
    }
}

/// Scaling by a scalar.
impl Mul<f32> for &Expression {
    type Output = Expression;

    fn mul(self, rhs: f32) -> Expression {
        crate::functions::elementwise_product(self, &Expression::value(rhs))
    }
}

/// Scaling by a scalar.
impl Mul<Expression> for f32 {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        crate::functions::elementwise_product(&Expression::value(self), &rhs)
    }
}

impl Neg for &Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        crate::functions::negative(self)
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        crate::functions::negative(&self)
    }
}

// =============================================================================
// Tests
// =============================================================================
