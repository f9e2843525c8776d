//! Operators - Differentiable Graph Nodes
//!
//! Every differentiable operation implements `UnaryFunction` or
//! `BinaryFunction`: a forward computation and a backward computation that
//! turns the gradient of the output into gradients of the inputs. The
//! backward step receives the inputs and the output of the latest forward
//! evaluation, which the operator node caches.
//!
//! Functions that carry state between passes (dropout masks, pooling
//! argmax masks, running normalization statistics) keep it behind their
//! own lock, so a function object can be shared by several graphs.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use ceras_core::error::{Error, Result};
use ceras_tensor::Tensor;

use crate::expression::Expression;

// =============================================================================
// Function Traits
// =============================================================================

/// An operation with one input.
pub trait UnaryFunction: Debug + Send + Sync {
    /// Computes the output from the input.
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>>;

    /// Computes the input gradient from the output gradient.
    ///
    /// # Arguments
    /// * `input` - Input of the latest forward evaluation
    /// * `output` - Output of the latest forward evaluation
    /// * `grad` - Gradient of the loss with respect to `output`
    fn backward(
        &self,
        input: &Tensor<f32>,
        output: &Tensor<f32>,
        grad: &Tensor<f32>,
    ) -> Result<Tensor<f32>>;

    /// Returns the name of this operation for debugging.
    fn name(&self) -> &'static str;
}

/// An operation with two inputs.
pub trait BinaryFunction: Debug + Send + Sync {
    /// Computes the output from both inputs.
    fn forward(&self, lhs: &Tensor<f32>, rhs: &Tensor<f32>) -> Result<Tensor<f32>>;

    /// Computes `(lhs_grad, rhs_grad)` from the output gradient.
    fn backward(
        &self,
        lhs: &Tensor<f32>,
        rhs: &Tensor<f32>,
        output: &Tensor<f32>,
        grad: &Tensor<f32>,
    ) -> Result<(Tensor<f32>, Tensor<f32>)>;

    /// Returns the name of this operation for debugging.
    fn name(&self) -> &'static str;
}

// =============================================================================
// Operator Nodes
// =============================================================================

#[derive(Debug, Clone)]
struct UnaryCache {
    input: Tensor<f32>,
    output: Tensor<f32>,
}

/// Graph node applying a `UnaryFunction` to one child expression.
#[derive(Debug)]
pub struct UnaryOperator {
    function: Arc<dyn UnaryFunction>,
    child: Expression,
    cache: RwLock<Option<UnaryCache>>,
}

impl UnaryOperator {
    pub(crate) fn new(function: Arc<dyn UnaryFunction>, child: Expression) -> Self {
        Self {
            function,
            child,
            cache: RwLock::new(None),
        }
    }

    /// The input expression.
    #[must_use]
    pub fn child(&self) -> &Expression {
        &self.child
    }

    /// The operation this node applies.
    #[must_use]
    pub fn function(&self) -> &Arc<dyn UnaryFunction> {
        &self.function
    }

    pub(crate) fn forward(&self, input: Tensor<f32>) -> Result<Tensor<f32>> {
        let output = self.function.forward(&input)?;
        *self.cache.write() = Some(UnaryCache {
            input,
            output: output.clone(),
        });
        Ok(output)
    }

    pub(crate) fn backward(&self, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        let cache = self.cache.read().clone().ok_or_else(|| {
            Error::gradient(format!(
                "backward through '{}' before any forward pass",
                self.function.name()
            ))
        })?;
        let grad = fit_gradient(grad, &cache.output)?;
        self.function.backward(&cache.input, &cache.output, &grad)
    }
}

#[derive(Debug, Clone)]
struct BinaryCache {
    lhs: Tensor<f32>,
    rhs: Tensor<f32>,
    output: Tensor<f32>,
}

/// Graph node applying a `BinaryFunction` to two child expressions.
#[derive(Debug)]
pub struct BinaryOperator {
    function: Arc<dyn BinaryFunction>,
    lhs: Expression,
    rhs: Expression,
    cache: RwLock<Option<BinaryCache>>,
}

impl BinaryOperator {
    pub(crate) fn new(function: Arc<dyn BinaryFunction>, lhs: Expression, rhs: Expression) -> Self {
        Self {
            function,
            lhs,
            rhs,
            cache: RwLock::new(None),
        }
    }

    /// The left input expression.
    #[must_use]
    pub fn lhs(&self) -> &Expression {
        &self.lhs
    }

    /// The right input expression.
    #[must_use]
    pub fn rhs(&self) -> &Expression {
        &self.rhs
    }

    /// The operation this node applies.
    #[must_use]
    pub fn function(&self) -> &Arc<dyn BinaryFunction> {
        &self.function
    }

    pub(crate) fn forward(&self, lhs: Tensor<f32>, rhs: Tensor<f32>) -> Result<Tensor<f32>> {
        let output = self.function.forward(&lhs, &rhs)?;
        *self.cache.write() = Some(BinaryCache {
            lhs,
            rhs,
            output: output.clone(),
        });
        Ok(output)
    }

    pub(crate) fn backward(&self, grad: &Tensor<f32>) -> Result<(Tensor<f32>, Tensor<f32>)> {
        let cache = self.cache.read().clone().ok_or_else(|| {
            Error::gradient(format!(
                "backward through '{}' before any forward pass",
                self.function.name()
            ))
        })?;
        let grad = fit_gradient(grad, &cache.output)?;
        self.function
            .backward(&cache.lhs, &cache.rhs, &cache.output, &grad)
    }
}

/// Views `grad` with the shape of `output`; only the element count must agree.
fn fit_gradient(grad: &Tensor<f32>, output: &Tensor<f32>) -> Result<Tensor<f32>> {
    if grad.shape() == output.shape() {
        return Ok(grad.clone());
    }
    if grad.size() != output.size() {
        return Err(Error::gradient(format!(
            "gradient of shape {:?} does not match output of shape {:?}",
            grad.shape(),
            output.shape()
        )));
    }
    grad.reshape_to(output.shape())
}
