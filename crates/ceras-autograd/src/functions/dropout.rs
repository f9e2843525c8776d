//! Dropout - Random Deactivation During Training
//!
//! @version 0.1.0
//! @author Ceras Development Team

use parking_lot::RwLock;

use ceras_core::config::is_training;
use ceras_core::error::{Error, Result};
use ceras_tensor::{random, Tensor};

use crate::expression::Expression;
use crate::operator::UnaryFunction;

#[derive(Debug, Default)]
struct DropOutState {
    mask: Option<Tensor<f32>>,
    applied: bool,
}

/// Zeroes elements with probability `factor` and rescales the survivors by
/// `1 / (1 - factor)`.
///
/// The mask is drawn on the first training pass and redrawn whenever the
/// input shape changes. In the prediction phase the input passes through.
#[derive(Debug)]
pub struct DropOut {
    factor: f32,
    state: RwLock<DropOutState>,
}

impl UnaryFunction for DropOut {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        let mut state = self.state.write();
        if !is_training() {
            state.applied = false;
            return Ok(input.clone());
        }

        let stale = state.mask.as_ref().map_or(true, |m| m.shape() != input.shape());
        if stale {
            let factor = self.factor;
            let mask = random(input.shape(), 0.0f32, 1.0)?.map(|u| if u > factor { 1.0 } else { 0.0 });
            tracing::trace!(shape = ?input.shape(), "drop out mask drawn");
            state.mask = Some(mask);
        }
        state.applied = true;

        let Some(mask) = state.mask.as_ref() else {
            return Err(Error::internal("drop out mask missing after draw"));
        };
        let scale = 1.0 / (1.0 - self.factor);
        input.zip_map(mask, |x, m| x * m * scale)
    }

    fn backward(&self, _input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        let state = self.state.read();
        if !state.applied {
            return Ok(grad.clone());
        }
        let mask = state
            .mask
            .as_ref()
            .ok_or_else(|| Error::gradient("drop out backward without a mask"))?;
        let scale = 1.0 / (1.0 - self.factor);
        grad.zip_map(mask, |g, m| g * m * scale)
    }

    fn name(&self) -> &'static str {
        "DropOut"
    }
}

/// Applies dropout with rate `factor`, which must lie strictly between 0 and 1.
pub fn drop_out(ex: &Expression, factor: f32) -> Result<Expression> {
    if !(factor > 0.0 && factor < 1.0) {
        return Err(Error::invalid_operation(format!(
            "drop out rate must lie in (0, 1), got {factor}"
        )));
    }
    Ok(Expression::unary(
        DropOut {
            factor,
            state: RwLock::new(DropOutState::default()),
        },
        ex,
    ))
}
