//! Shape Layers - Flatten and Reshape
//!
//! @version 0.1.0
//! @author Ceras Development Team

use ceras_autograd::functions::{flatten, reshape};
use ceras_autograd::Expression;
use ceras_core::error::Result;

use crate::layer::Layer;

/// Collapses every dimension after the batch into one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flatten;

impl Layer for Flatten {
    fn forward(&self, input: &Expression) -> Result<Expression> {
        Ok(flatten(input))
    }

    fn name(&self) -> &'static str {
        "Flatten"
    }
}

/// Reshapes every sample to `shape`.
///
/// With `include_batch` the batch dimension is kept in front of `shape`;
/// otherwise the whole tensor takes `shape`.
#[derive(Debug, Clone)]
pub struct Reshape {
    shape: Vec<usize>,
    include_batch: bool,
}

impl Reshape {
    /// Creates a reshape layer.
    pub fn new(shape: &[usize], include_batch: bool) -> Self {
        Self {
            shape: shape.to_vec(),
            include_batch,
        }
    }
}

impl Layer for Reshape {
    fn forward(&self, input: &Expression) -> Result<Expression> {
        reshape(input, &self.shape, self.include_batch)
    }

    fn name(&self) -> &'static str {
        "Reshape"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ceras_tensor::Tensor;

    #[test]
    fn test_flatten_and_reshape() {
        let x = Expression::constant(Tensor::ones(&[2, 3, 4]));
        let flat = Flatten.forward(&x).unwrap();
        assert_eq!(flat.forward().unwrap().shape(), &[2, 12]);

        let back = Reshape::new(&[4, 3], true).forward(&flat).unwrap();
        assert_eq!(back.forward().unwrap().shape(), &[2, 4, 3]);

        let whole = Reshape::new(&[6, 4], false).forward(&x).unwrap();
        assert_eq!(whole.forward().unwrap().shape(), &[6, 4]);

        assert!(Reshape::new(&[], true).forward(&x).is_err());
    }
}
