//! Shape Utilities - Dimensions, Strides and Broadcasting
//!
//! Ceras tensors are always laid out contiguously in row-major order, so a
//! shape fully determines the strides. This module holds the shape
//! arithmetic shared by the tensor kernels and by the graph operators that
//! have to undo broadcasting on the way back.
//!
//! # Key Features
//! - Small-vector shapes (no heap allocation up to six dimensions)
//! - `NumPy` broadcasting rules
//! - Reshape with a single inferred (`-1`) dimension
//!
//! @version 0.1.0
//! @author Ceras Development Team

use smallvec::SmallVec;

use ceras_core::error::{Error, Result};

// =============================================================================
// Type Aliases
// =============================================================================

/// Shape type - dimensions of a tensor.
/// Uses `SmallVec` for stack allocation of small shapes (up to 6 dimensions).
pub type Shape = SmallVec<[usize; 6]>;

/// Strides type - step sizes for each dimension, in elements.
pub type Strides = SmallVec<[usize; 6]>;

// =============================================================================
// Shape Utilities
// =============================================================================

/// Computes the total number of elements from a shape.
#[must_use]
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Computes row-major strides for a shape.
#[must_use]
pub fn contiguous_strides(shape: &[usize]) -> Strides {
    let mut strides: Strides = smallvec::smallvec![0; shape.len()];
    let mut stride = 1;
    for (i, &dim) in shape.iter().enumerate().rev() {
        strides[i] = stride;
        stride *= dim;
    }
    strides
}

/// Computes a linear offset from multi-dimensional indices.
#[must_use]
pub fn linear_index(indices: &[usize], strides: &[usize]) -> usize {
    debug_assert_eq!(indices.len(), strides.len());
    indices.iter().zip(strides.iter()).map(|(&i, &s)| i * s).sum()
}

// =============================================================================
// Broadcasting
// =============================================================================

/// Computes the broadcast shape of two shapes.
///
/// Shapes are aligned from the right; dimensions are compatible if equal or
/// one of them is 1; missing dimensions are treated as 1.
pub fn broadcast_shape(shape1: &[usize], shape2: &[usize]) -> Result<Shape> {
    let max_ndim = shape1.len().max(shape2.len());
    let mut result = Shape::with_capacity(max_ndim);

    for i in 0..max_ndim {
        let d1 = if i < shape1.len() {
            shape1[shape1.len() - 1 - i]
        } else {
            1
        };
        let d2 = if i < shape2.len() {
            shape2[shape2.len() - 1 - i]
        } else {
            1
        };

        if d1 == d2 || d2 == 1 {
            result.push(d1);
        } else if d1 == 1 {
            result.push(d2);
        } else {
            return Err(Error::BroadcastError {
                shape1: shape1.to_vec(),
                shape2: shape2.to_vec(),
            });
        }
    }

    result.reverse();
    Ok(result)
}

/// Strides that read a contiguous tensor of `shape` as if it had
/// `target_shape`; broadcast dimensions get stride 0.
#[must_use]
pub fn broadcast_strides(shape: &[usize], target_shape: &[usize]) -> Strides {
    let own = contiguous_strides(shape);
    let shape_offset = target_shape.len() - shape.len();

    target_shape
        .iter()
        .enumerate()
        .map(|(i, &target_dim)| {
            if i < shape_offset {
                0
            } else {
                let orig = i - shape_offset;
                if shape[orig] == 1 && target_dim != 1 {
                    0
                } else {
                    own[orig]
                }
            }
        })
        .collect()
}

/// Maps every linear position of `target_shape` to the source offset of a
/// contiguous tensor of `shape` broadcast to it.
#[must_use]
pub fn broadcast_offsets(shape: &[usize], target_shape: &[usize]) -> Vec<usize> {
    let strides = broadcast_strides(shape, target_shape);
    let total = numel(target_shape);
    let mut offsets = Vec::with_capacity(total);
    let mut index = vec![0usize; target_shape.len()];
    let mut offset = 0usize;

    for _ in 0..total {
        offsets.push(offset);
        // odometer increment
        for axis in (0..target_shape.len()).rev() {
            index[axis] += 1;
            offset += strides[axis];
            if index[axis] < target_shape[axis] {
                break;
            }
            offset -= strides[axis] * index[axis];
            index[axis] = 0;
        }
    }

    offsets
}

// =============================================================================
// Shape Manipulation
// =============================================================================

/// Resolves a reshape target against the current shape.
///
/// One dimension may be `-1`; its size is inferred from the others.
pub fn reshape(old_shape: &[usize], new_shape: &[isize]) -> Result<Shape> {
    let old_numel = numel(old_shape);
    let mut result = Shape::with_capacity(new_shape.len());
    let mut infer_idx = None;
    let mut known_numel = 1usize;

    for (i, &dim) in new_shape.iter().enumerate() {
        if dim == -1 {
            if infer_idx.is_some() {
                return Err(Error::invalid_operation("Can only have one -1 in reshape"));
            }
            infer_idx = Some(i);
            result.push(0);
        } else if dim < 0 {
            return Err(Error::invalid_operation("Invalid dimension in reshape"));
        } else {
            let d = dim as usize;
            known_numel *= d;
            result.push(d);
        }
    }

    if let Some(idx) = infer_idx {
        if known_numel == 0 || old_numel % known_numel != 0 {
            return Err(Error::invalid_operation(
                "Cannot infer dimension: not evenly divisible",
            ));
        }
        result[idx] = old_numel / known_numel;
    } else if known_numel != old_numel {
        return Err(Error::shape_mismatch(old_shape, &result));
    }

    Ok(result)
}

/// Removes dimensions of size 1.
#[must_use]
pub fn squeeze(shape: &[usize]) -> Shape {
    let squeezed: Shape = shape.iter().copied().filter(|&d| d != 1).collect();
    if squeezed.is_empty() && !shape.is_empty() {
        smallvec::smallvec![1]
    } else {
        squeezed
    }
}

/// Inserts a dimension of size 1 at `axis` (negative counts from the end).
pub fn expand_dims(shape: &[usize], axis: i64) -> Result<Shape> {
    let ndim = shape.len() + 1;
    let axis = normalize_dim(axis, ndim)?;
    let mut result = Shape::from_slice(shape);
    result.insert(axis, 1);
    Ok(result)
}

/// Normalizes a dimension index, handling negative values.
pub fn normalize_dim(dim: i64, ndim: usize) -> Result<usize> {
    let ndim_i64 = ndim as i64;
    let normalized = if dim < 0 { dim + ndim_i64 } else { dim };

    if normalized < 0 || normalized >= ndim_i64 {
        return Err(Error::InvalidDimension { index: dim, ndim });
    }

    Ok(normalized as usize)
}

/// Validates that indices are within bounds for a shape.
pub fn validate_indices(indices: &[usize], shape: &[usize]) -> Result<()> {
    if indices.len() != shape.len() {
        return Err(Error::invalid_operation(format!(
            "Expected {} indices, got {}",
            shape.len(),
            indices.len()
        )));
    }

    for (&idx, &dim) in indices.iter().zip(shape.iter()) {
        if idx >= dim {
            return Err(Error::IndexOutOfBounds {
                index: idx,
                size: dim,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numel() {
        assert_eq!(numel(&[2, 3, 4]), 24);
        assert_eq!(numel(&[]), 1);
        assert_eq!(numel(&[5]), 5);
    }

    #[test]
    fn test_contiguous_strides() {
        let strides = contiguous_strides(&[2, 3, 4]);
        assert_eq!(strides.as_slice(), &[12, 4, 1]);
    }

    #[test]
    fn test_linear_index() {
        assert_eq!(linear_index(&[1, 2], &[3, 1]), 5);
    }

    #[test]
    fn test_broadcast_shape() {
        assert_eq!(broadcast_shape(&[2, 3], &[2, 3]).unwrap().as_slice(), &[2, 3]);
        assert_eq!(broadcast_shape(&[2, 3], &[3]).unwrap().as_slice(), &[2, 3]);
        assert_eq!(broadcast_shape(&[2, 1], &[1, 3]).unwrap().as_slice(), &[2, 3]);
        assert_eq!(
            broadcast_shape(&[5, 1, 3], &[2, 3]).unwrap().as_slice(),
            &[5, 2, 3]
        );
        assert!(broadcast_shape(&[2, 3], &[2, 4]).is_err());
    }

    #[test]
    fn test_broadcast_offsets() {
        // [1, 3] read as [2, 3]
        assert_eq!(broadcast_offsets(&[1, 3], &[2, 3]), vec![0, 1, 2, 0, 1, 2]);
        // [2, 1] read as [2, 3]
        assert_eq!(broadcast_offsets(&[2, 1], &[2, 3]), vec![0, 0, 0, 1, 1, 1]);
        // scalar-like [1] read as [2, 2]
        assert_eq!(broadcast_offsets(&[1], &[2, 2]), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_reshape() {
        let old_shape = [2, 3, 4];
        assert_eq!(reshape(&old_shape, &[6, 4]).unwrap().as_slice(), &[6, 4]);
        assert_eq!(reshape(&old_shape, &[2, -1]).unwrap().as_slice(), &[2, 12]);
        assert!(reshape(&old_shape, &[5, 5]).is_err());
        assert!(reshape(&old_shape, &[-1, -1]).is_err());
    }

    #[test]
    fn test_squeeze_and_expand() {
        assert_eq!(squeeze(&[1, 3, 1, 2]).as_slice(), &[3, 2]);
        assert_eq!(squeeze(&[1, 1]).as_slice(), &[1]);
        assert_eq!(expand_dims(&[3, 2], 0).unwrap().as_slice(), &[1, 3, 2]);
        assert_eq!(expand_dims(&[3, 2], -1).unwrap().as_slice(), &[3, 2, 1]);
    }

    #[test]
    fn test_normalize_dim() {
        assert_eq!(normalize_dim(-1, 3).unwrap(), 2);
        assert!(normalize_dim(3, 3).is_err());
    }
}
