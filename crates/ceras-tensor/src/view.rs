//! Views - Non-Owning Row-Major Windows over Flat Buffers
//!
//! `View2d`, `View3d` and `View4d` reinterpret a flat slice (or a lock
//! guard over one) as a 2-, 3- or 4-dimensional array without copying.
//! Convolution, pooling and normalization kernels index their NHWC
//! buffers through these views.
//!
//! A view is generic over anything that dereferences to a slice, so the
//! same type wraps `&[T]`, `&mut [T]` and tensor guards.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use core::ops::{Deref, DerefMut, Index, IndexMut};

use ceras_core::error::{Error, Result};

fn check_len(available: usize, required: usize) -> Result<()> {
    if available < required {
        return Err(Error::IndexOutOfBounds {
            index: required,
            size: available,
        });
    }
    Ok(())
}

// =============================================================================
// View2d
// =============================================================================

/// A `[rows, cols]` window over a flat buffer.
#[derive(Debug)]
pub struct View2d<S> {
    data: S,
    rows: usize,
    cols: usize,
}

impl<T, S: Deref<Target = [T]>> View2d<S> {
    /// Wraps `data`, which must hold at least `rows * cols` elements.
    pub fn new(data: S, rows: usize, cols: usize) -> Result<Self> {
        check_len(data.len(), rows * cols)?;
        Ok(Self { data, rows, cols })
    }

    /// Returns `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Releases the wrapped buffer.
    pub fn into_inner(self) -> S {
        self.data
    }

    /// Returns row `r` as a slice.
    pub fn row(&self, r: usize) -> &[T] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }
}

impl<T, S: DerefMut<Target = [T]>> View2d<S> {
    /// Returns row `r` as a mutable slice.
    pub fn row_mut(&mut self, r: usize) -> &mut [T] {
        let cols = self.cols;
        &mut self.data[r * cols..(r + 1) * cols]
    }
}

impl<T, S: Deref<Target = [T]>> Index<(usize, usize)> for View2d<S> {
    type Output = T;

    fn index(&self, (r, c): (usize, usize)) -> &T {
        &self.data[r * self.cols + c]
    }
}

impl<T, S: DerefMut<Target = [T]>> IndexMut<(usize, usize)> for View2d<S> {
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut T {
        &mut self.data[r * self.cols + c]
    }
}

// =============================================================================
// View3d
// =============================================================================

/// A `[d0, d1, d2]` window over a flat buffer.
#[derive(Debug)]
pub struct View3d<S> {
    data: S,
    dims: [usize; 3],
}

impl<T, S: Deref<Target = [T]>> View3d<S> {
    /// Wraps `data`, which must hold at least `d0 * d1 * d2` elements.
    pub fn new(data: S, d0: usize, d1: usize, d2: usize) -> Result<Self> {
        check_len(data.len(), d0 * d1 * d2)?;
        Ok(Self {
            data,
            dims: [d0, d1, d2],
        })
    }

    /// Returns the three dimensions.
    pub fn shape(&self) -> [usize; 3] {
        self.dims
    }

    /// Releases the wrapped buffer.
    pub fn into_inner(self) -> S {
        self.data
    }

    fn offset(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.dims[1] + j) * self.dims[2] + k
    }

    /// Returns the innermost row at `(i, j)`.
    pub fn row(&self, i: usize, j: usize) -> &[T] {
        let start = self.offset(i, j, 0);
        &self.data[start..start + self.dims[2]]
    }
}

impl<T, S: Deref<Target = [T]>> Index<(usize, usize, usize)> for View3d<S> {
    type Output = T;

    fn index(&self, (i, j, k): (usize, usize, usize)) -> &T {
        &self.data[self.offset(i, j, k)]
    }
}

impl<T, S: DerefMut<Target = [T]>> IndexMut<(usize, usize, usize)> for View3d<S> {
    fn index_mut(&mut self, (i, j, k): (usize, usize, usize)) -> &mut T {
        let at = self.offset(i, j, k);
        &mut self.data[at]
    }
}

// =============================================================================
// View4d
// =============================================================================

/// A `[d0, d1, d2, d3]` window over a flat buffer, typically NHWC images.
#[derive(Debug)]
pub struct View4d<S> {
    data: S,
    dims: [usize; 4],
}

impl<T, S: Deref<Target = [T]>> View4d<S> {
    /// Wraps `data`, which must hold at least `d0 * d1 * d2 * d3` elements.
    pub fn new(data: S, d0: usize, d1: usize, d2: usize, d3: usize) -> Result<Self> {
        check_len(data.len(), d0 * d1 * d2 * d3)?;
        Ok(Self {
            data,
            dims: [d0, d1, d2, d3],
        })
    }

    /// Returns the four dimensions.
    pub fn shape(&self) -> [usize; 4] {
        self.dims
    }

    /// Releases the wrapped buffer.
    pub fn into_inner(self) -> S {
        self.data
    }

    fn offset(&self, n: usize, h: usize, w: usize, c: usize) -> usize {
        ((n * self.dims[1] + h) * self.dims[2] + w) * self.dims[3] + c
    }
}

impl<T, S: Deref<Target = [T]>> Index<(usize, usize, usize, usize)> for View4d<S> {
    type Output = T;

    fn index(&self, (n, h, w, c): (usize, usize, usize, usize)) -> &T {
        &self.data[self.offset(n, h, w, c)]
    }
}

impl<T, S: DerefMut<Target = [T]>> IndexMut<(usize, usize, usize, usize)> for View4d<S> {
    fn index_mut(&mut self, (n, h, w, c): (usize, usize, usize, usize)) -> &mut T {
        let at = self.offset(n, h, w, c);
        &mut self.data[at]
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    #[test]
    fn test_view2d_indexing() {
        let data = [1, 2, 3, 4, 5, 6];
        let v = View2d::new(&data[..], 2, 3).unwrap();
        assert_eq!(v[(1, 0)], 4);
        assert_eq!(v.row(0), &[1, 2, 3]);
        assert_eq!(v.shape(), (2, 3));
        assert!(View2d::new(&data[..], 3, 3).is_err());
    }

    #[test]
    fn test_view2d_mut() {
        let mut data = vec![0.0_f32; 4];
        let mut v = View2d::new(&mut data[..], 2, 2).unwrap();
        v[(1, 1)] = 3.0;
        v.row_mut(0)[1] = 1.0;
        assert_eq!(data, vec![0.0, 1.0, 0.0, 3.0]);
    }

    #[test]
    fn test_view3d_and_4d() {
        let data: Vec<u8> = (0..24).collect();
        let v3 = View3d::new(&data[..], 2, 3, 4).unwrap();
        assert_eq!(v3[(1, 2, 3)], 23);
        assert_eq!(v3.row(1, 0), &[12, 13, 14, 15]);
        let v4 = View4d::new(&data[..], 2, 2, 3, 2).unwrap();
        assert_eq!(v4[(1, 0, 1, 1)], 15);
    }

    #[test]
    fn test_view_over_tensor_guard() {
        let t = Tensor::from_vec(vec![1.0_f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        {
            let mut v = View2d::new(t.as_slice_mut(), 2, 2).unwrap();
            v[(0, 1)] = 9.0;
        }
        assert_eq!(t.to_vec(), vec![1.0, 9.0, 3.0, 4.0]);
    }
}
