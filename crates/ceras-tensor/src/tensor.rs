//! Tensor - Core N-Dimensional Array Type
//!
//! A `Tensor` is a shape and a memory offset over a shared, contiguous
//! row-major buffer. Cloning a tensor is shallow: the clone is a second
//! handle on the same elements, so writes through one are visible through
//! the other. `deep_copy` produces an independent tensor.
//!
//! Views produced by `reshape`, `slice`, `shrink_to` and `creep_to` share
//! the buffer as well and never copy.
//!
//! # Key Features
//! - Generic over element type (f32, f64, u8)
//! - Shallow clones and zero-copy views through offsets
//! - Broadcasting arithmetic following `NumPy` rules
//! - In-place mutation through interior locking
//!
//! @version 0.1.0
//! @author Ceras Development Team

use core::fmt;
use core::ops::Neg;

use ceras_core::dtype::{Float, Numeric, Scalar};
use ceras_core::error::{Error, Result};
use ceras_core::storage::Storage;
use num_traits::NumCast;
use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLockReadGuard, RwLockWriteGuard};

use crate::shape::{
    broadcast_offsets, broadcast_shape, contiguous_strides, expand_dims, linear_index,
    normalize_dim, numel, reshape, squeeze, validate_indices, Shape,
};

// =============================================================================
// Tensor Struct
// =============================================================================

/// An N-dimensional array of numeric values.
#[derive(Clone)]
pub struct Tensor<T: Scalar> {
    /// Underlying data buffer (reference-counted).
    pub(crate) storage: Storage<T>,
    /// Shape of the tensor (dimensions).
    pub(crate) shape: Shape,
    /// Offset into the buffer where this tensor's elements start.
    pub(crate) offset: usize,
}

impl<T: Scalar> Tensor<T> {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Builds a tensor from a buffer whose length is known to match `shape`.
    pub(crate) fn from_vec_unchecked(data: Vec<T>, shape: &[usize]) -> Self {
        debug_assert_eq!(data.len(), numel(shape));
        Self {
            storage: Storage::from_vec(data),
            shape: Shape::from_slice(shape),
            offset: 0,
        }
    }

    /// Creates a tensor viewing `shape` elements of `storage` from `offset`.
    pub fn from_storage(storage: Storage<T>, shape: &[usize], offset: usize) -> Result<Self> {
        let total = numel(shape);
        if offset + total > storage.len() {
            return Err(Error::IndexOutOfBounds {
                index: offset + total,
                size: storage.len(),
            });
        }

        Ok(Self {
            storage,
            shape: Shape::from_slice(shape),
            offset,
        })
    }

    /// Creates a new tensor from a vector with the given shape.
    ///
    /// # Returns
    /// New tensor, or error if shape doesn't match data length.
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let total = numel(shape);
        if total != data.len() {
            return Err(Error::shape_mismatch(&[data.len()], shape));
        }
        Ok(Self::from_vec_unchecked(data, shape))
    }

    /// Creates a new tensor from a slice with the given shape.
    pub fn from_slice(data: &[T], shape: &[usize]) -> Result<Self> {
        Self::from_vec(data.to_vec(), shape)
    }

    /// Creates a one-element tensor of shape `[1]`.
    pub fn scalar(value: T) -> Self {
        Self::from_vec_unchecked(vec![value], &[1])
    }

    /// Creates a tensor filled with zeros.
    #[must_use]
    pub fn zeros(shape: &[usize]) -> Self {
        Self::from_vec_unchecked(vec![T::zeroed(); numel(shape)], shape)
    }

    /// Creates a tensor filled with `value`.
    #[must_use]
    pub fn full(shape: &[usize], value: T) -> Self {
        Self::from_vec_unchecked(vec![value; numel(shape)], shape)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the row-major strides of the tensor.
    pub fn strides(&self) -> Shape {
        contiguous_strides(&self.shape)
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Returns the total number of elements.
    pub fn size(&self) -> usize {
        numel(&self.shape)
    }

    /// Returns true if the tensor has no elements.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Offset of the first element inside the shared buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The shared buffer behind this tensor.
    pub fn storage(&self) -> &Storage<T> {
        &self.storage
    }

    /// Returns true if both tensors read the same buffer.
    pub fn shares_storage(&self, other: &Self) -> bool {
        self.storage.ptr_eq(&other.storage)
    }

    // =========================================================================
    // Data Access
    // =========================================================================

    /// Read access to this tensor's elements.
    pub fn as_slice(&self) -> MappedRwLockReadGuard<'_, [T]> {
        let (start, end) = (self.offset, self.offset + self.size());
        RwLockReadGuard::map(self.storage.read(), move |data| &data[start..end])
    }

    /// Write access to this tensor's elements.
    ///
    /// Every handle sharing the buffer observes the writes.
    pub fn as_slice_mut(&self) -> MappedRwLockWriteGuard<'_, [T]> {
        let (start, end) = (self.offset, self.offset + self.size());
        RwLockWriteGuard::map(self.storage.write(), move |data| &mut data[start..end])
    }

    /// Copies the elements into a new vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    /// Gets the element at the given indices.
    pub fn get(&self, indices: &[usize]) -> Result<T> {
        validate_indices(indices, &self.shape)?;
        let index = linear_index(indices, &self.strides());
        Ok(self.as_slice()[index])
    }

    /// Sets the element at the given indices.
    pub fn set(&self, indices: &[usize], value: T) -> Result<()> {
        validate_indices(indices, &self.shape)?;
        let index = linear_index(indices, &self.strides());
        self.as_slice_mut()[index] = value;
        Ok(())
    }

    /// Returns the only element of a one-element tensor.
    pub fn as_scalar(&self) -> Result<T> {
        if self.size() != 1 {
            return Err(Error::invalid_operation(format!(
                "as_scalar requires exactly one element, tensor has {}",
                self.size()
            )));
        }
        Ok(self.as_slice()[0])
    }

    // =========================================================================
    // Copies and Resets
    // =========================================================================

    /// Creates a tensor with its own copy of the elements.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        Self::from_vec_unchecked(self.to_vec(), &self.shape)
    }

    /// Sets every element to `value`.
    pub fn reset(&self, value: T) {
        self.as_slice_mut().fill(value);
    }

    /// Copies the elements of `other` into this tensor.
    ///
    /// Both tensors must hold the same number of elements.
    pub fn copy_from(&self, other: &Self) -> Result<()> {
        if self.size() != other.size() {
            return Err(Error::shape_mismatch(&self.shape, &other.shape));
        }
        let source = other.to_vec();
        self.as_slice_mut().copy_from_slice(&source);
        Ok(())
    }

    // =========================================================================
    // Shape Views
    // =========================================================================

    /// Returns a view with a new shape; one dimension may be `-1`.
    pub fn reshape(&self, new_shape: &[isize]) -> Result<Self> {
        let shape = reshape(&self.shape, new_shape)?;
        Ok(Self {
            storage: self.storage.clone(),
            shape,
            offset: self.offset,
        })
    }

    /// Returns a view with the given (fully specified) shape.
    pub fn reshape_to(&self, new_shape: &[usize]) -> Result<Self> {
        if numel(new_shape) != self.size() {
            return Err(Error::shape_mismatch(&self.shape, new_shape));
        }
        Ok(Self {
            storage: self.storage.clone(),
            shape: Shape::from_slice(new_shape),
            offset: self.offset,
        })
    }

    /// Changes the shape, reallocating a private buffer.
    ///
    /// Elements shared by the old and the new size keep their values; new
    /// elements are zero.
    pub fn resize(&mut self, new_shape: &[usize]) {
        let mut data = self.to_vec();
        data.resize(numel(new_shape), T::zeroed());
        *self = Self::from_vec_unchecked(data, new_shape);
    }

    /// Returns a view over the first `numel(new_shape)` elements.
    pub fn shrink_to(&self, new_shape: &[usize]) -> Result<Self> {
        if numel(new_shape) > self.size() {
            return Err(Error::invalid_operation(format!(
                "cannot shrink tensor of shape {:?} to larger shape {:?}",
                self.shape.as_slice(),
                new_shape
            )));
        }
        Ok(Self {
            storage: self.storage.clone(),
            shape: Shape::from_slice(new_shape),
            offset: self.offset,
        })
    }

    /// Returns a view of the same shape starting at `new_offset` in the buffer.
    pub fn creep_to(&self, new_offset: usize) -> Result<Self> {
        Self::from_storage(self.storage.clone(), &self.shape, new_offset)
    }

    /// Returns a view over rows `[m, n)` of the first dimension.
    pub fn slice(&self, m: usize, n: usize) -> Result<Self> {
        let rows = *self.shape.first().ok_or(Error::EmptyTensor)?;
        if m > n {
            return Err(Error::invalid_operation(format!(
                "slice start {m} is past its end {n}"
            )));
        }
        if n > rows {
            return Err(Error::IndexOutOfBounds { index: n, size: rows });
        }
        let row_size: usize = self.shape[1..].iter().product();
        let mut shape = self.shape.clone();
        shape[0] = n - m;
        Ok(Self {
            storage: self.storage.clone(),
            shape,
            offset: self.offset + m * row_size,
        })
    }

    /// Removes every dimension of size 1.
    pub fn squeeze(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            shape: squeeze(&self.shape),
            offset: self.offset,
        }
    }

    /// Inserts a dimension of size 1 at `axis`.
    pub fn expand_dims(&self, axis: i64) -> Result<Self> {
        Ok(Self {
            storage: self.storage.clone(),
            shape: expand_dims(&self.shape, axis)?,
            offset: self.offset,
        })
    }

    // =========================================================================
    // Element-wise Mapping
    // =========================================================================

    /// Applies `f` to every element in place.
    pub fn map_(&self, mut f: impl FnMut(T) -> T) {
        for x in self.as_slice_mut().iter_mut() {
            *x = f(*x);
        }
    }

    /// Returns a new tensor with `f` applied to every element.
    pub fn map<U: Scalar>(&self, f: impl FnMut(T) -> U) -> Tensor<U> {
        let data: Vec<U> = self.as_slice().iter().copied().map(f).collect();
        Tensor::from_vec_unchecked(data, &self.shape)
    }

    /// Combines two tensors of identical shape element by element.
    pub fn zip_map<U: Scalar, V: Scalar>(
        &self,
        other: &Tensor<U>,
        mut f: impl FnMut(T, U) -> V,
    ) -> Result<Tensor<V>> {
        if self.shape != other.shape {
            return Err(Error::shape_mismatch(&self.shape, &other.shape));
        }
        let rhs = other.to_vec();
        let data: Vec<V> = self
            .as_slice()
            .iter()
            .zip(rhs.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Tensor::from_vec_unchecked(data, &self.shape))
    }
}

// =============================================================================
// Numeric Operations
// =============================================================================

impl<T: Numeric> Tensor<T> {
    /// Creates a tensor filled with ones.
    #[must_use]
    pub fn ones(shape: &[usize]) -> Self {
        Self::full(shape, T::one())
    }

    /// Converts every element to another numeric type.
    pub fn as_type<U: Numeric>(&self) -> Result<Tensor<U>> {
        let data = self
            .as_slice()
            .iter()
            .map(|&x| {
                <U as NumCast>::from(x).ok_or_else(|| {
                    Error::invalid_operation(format!("cannot convert {x} to {}", U::DTYPE))
                })
            })
            .collect::<Result<Vec<U>>>()?;
        Ok(Tensor::from_vec_unchecked(data, &self.shape))
    }

    fn broadcast_binary(&self, other: &Self, f: impl Fn(T, T) -> T) -> Result<Self> {
        let result_shape = broadcast_shape(&self.shape, &other.shape)?;
        let lhs_offsets = broadcast_offsets(&self.shape, &result_shape);
        let rhs_offsets = broadcast_offsets(&other.shape, &result_shape);

        let lhs = self.to_vec();
        let rhs = other.to_vec();
        let data: Vec<T> = lhs_offsets
            .iter()
            .zip(rhs_offsets.iter())
            .map(|(&l, &r)| f(lhs[l], rhs[r]))
            .collect();

        Ok(Self::from_vec_unchecked(data, &result_shape))
    }

    /// Element-wise addition with broadcasting.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.broadcast_binary(other, |a, b| a + b)
    }

    /// Element-wise subtraction with broadcasting.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.broadcast_binary(other, |a, b| a - b)
    }

    /// Element-wise multiplication with broadcasting.
    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.broadcast_binary(other, |a, b| a * b)
    }

    /// Element-wise division with broadcasting.
    pub fn div(&self, other: &Self) -> Result<Self> {
        self.broadcast_binary(other, |a, b| a / b)
    }

    /// Scalar addition.
    #[must_use]
    pub fn add_scalar(&self, scalar: T) -> Self {
        self.map(|x| x + scalar)
    }

    /// Scalar multiplication.
    #[must_use]
    pub fn mul_scalar(&self, scalar: T) -> Self {
        self.map(|x| x * scalar)
    }

    /// Scalar division.
    #[must_use]
    pub fn div_scalar(&self, scalar: T) -> Self {
        self.map(|x| x / scalar)
    }

    fn zip_assign(&self, other: &Self, f: impl Fn(T, T) -> T) -> Result<()> {
        if self.shape != other.shape {
            return Err(Error::shape_mismatch(&self.shape, &other.shape));
        }
        // copy first so `x.add_(&x)` never holds two locks on one buffer
        let rhs = other.to_vec();
        for (x, &y) in self.as_slice_mut().iter_mut().zip(rhs.iter()) {
            *x = f(*x, y);
        }
        Ok(())
    }

    /// In-place addition of a tensor of the same shape.
    pub fn add_(&self, other: &Self) -> Result<()> {
        self.zip_assign(other, |a, b| a + b)
    }

    /// In-place subtraction of a tensor of the same shape.
    pub fn sub_(&self, other: &Self) -> Result<()> {
        self.zip_assign(other, |a, b| a - b)
    }

    /// In-place multiplication by a tensor of the same shape.
    pub fn mul_(&self, other: &Self) -> Result<()> {
        self.zip_assign(other, |a, b| a * b)
    }

    /// In-place division by a tensor of the same shape.
    pub fn div_(&self, other: &Self) -> Result<()> {
        self.zip_assign(other, |a, b| a / b)
    }

    /// In-place scalar addition.
    pub fn add_scalar_(&self, scalar: T) {
        self.map_(|x| x + scalar);
    }

    /// In-place scalar subtraction.
    pub fn sub_scalar_(&self, scalar: T) {
        self.map_(|x| x - scalar);
    }

    /// In-place scalar multiplication.
    pub fn mul_scalar_(&self, scalar: T) {
        self.map_(|x| x * scalar);
    }

    /// In-place scalar division.
    pub fn div_scalar_(&self, scalar: T) {
        self.map_(|x| x / scalar);
    }

    // =========================================================================
    // Reductions
    // =========================================================================

    /// Sum of all elements.
    pub fn sum_all(&self) -> T {
        self.as_slice().iter().fold(T::zero(), |acc, &x| acc + x)
    }

    /// Splits the shape around `axis` into (outer, axis length, inner).
    fn axis_layout(&self, axis: i64) -> Result<(usize, usize, usize, usize)> {
        let axis = normalize_dim(axis, self.ndim())?;
        let outer: usize = self.shape[..axis].iter().product();
        let inner: usize = self.shape[axis + 1..].iter().product();
        Ok((axis, outer, self.shape[axis], inner))
    }

    fn reduced_shape(&self, axis: usize, keepdims: bool) -> Shape {
        let mut shape = self.shape.clone();
        if keepdims {
            shape[axis] = 1;
        } else {
            shape.remove(axis);
            if shape.is_empty() {
                shape.push(1);
            }
        }
        shape
    }

    fn fold_along(&self, axis: i64, keepdims: bool, init: T, f: impl Fn(T, T) -> T) -> Result<Self> {
        let (axis, outer, len, inner) = self.axis_layout(axis)?;
        let data = self.as_slice();
        let mut result = vec![init; outer * inner];
        for o in 0..outer {
            for d in 0..len {
                let base = (o * len + d) * inner;
                for i in 0..inner {
                    let slot = &mut result[o * inner + i];
                    *slot = f(*slot, data[base + i]);
                }
            }
        }
        drop(data);
        Ok(Self::from_vec_unchecked(result, &self.reduced_shape(axis, keepdims)))
    }

    /// Sums along `axis`; with `keepdims` the axis is kept with size 1.
    pub fn sum_along(&self, axis: i64, keepdims: bool) -> Result<Self> {
        self.fold_along(axis, keepdims, T::zero(), |a, b| a + b)
    }

    /// Maximum along `axis`.
    pub fn max_along(&self, axis: i64, keepdims: bool) -> Result<Self> {
        self.fold_along(axis, keepdims, T::LOWEST, |a, b| if b > a { b } else { a })
    }

    /// Minimum along `axis`.
    pub fn min_along(&self, axis: i64, keepdims: bool) -> Result<Self> {
        self.fold_along(axis, keepdims, T::HIGHEST, |a, b| if b < a { b } else { a })
    }

    /// Largest element.
    pub fn reduce_max(&self) -> Result<T> {
        let data = self.as_slice();
        let first = *data.first().ok_or(Error::EmptyTensor)?;
        Ok(data.iter().fold(first, |a, &b| if b > a { b } else { a }))
    }

    /// Smallest element.
    pub fn reduce_min(&self) -> Result<T> {
        let data = self.as_slice();
        let first = *data.first().ok_or(Error::EmptyTensor)?;
        Ok(data.iter().fold(first, |a, &b| if b < a { b } else { a }))
    }

    /// Index of the largest element along `axis`, for every other position.
    ///
    /// The result has the shape of the tensor with `axis` removed, flattened.
    pub fn argmax_along(&self, axis: i64) -> Result<Vec<usize>> {
        let (_, outer, len, inner) = self.axis_layout(axis)?;
        if len == 0 {
            return Err(Error::EmptyTensor);
        }
        let data = self.as_slice();
        let mut result = Vec::with_capacity(outer * inner);
        for o in 0..outer {
            for i in 0..inner {
                let mut best = 0;
                for d in 1..len {
                    if data[(o * len + d) * inner + i] > data[(o * len + best) * inner + i] {
                        best = d;
                    }
                }
                result.push(best);
            }
        }
        Ok(result)
    }

    // =========================================================================
    // Linear Algebra
    // =========================================================================

    /// Matrix product of `[m, k]` and `[k, n]` tensors.
    pub fn gemm(&self, other: &Self) -> Result<Self> {
        if self.ndim() != 2 || other.ndim() != 2 {
            return Err(Error::invalid_operation(format!(
                "gemm requires 2-D tensors, got {:?} and {:?}",
                self.shape.as_slice(),
                other.shape.as_slice()
            )));
        }
        let (m, k) = (self.shape[0], self.shape[1]);
        let (k2, n) = (other.shape[0], other.shape[1]);
        if k != k2 {
            return Err(Error::shape_mismatch(&self.shape, &other.shape));
        }

        let a = self.to_vec();
        let b = other.to_vec();
        let mut c = vec![T::zero(); m * n];
        for i in 0..m {
            let row = &mut c[i * n..(i + 1) * n];
            for p in 0..k {
                let a_ip = a[i * k + p];
                if a_ip == T::zero() {
                    continue;
                }
                let b_row = &b[p * n..(p + 1) * n];
                for (c_ij, &b_pj) in row.iter_mut().zip(b_row.iter()) {
                    *c_ij = *c_ij + a_ip * b_pj;
                }
            }
        }

        Ok(Self::from_vec_unchecked(c, &[m, n]))
    }

    /// Transposes a 2-D tensor.
    pub fn transpose(&self) -> Result<Self> {
        if self.ndim() != 2 {
            return Err(Error::invalid_operation(format!(
                "transpose requires a 2-D tensor, got {:?}",
                self.shape.as_slice()
            )));
        }
        let (rows, cols) = (self.shape[0], self.shape[1]);
        let data = self.as_slice();
        let mut result = vec![T::zero(); rows * cols];
        for r in 0..rows {
            for c in 0..cols {
                result[c * rows + r] = data[r * cols + c];
            }
        }
        drop(data);
        Ok(Self::from_vec_unchecked(result, &[cols, rows]))
    }

    // =========================================================================
    // Structural Operations
    // =========================================================================

    /// Clamps every element into `[lower, upper]`.
    #[must_use]
    pub fn clip(&self, lower: T, upper: T) -> Self {
        self.map(|x| {
            if x < lower {
                lower
            } else if x > upper {
                upper
            } else {
                x
            }
        })
    }

    /// Joins two tensors along `axis`; every other dimension must agree.
    pub fn concatenate(&self, other: &Self, axis: i64) -> Result<Self> {
        if self.ndim() != other.ndim() {
            return Err(Error::shape_mismatch(&self.shape, &other.shape));
        }
        let axis = normalize_dim(axis, self.ndim())?;
        for (d, (&a, &b)) in self.shape.iter().zip(other.shape.iter()).enumerate() {
            if d != axis && a != b {
                return Err(Error::shape_mismatch(&self.shape, &other.shape));
            }
        }

        let outer: usize = self.shape[..axis].iter().product();
        let inner: usize = self.shape[axis + 1..].iter().product();
        let lhs_chunk = self.shape[axis] * inner;
        let rhs_chunk = other.shape[axis] * inner;

        let lhs = self.to_vec();
        let rhs = other.to_vec();
        let mut data = Vec::with_capacity(lhs.len() + rhs.len());
        for o in 0..outer {
            data.extend_from_slice(&lhs[o * lhs_chunk..(o + 1) * lhs_chunk]);
            data.extend_from_slice(&rhs[o * rhs_chunk..(o + 1) * rhs_chunk]);
        }

        let mut shape = self.shape.clone();
        shape[axis] += other.shape[axis];
        Ok(Self::from_vec_unchecked(data, &shape))
    }

    /// Splits along `axis` into a part of length `first` and the remainder.
    pub fn split_at(&self, axis: i64, first: usize) -> Result<(Self, Self)> {
        let (axis, outer, len, inner) = self.axis_layout(axis)?;
        if first > len {
            return Err(Error::IndexOutOfBounds { index: first, size: len });
        }
        let data = self.as_slice();
        let mut lhs = Vec::with_capacity(outer * first * inner);
        let mut rhs = Vec::with_capacity(outer * (len - first) * inner);
        for o in 0..outer {
            let base = o * len * inner;
            lhs.extend_from_slice(&data[base..base + first * inner]);
            rhs.extend_from_slice(&data[base + first * inner..base + len * inner]);
        }
        drop(data);

        let mut lhs_shape = self.shape.clone();
        lhs_shape[axis] = first;
        let mut rhs_shape = self.shape.clone();
        rhs_shape[axis] = len - first;
        Ok((
            Self::from_vec_unchecked(lhs, &lhs_shape),
            Self::from_vec_unchecked(rhs, &rhs_shape),
        ))
    }

    /// Stacks `n` copies of the tensor along a new leading dimension.
    #[must_use]
    pub fn repeat(&self, n: usize) -> Self {
        let data = self.to_vec();
        let mut repeated = Vec::with_capacity(data.len() * n);
        for _ in 0..n {
            repeated.extend_from_slice(&data);
        }
        let mut shape = Shape::with_capacity(self.ndim() + 1);
        shape.push(n);
        shape.extend_from_slice(&self.shape);
        Self::from_vec_unchecked(repeated, &shape)
    }
}

// =============================================================================
// Floating Point Operations
// =============================================================================

impl<T: Float> Tensor<T> {
    /// Element-wise negation.
    #[must_use]
    pub fn neg(&self) -> Self {
        self.map(|x| -x)
    }

    /// Element-wise exponential.
    #[must_use]
    pub fn exp(&self) -> Self {
        self.map(num_traits::Float::exp)
    }

    /// Element-wise natural logarithm.
    #[must_use]
    pub fn ln(&self) -> Self {
        self.map(num_traits::Float::ln)
    }

    /// Element-wise square root.
    #[must_use]
    pub fn sqrt(&self) -> Self {
        self.map(num_traits::Float::sqrt)
    }

    /// Element-wise absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        self.map(num_traits::Float::abs)
    }

    /// Element-wise square.
    #[must_use]
    pub fn square(&self) -> Self {
        self.map(|x| x * x)
    }

    /// Mean of all elements.
    pub fn mean_all(&self) -> Result<T> {
        if self.is_empty() {
            return Err(Error::EmptyTensor);
        }
        Ok(self.sum_all() / T::from_f64(self.size() as f64))
    }

    /// Mean along `axis`.
    pub fn mean_along(&self, axis: i64, keepdims: bool) -> Result<Self> {
        let axis_len = self.shape[normalize_dim(axis, self.ndim())?];
        if axis_len == 0 {
            return Err(Error::EmptyTensor);
        }
        let sum = self.sum_along(axis, keepdims)?;
        sum.div_scalar_(T::from_f64(axis_len as f64));
        Ok(sum)
    }

    /// Softmax over the last dimension, shifted by the row maximum.
    pub fn softmax(&self) -> Result<Self> {
        let cols = *self.shape.last().ok_or(Error::EmptyTensor)?;
        if cols == 0 {
            return Err(Error::EmptyTensor);
        }
        let mut data = self.to_vec();
        for row in data.chunks_mut(cols) {
            let max = row.iter().fold(T::neg_infinity(), |a, &b| a.max(b));
            let mut total = T::zero();
            for x in row.iter_mut() {
                *x = (*x - max).exp();
                total = total + *x;
            }
            for x in row.iter_mut() {
                *x = *x / total;
            }
        }
        Ok(Self::from_vec_unchecked(data, &self.shape))
    }

    /// Returns true if any element is NaN.
    pub fn has_nan(&self) -> bool {
        self.as_slice().iter().any(|x| x.is_nan())
    }
}

impl<T: Float> Neg for &Tensor<T> {
    type Output = Tensor<T>;

    fn neg(self) -> Self::Output {
        Tensor::neg(self)
    }
}

// =============================================================================
// Formatting
// =============================================================================

impl<T: Scalar> fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape.as_slice())
            .field("offset", &self.offset)
            .field("data", &&*self.as_slice())
            .finish()
    }
}

impl<T: Scalar> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor(shape={:?}, data=[", self.shape.as_slice())?;
        for (i, x) in self.as_slice().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{x}")?;
        }
        write!(f, "])")
    }
}

// =============================================================================
// Tests
// =============================================================================
