//! Storage - Shared Memory Buffer for Tensors
//!
//! A `Storage` is a reference-counted, lock-protected flat buffer. Cloning
//! a storage is shallow: every clone reads and writes the same elements,
//! which is how tensor views and graph nodes share data without copying.
//!
//! # Example
//! ```rust
//! use ceras_core::Storage;
//!
//! let storage = Storage::<f32>::zeros(4);
//! let alias = storage.clone();
//! alias.write()[0] = 1.0;
//! assert_eq!(storage.read()[0], 1.0);
//! ```
//!
//! @version 0.1.0
//! @author Ceras Development Team

use std::sync::Arc;

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use crate::dtype::Scalar;
use crate::error::{Error, Result};

// =============================================================================
// Storage Struct
// =============================================================================

/// Shared flat buffer of tensor elements.
#[derive(Debug)]
pub struct Storage<T: Scalar> {
    inner: Arc<RwLock<Vec<T>>>,
}

impl<T: Scalar> Storage<T> {
    /// Creates new storage of `len` zeroed elements.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![T::zeroed(); len])
    }

    /// Creates storage that takes ownership of `data`.
    #[must_use]
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
        }
    }

    /// Creates storage holding a copy of `data`.
    #[must_use]
    pub fn from_slice(data: &[T]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Number of elements in the whole buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true if the buffer holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Returns true if no other handle shares this buffer.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Returns true if both handles refer to the same buffer.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read access to the whole buffer.
    #[must_use]
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.inner.read()
    }

    /// Write access to the whole buffer.
    #[must_use]
    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.inner.write()
    }

    /// Read access to `len` elements starting at `offset`.
    pub fn read_range(&self, offset: usize, len: usize) -> Result<MappedRwLockReadGuard<'_, [T]>> {
        let guard = self.inner.read();
        if offset + len > guard.len() {
            return Err(Error::IndexOutOfBounds {
                index: offset + len,
                size: guard.len(),
            });
        }
        Ok(RwLockReadGuard::map(guard, |data| &data[offset..offset + len]))
    }

    /// Write access to `len` elements starting at `offset`.
    pub fn write_range(
        &self,
        offset: usize,
        len: usize,
    ) -> Result<MappedRwLockWriteGuard<'_, [T]>> {
        let guard = self.inner.write();
        if offset + len > guard.len() {
            return Err(Error::IndexOutOfBounds {
                index: offset + len,
                size: guard.len(),
            });
        }
        Ok(RwLockWriteGuard::map(guard, |data| {
            &mut data[offset..offset + len]
        }))
    }

    /// Replaces the whole buffer.
    pub fn replace(&self, data: Vec<T>) {
        *self.inner.write() = data;
    }

    /// Creates an independent copy of the buffer.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        Self::from_vec(self.inner.read().clone())
    }
}

impl<T: Scalar> Clone for Storage<T> {
    /// Shallow clone; the buffer is shared.
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let storage = Storage::<f32>::zeros(8);
        assert_eq!(storage.len(), 8);
        assert!(storage.read().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_clone_is_shallow() {
        let a = Storage::from_vec(vec![1.0_f32, 2.0, 3.0]);
        let b = a.clone();
        b.write()[1] = 9.0;
        assert_eq!(a.read()[1], 9.0);
        assert!(a.ptr_eq(&b));
        assert!(!a.is_unique());
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let a = Storage::from_vec(vec![1.0_f32, 2.0]);
        let b = a.deep_copy();
        b.write()[0] = 5.0;
        assert_eq!(a.read()[0], 1.0);
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_ranges() {
        let a = Storage::from_vec(vec![1_u8, 2, 3, 4, 5]);
        assert_eq!(&*a.read_range(1, 3).unwrap(), &[2, 3, 4]);
        a.write_range(3, 2).unwrap()[0] = 7;
        assert_eq!(a.read()[3], 7);
        assert!(a.read_range(4, 2).is_err());
    }
}
