//! Data Types - Ceras Scalar Type System
//!
//! Defines the element types a Ceras tensor can hold and the traits the
//! numeric kernels are written against. Graph computation is carried out in
//! `f32`; `f64` tensors are supported by the tensor layer and `u8` tensors
//! carry raw dataset bytes.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use bytemuck::{Pod, Zeroable};
use num_traits::{Float as NumFloat, Num, NumCast, One, Zero};

use core::fmt::{Debug, Display};

// =============================================================================
// DType Enum
// =============================================================================

/// Runtime representation of tensor element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    /// 32-bit floating point (single precision).
    #[default]
    F32,
    /// 64-bit floating point (double precision).
    F64,
    /// 8-bit unsigned integer.
    U8,
}

impl DType {
    /// Returns the size in bytes of this data type.
    #[must_use]
    pub const fn size_of(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Returns true if this is a floating point type.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Returns the name of this data type as a string.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::U8 => "u8",
        }
    }
}

impl core::fmt::Display for DType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Scalar Trait
// =============================================================================

/// Trait for all scalar types that can be stored in a tensor.
pub trait Scalar:
    Copy + Clone + Debug + Display + Default + Send + Sync + Pod + Zeroable + 'static
{
    /// The runtime dtype for this scalar type.
    const DTYPE: DType;

    /// Returns the dtype for this type.
    #[must_use]
    fn dtype() -> DType {
        Self::DTYPE
    }
}

// =============================================================================
// Numeric Trait
// =============================================================================

/// Trait for numeric types that support arithmetic operations.
pub trait Numeric: Scalar + Num + NumCast + PartialOrd + Zero + One {
    /// The zero value for this type.
    const ZERO: Self;

    /// The one value for this type.
    const ONE: Self;

    /// Smallest finite value of this type.
    const LOWEST: Self;

    /// Largest finite value of this type.
    const HIGHEST: Self;
}

// =============================================================================
// Float Trait
// =============================================================================

/// Trait for floating point element types.
pub trait Float: Numeric + NumFloat {
    /// Converts an `f64` literal into this type.
    fn from_f64(value: f64) -> Self;

    /// Widens this value to `f64`.
    fn to_f64_lossless(self) -> f64;
}

// =============================================================================
// Implementations
// =============================================================================

macro_rules! impl_scalar {
    ($ty:ty, $dtype:expr) => {
        impl Scalar for $ty {
            const DTYPE: DType = $dtype;
        }
    };
}

impl_scalar!(f32, DType::F32);
impl_scalar!(f64, DType::F64);
impl_scalar!(u8, DType::U8);

macro_rules! impl_numeric {
    ($ty:ty, $zero:expr, $one:expr) => {
        impl Numeric for $ty {
            const ZERO: Self = $zero;
            const ONE: Self = $one;
            const LOWEST: Self = <$ty>::MIN;
            const HIGHEST: Self = <$ty>::MAX;
        }
    };
}

impl_numeric!(f32, 0.0, 1.0);
impl_numeric!(f64, 0.0, 1.0);
impl_numeric!(u8, 0, 1);

impl Float for f32 {
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f64_lossless(self) -> f64 {
        <f64 as From<f32>>::from(self)
    }
}

impl Float for f64 {
    fn from_f64(value: f64) -> Self {
        value
    }

    fn to_f64_lossless(self) -> f64 {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_size() {
        assert_eq!(DType::F32.size_of(), 4);
        assert_eq!(DType::F64.size_of(), 8);
        assert_eq!(DType::U8.size_of(), 1);
    }

    #[test]
    fn test_scalar_dtype() {
        assert_eq!(f32::dtype(), DType::F32);
        assert_eq!(f64::dtype(), DType::F64);
        assert_eq!(u8::dtype(), DType::U8);
        assert!(!DType::U8.is_float());
    }

    #[test]
    fn test_numeric_constants() {
        assert_eq!(<f32 as Numeric>::ZERO, 0.0);
        assert_eq!(<f32 as Numeric>::ONE, 1.0);
        assert_eq!(<u8 as Numeric>::HIGHEST, 255);
    }

    #[test]
    fn test_float_conversion() {
        assert!((<f32 as Float>::from_f64(0.25) - 0.25).abs() < f32::EPSILON);
        assert!((1.5_f32.to_f64_lossless() - 1.5).abs() < f64::EPSILON);
    }
}
