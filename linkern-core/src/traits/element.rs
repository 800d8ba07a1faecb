//! Element type constraints for matrix and vector storage
//!
//! This module defines the trait that constrains what types can be
//! stored as matrix or vector elements.

use core::fmt::Debug;
use core::ops::{Add, Div, Mul, Neg, Rem, Sub};

use crate::format::DataType;

/// Trait for types that can be stored as matrix and vector elements
///
/// All element types must be:
/// - Copy: values move through kernels without allocation
/// - PartialOrd: norms and absolute-maximum searches compare magnitudes
/// - Send + Sync: parallel kernels share slices across worker threads
/// - closed under the field operations plus remainder and negation
pub trait Scalar:
    Copy
    + PartialEq
    + PartialOrd
    + Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Rem<Output = Self>
    + Neg<Output = Self>
{
    /// Get the DataType tag for this element type
    fn data_type() -> DataType;

    /// Additive identity
    fn zero() -> Self;

    /// Multiplicative identity
    fn one() -> Self;

    /// Absolute value
    fn abs(self) -> Self;

    /// Convert from f64 for generic construction
    fn from_f64(value: f64) -> Self;

    /// Convert to f64 for generic operations
    ///
    /// Square roots and powers in norms go through f64 so the trait
    /// stays usable without `std`.
    fn to_f64(self) -> f64;

    /// Whether this value is exactly zero
    fn is_zero(self) -> bool {
        self == Self::zero()
    }
}

impl Scalar for f32 {
    fn data_type() -> DataType {
        DataType::F32
    }

    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn abs(self) -> Self {
        if self < 0.0 {
            -self
        } else {
            self
        }
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Scalar for f64 {
    fn data_type() -> DataType {
        DataType::F64
    }

    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn abs(self) -> Self {
        if self < 0.0 {
            -self
        } else {
            self
        }
    }

    fn from_f64(value: f64) -> Self {
        value
    }

    fn to_f64(self) -> f64 {
        self
    }
}
