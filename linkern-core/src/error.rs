//! Error types for linkern operations

use crate::format::MatrixKind;

/// Broad grouping of [`LinalgError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Operand shapes are incompatible or non-positive
    Shape,
    /// Element access outside declared bounds
    Index,
    /// Storage format constraints would be violated
    Structure,
    /// Numerically undefined operation
    Numeric,
    /// A required argument is absent or empty
    Argument,
}

/// Errors that can occur during matrix and vector operations
///
/// Every variant describes a caller error. Operations validate all
/// preconditions before touching storage, so an `Err` always leaves the
/// participating matrices and vectors unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinalgError {
    /// Operand shapes are incompatible for the requested operation
    DimensionMismatch {
        operation: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
    /// A matrix or vector was requested with a zero dimension
    InvalidSize { rows: usize, cols: usize },
    /// Element access outside declared bounds
    IndexOutOfBounds { index: usize, bound: usize },
    /// A write or request the storage kind cannot represent
    StructuralViolation {
        kind: MatrixKind,
        reason: &'static str,
    },
    /// Inversion hit a zero pivot at the given diagonal index
    Singular { index: usize },
    /// A required argument was absent or empty
    MissingArgument { name: &'static str },
    /// A scalar argument lies outside its accepted range
    InvalidArgument {
        name: &'static str,
        reason: &'static str,
    },
    /// Raw storage parts do not satisfy the format invariants
    InvalidStructure { reason: &'static str },
    /// The operation is not defined for this storage kind
    Unsupported {
        operation: &'static str,
        kind: MatrixKind,
    },
}

impl LinalgError {
    /// Create a dimension mismatch error
    pub const fn dimension_mismatch(
        operation: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    ) -> Self {
        Self::DimensionMismatch {
            operation,
            expected,
            found,
        }
    }

    /// Create a structural violation error
    pub const fn structural(kind: MatrixKind, reason: &'static str) -> Self {
        Self::StructuralViolation { kind, reason }
    }

    /// Get the category of this error
    pub const fn category(&self) -> ErrorCategory {
        match self {
            LinalgError::DimensionMismatch { .. } | LinalgError::InvalidSize { .. } => {
                ErrorCategory::Shape
            }
            LinalgError::IndexOutOfBounds { .. } => ErrorCategory::Index,
            LinalgError::StructuralViolation { .. }
            | LinalgError::InvalidStructure { .. }
            | LinalgError::Unsupported { .. } => ErrorCategory::Structure,
            LinalgError::Singular { .. } => ErrorCategory::Numeric,
            LinalgError::MissingArgument { .. } | LinalgError::InvalidArgument { .. } => {
                ErrorCategory::Argument
            }
        }
    }
}

impl core::fmt::Display for LinalgError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LinalgError::DimensionMismatch {
                operation,
                expected,
                found,
            } => write!(
                f,
                "Dimension mismatch in {operation}: expected {}x{}, found {}x{}",
                expected.0, expected.1, found.0, found.1
            ),
            LinalgError::InvalidSize { rows, cols } => {
                write!(f, "Invalid size {rows}x{cols}: dimensions must be positive")
            }
            LinalgError::IndexOutOfBounds { index, bound } => {
                write!(f, "Index {index} out of bounds (bound {bound})")
            }
            LinalgError::StructuralViolation { kind, reason } => {
                write!(f, "Structural violation on {kind} matrix: {reason}")
            }
            LinalgError::Singular { index } => {
                write!(f, "Singular operand: zero diagonal entry at {index}")
            }
            LinalgError::MissingArgument { name } => write!(f, "Missing argument '{name}'"),
            LinalgError::InvalidArgument { name, reason } => {
                write!(f, "Invalid argument '{name}': {reason}")
            }
            LinalgError::InvalidStructure { reason } => write!(f, "Invalid structure: {reason}"),
            LinalgError::Unsupported { operation, kind } => {
                write!(f, "Operation {operation} is not supported for {kind} matrices")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LinalgError {}

/// Result type for linkern operations
pub type Result<T> = core::result::Result<T, LinalgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        assert_eq!(
            LinalgError::dimension_mismatch("add", (2, 2), (3, 3)).category(),
            ErrorCategory::Shape
        );
        assert_eq!(
            LinalgError::structural(MatrixKind::Diagonal, "off-diagonal write").category(),
            ErrorCategory::Structure
        );
        assert_eq!(LinalgError::Singular { index: 1 }.category(), ErrorCategory::Numeric);
        assert_eq!(
            LinalgError::IndexOutOfBounds { index: 5, bound: 3 }.category(),
            ErrorCategory::Index
        );
    }
}
