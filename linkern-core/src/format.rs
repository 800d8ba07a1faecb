//! Storage format tags
//!
//! Every matrix and vector carries one of these tags alongside its
//! payload. The dispatcher matches on pairs of tags to choose between a
//! format-specialized kernel and the generic fallback.

/// Matrix storage representations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatrixKind {
    /// Column-major flat array
    Dense,
    /// Compressed Sparse Row
    Csr,
    /// Main diagonal only, off-diagonal structurally zero
    Diagonal,
    /// Square, upper triangle stored, lower mirrored on read
    Symmetric,
}

impl MatrixKind {
    /// Whether absent entries are structural zeros
    pub const fn is_sparse(&self) -> bool {
        matches!(self, MatrixKind::Csr | MatrixKind::Diagonal)
    }
}

impl core::fmt::Display for MatrixKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MatrixKind::Dense => write!(f, "Dense"),
            MatrixKind::Csr => write!(f, "CSR"),
            MatrixKind::Diagonal => write!(f, "Diagonal"),
            MatrixKind::Symmetric => write!(f, "Symmetric"),
        }
    }
}

/// Vector storage representations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VectorKind {
    /// Flat value array
    Dense,
    /// Sorted parallel index/value arrays
    Sparse,
}

impl VectorKind {
    /// The matrix kind a vector of this kind promotes to
    pub const fn matrix_kind(&self) -> MatrixKind {
        match self {
            VectorKind::Dense => MatrixKind::Dense,
            VectorKind::Sparse => MatrixKind::Csr,
        }
    }
}

impl core::fmt::Display for VectorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            VectorKind::Dense => write!(f, "Dense"),
            VectorKind::Sparse => write!(f, "Sparse"),
        }
    }
}

/// Element data types supported by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    F32,
    F64,
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DataType::F32 => write!(f, "f32"),
            DataType::F64 => write!(f, "f64"),
        }
    }
}
