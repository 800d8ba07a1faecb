//! Vector storage kinds and the tagged [`Vector`] type
//!
//! [`Vector`] mirrors [`Matrix`](crate::Matrix): each variant owns one
//! storage kind, and operations match on the variants of every
//! participant before choosing a kernel.

use std::borrow::Cow;

use linkern_core::{
    validate_count, validate_range, validate_same_shape, Result, VectorAccess,
    VectorAccessMut, VectorKind,
};

use crate::fallback;
use crate::matrix::Matrix;
use crate::provider::Element;

pub mod dense;
mod ops;
pub mod sparse;

pub use dense::DenseVector;
pub use sparse::SparseVector;

impl<T: Element> VectorAccess for DenseVector<T> {
    type Element = T;

    fn count(&self) -> usize {
        self.count()
    }

    fn kind(&self) -> VectorKind {
        VectorKind::Dense
    }

    fn get(&self, index: usize) -> Result<T> {
        self.get(index)
    }

    fn get_unchecked(&self, index: usize) -> T {
        self.values()[index]
    }
}

impl<T: Element> VectorAccessMut for DenseVector<T> {
    fn set(&mut self, index: usize, value: T) -> Result<()> {
        self.set(index, value)
    }

    fn clear(&mut self) {
        self.clear()
    }
}

impl<T: Element> VectorAccess for SparseVector<T> {
    type Element = T;

    fn count(&self) -> usize {
        self.count()
    }

    fn kind(&self) -> VectorKind {
        VectorKind::Sparse
    }

    fn get(&self, index: usize) -> Result<T> {
        self.get(index)
    }

    fn get_unchecked(&self, index: usize) -> T {
        self.get_unchecked(index)
    }
}

impl<T: Element> VectorAccessMut for SparseVector<T> {
    fn set(&mut self, index: usize, value: T) -> Result<()> {
        self.set(index, value)
    }

    fn clear(&mut self) {
        self.clear()
    }
}

/// A vector of `count >= 1` elements in one of the storage kinds
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(deserialize = "T: Element + serde::Deserialize<'de>"))
)]
pub enum Vector<T> {
    Dense(DenseVector<T>),
    Sparse(SparseVector<T>),
}

impl<T: Element> Vector<T> {
    /// Zero dense vector
    pub fn dense(count: usize) -> Result<Self> {
        DenseVector::new(count).map(Vector::Dense)
    }

    /// Dense vector taking ownership of `values`
    pub fn dense_from_vec(values: Vec<T>) -> Result<Self> {
        DenseVector::from_vec(values).map(Vector::Dense)
    }

    /// Dense vector copying `values`
    pub fn dense_from_slice(values: &[T]) -> Result<Self> {
        DenseVector::from_slice(values).map(Vector::Dense)
    }

    /// Empty sparse vector
    pub fn sparse(count: usize) -> Result<Self> {
        SparseVector::new(count).map(Vector::Sparse)
    }

    /// Sparse vector holding the non-zeros of `values`
    pub fn sparse_from_slice(values: &[T]) -> Result<Self> {
        SparseVector::from_slice(values).map(Vector::Sparse)
    }

    /// Sparse vector from sorted index/value arrays
    pub fn sparse_from_parts(count: usize, indices: Vec<usize>, values: Vec<T>) -> Result<Self> {
        SparseVector::from_parts(count, indices, values).map(Vector::Sparse)
    }

    /// Zero vector of `kind`
    pub fn zeros(kind: VectorKind, count: usize) -> Result<Self> {
        match kind {
            VectorKind::Dense => Self::dense(count),
            VectorKind::Sparse => Self::sparse(count),
        }
    }

    pub(crate) fn zeros_like(&self) -> Self {
        Self::zeros(self.kind(), self.count())
            .unwrap_or_else(|_| unreachable!("count taken from a live vector"))
    }

    /// Storage kind of this vector
    pub fn kind(&self) -> VectorKind {
        match self {
            Vector::Dense(_) => VectorKind::Dense,
            Vector::Sparse(_) => VectorKind::Sparse,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Vector::Dense(v) => v.count(),
            Vector::Sparse(v) => v.count(),
        }
    }

    pub fn get(&self, index: usize) -> Result<T> {
        match self {
            Vector::Dense(v) => v.get(index),
            Vector::Sparse(v) => v.get(index),
        }
    }

    /// Write `value` at `index`
    ///
    /// On sparse storage a zero removes the slot.
    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        match self {
            Vector::Dense(v) => v.set(index, value),
            Vector::Sparse(v) => v.set(index, value),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Vector::Dense(v) => v.clear(),
            Vector::Sparse(v) => v.clear(),
        }
    }

    pub fn non_zero_count(&self) -> usize {
        match self {
            Vector::Dense(v) => v.non_zero_count(),
            Vector::Sparse(v) => v.non_zero_count(),
        }
    }

    /// Contiguous view of every element, borrowed for dense storage
    pub fn dense_values(&self) -> Cow<'_, [T]> {
        match self {
            Vector::Dense(v) => Cow::Borrowed(v.values()),
            Vector::Sparse(v) => Cow::Owned(v.to_dense_vec()),
        }
    }

    /// Copy every element into a new array
    pub fn to_vec(&self) -> Vec<T> {
        self.dense_values().into_owned()
    }

    /// Stored or non-zero `(index, value)` pairs in ascending order
    pub fn enumerate_non_zero(&self) -> Vec<(usize, T)> {
        match self {
            Vector::Dense(v) => v
                .values()
                .iter()
                .enumerate()
                .filter(|(_, x)| !x.is_zero())
                .map(|(i, &x)| (i, x))
                .collect(),
            Vector::Sparse(v) => v.iter().collect(),
        }
    }

    /// New zero vector of the same kind with `count` elements
    pub fn create_vector(&self, count: usize) -> Result<Self> {
        Self::zeros(self.kind(), count)
    }

    /// New zero matrix of the kind this vector promotes to
    pub fn create_matrix(&self, rows: usize, cols: usize) -> Result<Matrix<T>> {
        Matrix::zeros(self.kind().matrix_kind(), rows, cols)
    }

    pub fn to_dense(&self) -> Self {
        match self {
            Vector::Dense(_) => self.clone(),
            Vector::Sparse(v) => Vector::Dense(
                DenseVector::from_vec(v.to_dense_vec())
                    .unwrap_or_else(|_| unreachable!("count taken from a live vector")),
            ),
        }
    }

    pub fn to_sparse(&self) -> Self {
        match self {
            Vector::Sparse(_) => self.clone(),
            Vector::Dense(v) => Vector::Sparse(
                SparseVector::from_slice(v.values())
                    .unwrap_or_else(|_| unreachable!("count taken from a live vector")),
            ),
        }
    }

    /// Copy of `length` elements starting at `offset`, same kind
    pub fn sub_vector(&self, offset: usize, length: usize) -> Result<Self> {
        validate_range(offset, length, self.count())?;
        match self {
            Vector::Dense(v) => Self::dense_from_slice(&v.values()[offset..offset + length]),
            Vector::Sparse(v) => {
                let start = v.find(offset).unwrap_or_else(|slot| slot);
                let end = v.find(offset + length).unwrap_or_else(|slot| slot);
                let indices = v.indices()[start..end].iter().map(|i| i - offset).collect();
                Self::sparse_from_parts(length, indices, v.values()[start..end].to_vec())
            }
        }
    }

    /// Overwrite every element from `values`
    pub fn set_values(&mut self, values: &[T]) -> Result<()> {
        validate_same_shape("set_values", (self.count(), 1), (values.len(), 1))?;
        match self {
            Vector::Dense(v) => v.values_mut().copy_from_slice(values),
            Vector::Sparse(v) => *v = SparseVector::from_slice(values)?,
        }
        Ok(())
    }

    /// Overwrite the elements starting at `offset` with `source`
    pub fn set_sub_vector(&mut self, offset: usize, source: &Self) -> Result<()> {
        validate_range(offset, source.count(), self.count())?;
        match (&mut *self, source) {
            (Vector::Dense(v), Vector::Dense(s)) => {
                v.values_mut()[offset..offset + s.count()].copy_from_slice(s.values());
            }
            _ => {
                for (i, value) in source.dense_values().iter().enumerate() {
                    self.set(offset + i, *value)?;
                }
            }
        }
        Ok(())
    }

    /// Copy every element into `target`, keeping `target`'s kind
    pub fn copy_to(&self, target: &mut Self) -> Result<()> {
        validate_same_shape("copy_to", (self.count(), 1), (target.count(), 1))?;
        if self.kind() == target.kind() {
            target.clone_from(self);
            return Ok(());
        }
        fallback::write_vector(target, &self.dense_values())
    }

    /// Single-row matrix, CSR for sparse vectors
    pub fn to_row_matrix(&self) -> Matrix<T> {
        let matrix = match self {
            Vector::Dense(v) => Matrix::dense_from_column_major(1, v.count(), v.values().to_vec()),
            Vector::Sparse(v) => {
                let triplets: Vec<_> = v.iter().map(|(i, x)| (0, i, x)).collect();
                Matrix::csr_from_triplets(1, v.count(), &triplets)
            }
        };
        matrix.unwrap_or_else(|_| unreachable!("count taken from a live vector"))
    }

    /// Single-column matrix, CSR for sparse vectors
    pub fn to_column_matrix(&self) -> Matrix<T> {
        let matrix = match self {
            Vector::Dense(v) => Matrix::dense_from_column_major(v.count(), 1, v.values().to_vec()),
            Vector::Sparse(v) => {
                let triplets: Vec<_> = v.iter().map(|(i, x)| (i, 0, x)).collect();
                Matrix::csr_from_triplets(v.count(), 1, &triplets)
            }
        };
        matrix.unwrap_or_else(|_| unreachable!("count taken from a live vector"))
    }
}

impl<T: Element> VectorAccess for Vector<T> {
    type Element = T;

    fn count(&self) -> usize {
        Vector::count(self)
    }

    fn kind(&self) -> VectorKind {
        Vector::kind(self)
    }

    fn get(&self, index: usize) -> Result<T> {
        Vector::get(self, index)
    }

    fn get_unchecked(&self, index: usize) -> T {
        debug_assert!(index < Vector::count(self));
        match self {
            Vector::Dense(v) => v.values()[index],
            Vector::Sparse(v) => v.get_unchecked(index),
        }
    }
}

impl<T: Element> VectorAccessMut for Vector<T> {
    fn set(&mut self, index: usize, value: T) -> Result<()> {
        Vector::set(self, index, value)
    }

    fn clear(&mut self) {
        Vector::clear(self)
    }
}

impl<T> From<DenseVector<T>> for Vector<T> {
    fn from(v: DenseVector<T>) -> Self {
        Vector::Dense(v)
    }
}

impl<T> From<SparseVector<T>> for Vector<T> {
    fn from(v: SparseVector<T>) -> Self {
        Vector::Sparse(v)
    }
}

/// Shared count check for binary vector operations
pub(crate) fn validate_same_count(operation: &'static str, a: usize, b: usize) -> Result<()> {
    validate_count(a)?;
    validate_same_shape(operation, (a, 1), (b, 1))
}
