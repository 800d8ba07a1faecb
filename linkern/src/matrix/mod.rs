//! Matrix storage kinds and the tagged [`Matrix`] type
//!
//! Each storage kind is a plain struct implementing the accessor
//! contracts. [`Matrix`] carries the kind as its variant, and every
//! operation dispatches on the variants of all participants.

use std::borrow::Cow;

use linkern_core::{
    validate_index, validate_range, validate_same_shape, validate_size, validate_square,
    LinalgError, MatrixAccess, MatrixAccessMut, MatrixKind, Result, VectorAccess,
};

use crate::fallback;
use crate::provider::Element;
use crate::vector::{SparseVector, Vector};

pub(crate) mod arith;
pub mod csr;
pub mod dense;
pub mod diagonal;
mod norms;
mod product;
mod structure;
pub mod symmetric;

pub use csr::CsrMatrix;
pub use dense::DenseMatrix;
pub use diagonal::DiagonalMatrix;
pub use structure::Triangle;
pub use symmetric::SymmetricMatrix;

macro_rules! impl_storage_access {
    ($($storage:ident => $kind:ident),* $(,)?) => {$(
        impl<T: Element> MatrixAccess for $storage<T> {
            type Element = T;

            fn row_count(&self) -> usize {
                self.rows()
            }

            fn column_count(&self) -> usize {
                self.cols()
            }

            fn kind(&self) -> MatrixKind {
                MatrixKind::$kind
            }

            fn at(&self, row: usize, col: usize) -> Result<T> {
                self.get(row, col)
            }

            fn at_unchecked(&self, row: usize, col: usize) -> T {
                debug_assert!(row < self.rows() && col < self.cols());
                self.get_unchecked(row, col)
            }
        }
    )*};
}

impl_storage_access!(
    DenseMatrix => Dense,
    CsrMatrix => Csr,
    DiagonalMatrix => Diagonal,
    SymmetricMatrix => Symmetric,
);

macro_rules! impl_unconstrained_access_mut {
    ($($storage:ident),* $(,)?) => {$(
        impl<T: Element> MatrixAccessMut for $storage<T> {
            fn set_at(&mut self, row: usize, col: usize, value: T) -> Result<()> {
                self.set(row, col, value)
            }

            fn accepts(&self, _row: usize, _col: usize, _value: T) -> bool {
                true
            }

            fn clear(&mut self) {
                $storage::clear(self)
            }
        }
    )*};
}

// Symmetric accepts any single write; whole-output symmetry is checked by the writer
impl_unconstrained_access_mut!(DenseMatrix, CsrMatrix, SymmetricMatrix);

impl<T: Element> MatrixAccessMut for DiagonalMatrix<T> {
    fn set_at(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        self.set(row, col, value)
    }

    fn accepts(&self, row: usize, col: usize, value: T) -> bool {
        DiagonalMatrix::accepts(self, row, col, value)
    }

    fn clear(&mut self) {
        DiagonalMatrix::clear(self)
    }
}

/// A matrix in one of the supported storage kinds
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(deserialize = "T: Element + serde::Deserialize<'de>"))
)]
pub enum Matrix<T> {
    /// Column-major flat array
    Dense(DenseMatrix<T>),
    /// Compressed sparse rows
    Csr(CsrMatrix<T>),
    /// Diagonal values only
    Diagonal(DiagonalMatrix<T>),
    /// Upper triangle written, lower triangle mirrored
    Symmetric(SymmetricMatrix<T>),
}

/// Forward a call to whichever storage kind `self` holds
macro_rules! forward {
    ($self:expr, $m:ident => $body:expr) => {
        match $self {
            Matrix::Dense($m) => $body,
            Matrix::Csr($m) => $body,
            Matrix::Diagonal($m) => $body,
            Matrix::Symmetric($m) => $body,
        }
    };
}
pub(crate) use forward;

impl<T: Element> Matrix<T> {
    pub fn dense(rows: usize, cols: usize) -> Result<Self> {
        DenseMatrix::new(rows, cols).map(Matrix::Dense)
    }

    /// Dense matrix owning a column-major array
    pub fn dense_from_column_major(rows: usize, cols: usize, values: Vec<T>) -> Result<Self> {
        DenseMatrix::from_column_major(rows, cols, values).map(Matrix::Dense)
    }

    /// Dense matrix copied from equally long rows
    pub fn dense_from_rows(rows: &[&[T]]) -> Result<Self> {
        DenseMatrix::from_rows(rows).map(Matrix::Dense)
    }

    pub fn csr(rows: usize, cols: usize) -> Result<Self> {
        CsrMatrix::new(rows, cols).map(Matrix::Csr)
    }

    pub fn csr_from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, T)]) -> Result<Self> {
        CsrMatrix::from_triplets(rows, cols, triplets).map(Matrix::Csr)
    }

    pub fn csr_from_parts(
        rows: usize,
        cols: usize,
        row_pointers: Vec<usize>,
        column_indices: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        CsrMatrix::from_parts(rows, cols, row_pointers, column_indices, values).map(Matrix::Csr)
    }

    pub fn diagonal(rows: usize, cols: usize) -> Result<Self> {
        DiagonalMatrix::new(rows, cols).map(Matrix::Diagonal)
    }

    pub fn diagonal_from_values(rows: usize, cols: usize, values: Vec<T>) -> Result<Self> {
        DiagonalMatrix::from_values(rows, cols, values).map(Matrix::Diagonal)
    }

    /// Square identity in diagonal storage
    pub fn identity(order: usize) -> Result<Self> {
        DiagonalMatrix::identity(order).map(Matrix::Diagonal)
    }

    pub fn symmetric(order: usize) -> Result<Self> {
        SymmetricMatrix::new(order).map(Matrix::Symmetric)
    }

    /// Symmetric matrix from its upper triangle, row `r` holding columns `r..order`
    pub fn symmetric_from_upper(upper: &[&[T]]) -> Result<Self> {
        SymmetricMatrix::from_upper(upper).map(Matrix::Symmetric)
    }

    /// All-zero matrix of the given storage kind
    pub fn zeros(kind: MatrixKind, rows: usize, cols: usize) -> Result<Self> {
        match kind {
            MatrixKind::Dense => Self::dense(rows, cols),
            MatrixKind::Csr => Self::csr(rows, cols),
            MatrixKind::Diagonal => Self::diagonal(rows, cols),
            MatrixKind::Symmetric => {
                validate_size(rows, cols)?;
                if rows != cols {
                    return Err(LinalgError::structural(kind, "symmetric storage must be square"));
                }
                Self::symmetric(rows)
            }
        }
    }

    /// All-zero matrix of the same kind and shape as `self`
    pub(crate) fn zeros_like(&self) -> Self {
        Self::zeros(self.kind(), self.rows(), self.cols())
            .unwrap_or_else(|_| unreachable!("shape of a live matrix is valid"))
    }

    /// New zero matrix of the same storage family
    ///
    /// Symmetric matrices produce dense storage when `rows != cols`.
    pub fn create_matrix(&self, rows: usize, cols: usize) -> Result<Self> {
        match self.kind() {
            MatrixKind::Symmetric if rows != cols => Self::dense(rows, cols),
            kind => Self::zeros(kind, rows, cols),
        }
    }

    /// New zero vector, sparse for sparse matrix kinds
    pub fn create_vector(&self, count: usize) -> Result<Vector<T>> {
        if self.kind().is_sparse() {
            Vector::sparse(count)
        } else {
            Vector::dense(count)
        }
    }

    pub fn kind(&self) -> MatrixKind {
        match self {
            Matrix::Dense(_) => MatrixKind::Dense,
            Matrix::Csr(_) => MatrixKind::Csr,
            Matrix::Diagonal(_) => MatrixKind::Diagonal,
            Matrix::Symmetric(_) => MatrixKind::Symmetric,
        }
    }

    pub fn rows(&self) -> usize {
        forward!(self, m => m.rows())
    }

    pub fn cols(&self) -> usize {
        forward!(self, m => m.cols())
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        forward!(self, m => m.get(row, col))
    }

    pub(crate) fn get_unchecked(&self, row: usize, col: usize) -> T {
        forward!(self, m => m.get_unchecked(row, col))
    }

    /// Write one element, respecting the storage kind's constraints
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        forward!(self, m => m.set(row, col, value))
    }

    pub(crate) fn accepts(&self, row: usize, col: usize, value: T) -> bool {
        match self {
            Matrix::Diagonal(m) => m.accepts(row, col, value),
            _ => true,
        }
    }

    /// Reset every entry to zero, keeping shape and kind
    pub fn clear(&mut self) {
        forward!(self, m => m.clear())
    }

    /// Number of non-zero entries
    pub fn non_zero_count(&self) -> usize {
        forward!(self, m => m.non_zero_count())
    }

    /// Dense view, borrowed when `self` already is dense
    pub(crate) fn dense_storage(&self) -> Cow<'_, DenseMatrix<T>> {
        match self {
            Matrix::Dense(m) => Cow::Borrowed(m),
            Matrix::Csr(m) => Cow::Owned(m.to_dense()),
            Matrix::Diagonal(m) => Cow::Owned(m.to_dense()),
            Matrix::Symmetric(m) => Cow::Owned(m.to_dense()),
        }
    }

    /// CSR view, borrowed when `self` already is CSR
    pub(crate) fn csr_storage(&self) -> Cow<'_, CsrMatrix<T>> {
        match self {
            Matrix::Csr(m) => Cow::Borrowed(m),
            Matrix::Dense(m) => Cow::Owned(CsrMatrix::from_dense(m)),
            Matrix::Diagonal(m) => {
                let triplets: Vec<_> = m
                    .values()
                    .iter()
                    .enumerate()
                    .map(|(i, &value)| (i, i, value))
                    .collect();
                Cow::Owned(
                    CsrMatrix::from_triplets(m.rows(), m.cols(), &triplets)
                        .unwrap_or_else(|_| unreachable!("diagonal positions are in bounds")),
                )
            }
            Matrix::Symmetric(m) => Cow::Owned(CsrMatrix::from_dense(&m.to_dense())),
        }
    }

    /// Copy into dense storage
    pub fn to_dense(&self) -> Self {
        Matrix::Dense(self.dense_storage().into_owned())
    }

    /// Copy into CSR storage
    pub fn to_csr(&self) -> Self {
        Matrix::Csr(self.csr_storage().into_owned())
    }

    /// Copy into `kind` storage
    ///
    /// Fails with a structural violation when `kind` cannot represent
    /// the values, e.g. off-diagonal entries for diagonal storage.
    pub fn convert_to(&self, kind: MatrixKind) -> Result<Self> {
        if kind == self.kind() {
            return Ok(self.clone());
        }
        match kind {
            MatrixKind::Dense => Ok(self.to_dense()),
            MatrixKind::Csr => Ok(self.to_csr()),
            MatrixKind::Symmetric => {
                SymmetricMatrix::from_dense(&self.dense_storage()).map(Matrix::Symmetric)
            }
            MatrixKind::Diagonal => {
                let mut target = Self::diagonal(self.rows(), self.cols())?;
                fallback::write_matrix(&mut target, &linkern_core::to_column_major(self))?;
                Ok(target)
            }
        }
    }

    /// Overwrite `target`, which must have the same shape
    ///
    /// `target` keeps its storage kind; values it cannot represent are
    /// rejected before anything is written.
    pub fn copy_to(&self, target: &mut Self) -> Result<()> {
        validate_same_shape("copy_to", self.shape(), target.shape())?;
        if self.kind() == target.kind() {
            target.clone_from(self);
            return Ok(());
        }
        fallback::write_matrix(target, &linkern_core::to_column_major(self))
    }

    /// Validate a batch of writes in full, then apply it
    fn apply_writes(&mut self, writes: &[(usize, usize, T)]) -> Result<()> {
        if writes
            .iter()
            .any(|&(row, col, value)| !self.accepts(row, col, value))
        {
            return Err(LinalgError::structural(
                self.kind(),
                "cannot store a non-zero value off the diagonal",
            ));
        }
        if self.kind() == MatrixKind::Symmetric {
            // Mirrored pairs inside one batch must agree
            let mut upper: Vec<(usize, usize, T)> = writes
                .iter()
                .map(|&(r, c, v)| if c < r { (c, r, v) } else { (r, c, v) })
                .collect();
            upper.sort_by_key(|&(r, c, _)| (r, c));
            if upper
                .windows(2)
                .any(|w| (w[0].0, w[0].1) == (w[1].0, w[1].1) && w[0].2 != w[1].2)
            {
                return Err(LinalgError::structural(
                    MatrixKind::Symmetric,
                    "write would break symmetry",
                ));
            }
        }
        for &(row, col, value) in writes {
            self.set(row, col, value)?;
        }
        Ok(())
    }

    /// Copy of row `row`, sparse for sparse kinds
    pub fn row(&self, row: usize) -> Result<Vector<T>> {
        validate_index(row, self.rows())?;
        Ok(match self {
            Matrix::Csr(m) => {
                let (indices, values): (Vec<usize>, Vec<T>) = m.row_entries(row).unzip();
                Vector::Sparse(SparseVector::from_parts(m.cols(), indices, values)?)
            }
            Matrix::Diagonal(m) => {
                let mut v = SparseVector::new(m.cols())?;
                if row < m.values().len() {
                    v.set(row, m.values()[row])?;
                }
                Vector::Sparse(v)
            }
            _ => Vector::dense_from_vec((0..self.cols()).map(|c| self.get_unchecked(row, c)).collect())?,
        })
    }

    /// Copy of column `col`, sparse for sparse kinds
    pub fn column(&self, col: usize) -> Result<Vector<T>> {
        validate_index(col, self.cols())?;
        Ok(match self {
            Matrix::Dense(m) => Vector::dense_from_slice(m.column(col))?,
            Matrix::Symmetric(_) => {
                Vector::dense_from_vec((0..self.rows()).map(|r| self.get_unchecked(r, col)).collect())?
            }
            _ => Vector::Sparse(SparseVector::from_slice(
                &(0..self.rows()).map(|r| self.get_unchecked(r, col)).collect::<Vec<_>>(),
            )?),
        })
    }

    pub fn set_row(&mut self, row: usize, values: &Vector<T>) -> Result<()> {
        validate_index(row, self.rows())?;
        validate_same_shape("set_row", (1, self.cols()), (1, values.count()))?;
        let writes: Vec<_> = (0..self.cols())
            .map(|c| (row, c, values.get_unchecked(c)))
            .collect();
        self.apply_writes(&writes)
    }

    pub fn set_column(&mut self, col: usize, values: &Vector<T>) -> Result<()> {
        validate_index(col, self.cols())?;
        validate_same_shape("set_column", (self.rows(), 1), (values.count(), 1))?;
        let writes: Vec<_> = (0..self.rows())
            .map(|r| (r, col, values.get_unchecked(r)))
            .collect();
        self.apply_writes(&writes)
    }

    /// Copy of the `row_count x col_count` block starting at `(row, col)`
    ///
    /// Dense storage stays dense; every other kind yields CSR, since a
    /// block of a diagonal or symmetric matrix is neither in general.
    pub fn sub_matrix(&self, row: usize, row_count: usize, col: usize, col_count: usize) -> Result<Self> {
        validate_range(row, row_count, self.rows())?;
        validate_range(col, col_count, self.cols())?;
        match self {
            Matrix::Dense(m) => {
                let mut values = Vec::with_capacity(row_count * col_count);
                for c in col..col + col_count {
                    values.extend_from_slice(&m.column(c)[row..row + row_count]);
                }
                Self::dense_from_column_major(row_count, col_count, values)
            }
            Matrix::Csr(m) => {
                let triplets: Vec<_> = (row..row + row_count)
                    .flat_map(|r| {
                        m.row_entries(r)
                            .filter(|&(c, _)| c >= col && c < col + col_count)
                            .map(move |(c, v)| (r - row, c - col, v))
                    })
                    .collect();
                Self::csr_from_triplets(row_count, col_count, &triplets)
            }
            _ => {
                let mut triplets = Vec::new();
                for r in row..row + row_count {
                    for c in col..col + col_count {
                        let value = self.get_unchecked(r, c);
                        if !value.is_zero() {
                            triplets.push((r - row, c - col, value));
                        }
                    }
                }
                Self::csr_from_triplets(row_count, col_count, &triplets)
            }
        }
    }

    /// Overwrite the block starting at `(row, col)` with `block`
    pub fn set_sub_matrix(&mut self, row: usize, col: usize, block: &Self) -> Result<()> {
        validate_range(row, block.rows(), self.rows())?;
        validate_range(col, block.cols(), self.cols())?;
        let mut writes = Vec::with_capacity(block.rows() * block.cols());
        for c in 0..block.cols() {
            for r in 0..block.rows() {
                writes.push((row + r, col + c, block.get_unchecked(r, c)));
            }
        }
        self.apply_writes(&writes)
    }

    /// Diagonal entries as a dense vector of `min(rows, cols)` elements
    pub fn diagonal_vector(&self) -> Vector<T> {
        let values = match self {
            Matrix::Diagonal(m) => m.values().to_vec(),
            _ => (0..self.rows().min(self.cols()))
                .map(|i| self.get_unchecked(i, i))
                .collect(),
        };
        Vector::dense_from_vec(values)
            .unwrap_or_else(|_| unreachable!("a live matrix has a non-empty diagonal"))
    }

    pub fn set_diagonal(&mut self, values: &Vector<T>) -> Result<()> {
        let length = self.rows().min(self.cols());
        validate_same_shape("set_diagonal", (length, 1), (values.count(), 1))?;
        let writes: Vec<_> = (0..length).map(|i| (i, i, values.get_unchecked(i))).collect();
        self.apply_writes(&writes)
    }

    /// Sum of the diagonal of a square matrix
    pub fn trace(&self) -> Result<T> {
        validate_square("trace", self.shape())?;
        Ok((0..self.rows()).fold(T::zero(), |sum, i| sum + self.get_unchecked(i, i)))
    }

    /// Whether both matrices share a shape and differ by at most
    /// `tolerance` at every position
    pub fn almost_equal(&self, other: &Self, tolerance: f64) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        (0..self.cols()).all(|c| {
            (0..self.rows()).all(|r| {
                (self.get_unchecked(r, c) - other.get_unchecked(r, c)).abs().to_f64() <= tolerance
            })
        })
    }
}

impl<T: Element> MatrixAccess for Matrix<T> {
    type Element = T;

    fn row_count(&self) -> usize {
        self.rows()
    }

    fn column_count(&self) -> usize {
        self.cols()
    }

    fn kind(&self) -> MatrixKind {
        Matrix::kind(self)
    }

    fn at(&self, row: usize, col: usize) -> Result<T> {
        self.get(row, col)
    }

    fn at_unchecked(&self, row: usize, col: usize) -> T {
        self.get_unchecked(row, col)
    }
}

impl<T: Element> MatrixAccessMut for Matrix<T> {
    fn set_at(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        self.set(row, col, value)
    }

    fn accepts(&self, row: usize, col: usize, value: T) -> bool {
        Matrix::accepts(self, row, col, value)
    }

    fn clear(&mut self) {
        Matrix::clear(self)
    }
}

impl<T> From<DenseMatrix<T>> for Matrix<T> {
    fn from(m: DenseMatrix<T>) -> Self {
        Matrix::Dense(m)
    }
}

impl<T> From<CsrMatrix<T>> for Matrix<T> {
    fn from(m: CsrMatrix<T>) -> Self {
        Matrix::Csr(m)
    }
}

impl<T> From<DiagonalMatrix<T>> for Matrix<T> {
    fn from(m: DiagonalMatrix<T>) -> Self {
        Matrix::Diagonal(m)
    }
}

impl<T> From<SymmetricMatrix<T>> for Matrix<T> {
    fn from(m: SymmetricMatrix<T>) -> Self {
        Matrix::Symmetric(m)
    }
}
