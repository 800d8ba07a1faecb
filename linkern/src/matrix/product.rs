//! Matrix-matrix and matrix-vector products

use linkern_core::{validate_product_shape, validate_same_shape, MatrixKind, Result, VectorKind};

use super::arith::into_result;
use super::{CsrMatrix, DenseMatrix, DiagonalMatrix, Matrix};
use crate::alias::{through_temporary, Operand};
use crate::fallback::{self, note_matrix_fallback};
use crate::provider::{backend, Element};
use crate::vector::Vector;

/// Kind produced by `a * b`
fn product_kind(a: MatrixKind, b: MatrixKind) -> MatrixKind {
    use MatrixKind::*;
    match (a, b) {
        (Diagonal, Diagonal) => Diagonal,
        (Csr, Csr) | (Diagonal, Csr) | (Csr, Diagonal) => Csr,
        _ => Dense,
    }
}

fn dense_product<T: Element>(a: &DenseMatrix<T>, b: &DenseMatrix<T>) -> DenseMatrix<T> {
    let mut values = vec![T::zero(); a.rows() * b.cols()];
    backend::<T>().dense_matrix_multiply(
        a.values(),
        a.rows(),
        a.cols(),
        b.values(),
        b.rows(),
        b.cols(),
        &mut values,
    );
    DenseMatrix::from_column_major(a.rows(), b.cols(), values)
        .unwrap_or_else(|_| unreachable!("product shape of two live matrices"))
}

fn csr_from_triplets<T: Element>(rows: usize, cols: usize, triplets: Vec<(usize, usize, T)>) -> Matrix<T> {
    Matrix::Csr(
        CsrMatrix::from_triplets(rows, cols, &triplets)
            .unwrap_or_else(|_| unreachable!("triplets taken from a live matrix")),
    )
}

impl<T: Element> Matrix<T> {
    fn product(&self, other: &Self) -> Self {
        match (self, other) {
            (Matrix::Dense(a), Matrix::Dense(b)) => Matrix::Dense(dense_product(a, b)),
            (Matrix::Csr(a), Matrix::Csr(b)) => Matrix::Csr(CsrMatrix::multiply(a, b)),
            (Matrix::Csr(a), Matrix::Dense(b)) => Matrix::Dense(a.multiply_dense(b)),
            (Matrix::Dense(a), Matrix::Csr(b)) => Matrix::Dense(CsrMatrix::left_multiply_dense(a, b)),
            (Matrix::Diagonal(a), Matrix::Diagonal(b)) => Matrix::Diagonal(DiagonalMatrix::multiply(a, b)),
            (Matrix::Diagonal(a), Matrix::Dense(b)) => Matrix::Dense(a.multiply_dense(b)),
            (Matrix::Dense(a), Matrix::Diagonal(b)) => {
                Matrix::Dense(DiagonalMatrix::left_multiply_dense(a, b))
            }
            (Matrix::Diagonal(a), Matrix::Csr(b)) => {
                // Row r scaled by the r-th diagonal value
                let d = a.values();
                let triplets = b
                    .triplets()
                    .filter(|&(r, _, _)| r < d.len())
                    .map(|(r, c, v)| (r, c, d[r] * v))
                    .collect();
                csr_from_triplets(a.rows(), b.cols(), triplets)
            }
            (Matrix::Csr(a), Matrix::Diagonal(b)) => {
                // Column c scaled by the c-th diagonal value
                let d = b.values();
                let triplets = a
                    .triplets()
                    .filter(|&(_, c, _)| c < d.len())
                    .map(|(r, c, v)| (r, c, v * d[c]))
                    .collect();
                csr_from_triplets(a.rows(), b.cols(), triplets)
            }
            _ => Matrix::Dense(dense_product(&self.dense_storage(), &other.dense_storage())),
        }
    }

    /// Matrix product `self * other`
    pub fn multiply(&self, other: &Self) -> Result<Self> {
        validate_product_shape("multiply", self.shape(), other.shape())?;
        Ok(self.product(other))
    }

    pub fn multiply_into(&self, other: &Self, result: &mut Self) -> Result<()> {
        validate_product_shape("multiply", self.shape(), other.shape())?;
        validate_same_shape("multiply", (self.rows(), other.cols()), result.shape())?;
        if let (Matrix::Dense(a), Matrix::Dense(b), Matrix::Dense(out)) = (self, other, &mut *result) {
            backend::<T>().dense_matrix_multiply(
                a.values(),
                a.rows(),
                a.cols(),
                b.values(),
                b.rows(),
                b.cols(),
                out.values_mut(),
            );
            return Ok(());
        }
        into_result(
            "multiply",
            product_kind(self.kind(), other.kind()),
            &[self.kind(), other.kind()],
            result,
            || Ok(self.product(other)),
            || fallback::product(self, other),
        )
    }

    /// `self = self * other`, keeping the storage kind of `self`
    ///
    /// `other` must be square with `self.cols()` rows. Products never
    /// run in place, so the result always goes through a temporary.
    pub fn multiply_in_place(&mut self, other: Operand<'_, Self>) -> Result<()> {
        let other_shape = match other {
            Operand::This => self.shape(),
            Operand::Other(other) => other.shape(),
        };
        validate_product_shape("multiply", self.shape(), other_shape)?;
        validate_same_shape("multiply", self.shape(), (self.rows(), other_shape.1))?;
        through_temporary(self, "multiply", |this| {
            let mut temporary = this.zeros_like();
            this.multiply_into(other.resolve(this), &mut temporary)?;
            Ok(temporary)
        })
    }

    /// `self * other^T`
    pub fn transpose_and_multiply(&self, other: &Self) -> Result<Self> {
        validate_product_shape("transpose_and_multiply", self.shape(), (other.cols(), other.rows()))?;
        Ok(self.product(&other.transpose()))
    }

    pub fn transpose_and_multiply_into(&self, other: &Self, result: &mut Self) -> Result<()> {
        validate_product_shape("transpose_and_multiply", self.shape(), (other.cols(), other.rows()))?;
        self.multiply_into(&other.transpose(), result)
    }

    /// Vector kind matching this matrix's storage family
    fn vector_kind(&self) -> VectorKind {
        if self.kind().is_sparse() {
            VectorKind::Sparse
        } else {
            VectorKind::Dense
        }
    }

    fn vector_from(&self, values: Vec<T>) -> Result<Vector<T>> {
        match self.vector_kind() {
            VectorKind::Sparse => Vector::sparse_from_slice(&values),
            VectorKind::Dense => Vector::dense_from_vec(values),
        }
    }

    fn product_values(&self, x: &[T]) -> Vec<T> {
        match self {
            Matrix::Dense(m) => {
                let mut out = vec![T::zero(); m.rows()];
                backend::<T>().dense_matrix_multiply(m.values(), m.rows(), m.cols(), x, m.cols(), 1, &mut out);
                out
            }
            Matrix::Csr(m) => m.multiply_dense_vector(x),
            Matrix::Diagonal(m) => m.multiply_dense_vector(x),
            Matrix::Symmetric(m) => m.multiply_dense_vector(x),
        }
    }

    fn transpose_product_values(&self, x: &[T]) -> Vec<T> {
        match self {
            Matrix::Dense(m) => {
                let provider = backend::<T>();
                (0..m.cols()).map(|c| provider.dot_product(m.column(c), x)).collect()
            }
            Matrix::Csr(m) => m.transpose_multiply_dense_vector(x),
            Matrix::Diagonal(m) => m.transpose().multiply_dense_vector(x),
            Matrix::Symmetric(m) => m.multiply_dense_vector(x),
        }
    }

    /// `self * v`, sparse for sparse matrix kinds
    pub fn multiply_vector(&self, v: &Vector<T>) -> Result<Vector<T>> {
        validate_same_shape("multiply_vector", (self.cols(), 1), (v.count(), 1))?;
        self.vector_from(self.product_values(&v.dense_values()))
    }

    pub fn multiply_vector_into(&self, v: &Vector<T>, result: &mut Vector<T>) -> Result<()> {
        validate_same_shape("multiply_vector", (self.cols(), 1), (v.count(), 1))?;
        validate_same_shape("multiply_vector", (self.rows(), 1), (result.count(), 1))?;
        if result.kind() == self.vector_kind() {
            *result = self.multiply_vector(v)?;
            return Ok(());
        }
        note_matrix_fallback(
            "multiply_vector",
            &[self.kind(), v.kind().matrix_kind(), result.kind().matrix_kind()],
        );
        fallback::write_vector(result, &fallback::product_vector(self, v))
    }

    /// `self^T * v`, sparse for sparse matrix kinds
    pub fn transpose_multiply_vector(&self, v: &Vector<T>) -> Result<Vector<T>> {
        validate_same_shape("transpose_multiply_vector", (self.rows(), 1), (v.count(), 1))?;
        self.vector_from(self.transpose_product_values(&v.dense_values()))
    }

    pub fn transpose_multiply_vector_into(&self, v: &Vector<T>, result: &mut Vector<T>) -> Result<()> {
        validate_same_shape("transpose_multiply_vector", (self.rows(), 1), (v.count(), 1))?;
        validate_same_shape("transpose_multiply_vector", (self.cols(), 1), (result.count(), 1))?;
        if result.kind() == self.vector_kind() {
            *result = self.transpose_multiply_vector(v)?;
            return Ok(());
        }
        note_matrix_fallback(
            "transpose_multiply_vector",
            &[self.kind(), v.kind().matrix_kind(), result.kind().matrix_kind()],
        );
        fallback::write_vector(result, &fallback::transpose_product_vector(self, v))
    }
}
