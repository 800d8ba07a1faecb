//! Element-wise matrix arithmetic
//!
//! Every binary operation first picks the storage kind its fast kernel
//! produces for the operand kinds. Allocating forms return that kind.
//! Result-provided forms run the fast kernel only when the result holds
//! the same kind, otherwise they take the generic fallback.

use std::borrow::Cow;

use linkern_core::{validate_same_shape, MatrixKind, Result};

use super::{forward, CsrMatrix, DenseMatrix, DiagonalMatrix, Matrix, SymmetricMatrix};
use crate::alias::{through_temporary, Operand};
use crate::fallback::{self, note_matrix_fallback};
use crate::provider::{backend, Element};

/// Store a fast result when `result` holds the planned kind, otherwise
/// write the generic column-major output through the accessor contract
pub(super) fn into_result<T: Element>(
    operation: &'static str,
    planned: MatrixKind,
    operands: &[MatrixKind],
    result: &mut Matrix<T>,
    fast: impl FnOnce() -> Result<Matrix<T>>,
    generic: impl FnOnce() -> Vec<T>,
) -> Result<()> {
    if planned == result.kind() {
        *result = fast()?;
        return Ok(());
    }
    let mut kinds = operands.to_vec();
    kinds.push(result.kind());
    note_matrix_fallback(operation, &kinds);
    fallback::write_matrix(result, &generic())
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Elementwise {
    Add,
    Subtract,
}

impl Elementwise {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Elementwise::Add => "add",
            Elementwise::Subtract => "subtract",
        }
    }

    #[inline]
    pub(crate) fn apply<T: Element>(self, x: T, y: T) -> T {
        match self {
            Elementwise::Add => x + y,
            Elementwise::Subtract => x - y,
        }
    }

    pub(crate) fn arrays<T: Element>(self, a: &[T], b: &[T], result: &mut [T]) {
        let provider = backend::<T>();
        match self {
            Elementwise::Add => provider.add_arrays(a, b, result),
            Elementwise::Subtract => provider.subtract_arrays(a, b, result),
        }
    }
}

/// Kind produced by a sum or difference of `a` and `b`
fn elementwise_kind(a: MatrixKind, b: MatrixKind) -> MatrixKind {
    use MatrixKind::*;
    match (a, b) {
        (Dense, _) | (_, Dense) => Dense,
        (x, y) if x == y => x,
        (Csr, Diagonal) | (Diagonal, Csr) => Csr,
        (Symmetric, Diagonal) | (Diagonal, Symmetric) => Symmetric,
        _ => Dense,
    }
}

/// Kind produced by a Hadamard product of `a` and `b`
fn pointwise_multiply_kind(a: MatrixKind, b: MatrixKind) -> MatrixKind {
    use MatrixKind::*;
    match (a, b) {
        (Diagonal, _) | (_, Diagonal) => Diagonal,
        (Csr, _) | (_, Csr) => Csr,
        (Symmetric, Symmetric) => Symmetric,
        _ => Dense,
    }
}

/// Kind produced by a Hadamard quotient; sparse numerators stay sparse
fn pointwise_divide_kind(a: MatrixKind, b: MatrixKind) -> MatrixKind {
    use MatrixKind::*;
    match (a, b) {
        (Diagonal, _) => Diagonal,
        (Csr, _) => Csr,
        (Symmetric, Symmetric) => Symmetric,
        _ => Dense,
    }
}

/// Zero numerators divide to zero so structural zeros survive
#[inline]
fn divide<T: Element>(x: T, y: T) -> T {
    if x.is_zero() {
        T::zero()
    } else {
        x / y
    }
}

fn symmetric_storage<T: Element>(matrix: &Matrix<T>) -> Cow<'_, SymmetricMatrix<T>> {
    match matrix {
        Matrix::Symmetric(m) => Cow::Borrowed(m),
        Matrix::Diagonal(m) => Cow::Owned(
            SymmetricMatrix::from_diagonal(m)
                .unwrap_or_else(|_| unreachable!("paired with a square symmetric operand")),
        ),
        _ => unreachable!("only diagonal operands are promoted to symmetric"),
    }
}

fn dense_zip<T: Element>(a: &DenseMatrix<T>, b: &DenseMatrix<T>, fill: impl FnOnce(&[T], &[T], &mut [T])) -> Matrix<T> {
    let mut values = vec![T::zero(); a.values().len()];
    fill(a.values(), b.values(), &mut values);
    Matrix::Dense(
        DenseMatrix::from_column_major(a.rows(), a.cols(), values)
            .unwrap_or_else(|_| unreachable!("shape taken from a live matrix")),
    )
}

fn diagonal_with<T: Element>(like: &DiagonalMatrix<T>, values: Vec<T>) -> Matrix<T> {
    Matrix::Diagonal(
        DiagonalMatrix::from_values(like.rows(), like.cols(), values)
            .unwrap_or_else(|_| unreachable!("diagonal length taken from a live matrix")),
    )
}

impl<T: Element> Matrix<T> {
    fn combine(&self, other: &Self, op: Elementwise) -> Self {
        let apply = |x: T, y: T| op.apply(x, y);
        match (self, other) {
            (Matrix::Dense(a), Matrix::Dense(b)) => dense_zip(a, b, |x, y, out| op.arrays(x, y, out)),
            (Matrix::Csr(a), Matrix::Csr(b)) => Matrix::Csr(CsrMatrix::merge(a, b, apply)),
            (Matrix::Diagonal(a), Matrix::Diagonal(b)) => Matrix::Diagonal(DiagonalMatrix::zip(a, b, apply)),
            (Matrix::Symmetric(a), Matrix::Symmetric(b)) => {
                Matrix::Symmetric(SymmetricMatrix::zip_upper(a, b, apply))
            }
            (Matrix::Csr(_), Matrix::Diagonal(_)) | (Matrix::Diagonal(_), Matrix::Csr(_)) => {
                Matrix::Csr(CsrMatrix::merge(&self.csr_storage(), &other.csr_storage(), apply))
            }
            (Matrix::Symmetric(_), Matrix::Diagonal(_)) | (Matrix::Diagonal(_), Matrix::Symmetric(_)) => {
                Matrix::Symmetric(SymmetricMatrix::zip_upper(
                    &symmetric_storage(self),
                    &symmetric_storage(other),
                    apply,
                ))
            }
            _ => dense_zip(&self.dense_storage(), &other.dense_storage(), |x, y, out| {
                op.arrays(x, y, out)
            }),
        }
    }

    fn combine_into(&self, other: &Self, result: &mut Self, op: Elementwise) -> Result<()> {
        validate_same_shape(op.name(), self.shape(), other.shape())?;
        validate_same_shape(op.name(), self.shape(), result.shape())?;
        if let (Matrix::Dense(a), Matrix::Dense(b), Matrix::Dense(out)) = (self, other, &mut *result) {
            op.arrays(a.values(), b.values(), out.values_mut());
            return Ok(());
        }
        into_result(
            op.name(),
            elementwise_kind(self.kind(), other.kind()),
            &[self.kind(), other.kind()],
            result,
            || Ok(self.combine(other, op)),
            || fallback::zip_matrices(self, other, |x, y| op.apply(x, y)),
        )
    }

    fn combine_in_place(&mut self, other: Operand<'_, Self>, op: Elementwise) -> Result<()> {
        let other = match other {
            // Closed forms, no reads of partially updated state
            Operand::This => {
                match op {
                    Elementwise::Add => self.scale_in_place(T::one() + T::one()),
                    Elementwise::Subtract => self.clear(),
                }
                return Ok(());
            }
            Operand::Other(other) => other,
        };
        validate_same_shape(op.name(), self.shape(), other.shape())?;

        if let Matrix::Dense(a) = self {
            a.map_indexed_in_place(|row, col, x| op.apply(x, other.get_unchecked(row, col)));
            return Ok(());
        }
        if let (Matrix::Diagonal(a), Matrix::Diagonal(b)) = (&mut *self, other) {
            for (x, &y) in a.values_mut().iter_mut().zip(b.values()) {
                *x = op.apply(*x, y);
            }
            return Ok(());
        }
        through_temporary(self, op.name(), |this| {
            let mut temporary = this.zeros_like();
            this.combine_into(other, &mut temporary, op)?;
            Ok(temporary)
        })
    }

    /// Element-wise sum
    pub fn add(&self, other: &Self) -> Result<Self> {
        validate_same_shape("add", self.shape(), other.shape())?;
        Ok(self.combine(other, Elementwise::Add))
    }

    pub fn add_into(&self, other: &Self, result: &mut Self) -> Result<()> {
        self.combine_into(other, result, Elementwise::Add)
    }

    /// `self += other`, keeping the storage kind of `self`
    pub fn add_in_place(&mut self, other: Operand<'_, Self>) -> Result<()> {
        self.combine_in_place(other, Elementwise::Add)
    }

    /// Element-wise difference
    pub fn subtract(&self, other: &Self) -> Result<Self> {
        validate_same_shape("subtract", self.shape(), other.shape())?;
        Ok(self.combine(other, Elementwise::Subtract))
    }

    pub fn subtract_into(&self, other: &Self, result: &mut Self) -> Result<()> {
        self.combine_into(other, result, Elementwise::Subtract)
    }

    /// `self -= other`, keeping the storage kind of `self`
    pub fn subtract_in_place(&mut self, other: Operand<'_, Self>) -> Result<()> {
        self.combine_in_place(other, Elementwise::Subtract)
    }

    /// Apply a zero-preserving `f` to every stored value, keeping the kind
    fn map_values(&self, f: impl Fn(T) -> T + Sync) -> Self {
        let mut result = self.clone();
        match &mut result {
            Matrix::Dense(m) => m.map_indexed_in_place(|_, _, x| f(x)),
            Matrix::Csr(m) => m.map_stored(|_, _, x| f(x)),
            Matrix::Diagonal(m) => m.values_mut().iter_mut().for_each(|x| *x = f(*x)),
            Matrix::Symmetric(m) => m.map_upper(|_, _, x| f(x)),
        }
        result
    }

    /// Multiply every element by `factor`
    pub fn scale(&self, factor: T) -> Self {
        let mut result = self.clone();
        result.scale_in_place(factor);
        result
    }

    pub fn scale_into(&self, factor: T, result: &mut Self) -> Result<()> {
        validate_same_shape("scale", self.shape(), result.shape())?;
        if let (Matrix::Dense(a), Matrix::Dense(out)) = (self, &mut *result) {
            backend::<T>().scale_into(a.values(), factor, out.values_mut());
            return Ok(());
        }
        into_result(
            "scale",
            self.kind(),
            &[self.kind()],
            result,
            || Ok(self.scale(factor)),
            || fallback::map_matrix(self, |_, _, x| x * factor),
        )
    }

    /// Scale in place; safe without a temporary for every kind
    pub fn scale_in_place(&mut self, factor: T) {
        forward!(self, m => m.scale_in_place(factor))
    }

    pub fn negate(&self) -> Self {
        self.map_values(|x| -x)
    }

    pub fn negate_into(&self, result: &mut Self) -> Result<()> {
        validate_same_shape("negate", self.shape(), result.shape())?;
        into_result(
            "negate",
            self.kind(),
            &[self.kind()],
            result,
            || Ok(self.negate()),
            || fallback::map_matrix(self, |_, _, x| -x),
        )
    }

    /// Add `scalar` to every element
    ///
    /// Symmetric storage stays symmetric; every other kind becomes dense.
    pub fn add_scalar(&self, scalar: T) -> Self {
        match self {
            Matrix::Symmetric(m) => {
                let mut result = m.clone();
                result.map_upper(|_, _, x| x + scalar);
                Matrix::Symmetric(result)
            }
            _ => {
                let mut result = self.dense_storage().into_owned();
                result.map_indexed_in_place(|_, _, x| x + scalar);
                Matrix::Dense(result)
            }
        }
    }

    pub fn add_scalar_into(&self, scalar: T, result: &mut Self) -> Result<()> {
        validate_same_shape("add_scalar", self.shape(), result.shape())?;
        let planned = match self.kind() {
            MatrixKind::Symmetric => MatrixKind::Symmetric,
            _ => MatrixKind::Dense,
        };
        into_result(
            "add_scalar",
            planned,
            &[self.kind()],
            result,
            || Ok(self.add_scalar(scalar)),
            || fallback::map_matrix(self, |_, _, x| x + scalar),
        )
    }

    /// Remainder of every element divided by `divisor`
    ///
    /// Zero elements stay zero, so sparse kinds keep their structure.
    pub fn modulus(&self, divisor: T) -> Self {
        self.map_values(|x| if x.is_zero() { x } else { x % divisor })
    }

    pub fn modulus_into(&self, divisor: T, result: &mut Self) -> Result<()> {
        validate_same_shape("modulus", self.shape(), result.shape())?;
        into_result(
            "modulus",
            self.kind(),
            &[self.kind()],
            result,
            || Ok(self.modulus(divisor)),
            || fallback::map_matrix(self, |_, _, x| if x.is_zero() { x } else { x % divisor }),
        )
    }

    fn pointwise_product(&self, other: &Self) -> Self {
        match (self, other) {
            (Matrix::Dense(a), Matrix::Dense(b)) => {
                dense_zip(a, b, |x, y, out| backend::<T>().pointwise_multiply(x, y, out))
            }
            (Matrix::Diagonal(a), _) => {
                let values = a.values().iter().enumerate().map(|(i, &x)| x * other.get_unchecked(i, i)).collect();
                diagonal_with(a, values)
            }
            (_, Matrix::Diagonal(b)) => {
                let values = b.values().iter().enumerate().map(|(i, &y)| self.get_unchecked(i, i) * y).collect();
                diagonal_with(b, values)
            }
            (Matrix::Csr(a), Matrix::Csr(b)) => Matrix::Csr(CsrMatrix::intersect(a, b, |x, y| x * y)),
            (Matrix::Csr(a), _) => {
                let mut result = a.clone();
                result.map_stored(|row, col, x| x * other.get_unchecked(row, col));
                Matrix::Csr(result)
            }
            (_, Matrix::Csr(b)) => {
                let mut result = b.clone();
                result.map_stored(|row, col, y| self.get_unchecked(row, col) * y);
                Matrix::Csr(result)
            }
            (Matrix::Symmetric(a), Matrix::Symmetric(b)) => {
                Matrix::Symmetric(SymmetricMatrix::zip_upper(a, b, |x, y| x * y))
            }
            _ => dense_zip(&self.dense_storage(), &other.dense_storage(), |x, y, out| {
                backend::<T>().pointwise_multiply(x, y, out)
            }),
        }
    }

    /// Hadamard product
    pub fn pointwise_multiply(&self, other: &Self) -> Result<Self> {
        validate_same_shape("pointwise_multiply", self.shape(), other.shape())?;
        Ok(self.pointwise_product(other))
    }

    pub fn pointwise_multiply_into(&self, other: &Self, result: &mut Self) -> Result<()> {
        validate_same_shape("pointwise_multiply", self.shape(), other.shape())?;
        validate_same_shape("pointwise_multiply", self.shape(), result.shape())?;
        into_result(
            "pointwise_multiply",
            pointwise_multiply_kind(self.kind(), other.kind()),
            &[self.kind(), other.kind()],
            result,
            || Ok(self.pointwise_product(other)),
            || fallback::zip_matrices(self, other, |x, y| x * y),
        )
    }

    /// `self ∘= other`, keeping the storage kind of `self`
    pub fn pointwise_multiply_in_place(&mut self, other: Operand<'_, Self>) -> Result<()> {
        let other = match other {
            Operand::This => {
                *self = self.map_values(|x| x * x);
                return Ok(());
            }
            Operand::Other(other) => other,
        };
        validate_same_shape("pointwise_multiply", self.shape(), other.shape())?;
        through_temporary(self, "pointwise_multiply", |this| {
            let mut temporary = this.zeros_like();
            this.pointwise_multiply_into(other, &mut temporary)?;
            Ok(temporary)
        })
    }

    fn pointwise_quotient(&self, other: &Self) -> Self {
        match (self, other) {
            (Matrix::Diagonal(a), _) => {
                let values = a
                    .values()
                    .iter()
                    .enumerate()
                    .map(|(i, &x)| divide(x, other.get_unchecked(i, i)))
                    .collect();
                diagonal_with(a, values)
            }
            (Matrix::Csr(a), _) => {
                let mut result = a.clone();
                result.map_stored(|row, col, x| divide(x, other.get_unchecked(row, col)));
                Matrix::Csr(result)
            }
            (Matrix::Symmetric(a), Matrix::Symmetric(b)) => {
                Matrix::Symmetric(SymmetricMatrix::zip_upper(a, b, divide))
            }
            _ => dense_zip(&self.dense_storage(), &other.dense_storage(), |x, y, out| {
                for ((o, &a), &b) in out.iter_mut().zip(x).zip(y) {
                    *o = divide(a, b);
                }
            }),
        }
    }

    /// Element-wise quotient; zero numerators give zero
    pub fn pointwise_divide(&self, other: &Self) -> Result<Self> {
        validate_same_shape("pointwise_divide", self.shape(), other.shape())?;
        Ok(self.pointwise_quotient(other))
    }

    pub fn pointwise_divide_into(&self, other: &Self, result: &mut Self) -> Result<()> {
        validate_same_shape("pointwise_divide", self.shape(), other.shape())?;
        validate_same_shape("pointwise_divide", self.shape(), result.shape())?;
        into_result(
            "pointwise_divide",
            pointwise_divide_kind(self.kind(), other.kind()),
            &[self.kind(), other.kind()],
            result,
            || Ok(self.pointwise_quotient(other)),
            || fallback::zip_matrices(self, other, divide),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense() -> Matrix<f64> {
        Matrix::dense_from_rows(&[&[1.0, 0.0, 2.0], &[0.0, 3.0, 0.0], &[4.0, 0.0, 5.0]]).unwrap()
    }

    fn every_kind() -> Vec<Matrix<f64>> {
        vec![
            dense(),
            dense().to_csr(),
            Matrix::diagonal_from_values(3, 3, vec![1.0, -2.0, 3.0]).unwrap(),
            Matrix::symmetric_from_upper(&[&[1.0, 2.0, 0.0], &[3.0, 4.0], &[5.0]]).unwrap(),
        ]
    }

    #[test]
    fn test_result_kinds() {
        let [d, c, g, s]: [Matrix<f64>; 4] = every_kind().try_into().unwrap();
        assert_eq!(c.add(&c).unwrap().kind(), MatrixKind::Csr);
        assert_eq!(c.add(&g).unwrap().kind(), MatrixKind::Csr);
        assert_eq!(s.add(&g).unwrap().kind(), MatrixKind::Symmetric);
        assert_eq!(c.subtract(&s).unwrap().kind(), MatrixKind::Dense);
        assert_eq!(g.add(&d).unwrap().kind(), MatrixKind::Dense);
        assert_eq!(c.pointwise_multiply(&d).unwrap().kind(), MatrixKind::Csr);
        assert_eq!(s.pointwise_multiply(&g).unwrap().kind(), MatrixKind::Diagonal);
        assert_eq!(d.pointwise_divide(&c).unwrap().kind(), MatrixKind::Dense);
        assert_eq!(s.add_scalar(1.0).kind(), MatrixKind::Symmetric);
        assert_eq!(c.add_scalar(1.0).kind(), MatrixKind::Dense);
    }

    #[test]
    fn test_every_pairing_matches_dense_arithmetic() {
        for a in every_kind() {
            for b in every_kind() {
                let (da, db) = (a.to_dense(), b.to_dense());
                assert!(a.add(&b).unwrap().almost_equal(&da.add(&db).unwrap(), 0.0));
                assert!(a.subtract(&b).unwrap().almost_equal(&da.subtract(&db).unwrap(), 0.0));
                assert!(a
                    .pointwise_multiply(&b)
                    .unwrap()
                    .almost_equal(&da.pointwise_multiply(&db).unwrap(), 0.0));
            }
        }
    }

    #[test]
    fn test_into_falls_back_for_foreign_result_kind() {
        let a = dense().to_csr();
        let b = dense();
        let mut result = Matrix::symmetric(3).unwrap();
        // dense() is not symmetric, so a symmetric result must refuse it
        assert!(a.add_into(&b, &mut result).is_err());
        assert_eq!(result.non_zero_count(), 0);

        let mut result = Matrix::csr(3, 3).unwrap();
        a.add_into(&b, &mut result).unwrap();
        assert_eq!(result.kind(), MatrixKind::Csr);
        assert_eq!(result.get(2, 0).unwrap(), 8.0);

        let mut diagonal = Matrix::diagonal(3, 3).unwrap();
        assert!(a.scale_into(2.0, &mut diagonal).is_err());
        let mut wrong = Matrix::dense(2, 2).unwrap();
        assert!(a.add_into(&b, &mut wrong).is_err());
    }

    #[test]
    fn test_self_aliasing_closed_forms() {
        for original in every_kind() {
            let mut doubled = original.clone();
            doubled.add_in_place(Operand::This).unwrap();
            assert_eq!(doubled, original.add(&original.clone()).unwrap().convert_to(original.kind()).unwrap());

            let mut zeroed = original.clone();
            zeroed.subtract_in_place(Operand::This).unwrap();
            assert_eq!(zeroed.non_zero_count(), 0);
            assert_eq!(zeroed.kind(), original.kind());

            let mut squared = original.clone();
            squared.pointwise_multiply_in_place(Operand::This).unwrap();
            assert!(squared.almost_equal(&original.pointwise_multiply(&original).unwrap(), 0.0));
        }
    }

    #[test]
    fn test_in_place_keeps_kind_and_rejects_unrepresentable() {
        let mut csr = dense().to_csr();
        csr.add_in_place(Operand::from(&dense())).unwrap();
        assert_eq!(csr.kind(), MatrixKind::Csr);
        assert_eq!(csr.get(0, 2).unwrap(), 4.0);

        let mut diagonal = Matrix::diagonal_from_values(3, 3, vec![1.0, 2.0, 3.0]).unwrap();
        let before = diagonal.clone();
        assert!(diagonal.add_in_place(Operand::from(&dense())).is_err());
        assert_eq!(diagonal, before);
    }

    #[test]
    fn test_divide_and_modulus_preserve_zeros() {
        let c = dense().to_csr();
        let q = c.pointwise_divide(&Matrix::dense(3, 3).unwrap().add_scalar(2.0)).unwrap();
        assert_eq!(q.kind(), MatrixKind::Csr);
        assert_eq!(q.non_zero_count(), 5);
        assert_eq!(q.get(2, 2).unwrap(), 2.5);

        let zero_over_zero = c.pointwise_divide(&c).unwrap();
        assert_eq!(zero_over_zero.get(0, 1).unwrap(), 0.0);

        let r = dense().modulus(2.0);
        assert_eq!(r.get(2, 2).unwrap(), 1.0);
        assert_eq!(r.get(0, 2).unwrap(), 0.0);
        assert_eq!(c.modulus(2.0).non_zero_count(), 3);
    }

    #[test]
    fn test_scale_and_negate() {
        let c = dense().to_csr();
        assert_eq!(c.scale(0.0).non_zero_count(), 0);
        assert_eq!(c.negate().get(2, 0).unwrap(), -4.0);
        let mut out = Matrix::dense(3, 3).unwrap();
        dense().scale_into(2.0, &mut out).unwrap();
        assert_eq!(out.get(1, 1).unwrap(), 6.0);
        c.negate_into(&mut out).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), -1.0);
    }
}
