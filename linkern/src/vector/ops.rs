//! Vector arithmetic, reductions and norms
//!
//! Binary operations pick the kind their fast kernel produces: two
//! sparse operands stay sparse, anything involving a dense operand
//! goes dense. Result-provided forms fall back to the accessor
//! contract when the result holds another kind.

use linkern_core::{LinalgError, Result, VectorAccess, VectorKind};

use super::{validate_same_count, DenseVector, SparseVector, Vector};
use crate::alias::{through_temporary, Operand};
use crate::fallback::{self, note_vector_fallback};
use crate::matrix::arith::Elementwise;
use crate::matrix::Matrix;
use crate::provider::{backend, Element};

fn into_result<T: Element>(
    operation: &'static str,
    planned: VectorKind,
    operands: &[VectorKind],
    result: &mut Vector<T>,
    fast: impl FnOnce() -> Vector<T>,
    generic: impl FnOnce() -> Vec<T>,
) -> Result<()> {
    if planned == result.kind() {
        *result = fast();
        return Ok(());
    }
    let mut kinds = operands.to_vec();
    kinds.push(result.kind());
    note_vector_fallback(operation, &kinds);
    fallback::write_vector(result, &generic())
}

fn elementwise_kind(a: VectorKind, b: VectorKind) -> VectorKind {
    match (a, b) {
        (VectorKind::Sparse, VectorKind::Sparse) => VectorKind::Sparse,
        _ => VectorKind::Dense,
    }
}

fn pointwise_multiply_kind(a: VectorKind, b: VectorKind) -> VectorKind {
    match (a, b) {
        (VectorKind::Dense, VectorKind::Dense) => VectorKind::Dense,
        _ => VectorKind::Sparse,
    }
}

#[inline]
fn divide<T: Element>(x: T, y: T) -> T {
    if x.is_zero() {
        T::zero()
    } else {
        x / y
    }
}

fn dense_vector<T: Element>(values: Vec<T>) -> Vector<T> {
    Vector::Dense(
        DenseVector::from_vec(values).unwrap_or_else(|_| unreachable!("count taken from a live vector")),
    )
}

impl<T: Element> Vector<T> {
    fn combine(&self, other: &Self, op: Elementwise) -> Self {
        match (self, other) {
            (Vector::Sparse(a), Vector::Sparse(b)) => {
                Vector::Sparse(SparseVector::merge(a, b, |x, y| op.apply(x, y)))
            }
            _ => {
                let mut values = vec![T::zero(); self.count()];
                op.arrays(&self.dense_values(), &other.dense_values(), &mut values);
                dense_vector(values)
            }
        }
    }

    fn combine_into(&self, other: &Self, result: &mut Self, op: Elementwise) -> Result<()> {
        validate_same_count(op.name(), self.count(), other.count())?;
        validate_same_count(op.name(), self.count(), result.count())?;
        if let (Vector::Dense(a), Vector::Dense(b), Vector::Dense(out)) = (self, other, &mut *result) {
            op.arrays(a.values(), b.values(), out.values_mut());
            return Ok(());
        }
        into_result(
            op.name(),
            elementwise_kind(self.kind(), other.kind()),
            &[self.kind(), other.kind()],
            result,
            || self.combine(other, op),
            || fallback::zip_vectors(self, other, |x, y| op.apply(x, y)),
        )
    }

    fn combine_in_place(&mut self, other: Operand<'_, Self>, op: Elementwise) -> Result<()> {
        let other = match other {
            Operand::This => {
                match op {
                    Elementwise::Add => self.scale_in_place(T::one() + T::one()),
                    Elementwise::Subtract => self.clear(),
                }
                return Ok(());
            }
            Operand::Other(other) => other,
        };
        validate_same_count(op.name(), self.count(), other.count())?;

        if let Vector::Dense(a) = self {
            for (i, x) in a.values_mut().iter_mut().enumerate() {
                *x = op.apply(*x, other.get_unchecked(i));
            }
            return Ok(());
        }
        if let (Vector::Sparse(a), Vector::Sparse(b)) = (&mut *self, other) {
            *a = SparseVector::merge(a, b, |x, y| op.apply(x, y));
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
        validate_same_count("add", self.count(), other.count())?;
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
        validate_same_count("subtract", self.count(), other.count())?;
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
    fn map_values(&self, f: impl Fn(T) -> T) -> Self {
        let mut result = self.clone();
        match &mut result {
            Vector::Dense(v) => v.values_mut().iter_mut().for_each(|x| *x = f(*x)),
            Vector::Sparse(v) => v.map_stored(|_, x| f(x)),
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
        validate_same_count("scale", self.count(), result.count())?;
        if let (Vector::Dense(a), Vector::Dense(out)) = (self, &mut *result) {
            backend::<T>().scale_into(a.values(), factor, out.values_mut());
            return Ok(());
        }
        into_result(
            "scale",
            self.kind(),
            &[self.kind()],
            result,
            || self.scale(factor),
            || fallback::map_vector(self, |x| x * factor),
        )
    }

    pub fn scale_in_place(&mut self, factor: T) {
        match self {
            Vector::Dense(v) => backend::<T>().scale(v.values_mut(), factor),
            Vector::Sparse(v) => v.scale_in_place(factor),
        }
    }

    pub fn negate(&self) -> Self {
        self.map_values(|x| -x)
    }

    pub fn negate_into(&self, result: &mut Self) -> Result<()> {
        validate_same_count("negate", self.count(), result.count())?;
        into_result(
            "negate",
            self.kind(),
            &[self.kind()],
            result,
            || self.negate(),
            || fallback::map_vector(self, |x| -x),
        )
    }

    /// Add `scalar` to every element; the result is always dense
    pub fn add_scalar(&self, scalar: T) -> Self {
        dense_vector(self.dense_values().iter().map(|&x| x + scalar).collect())
    }

    pub fn add_scalar_into(&self, scalar: T, result: &mut Self) -> Result<()> {
        validate_same_count("add_scalar", self.count(), result.count())?;
        into_result(
            "add_scalar",
            VectorKind::Dense,
            &[self.kind()],
            result,
            || self.add_scalar(scalar),
            || fallback::map_vector(self, |x| x + scalar),
        )
    }

    /// Remainder of every element divided by `divisor`
    ///
    /// Zero elements stay zero, so sparse storage keeps its structure.
    pub fn modulus(&self, divisor: T) -> Self {
        self.map_values(|x| if x.is_zero() { x } else { x % divisor })
    }

    pub fn modulus_into(&self, divisor: T, result: &mut Self) -> Result<()> {
        validate_same_count("modulus", self.count(), result.count())?;
        into_result(
            "modulus",
            self.kind(),
            &[self.kind()],
            result,
            || self.modulus(divisor),
            || fallback::map_vector(self, |x| if x.is_zero() { x } else { x % divisor }),
        )
    }

    /// Inner product
    pub fn dot(&self, other: &Self) -> Result<T> {
        validate_same_count("dot", self.count(), other.count())?;
        Ok(match (self, other) {
            (Vector::Dense(a), Vector::Dense(b)) => backend::<T>().dot_product(a.values(), b.values()),
            (Vector::Sparse(a), Vector::Sparse(b)) => SparseVector::intersect(a, b, |x, y| x * y)
                .values()
                .iter()
                .fold(T::zero(), |sum, &x| sum + x),
            (Vector::Sparse(s), Vector::Dense(d)) | (Vector::Dense(d), Vector::Sparse(s)) => {
                let dense = d.values();
                s.iter().fold(T::zero(), |sum, (i, x)| sum + x * dense[i])
            }
        })
    }

    fn pointwise_product(&self, other: &Self) -> Self {
        match (self, other) {
            (Vector::Dense(a), Vector::Dense(b)) => {
                let mut values = vec![T::zero(); a.count()];
                backend::<T>().pointwise_multiply(a.values(), b.values(), &mut values);
                dense_vector(values)
            }
            (Vector::Sparse(a), Vector::Sparse(b)) => {
                Vector::Sparse(SparseVector::intersect(a, b, |x, y| x * y))
            }
            (Vector::Sparse(s), Vector::Dense(d)) | (Vector::Dense(d), Vector::Sparse(s)) => {
                let dense = d.values();
                let mut result = s.clone();
                result.map_stored(|i, x| x * dense[i]);
                Vector::Sparse(result)
            }
        }
    }

    /// Hadamard product, sparse when either operand is sparse
    pub fn pointwise_multiply(&self, other: &Self) -> Result<Self> {
        validate_same_count("pointwise_multiply", self.count(), other.count())?;
        Ok(self.pointwise_product(other))
    }

    pub fn pointwise_multiply_into(&self, other: &Self, result: &mut Self) -> Result<()> {
        validate_same_count("pointwise_multiply", self.count(), other.count())?;
        validate_same_count("pointwise_multiply", self.count(), result.count())?;
        into_result(
            "pointwise_multiply",
            pointwise_multiply_kind(self.kind(), other.kind()),
            &[self.kind(), other.kind()],
            result,
            || self.pointwise_product(other),
            || fallback::zip_vectors(self, other, |x, y| x * y),
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
        validate_same_count("pointwise_multiply", self.count(), other.count())?;
        through_temporary(self, "pointwise_multiply", |this| {
            let mut temporary = this.zeros_like();
            this.pointwise_multiply_into(other, &mut temporary)?;
            Ok(temporary)
        })
    }

    fn pointwise_quotient(&self, other: &Self) -> Self {
        match self {
            Vector::Sparse(a) => {
                let mut result = a.clone();
                result.map_stored(|i, x| divide(x, other.get_unchecked(i)));
                Vector::Sparse(result)
            }
            Vector::Dense(a) => {
                let divisor = other.dense_values();
                dense_vector(a.values().iter().zip(divisor.iter()).map(|(&x, &y)| divide(x, y)).collect())
            }
        }
    }

    /// Element-wise quotient; zero numerators give zero and the result
    /// keeps the kind of `self`
    pub fn pointwise_divide(&self, other: &Self) -> Result<Self> {
        validate_same_count("pointwise_divide", self.count(), other.count())?;
        Ok(self.pointwise_quotient(other))
    }

    pub fn pointwise_divide_into(&self, other: &Self, result: &mut Self) -> Result<()> {
        validate_same_count("pointwise_divide", self.count(), other.count())?;
        validate_same_count("pointwise_divide", self.count(), result.count())?;
        into_result(
            "pointwise_divide",
            self.kind(),
            &[self.kind(), other.kind()],
            result,
            || self.pointwise_quotient(other),
            || fallback::zip_vectors(self, other, divide),
        )
    }

    /// `self * other^T` as a `self.count() x other.count()` matrix
    ///
    /// Dense when both operands are dense, CSR otherwise.
    pub fn outer_product(&self, other: &Self) -> Matrix<T> {
        let (rows, cols) = (self.count(), other.count());
        let matrix = match (self, other) {
            (Vector::Dense(a), Vector::Dense(b)) => {
                let provider = backend::<T>();
                let mut values = vec![T::zero(); rows * cols];
                for (column, &factor) in values.chunks_mut(rows).zip(b.values()) {
                    provider.scale_into(a.values(), factor, column);
                }
                Matrix::dense_from_column_major(rows, cols, values)
            }
            _ => {
                let left = self.enumerate_non_zero();
                let right = other.enumerate_non_zero();
                let mut triplets = Vec::with_capacity(left.len() * right.len());
                for &(row, x) in &left {
                    for &(col, y) in &right {
                        triplets.push((row, col, x * y));
                    }
                }
                Matrix::csr_from_triplets(rows, cols, &triplets)
            }
        };
        matrix.unwrap_or_else(|_| unreachable!("shape taken from live vectors"))
    }

    /// Stored or non-zero values, the only ones reductions need to visit
    fn non_zero_values(&self) -> &[T] {
        match self {
            Vector::Dense(v) => v.values(),
            Vector::Sparse(v) => v.values(),
        }
    }

    pub fn sum(&self) -> T {
        self.non_zero_values().iter().fold(T::zero(), |sum, &x| sum + x)
    }

    /// Sum of absolute values
    pub fn l1_norm(&self) -> T {
        self.non_zero_values().iter().fold(T::zero(), |sum, &x| sum + x.abs())
    }

    /// Euclidean norm
    pub fn l2_norm(&self) -> T {
        let values = self.non_zero_values();
        let squares = backend::<T>().dot_product(values, values);
        T::from_f64(squares.to_f64().sqrt())
    }

    /// Largest absolute value
    pub fn infinity_norm(&self) -> T {
        self.non_zero_values()
            .iter()
            .map(|x| x.abs())
            .fold(T::zero(), |max, x| if x > max { x } else { max })
    }

    /// `p`-norm for `p >= 1`, with `f64::INFINITY` selecting the maximum norm
    pub fn norm(&self, p: f64) -> Result<T> {
        if p.is_nan() || p < 1.0 {
            return Err(LinalgError::InvalidArgument {
                name: "p",
                reason: "norm order must be at least 1",
            });
        }
        Ok(if p == 1.0 {
            self.l1_norm()
        } else if p == 2.0 {
            self.l2_norm()
        } else if p.is_infinite() {
            self.infinity_norm()
        } else {
            let sum: f64 = self
                .non_zero_values()
                .iter()
                .map(|x| x.abs().to_f64().powf(p))
                .sum();
            T::from_f64(sum.powf(1.0 / p))
        })
    }

    /// Index of the first element with the largest absolute value
    pub fn absolute_maximum_index(&self) -> usize {
        let (mut best_index, mut best) = (0, T::zero());
        let mut consider = |index: usize, x: T| {
            let magnitude = x.abs();
            if magnitude > best {
                best_index = index;
                best = magnitude;
            }
        };
        match self {
            Vector::Dense(v) => v.values().iter().enumerate().for_each(|(i, &x)| consider(i, x)),
            Vector::Sparse(v) => v.iter().for_each(|(i, x)| consider(i, x)),
        }
        best_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (Vector<f64>, Vector<f64>) {
        (
            Vector::dense_from_slice(&[1.0, 0.0, 3.0, 0.0]).unwrap(),
            Vector::dense_from_slice(&[0.0, 2.0, -3.0, 0.0]).unwrap(),
        )
    }

    fn all_kinds(v: &Vector<f64>) -> [Vector<f64>; 2] {
        [v.to_dense(), v.to_sparse()]
    }

    #[test]
    fn test_every_pairing_matches_dense() {
        let (x, y) = pair();
        for a in all_kinds(&x) {
            for b in all_kinds(&y) {
                let sum = a.add(&b).unwrap();
                assert_eq!(sum.kind(), elementwise_kind(a.kind(), b.kind()));
                assert_eq!(sum.to_vec(), vec![1.0, 2.0, 0.0, 0.0]);
                assert_eq!(a.subtract(&b).unwrap().to_vec(), vec![1.0, -2.0, 6.0, 0.0]);
                let product = a.pointwise_multiply(&b).unwrap();
                assert_eq!(product.kind(), pointwise_multiply_kind(a.kind(), b.kind()));
                assert_eq!(product.to_vec(), vec![0.0, 0.0, -9.0, 0.0]);
                assert_eq!(a.dot(&b).unwrap(), -9.0);
            }
        }
    }

    #[test]
    fn test_sparse_sum_drops_cancelled_entries() {
        let a = Vector::sparse_from_slice(&[1.0, 2.0, 0.0]).unwrap();
        let b = Vector::sparse_from_slice(&[-1.0, 0.0, 4.0]).unwrap();
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.non_zero_count(), 2);
        assert_eq!(sum.to_vec(), vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_into_falls_back_for_other_result_kind() {
        let (x, y) = pair();
        let mut result = Vector::sparse(4).unwrap();
        x.add_into(&y, &mut result).unwrap();
        assert_eq!(result.kind(), VectorKind::Sparse);
        assert_eq!(result.to_vec(), vec![1.0, 2.0, 0.0, 0.0]);

        let mut dense = Vector::dense(4).unwrap();
        x.to_sparse().scale_into(2.0, &mut dense).unwrap();
        assert_eq!(dense.to_vec(), vec![2.0, 0.0, 6.0, 0.0]);
        assert!(x.add_into(&y, &mut Vector::dense(3).unwrap()).is_err());
    }

    #[test]
    fn test_self_aliasing_in_place() {
        let (x, _) = pair();
        for v in all_kinds(&x) {
            let mut doubled = v.clone();
            doubled.add_in_place(Operand::This).unwrap();
            let mut expected = Vector::dense(4).unwrap();
            v.add_into(&v.clone(), &mut expected).unwrap();
            assert_eq!(doubled.to_vec(), expected.to_vec());
            assert_eq!(doubled.kind(), v.kind());

            let mut zeroed = v.clone();
            zeroed.subtract_in_place(Operand::This).unwrap();
            assert_eq!(zeroed.non_zero_count(), 0);

            let mut squared = v.clone();
            squared.pointwise_multiply_in_place(Operand::This).unwrap();
            assert_eq!(squared.to_vec(), vec![1.0, 0.0, 9.0, 0.0]);
        }
    }

    #[test]
    fn test_in_place_keeps_kind() {
        let (x, y) = pair();
        let mut sparse = x.to_sparse();
        sparse.add_in_place(Operand::from(&y)).unwrap();
        assert_eq!(sparse.kind(), VectorKind::Sparse);
        assert_eq!(sparse.to_vec(), vec![1.0, 2.0, 0.0, 0.0]);

        let mut dense = x.clone();
        dense.pointwise_multiply_in_place(Operand::from(&y.to_sparse())).unwrap();
        assert_eq!(dense.kind(), VectorKind::Dense);
        assert_eq!(dense.to_vec(), vec![0.0, 0.0, -9.0, 0.0]);

        let before = sparse.clone();
        assert!(sparse.add_in_place(Operand::from(&Vector::dense(2).unwrap())).is_err());
        assert_eq!(sparse, before);
    }

    #[test]
    fn test_divide_and_modulus() {
        let a = Vector::sparse_from_slice(&[0.0, 6.0, 7.0]).unwrap();
        let b = Vector::dense_from_slice(&[0.0, 3.0, 2.0]).unwrap();
        let quotient = a.pointwise_divide(&b).unwrap();
        assert_eq!(quotient.kind(), VectorKind::Sparse);
        assert_eq!(quotient.to_vec(), vec![0.0, 2.0, 3.5]);
        assert_eq!(b.pointwise_divide(&a).unwrap().get(0).unwrap(), 0.0);

        let remainder = a.modulus(4.0);
        assert_eq!(remainder.to_vec(), vec![0.0, 2.0, 3.0]);
        assert_eq!(remainder.kind(), VectorKind::Sparse);
    }

    #[test]
    fn test_scalar_operations() {
        let v = Vector::sparse_from_slice(&[0.0, -2.0, 1.0]).unwrap();
        assert_eq!(v.scale(0.0).non_zero_count(), 0);
        assert_eq!(v.negate().to_vec(), vec![0.0, 2.0, -1.0]);
        let shifted = v.add_scalar(1.0);
        assert_eq!(shifted.kind(), VectorKind::Dense);
        assert_eq!(shifted.to_vec(), vec![1.0, -1.0, 2.0]);
    }

    #[test]
    fn test_outer_product() {
        let a = Vector::dense_from_slice(&[1.0, 2.0]).unwrap();
        let b = Vector::dense_from_slice(&[3.0, 0.0, 5.0]).unwrap();
        let dense = a.outer_product(&b);
        assert_eq!(dense.shape(), (2, 3));
        assert_eq!(dense.get(1, 2).unwrap(), 10.0);
        let sparse = a.to_sparse().outer_product(&b);
        assert_eq!(sparse.kind(), linkern_core::MatrixKind::Csr);
        assert_eq!(sparse.non_zero_count(), 4);
        assert_eq!(sparse.to_dense(), dense);
    }

    #[test]
    fn test_norms() {
        let v = Vector::dense_from_slice(&[3.0, 0.0, -4.0]).unwrap();
        for v in all_kinds(&v) {
            assert_eq!(v.sum(), -1.0);
            assert_eq!(v.l1_norm(), 7.0);
            assert_eq!(v.l2_norm(), 5.0);
            assert_eq!(v.infinity_norm(), 4.0);
            assert_eq!(v.norm(2.0).unwrap(), 5.0);
            assert_eq!(v.norm(f64::INFINITY).unwrap(), 4.0);
            assert!((v.norm(3.0).unwrap() - 91.0f64.powf(1.0 / 3.0)).abs() < 1e-12);
            assert_eq!(v.absolute_maximum_index(), 2);
        }
        assert!(matches!(v.norm(0.5), Err(LinalgError::InvalidArgument { .. })));
        assert!(v.norm(f64::NAN).is_err());
        assert_eq!(Vector::<f64>::sparse(3).unwrap().absolute_maximum_index(), 0);
    }
}
