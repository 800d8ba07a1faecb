//! Diagonal matrix storage
//!
//! One value per diagonal position, `min(rows, cols)` in total. Every
//! off-diagonal position is a structural zero that cannot be set.

use linkern_core::{validate_position, validate_size, LinalgError, MatrixKind, Result};

use super::dense::DenseMatrix;
use crate::provider::{backend, Element};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        try_from = "DiagonalParts<T>",
        bound(deserialize = "T: Element + serde::Deserialize<'de>")
    )
)]
pub struct DiagonalMatrix<T> {
    rows: usize,
    cols: usize,
    values: Vec<T>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct DiagonalParts<T> {
    rows: usize,
    cols: usize,
    values: Vec<T>,
}

#[cfg(feature = "serde")]
impl<T: Element> TryFrom<DiagonalParts<T>> for DiagonalMatrix<T> {
    type Error = LinalgError;

    fn try_from(parts: DiagonalParts<T>) -> Result<Self> {
        Self::from_values(parts.rows, parts.cols, parts.values)
    }
}

impl<T: Element> DiagonalMatrix<T> {
    /// Create an all-zero diagonal matrix
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        validate_size(rows, cols)?;
        Ok(Self {
            rows,
            cols,
            values: vec![T::zero(); rows.min(cols)],
        })
    }

    /// Take ownership of the diagonal values
    pub fn from_values(rows: usize, cols: usize, values: Vec<T>) -> Result<Self> {
        validate_size(rows, cols)?;
        let length = rows.min(cols);
        if values.len() != length {
            return Err(LinalgError::dimension_mismatch(
                "diagonal_from_values",
                (length, 1),
                (values.len(), 1),
            ));
        }
        Ok(Self { rows, cols, values })
    }

    pub fn identity(order: usize) -> Result<Self> {
        validate_size(order, order)?;
        Ok(Self {
            rows: order,
            cols: order,
            values: vec![T::one(); order],
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Diagonal values, `min(rows, cols)` long
    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        validate_position(row, col, self.rows, self.cols)?;
        Ok(self.get_unchecked(row, col))
    }

    #[inline]
    pub(crate) fn get_unchecked(&self, row: usize, col: usize) -> T {
        if row == col {
            self.values[row]
        } else {
            T::zero()
        }
    }

    /// Write `(row, col)`
    ///
    /// Zero off the diagonal is accepted as a no-op; any other
    /// off-diagonal value is a structural violation.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        validate_position(row, col, self.rows, self.cols)?;
        if row == col {
            self.values[row] = value;
            Ok(())
        } else if value.is_zero() {
            Ok(())
        } else {
            Err(LinalgError::structural(
                MatrixKind::Diagonal,
                "cannot store a non-zero value off the diagonal",
            ))
        }
    }

    pub(crate) fn accepts(&self, row: usize, col: usize, value: T) -> bool {
        row == col || value.is_zero()
    }

    pub fn clear(&mut self) {
        self.values.fill(T::zero());
    }

    pub fn non_zero_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_zero()).count()
    }

    pub fn to_dense(&self) -> DenseMatrix<T> {
        let mut values = vec![T::zero(); self.rows * self.cols];
        for (i, &value) in self.values.iter().enumerate() {
            values[i * self.rows + i] = value;
        }
        DenseMatrix::from_column_major(self.rows, self.cols, values)
            .unwrap_or_else(|_| unreachable!("shape validated at construction"))
    }

    /// Same diagonal with swapped dimensions
    pub fn transpose(&self) -> Self {
        Self {
            rows: self.cols,
            cols: self.rows,
            values: self.values.clone(),
        }
    }

    pub fn scale_in_place(&mut self, factor: T) {
        backend::<T>().scale(&mut self.values, factor);
    }

    /// Combine diagonals element by element
    pub fn zip(a: &Self, b: &Self, op: impl Fn(T, T) -> T) -> Self {
        debug_assert_eq!((a.rows, a.cols), (b.rows, b.cols));
        Self {
            rows: a.rows,
            cols: a.cols,
            values: a.values.iter().zip(&b.values).map(|(&x, &y)| op(x, y)).collect(),
        }
    }

    /// Product of two diagonal matrices
    ///
    /// The result is `a.rows x b.cols`; only the leading
    /// `min(a.rows, b.cols)` positions can be non-zero.
    pub fn multiply(a: &Self, b: &Self) -> Self {
        debug_assert_eq!(a.cols, b.rows);
        let (rows, cols) = (a.rows, b.cols);
        let values = (0..rows.min(cols))
            .map(|i| match (a.values.get(i), b.values.get(i)) {
                (Some(&x), Some(&y)) => x * y,
                _ => T::zero(),
            })
            .collect();
        Self { rows, cols, values }
    }

    /// `self * x` for a dense `x` of length `cols`
    pub fn multiply_dense_vector(&self, x: &[T]) -> Vec<T> {
        let mut result = vec![T::zero(); self.rows];
        let length = self.values.len();
        backend::<T>().pointwise_multiply(&self.values, &x[..length], &mut result[..length]);
        result
    }

    /// `self * dense`: row `i` of `dense` scaled by the `i`-th diagonal value
    pub fn multiply_dense(&self, dense: &DenseMatrix<T>) -> DenseMatrix<T> {
        debug_assert_eq!(self.cols, dense.rows());
        let (rows, cols) = (self.rows, dense.cols());
        let mut values = vec![T::zero(); rows * cols];
        let length = self.values.len();
        let provider = backend::<T>();
        for (j, out) in values.chunks_mut(rows).enumerate() {
            provider.pointwise_multiply(&self.values, &dense.column(j)[..length], &mut out[..length]);
        }
        DenseMatrix::from_column_major(rows, cols, values)
            .unwrap_or_else(|_| unreachable!("shape validated at construction"))
    }

    /// `dense * self`: column `j` of `dense` scaled by the `j`-th diagonal value
    pub fn left_multiply_dense(dense: &DenseMatrix<T>, diagonal: &Self) -> DenseMatrix<T> {
        debug_assert_eq!(dense.cols(), diagonal.rows);
        let (rows, cols) = (dense.rows(), diagonal.cols);
        let mut values = vec![T::zero(); rows * cols];
        let provider = backend::<T>();
        for (j, &factor) in diagonal.values.iter().enumerate() {
            provider.scale_into(dense.column(j), factor, &mut values[j * rows..(j + 1) * rows]);
        }
        DenseMatrix::from_column_major(rows, cols, values)
            .unwrap_or_else(|_| unreachable!("shape validated at construction"))
    }

    /// Reciprocal of every diagonal value
    pub fn inverse(&self) -> Result<Self> {
        if self.rows != self.cols {
            return Err(LinalgError::dimension_mismatch(
                "inverse",
                (self.rows, self.rows),
                (self.rows, self.cols),
            ));
        }
        if let Some(index) = self.values.iter().position(|v| v.is_zero()) {
            return Err(LinalgError::Singular { index });
        }
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            values: self.values.iter().map(|&v| T::one() / v).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_off_diagonal_rejection_leaves_matrix_unchanged() {
        let mut m = DiagonalMatrix::from_values(3, 3, vec![1.0, 2.0, 3.0]).unwrap();
        let before = m.clone();
        let err = m.set(0, 1, 4.0).unwrap_err();
        assert!(matches!(err, LinalgError::StructuralViolation { .. }));
        assert_eq!(m, before);

        m.set(0, 1, 0.0).unwrap();
        m.set(2, 2, 9.0).unwrap();
        assert_eq!(m.get(2, 2).unwrap(), 9.0);
        assert_eq!(m.get(2, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_rectangular_shape() {
        let m = DiagonalMatrix::from_values(2, 4, vec![1.0, 2.0]).unwrap();
        assert_eq!(m.values().len(), 2);
        let t = m.transpose();
        assert_eq!((t.rows(), t.cols()), (4, 2));
        assert!(DiagonalMatrix::from_values(2, 4, vec![1.0]).is_err());
    }

    #[test]
    fn test_inverse() {
        let m = DiagonalMatrix::from_values(2, 2, vec![2.0, 4.0]).unwrap();
        assert_eq!(m.inverse().unwrap().values(), &[0.5, 0.25]);

        let singular = DiagonalMatrix::from_values(3, 3, vec![1.0, 0.0, 2.0]).unwrap();
        assert_eq!(
            singular.inverse().unwrap_err(),
            LinalgError::Singular { index: 1 }
        );
    }

    #[test]
    fn test_products() {
        let d = DiagonalMatrix::from_values(2, 2, vec![2.0, 3.0]).unwrap();
        let dense = DenseMatrix::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
        let left = d.multiply_dense(&dense);
        assert_eq!(left.values(), &[2.0, 9.0, 4.0, 12.0]);
        let right = DiagonalMatrix::left_multiply_dense(&dense, &d);
        assert_eq!(right.values(), &[2.0, 6.0, 6.0, 12.0]);
        assert_eq!(d.multiply_dense_vector(&[1.0, 1.0]), vec![2.0, 3.0]);
        assert_eq!(DiagonalMatrix::multiply(&d, &d).values(), &[4.0, 9.0]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_checks_diagonal_length() {
        let m: DiagonalMatrix<f64> =
            serde_json::from_str(r#"{"rows":2,"cols":3,"values":[1.0,2.0]}"#).unwrap();
        assert_eq!(m.get(1, 1).unwrap(), 2.0);
        assert!(
            serde_json::from_str::<DiagonalMatrix<f64>>(r#"{"rows":2,"cols":3,"values":[1.0,2.0,3.0]}"#)
                .is_err()
        );
    }
}
