//! Symmetric matrix storage
//!
//! Full `order x order` column-major storage, but only the upper
//! triangle (`col >= row`) is ever written. Lower-triangle reads are
//! redirected to the mirrored position, so `at(r, c) == at(c, r)` holds
//! by construction.

use linkern_core::{validate_position, validate_size, LinalgError, MatrixKind, Result};

use super::dense::DenseMatrix;
use super::diagonal::DiagonalMatrix;
use crate::provider::{backend, Element};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        try_from = "SymmetricParts<T>",
        bound(deserialize = "T: Element + serde::Deserialize<'de>")
    )
)]
pub struct SymmetricMatrix<T> {
    order: usize,
    values: Vec<T>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct SymmetricParts<T> {
    order: usize,
    values: Vec<T>,
}

#[cfg(feature = "serde")]
impl<T: Element> TryFrom<SymmetricParts<T>> for SymmetricMatrix<T> {
    type Error = LinalgError;

    /// Accept a full column-major array whose lower triangle is unwritten
    fn try_from(parts: SymmetricParts<T>) -> Result<Self> {
        let mut matrix = Self::new(parts.order)?;
        let n = parts.order;
        if parts.values.len() != matrix.values.len() {
            return Err(LinalgError::dimension_mismatch(
                "symmetric_from_parts",
                (n, n),
                (parts.values.len(), 1),
            ));
        }
        for col in 0..n {
            for row in col + 1..n {
                if !parts.values[col * n + row].is_zero() {
                    return Err(LinalgError::InvalidStructure {
                        reason: "symmetric storage holds a value below the diagonal",
                    });
                }
            }
        }
        matrix.values = parts.values;
        Ok(matrix)
    }
}

impl<T: Element> SymmetricMatrix<T> {
    /// Create an all-zero symmetric matrix
    pub fn new(order: usize) -> Result<Self> {
        validate_size(order, order)?;
        Ok(Self {
            order,
            values: vec![T::zero(); order * order],
        })
    }

    /// Build from the upper triangle given row by row
    ///
    /// Row `r` holds the `order - r` values of columns `r..order`.
    pub fn from_upper(upper: &[&[T]]) -> Result<Self> {
        let mut matrix = Self::new(upper.len())?;
        for (row, values) in upper.iter().enumerate() {
            if values.len() != matrix.order - row {
                return Err(LinalgError::dimension_mismatch(
                    "symmetric_from_upper",
                    (1, matrix.order - row),
                    (1, values.len()),
                ));
            }
            for (offset, &value) in values.iter().enumerate() {
                matrix.set_upper(row, row + offset, value);
            }
        }
        Ok(matrix)
    }

    /// Copy a dense matrix that is already symmetric
    pub fn from_dense(dense: &DenseMatrix<T>) -> Result<Self> {
        if dense.rows() != dense.cols() {
            return Err(LinalgError::structural(
                MatrixKind::Symmetric,
                "source matrix is not square",
            ));
        }
        let order = dense.rows();
        for col in 0..order {
            for row in 0..col {
                if dense.get_unchecked(row, col) != dense.get_unchecked(col, row) {
                    return Err(LinalgError::structural(
                        MatrixKind::Symmetric,
                        "source matrix is not symmetric",
                    ));
                }
            }
        }
        let mut matrix = Self::new(order)?;
        for col in 0..order {
            for row in 0..=col {
                matrix.set_upper(row, col, dense.get_unchecked(row, col));
            }
        }
        Ok(matrix)
    }

    /// Symmetric matrix with `diagonal` on its diagonal
    pub fn from_diagonal(diagonal: &DiagonalMatrix<T>) -> Result<Self> {
        if diagonal.rows() != diagonal.cols() {
            return Err(LinalgError::structural(
                MatrixKind::Symmetric,
                "source matrix is not square",
            ));
        }
        let mut matrix = Self::new(diagonal.rows())?;
        for (i, &value) in diagonal.values().iter().enumerate() {
            matrix.set_upper(i, i, value);
        }
        Ok(matrix)
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn rows(&self) -> usize {
        self.order
    }

    pub fn cols(&self) -> usize {
        self.order
    }

    #[inline]
    fn slot(&self, row: usize, col: usize) -> usize {
        // Lower-triangle positions are served by their mirror
        let (row, col) = if col < row { (col, row) } else { (row, col) };
        col * self.order + row
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        validate_position(row, col, self.order, self.order)?;
        Ok(self.get_unchecked(row, col))
    }

    #[inline]
    pub(crate) fn get_unchecked(&self, row: usize, col: usize) -> T {
        self.values[self.slot(row, col)]
    }

    /// Write `(row, col)` and, implicitly, `(col, row)`
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        validate_position(row, col, self.order, self.order)?;
        let slot = self.slot(row, col);
        self.values[slot] = value;
        Ok(())
    }

    #[inline]
    fn set_upper(&mut self, row: usize, col: usize, value: T) {
        debug_assert!(row <= col);
        self.values[col * self.order + row] = value;
    }

    pub fn clear(&mut self) {
        self.values.fill(T::zero());
    }

    pub fn non_zero_count(&self) -> usize {
        (0..self.order)
            .flat_map(|col| (0..self.order).map(move |row| (row, col)))
            .filter(|&(row, col)| !self.get_unchecked(row, col).is_zero())
            .count()
    }

    /// Expand into dense storage with both triangles filled
    pub fn to_dense(&self) -> DenseMatrix<T> {
        let n = self.order;
        let mut values = vec![T::zero(); n * n];
        for col in 0..n {
            for row in 0..n {
                values[col * n + row] = self.get_unchecked(row, col);
            }
        }
        DenseMatrix::from_column_major(n, n, values)
            .unwrap_or_else(|_| unreachable!("shape validated at construction"))
    }

    /// Apply `f(row, col, value)` to the upper triangle only
    pub(crate) fn map_upper(&mut self, f: impl Fn(usize, usize, T) -> T) {
        let n = self.order;
        for col in 0..n {
            for row in 0..=col {
                let slot = col * n + row;
                self.values[slot] = f(row, col, self.values[slot]);
            }
        }
    }

    /// Combine two symmetric matrices over the upper triangle
    pub fn zip_upper(a: &Self, b: &Self, op: impl Fn(T, T) -> T) -> Self {
        debug_assert_eq!(a.order, b.order);
        let mut result = a.clone();
        result.map_upper(|row, col, x| op(x, b.get_unchecked(row, col)));
        result
    }

    /// Multiply every stored value by `factor`
    ///
    /// The unwritten lower half stays zero.
    pub fn scale_in_place(&mut self, factor: T) {
        backend::<T>().scale(&mut self.values, factor);
    }

    /// `self * x` visiting the upper triangle once per entry
    pub fn multiply_dense_vector(&self, x: &[T]) -> Vec<T> {
        let n = self.order;
        let mut result = vec![T::zero(); n];
        for col in 0..n {
            for row in 0..col {
                let value = self.values[col * n + row];
                result[row] = result[row] + value * x[col];
                result[col] = result[col] + value * x[row];
            }
            result[col] = result[col] + self.values[col * n + col] * x[col];
        }
        result
    }
}
