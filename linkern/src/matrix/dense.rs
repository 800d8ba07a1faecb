//! Dense column-major matrix storage
//!
//! Element `(r, c)` lives at `c * rows + r`.

use linkern_core::{validate_position, validate_size, LinalgError, Result};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "parallel")]
use crate::config::kernel_config;
use crate::provider::{backend, Element};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        try_from = "DenseParts<T>",
        bound(deserialize = "T: Element + serde::Deserialize<'de>")
    )
)]
pub struct DenseMatrix<T> {
    rows: usize,
    cols: usize,
    values: Vec<T>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct DenseParts<T> {
    rows: usize,
    cols: usize,
    values: Vec<T>,
}

#[cfg(feature = "serde")]
impl<T: Element> TryFrom<DenseParts<T>> for DenseMatrix<T> {
    type Error = LinalgError;

    fn try_from(parts: DenseParts<T>) -> Result<Self> {
        Self::from_column_major(parts.rows, parts.cols, parts.values)
    }
}

impl<T: Element> DenseMatrix<T> {
    /// Create a zero matrix
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        validate_size(rows, cols)?;
        Ok(Self {
            rows,
            cols,
            values: vec![T::zero(); rows * cols],
        })
    }

    /// Take ownership of a column-major array without copying
    pub fn from_column_major(rows: usize, cols: usize, values: Vec<T>) -> Result<Self> {
        validate_size(rows, cols)?;
        if values.len() != rows * cols {
            return Err(LinalgError::dimension_mismatch(
                "from_column_major",
                (rows, cols),
                (values.len(), 1),
            ));
        }
        Ok(Self { rows, cols, values })
    }

    /// Copy a slice of equally long rows
    pub fn from_rows(rows: &[&[T]]) -> Result<Self> {
        let first = rows.first().ok_or(LinalgError::MissingArgument { name: "rows" })?;
        let (row_count, col_count) = (rows.len(), first.len());
        validate_size(row_count, col_count)?;
        if let Some(bad) = rows.iter().find(|row| row.len() != col_count) {
            return Err(LinalgError::dimension_mismatch(
                "from_rows",
                (1, col_count),
                (1, bad.len()),
            ));
        }
        let mut values = Vec::with_capacity(row_count * col_count);
        for col in 0..col_count {
            values.extend(rows.iter().map(|row| row[col]));
        }
        Ok(Self {
            rows: row_count,
            cols: col_count,
            values,
        })
    }

    /// Square identity matrix
    pub fn identity(order: usize) -> Result<Self> {
        let mut matrix = Self::new(order, order)?;
        for i in 0..order {
            matrix.values[i * order + i] = T::one();
        }
        Ok(matrix)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Column-major backing array
    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Release the column-major backing array
    pub fn into_vec(self) -> Vec<T> {
        self.values
    }

    pub fn column(&self, col: usize) -> &[T] {
        &self.values[col * self.rows..(col + 1) * self.rows]
    }

    pub fn column_mut(&mut self, col: usize) -> &mut [T] {
        &mut self.values[col * self.rows..(col + 1) * self.rows]
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        validate_position(row, col, self.rows, self.cols)?;
        Ok(self.get_unchecked(row, col))
    }

    #[inline]
    pub(crate) fn get_unchecked(&self, row: usize, col: usize) -> T {
        self.values[col * self.rows + row]
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        validate_position(row, col, self.rows, self.cols)?;
        self.set_unchecked(row, col, value);
        Ok(())
    }

    #[inline]
    pub(crate) fn set_unchecked(&mut self, row: usize, col: usize, value: T) {
        self.values[col * self.rows + row] = value;
    }

    pub fn clear(&mut self) {
        self.values.fill(T::zero());
    }

    pub fn non_zero_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_zero()).count()
    }

    pub fn scale_in_place(&mut self, factor: T) {
        backend::<T>().scale(&mut self.values, factor);
    }

    /// Apply `f(row, col, value)` to every element, one column per task
    pub(crate) fn map_indexed_in_place(&mut self, f: impl Fn(usize, usize, T) -> T + Sync) {
        let rows = self.rows;
        let apply = |(col, column): (usize, &mut [T])| {
            for (row, value) in column.iter_mut().enumerate() {
                *value = f(row, col, *value);
            }
        };
        #[cfg(feature = "parallel")]
        if kernel_config().should_parallelize(self.values.len()) {
            self.values.par_chunks_mut(rows).enumerate().for_each(apply);
            return;
        }
        self.values.chunks_mut(rows).enumerate().for_each(apply);
    }

    /// Transposed copy, output columns filled independently
    pub fn transpose(&self) -> Self {
        let (rows, cols) = (self.rows, self.cols);
        let mut values = vec![T::zero(); rows * cols];
        // Output column `r` is input row `r`
        let fill = |(r, out): (usize, &mut [T])| {
            for (c, value) in out.iter_mut().enumerate() {
                *value = self.values[c * rows + r];
            }
        };
        #[cfg(feature = "parallel")]
        if kernel_config().should_parallelize(values.len()) {
            values.par_chunks_mut(cols).enumerate().for_each(fill);
            return Self {
                rows: cols,
                cols: rows,
                values,
            };
        }
        values.chunks_mut(cols).enumerate().for_each(fill);
        Self {
            rows: cols,
            cols: rows,
            values,
        }
    }

    /// Copy out row `row` as a contiguous array
    pub fn row_to_vec(&self, row: usize) -> Vec<T> {
        (0..self.cols).map(|c| self.get_unchecked(row, c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_major_layout() {
        let m = DenseMatrix::from_rows(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(m.values(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(m.get(1, 2).unwrap(), 6.0);
        assert!(m.get(2, 0).is_err());
        assert_eq!(m.column(1), &[2.0, 5.0]);
        assert_eq!(m.row_to_vec(0), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_transpose() {
        let m = DenseMatrix::from_rows(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]).unwrap();
        let t = m.transpose();
        assert_eq!((t.rows(), t.cols()), (3, 2));
        assert_eq!(t.get(2, 1).unwrap(), 6.0);
        assert_eq!(t.get(0, 1).unwrap(), 4.0);
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(DenseMatrix::<f64>::new(0, 3).is_err());
        assert!(DenseMatrix::from_column_major(2, 2, vec![1.0, 2.0, 3.0]).is_err());
        assert!(DenseMatrix::<f64>::from_rows(&[]).is_err());
        assert!(DenseMatrix::from_rows(&[&[1.0, 2.0], &[3.0]]).is_err());
    }

    #[test]
    fn test_map_indexed_in_place() {
        let mut m = DenseMatrix::<f64>::identity(3).unwrap();
        m.map_indexed_in_place(|r, c, v| v + (r * 10 + c) as f64);
        assert_eq!(m.get(2, 1).unwrap(), 21.0);
        assert_eq!(m.get(1, 1).unwrap(), 12.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_checks_length() {
        let m: DenseMatrix<f64> =
            serde_json::from_str(r#"{"rows":1,"cols":2,"values":[1.0,2.0]}"#).unwrap();
        assert_eq!(m.get(0, 1).unwrap(), 2.0);
        assert!(serde_json::from_str::<DenseMatrix<f64>>(r#"{"rows":2,"cols":2,"values":[1.0]}"#).is_err());
        assert!(serde_json::from_str::<DenseMatrix<f64>>(r#"{"rows":0,"cols":2,"values":[]}"#).is_err());
    }
}
