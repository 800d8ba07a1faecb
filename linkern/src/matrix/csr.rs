//! Compressed Sparse Row matrix storage
//!
//! For an `rows x cols` matrix with `nnz` stored entries:
//! - `row_pointers`: `rows + 1` non-decreasing offsets, row `r` owns
//!   `row_pointers[r]..row_pointers[r + 1]`
//! - `column_indices`: `nnz` columns, strictly ascending within a row
//! - `values`: `nnz` non-zero values
//!
//! Writing zero removes an entry and shifts the remainder of the
//! arrays left; writing a non-zero value to an absent position shifts
//! right and inserts.

use core::ops::Range;

use linkern_core::{
    validate_csr_parts, validate_position, validate_size, LinalgError, Result,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::dense::DenseMatrix;
use crate::config::kernel_config;
use crate::provider::{backend, Element};
use crate::vector::sparse::{grown_capacity, push_non_zero};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        try_from = "CsrParts<T>",
        bound(deserialize = "T: Element + serde::Deserialize<'de>")
    )
)]
pub struct CsrMatrix<T> {
    rows: usize,
    cols: usize,
    row_pointers: Vec<usize>,
    column_indices: Vec<usize>,
    values: Vec<T>,
}

/// Unchecked wire form, validated through [`CsrMatrix::from_parts`]
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct CsrParts<T> {
    rows: usize,
    cols: usize,
    row_pointers: Vec<usize>,
    column_indices: Vec<usize>,
    values: Vec<T>,
}

#[cfg(feature = "serde")]
impl<T: Element> TryFrom<CsrParts<T>> for CsrMatrix<T> {
    type Error = LinalgError;

    fn try_from(parts: CsrParts<T>) -> Result<Self> {
        Self::from_parts(
            parts.rows,
            parts.cols,
            parts.row_pointers,
            parts.column_indices,
            parts.values,
        )
    }
}

impl<T: Element> CsrMatrix<T> {
    /// Create an all-zero CSR matrix
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        validate_size(rows, cols)?;
        let pointer_count = rows
            .checked_add(1)
            .ok_or(LinalgError::InvalidSize { rows, cols })?;
        Ok(Self {
            rows,
            cols,
            row_pointers: vec![0; pointer_count],
            column_indices: Vec::new(),
            values: Vec::new(),
        })
    }

    /// Take ownership of pre-built parts after validating them
    pub fn from_parts(
        rows: usize,
        cols: usize,
        row_pointers: Vec<usize>,
        column_indices: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        validate_size(rows, cols)?;
        validate_csr_parts(rows, cols, &row_pointers, &column_indices, values.len())?;
        let mut matrix = Self {
            rows,
            cols,
            row_pointers,
            column_indices,
            values,
        };
        matrix.drop_stored_zeros();
        Ok(matrix)
    }

    /// Build from `(row, col, value)` triplets in any order
    ///
    /// Duplicate positions are summed; zero sums are dropped.
    pub fn from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, T)]) -> Result<Self> {
        validate_size(rows, cols)?;
        for &(row, col, _) in triplets {
            validate_position(row, col, rows, cols)?;
        }

        let mut sorted = triplets.to_vec();
        sorted.sort_by_key(|&(row, col, _)| (row, col));

        let mut row_pointers = vec![0; rows + 1];
        let mut column_indices = Vec::with_capacity(sorted.len());
        let mut values: Vec<T> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;
        for (row, col, value) in sorted {
            if last == Some((row, col)) {
                let tail = values.len() - 1;
                values[tail] = values[tail] + value;
                continue;
            }
            last = Some((row, col));
            row_pointers[row + 1] += 1;
            column_indices.push(col);
            values.push(value);
        }
        for r in 0..rows {
            row_pointers[r + 1] += row_pointers[r];
        }

        let mut matrix = Self {
            rows,
            cols,
            row_pointers,
            column_indices,
            values,
        };
        matrix.drop_stored_zeros();
        Ok(matrix)
    }

    /// Compress a dense matrix, keeping only non-zero entries
    pub fn from_dense(dense: &DenseMatrix<T>) -> Self {
        let (rows, cols) = (dense.rows(), dense.cols());
        let mut row_pointers = Vec::with_capacity(rows + 1);
        let mut column_indices = Vec::new();
        let mut values = Vec::new();
        row_pointers.push(0);
        for row in 0..rows {
            for col in 0..cols {
                let value = dense.get_unchecked(row, col);
                if !value.is_zero() {
                    column_indices.push(col);
                    values.push(value);
                }
            }
            row_pointers.push(values.len());
        }
        Self {
            rows,
            cols,
            row_pointers,
            column_indices,
            values,
        }
    }

    /// Expand into dense column-major storage
    pub fn to_dense(&self) -> DenseMatrix<T> {
        let mut values = vec![T::zero(); self.rows * self.cols];
        for row in 0..self.rows {
            for (col, value) in self.row_entries(row) {
                values[col * self.rows + row] = value;
            }
        }
        DenseMatrix::from_column_major(self.rows, self.cols, values)
            .unwrap_or_else(|_| unreachable!("shape validated at construction"))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row_pointers(&self) -> &[usize] {
        &self.row_pointers
    }

    pub fn column_indices(&self) -> &[usize] {
        &self.column_indices
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn non_zero_count(&self) -> usize {
        self.values.len()
    }

    /// Stored slot range of `row`
    pub fn row_range(&self, row: usize) -> Range<usize> {
        self.row_pointers[row]..self.row_pointers[row + 1]
    }

    /// Stored `(col, value)` pairs of `row` in ascending column order
    pub fn row_entries(&self, row: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let range = self.row_range(row);
        self.column_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Every stored `(row, col, value)` in row-major order
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        (0..self.rows).flat_map(move |row| {
            self.row_entries(row).map(move |(col, value)| (row, col, value))
        })
    }

    /// Locate `(row, col)` among the stored slots
    ///
    /// Returns `Ok(slot)` when stored, otherwise `Err(insertion_slot)`.
    pub fn find(&self, row: usize, col: usize) -> core::result::Result<usize, usize> {
        let range = self.row_range(row);
        let start = range.start;
        self.column_indices[range]
            .binary_search(&col)
            .map(|offset| start + offset)
            .map_err(|offset| start + offset)
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        validate_position(row, col, self.rows, self.cols)?;
        Ok(self.get_unchecked(row, col))
    }

    pub(crate) fn get_unchecked(&self, row: usize, col: usize) -> T {
        match self.find(row, col) {
            Ok(slot) => self.values[slot],
            Err(_) => T::zero(),
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        validate_position(row, col, self.rows, self.cols)?;
        self.set_unchecked(row, col, value);
        Ok(())
    }

    pub(crate) fn set_unchecked(&mut self, row: usize, col: usize, value: T) {
        match self.find(row, col) {
            Ok(slot) if value.is_zero() => self.remove_slot(row, slot),
            Ok(slot) => self.values[slot] = value,
            Err(_) if value.is_zero() => {}
            Err(slot) => self.insert_slot(row, slot, col, value),
        }
    }

    fn capacity(&self) -> usize {
        self.column_indices.capacity().min(self.values.capacity())
    }

    fn insert_slot(&mut self, row: usize, slot: usize, col: usize, value: T) {
        if self.values.len() == self.capacity() {
            let target = grown_capacity(self.capacity(), self.rows * self.cols);
            let additional = target.saturating_sub(self.values.len()).max(1);
            self.column_indices.reserve_exact(additional);
            self.values.reserve_exact(additional);
        }
        self.column_indices.insert(slot, col);
        self.values.insert(slot, value);
        for pointer in &mut self.row_pointers[row + 1..] {
            *pointer += 1;
        }
    }

    fn remove_slot(&mut self, row: usize, slot: usize) {
        self.column_indices.remove(slot);
        self.values.remove(slot);
        for pointer in &mut self.row_pointers[row + 1..] {
            *pointer -= 1;
        }
        self.shrink_if_underused();
    }

    fn shrink_if_underused(&mut self) {
        let capacity = self.capacity();
        if capacity > kernel_config().sparse_shrink_threshold && self.values.len() < capacity / 2 {
            self.column_indices.shrink_to_fit();
            self.values.shrink_to_fit();
        }
    }

    /// Drop every stored entry
    pub fn clear(&mut self) {
        self.column_indices.clear();
        self.values.clear();
        self.row_pointers.fill(0);
        self.shrink_if_underused();
    }

    /// Remove stored zeros and rebuild the row pointers
    pub(crate) fn drop_stored_zeros(&mut self) {
        if self.values.iter().all(|v| !v.is_zero()) {
            return;
        }
        let mut write = 0;
        let mut read = 0;
        for row in 0..self.rows {
            let end = self.row_pointers[row + 1];
            while read < end {
                if !self.values[read].is_zero() {
                    self.column_indices[write] = self.column_indices[read];
                    self.values[write] = self.values[read];
                    write += 1;
                }
                read += 1;
            }
            self.row_pointers[row + 1] = write;
        }
        self.column_indices.truncate(write);
        self.values.truncate(write);
        self.shrink_if_underused();
    }

    /// Multiply stored values by `factor`, safe in place
    pub fn scale_in_place(&mut self, factor: T) {
        if factor.is_zero() {
            self.clear();
            return;
        }
        backend::<T>().scale(&mut self.values, factor);
        // Underflow can turn tiny products into zeros
        self.drop_stored_zeros();
    }

    /// Apply `f(row, col, value)` to stored values only, then drop resulting zeros
    pub(crate) fn map_stored(&mut self, f: impl Fn(usize, usize, T) -> T) {
        for row in 0..self.rows {
            for slot in self.row_pointers[row]..self.row_pointers[row + 1] {
                self.values[slot] = f(row, self.column_indices[slot], self.values[slot]);
            }
        }
        self.drop_stored_zeros();
    }

    /// Keep only entries whose position satisfies `keep`
    pub fn filter(&self, keep: impl Fn(usize, usize) -> bool) -> Self {
        let mut row_pointers = Vec::with_capacity(self.rows + 1);
        let mut column_indices = Vec::new();
        let mut values = Vec::new();
        row_pointers.push(0);
        for row in 0..self.rows {
            for (col, value) in self.row_entries(row) {
                if keep(row, col) {
                    column_indices.push(col);
                    values.push(value);
                }
            }
            row_pointers.push(values.len());
        }
        Self {
            rows: self.rows,
            cols: self.cols,
            row_pointers,
            column_indices,
            values,
        }
    }

    /// Transpose by scattering every entry into its column's bucket
    ///
    /// Counts entries per column, turns the counts into row pointers of
    /// the transposed matrix, then walks rows in order so each bucket
    /// receives ascending row indices.
    pub fn transpose(&self) -> Self {
        let nnz = self.values.len();
        let mut row_pointers = vec![0; self.cols + 1];
        for &col in &self.column_indices {
            row_pointers[col + 1] += 1;
        }
        for c in 0..self.cols {
            row_pointers[c + 1] += row_pointers[c];
        }

        let mut next = row_pointers.clone();
        let mut column_indices = vec![0; nnz];
        let mut values = vec![T::zero(); nnz];
        for row in 0..self.rows {
            for (col, value) in self.row_entries(row) {
                let slot = next[col];
                column_indices[slot] = row;
                values[slot] = value;
                next[col] += 1;
            }
        }

        Self {
            rows: self.cols,
            cols: self.rows,
            row_pointers,
            column_indices,
            values,
        }
    }

    /// Two-pointer row merge of `a` and `b` with `op`
    ///
    /// Absent entries enter `op` as zero. Results that are exactly zero
    /// are not stored.
    pub fn merge(a: &Self, b: &Self, op: impl Fn(T, T) -> T) -> Self {
        debug_assert_eq!((a.rows, a.cols), (b.rows, b.cols));
        let mut row_pointers = Vec::with_capacity(a.rows + 1);
        let mut column_indices = Vec::with_capacity(a.values.len().max(b.values.len()));
        let mut values = Vec::with_capacity(column_indices.capacity());
        row_pointers.push(0);

        for row in 0..a.rows {
            let (ra, rb) = (a.row_range(row), b.row_range(row));
            let (mut i, mut j) = (ra.start, rb.start);
            while i < ra.end && j < rb.end {
                let (ca, cb) = (a.column_indices[i], b.column_indices[j]);
                if ca < cb {
                    push_non_zero(&mut column_indices, &mut values, ca, op(a.values[i], T::zero()));
                    i += 1;
                } else if cb < ca {
                    push_non_zero(&mut column_indices, &mut values, cb, op(T::zero(), b.values[j]));
                    j += 1;
                } else {
                    push_non_zero(&mut column_indices, &mut values, ca, op(a.values[i], b.values[j]));
                    i += 1;
                    j += 1;
                }
            }
            for k in i..ra.end {
                push_non_zero(&mut column_indices, &mut values, a.column_indices[k], op(a.values[k], T::zero()));
            }
            for k in j..rb.end {
                push_non_zero(&mut column_indices, &mut values, b.column_indices[k], op(T::zero(), b.values[k]));
            }
            row_pointers.push(values.len());
        }

        Self {
            rows: a.rows,
            cols: a.cols,
            row_pointers,
            column_indices,
            values,
        }
    }

    /// Entries present in both `a` and `b`, combined with `op`
    pub fn intersect(a: &Self, b: &Self, op: impl Fn(T, T) -> T) -> Self {
        debug_assert_eq!((a.rows, a.cols), (b.rows, b.cols));
        let mut row_pointers = Vec::with_capacity(a.rows + 1);
        let mut column_indices = Vec::new();
        let mut values = Vec::new();
        row_pointers.push(0);
        for row in 0..a.rows {
            let (ra, rb) = (a.row_range(row), b.row_range(row));
            let (mut i, mut j) = (ra.start, rb.start);
            while i < ra.end && j < rb.end {
                let (ca, cb) = (a.column_indices[i], b.column_indices[j]);
                if ca < cb {
                    i += 1;
                } else if cb < ca {
                    j += 1;
                } else {
                    let value = op(a.values[i], b.values[j]);
                    if !value.is_zero() {
                        column_indices.push(ca);
                        values.push(value);
                    }
                    i += 1;
                    j += 1;
                }
            }
            row_pointers.push(values.len());
        }
        Self {
            rows: a.rows,
            cols: a.cols,
            row_pointers,
            column_indices,
            values,
        }
    }

    /// Sparse product `a * b` with a dense row accumulator
    pub fn multiply(a: &Self, b: &Self) -> Self {
        debug_assert_eq!(a.cols, b.rows);
        let cols = b.cols;
        let mut accumulator = vec![T::zero(); cols];
        let mut occupied = vec![false; cols];
        let mut touched: Vec<usize> = Vec::new();

        let mut row_pointers = Vec::with_capacity(a.rows + 1);
        let mut column_indices = Vec::new();
        let mut values = Vec::new();
        row_pointers.push(0);

        for row in 0..a.rows {
            for (k, a_value) in a.row_entries(row) {
                for (col, b_value) in b.row_entries(k) {
                    if !occupied[col] {
                        occupied[col] = true;
                        touched.push(col);
                    }
                    accumulator[col] = accumulator[col] + a_value * b_value;
                }
            }
            touched.sort_unstable();
            for &col in &touched {
                let value = accumulator[col];
                if !value.is_zero() {
                    column_indices.push(col);
                    values.push(value);
                }
                accumulator[col] = T::zero();
                occupied[col] = false;
            }
            touched.clear();
            row_pointers.push(values.len());
        }

        Self {
            rows: a.rows,
            cols,
            row_pointers,
            column_indices,
            values,
        }
    }

    /// Sparse dot product of stored row `row` with a dense column
    #[inline]
    fn row_dot(&self, row: usize, dense: &[T]) -> T {
        self.row_entries(row)
            .fold(T::zero(), |sum, (col, value)| sum + value * dense[col])
    }

    /// `self * x` for a dense `x` of length `cols`
    pub fn multiply_dense_vector(&self, x: &[T]) -> Vec<T> {
        debug_assert_eq!(x.len(), self.cols);
        let mut result = vec![T::zero(); self.rows];
        #[cfg(feature = "parallel")]
        if kernel_config().should_parallelize(self.values.len()) {
            result
                .par_iter_mut()
                .enumerate()
                .for_each(|(row, out)| *out = self.row_dot(row, x));
            return result;
        }
        for (row, out) in result.iter_mut().enumerate() {
            *out = self.row_dot(row, x);
        }
        result
    }

    /// `self^T * x` for a dense `x` of length `rows`
    pub fn transpose_multiply_dense_vector(&self, x: &[T]) -> Vec<T> {
        debug_assert_eq!(x.len(), self.rows);
        let mut result = vec![T::zero(); self.cols];
        for (row, &factor) in x.iter().enumerate() {
            if factor.is_zero() {
                continue;
            }
            for (col, value) in self.row_entries(row) {
                result[col] = result[col] + value * factor;
            }
        }
        result
    }

    /// `self * dense`, one dense column of the right operand at a time
    ///
    /// Each output column is the sparse dot product of every stored row
    /// against the matching dense column.
    pub fn multiply_dense(&self, dense: &DenseMatrix<T>) -> DenseMatrix<T> {
        debug_assert_eq!(self.cols, dense.rows());
        let (rows, cols) = (self.rows, dense.cols());
        let mut values = vec![T::zero(); rows * cols];
        let fill = |(j, out): (usize, &mut [T])| {
            let column = dense.column(j);
            for (row, value) in out.iter_mut().enumerate() {
                *value = self.row_dot(row, column);
            }
        };
        #[cfg(feature = "parallel")]
        if kernel_config().should_parallelize(self.values.len() * cols) {
            values.par_chunks_mut(rows).enumerate().for_each(fill);
            return DenseMatrix::from_column_major(rows, cols, values)
                .unwrap_or_else(|_| unreachable!("shape validated at construction"));
        }
        values.chunks_mut(rows).enumerate().for_each(fill);
        DenseMatrix::from_column_major(rows, cols, values)
            .unwrap_or_else(|_| unreachable!("shape validated at construction"))
    }

    /// `dense * self`, scattering each stored entry into an output column
    pub fn left_multiply_dense(dense: &DenseMatrix<T>, sparse: &Self) -> DenseMatrix<T> {
        debug_assert_eq!(dense.cols(), sparse.rows);
        let rows = dense.rows();
        let mut result = vec![T::zero(); rows * sparse.cols];
        for k in 0..sparse.rows {
            let source = dense.column(k);
            for (col, factor) in sparse.row_entries(k) {
                let out = &mut result[col * rows..(col + 1) * rows];
                for (o, &s) in out.iter_mut().zip(source) {
                    *o = *o + s * factor;
                }
            }
        }
        DenseMatrix::from_column_major(rows, sparse.cols, result)
            .unwrap_or_else(|_| unreachable!("shape validated at construction"))
    }

    /// Reorder rows so that row `i` moves to `permutation[i]`
    pub fn permute_rows(&self, permutation: &[usize]) -> Self {
        let mut inverse = vec![0; self.rows];
        for (from, &to) in permutation.iter().enumerate() {
            inverse[to] = from;
        }
        let mut row_pointers = Vec::with_capacity(self.rows + 1);
        let mut column_indices = Vec::with_capacity(self.values.len());
        let mut values = Vec::with_capacity(self.values.len());
        row_pointers.push(0);
        for &source in &inverse {
            let range = self.row_range(source);
            column_indices.extend_from_slice(&self.column_indices[range.clone()]);
            values.extend_from_slice(&self.values[range]);
            row_pointers.push(values.len());
        }
        Self {
            rows: self.rows,
            cols: self.cols,
            row_pointers,
            column_indices,
            values,
        }
    }

    /// Reorder columns so that column `c` moves to `permutation[c]`
    pub fn permute_columns(&self, permutation: &[usize]) -> Self {
        let mut result = self.clone();
        for row in 0..self.rows {
            let range = result.row_range(row);
            let mut entries: Vec<(usize, T)> = self
                .row_entries(row)
                .map(|(col, value)| (permutation[col], value))
                .collect();
            entries.sort_unstable_by_key(|&(col, _)| col);
            for (slot, (col, value)) in range.zip(entries) {
                result.column_indices[slot] = col;
                result.values[slot] = value;
            }
        }
        result
    }

    /// Sum of squares of stored values
    pub fn sum_of_squares(&self) -> f64 {
        self.values.iter().map(|v| v.to_f64() * v.to_f64()).sum()
    }

    /// Verify row pointer and column ordering invariants
    pub fn check_invariants(&self) -> Result<()> {
        validate_csr_parts(
            self.rows,
            self.cols,
            &self.row_pointers,
            &self.column_indices,
            self.values.len(),
        )?;
        if self.values.iter().any(|v| v.is_zero()) {
            return Err(LinalgError::InvalidStructure {
                reason: "stored zero in CSR values",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CsrMatrix<f64> {
        // [1 0 2]
        // [0 0 0]
        // [0 3 4]
        CsrMatrix::from_triplets(3, 3, &[(0, 0, 1.0), (0, 2, 2.0), (2, 1, 3.0), (2, 2, 4.0)])
            .unwrap()
    }

    #[test]
    fn test_from_triplets_sorts_and_sums() {
        let m = CsrMatrix::from_triplets(2, 2, &[(1, 1, 1.0), (0, 1, 2.0), (1, 1, 3.0), (0, 0, 0.0)])
            .unwrap();
        assert_eq!(m.row_pointers(), &[0, 1, 2]);
        assert_eq!(m.column_indices(), &[1, 1]);
        assert_eq!(m.values(), &[2.0, 4.0]);
        m.check_invariants().unwrap();
        assert!(CsrMatrix::from_triplets(2, 2, &[(2, 0, 1.0)]).is_err());
    }

    #[test]
    fn test_set_inserts_and_removes() {
        let mut m = sample();
        m.set(1, 1, 5.0).unwrap();
        assert_eq!(m.row_pointers(), &[0, 2, 3, 5]);
        assert_eq!(m.get(1, 1).unwrap(), 5.0);
        m.check_invariants().unwrap();

        m.set(0, 0, 0.0).unwrap();
        assert_eq!(m.non_zero_count(), 4);
        assert_eq!(m.get(0, 0).unwrap(), 0.0);
        assert_eq!(m.row_pointers(), &[0, 1, 2, 4]);
        m.check_invariants().unwrap();

        m.set(2, 0, 0.0).unwrap();
        assert_eq!(m.non_zero_count(), 4);
    }

    #[test]
    fn test_transpose() {
        let t = sample().transpose();
        assert_eq!(t.get(2, 0).unwrap(), 2.0);
        assert_eq!(t.get(1, 2).unwrap(), 3.0);
        assert_eq!(t.get(0, 2).unwrap(), 0.0);
        t.check_invariants().unwrap();
        assert_eq!(t.transpose(), sample());
    }

    #[test]
    fn test_merge_cancels_to_structural_zero() {
        let a = sample();
        let sum = CsrMatrix::merge(&a, &a, |x, y| x + y);
        assert_eq!(sum.get(2, 2).unwrap(), 8.0);
        assert_eq!(sum.row_pointers(), &[0, 2, 2, 4]);
        sum.check_invariants().unwrap();

        let b = CsrMatrix::from_triplets(3, 3, &[(0, 0, -1.0), (1, 1, 6.0), (2, 0, 5.0)]).unwrap();
        let mixed = CsrMatrix::merge(&a, &b, |x, y| x + y);
        assert_eq!(mixed.row_pointers(), &[0, 1, 2, 5]);
        assert_eq!(mixed.column_indices(), &[2, 1, 0, 1, 2]);
        assert_eq!(mixed.values(), &[2.0, 6.0, 5.0, 3.0, 4.0]);
        let difference = CsrMatrix::merge(&a, &a, |x, y| x - y);
        assert_eq!(difference.non_zero_count(), 0);
        difference.check_invariants().unwrap();
    }

    #[test]
    fn test_multiply_against_dense() {
        let a = sample();
        let product = CsrMatrix::multiply(&a, &a.transpose());
        let dense = a.to_dense();
        let expected = CsrMatrix::multiply_dense(&a, &dense.transpose());
        assert_eq!(product.to_dense(), expected);
        assert_eq!(product.get(0, 0).unwrap(), 5.0);
        assert_eq!(product.get(0, 2).unwrap(), 8.0);
        assert_eq!(product.get(2, 2).unwrap(), 25.0);
        product.check_invariants().unwrap();

        let left = CsrMatrix::left_multiply_dense(&dense, &a);
        assert_eq!(left, CsrMatrix::multiply(&a, &a).to_dense());
    }

    #[test]
    fn test_vector_products() {
        let a = sample();
        assert_eq!(a.multiply_dense_vector(&[1.0, 1.0, 1.0]), vec![3.0, 0.0, 7.0]);
        assert_eq!(a.transpose_multiply_dense_vector(&[1.0, 1.0, 1.0]), vec![1.0, 3.0, 6.0]);
    }

    #[test]
    fn test_permutations() {
        let a = sample();
        let rows = a.permute_rows(&[2, 0, 1]);
        assert_eq!(rows.get(2, 0).unwrap(), 1.0);
        assert_eq!(rows.get(1, 2).unwrap(), 4.0);
        rows.check_invariants().unwrap();

        let cols = a.permute_columns(&[2, 0, 1]);
        assert_eq!(cols.get(0, 2).unwrap(), 1.0);
        assert_eq!(cols.get(0, 1).unwrap(), 2.0);
        cols.check_invariants().unwrap();
    }

    #[test]
    fn test_dense_round_trip() {
        let a = sample();
        assert_eq!(CsrMatrix::from_dense(&a.to_dense()), a);
    }

    #[test]
    fn test_new_rejects_unaddressable_row_count() {
        assert_eq!(
            CsrMatrix::<f64>::new(usize::MAX, 1).unwrap_err(),
            LinalgError::InvalidSize {
                rows: usize::MAX,
                cols: 1
            }
        );
    }

    #[test]
    fn test_storage_shrinks_once_under_half_used() {
        let threshold = kernel_config().sparse_shrink_threshold;
        let order = 64;
        let mut m = CsrMatrix::<f64>::new(order, order).unwrap();
        let positions: Vec<(usize, usize)> = (0..threshold * 2)
            .map(|i| (i / order, i % order))
            .collect();
        for &(row, col) in &positions {
            m.set(row, col, 1.0).unwrap();
        }
        let peak = m.capacity();
        assert!(peak > threshold);

        for &(row, col) in &positions[100..] {
            m.set(row, col, 0.0).unwrap();
        }
        assert_eq!(m.non_zero_count(), 100);
        assert!(m.capacity() <= threshold);
        m.check_invariants().unwrap();
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_validates_parts() {
        let m: CsrMatrix<f64> = serde_json::from_str(
            r#"{"rows":2,"cols":2,"row_pointers":[0,1,1],"column_indices":[1],"values":[3.0]}"#,
        )
        .unwrap();
        assert_eq!(m.get(0, 1).unwrap(), 3.0);

        let short_pointers = serde_json::from_str::<CsrMatrix<f64>>(
            r#"{"rows":2,"cols":2,"row_pointers":[0],"column_indices":[7],"values":[1.0]}"#,
        );
        assert!(short_pointers.is_err());
        let column_out_of_range = serde_json::from_str::<CsrMatrix<f64>>(
            r#"{"rows":1,"cols":2,"row_pointers":[0,1],"column_indices":[2],"values":[1.0]}"#,
        );
        assert!(column_out_of_range.is_err());
    }
}
