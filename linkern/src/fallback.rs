//! Generic fallback kernels
//!
//! Representation-agnostic nested loops written only against the
//! accessor contracts. Always correct, never sparsity- or cache-aware.
//! Results are first gathered into a column-major buffer so that the
//! output can be validated in full before a single value is written.

use linkern_core::{
    LinalgError, MatrixAccess, MatrixAccessMut, MatrixKind, Result, Scalar, VectorAccess,
    VectorAccessMut, VectorKind,
};
use tracing::debug;

/// Record that the dispatcher fell back for `operation`
pub(crate) fn note_matrix_fallback(operation: &'static str, kinds: &[MatrixKind]) {
    debug!(operation, kinds = ?kinds, "no specialized kernel, using generic fallback");
}

pub(crate) fn note_vector_fallback(operation: &'static str, kinds: &[VectorKind]) {
    debug!(operation, kinds = ?kinds, "no specialized vector kernel, using generic fallback");
}

/// Map every element of a vector
pub(crate) fn map_vector<T, A>(a: &A, f: impl Fn(T) -> T) -> Vec<T>
where
    T: Scalar,
    A: VectorAccess<Element = T>,
{
    (0..a.count()).map(|i| f(a.get_unchecked(i))).collect()
}

/// Combine two equally sized vectors element by element
pub(crate) fn zip_vectors<T, A, B>(a: &A, b: &B, op: impl Fn(T, T) -> T) -> Vec<T>
where
    T: Scalar,
    A: VectorAccess<Element = T>,
    B: VectorAccess<Element = T>,
{
    debug_assert_eq!(a.count(), b.count());
    (0..a.count())
        .map(|i| op(a.get_unchecked(i), b.get_unchecked(i)))
        .collect()
}

/// Overwrite `result` with `values`
pub(crate) fn write_vector<T, R>(result: &mut R, values: &[T]) -> Result<()>
where
    T: Scalar,
    R: VectorAccessMut<Element = T>,
{
    debug_assert_eq!(result.count(), values.len());
    result.clear();
    for (i, &value) in values.iter().enumerate() {
        if !value.is_zero() {
            result.set(i, value)?;
        }
    }
    Ok(())
}

/// Combine two equally shaped matrices element by element, column-major
pub(crate) fn zip_matrices<T, A, B>(a: &A, b: &B, op: impl Fn(T, T) -> T) -> Vec<T>
where
    T: Scalar,
    A: MatrixAccess<Element = T>,
    B: MatrixAccess<Element = T>,
{
    let (rows, cols) = a.dimensions();
    debug_assert_eq!((rows, cols), b.dimensions());
    let mut values = Vec::with_capacity(rows * cols);
    for col in 0..cols {
        for row in 0..rows {
            values.push(op(a.at_unchecked(row, col), b.at_unchecked(row, col)));
        }
    }
    values
}

/// Map every element of a matrix, column-major
pub(crate) fn map_matrix<T, A>(a: &A, f: impl Fn(usize, usize, T) -> T) -> Vec<T>
where
    T: Scalar,
    A: MatrixAccess<Element = T>,
{
    let (rows, cols) = a.dimensions();
    let mut values = Vec::with_capacity(rows * cols);
    for col in 0..cols {
        for row in 0..rows {
            values.push(f(row, col, a.at_unchecked(row, col)));
        }
    }
    values
}

/// Transpose through indexed reads, column-major in the swapped shape
pub(crate) fn transposed<T, A>(a: &A) -> Vec<T>
where
    T: Scalar,
    A: MatrixAccess<Element = T>,
{
    let (rows, cols) = a.dimensions();
    let mut values = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            values.push(a.at_unchecked(row, col));
        }
    }
    values
}

/// Matrix product through indexed reads, column-major
pub(crate) fn product<T, A, B>(a: &A, b: &B) -> Vec<T>
where
    T: Scalar,
    A: MatrixAccess<Element = T>,
    B: MatrixAccess<Element = T>,
{
    let (rows, inner) = a.dimensions();
    let cols = b.column_count();
    debug_assert_eq!(inner, b.row_count());
    let mut values = vec![T::zero(); rows * cols];
    for col in 0..cols {
        for k in 0..inner {
            let factor = b.at_unchecked(k, col);
            for row in 0..rows {
                let slot = col * rows + row;
                values[slot] = values[slot] + a.at_unchecked(row, k) * factor;
            }
        }
    }
    values
}

/// Matrix-vector product through indexed reads
pub(crate) fn product_vector<T, A, V>(a: &A, v: &V) -> Vec<T>
where
    T: Scalar,
    A: MatrixAccess<Element = T>,
    V: VectorAccess<Element = T>,
{
    let (rows, cols) = a.dimensions();
    let mut values = vec![T::zero(); rows];
    for col in 0..cols {
        let factor = v.get_unchecked(col);
        for (row, value) in values.iter_mut().enumerate() {
            *value = *value + a.at_unchecked(row, col) * factor;
        }
    }
    values
}

/// Transposed matrix-vector product through indexed reads
pub(crate) fn transpose_product_vector<T, A, V>(a: &A, v: &V) -> Vec<T>
where
    T: Scalar,
    A: MatrixAccess<Element = T>,
    V: VectorAccess<Element = T>,
{
    let (rows, cols) = a.dimensions();
    (0..cols)
        .map(|col| {
            (0..rows).fold(T::zero(), |sum, row| {
                sum + a.at_unchecked(row, col) * v.get_unchecked(row)
            })
        })
        .collect()
}

/// Overwrite `result` with a column-major buffer
///
/// Checks that `result` can represent every value before clearing it,
/// so a rejected write leaves `result` untouched.
pub(crate) fn write_matrix<T, R>(result: &mut R, values: &[T]) -> Result<()>
where
    T: Scalar,
    R: MatrixAccessMut<Element = T>,
{
    let (rows, cols) = result.dimensions();
    debug_assert_eq!(values.len(), rows * cols);
    let kind = result.kind();

    for col in 0..cols {
        for row in 0..rows {
            let value = values[col * rows + row];
            if !result.accepts(row, col, value) {
                return Err(LinalgError::structural(
                    kind,
                    "result cannot represent a value of the computed output",
                ));
            }
            if kind == MatrixKind::Symmetric && row < col && value != values[row * rows + col] {
                return Err(LinalgError::structural(kind, "computed output is not symmetric"));
            }
        }
    }

    result.clear();
    for col in 0..cols {
        // Symmetric storage mirrors the lower triangle from the upper one
        let row_end = if kind == MatrixKind::Symmetric { col + 1 } else { rows };
        for row in 0..row_end {
            let value = values[col * rows + row];
            if !value.is_zero() {
                result.set_at(row, col, value)?;
            }
        }
    }
    Ok(())
}
