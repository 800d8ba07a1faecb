//! Numeric backend provider contract
//!
//! Storage kinds delegate their bulk hot paths to a provider so that a
//! faster implementation can be swapped in without touching format
//! logic. Providers operate on flat slices and perform no bounds
//! checking of their own: callers size every buffer.

use super::element::Scalar;

/// Bulk numeric primitives used by the storage kinds
///
/// Two providers satisfying this trait must agree on every result up to
/// floating-point summation order, which is not guaranteed identical.
pub trait NumericBackend<T: Scalar>: Send + Sync {
    /// Short identifier for diagnostics
    fn name(&self) -> &'static str;

    /// Multiply every element of `values` by `factor` in place
    fn scale(&self, values: &mut [T], factor: T);

    /// `result[i] = source[i] * factor`
    fn scale_into(&self, source: &[T], factor: T, result: &mut [T]);

    /// `result[i] = a[i] + b[i]`
    fn add_arrays(&self, a: &[T], b: &[T], result: &mut [T]);

    /// `result[i] = a[i] - b[i]`
    fn subtract_arrays(&self, a: &[T], b: &[T], result: &mut [T]);

    /// `result[i] = a[i] * b[i]`
    fn pointwise_multiply(&self, a: &[T], b: &[T], result: &mut [T]);

    /// Sum of `a[i] * b[i]`
    fn dot_product(&self, a: &[T], b: &[T]) -> T;

    /// Column-major dense product `result = a * b`
    ///
    /// `a` is `a_rows x a_cols`, `b` is `b_rows x b_cols` and `result`
    /// is `a_rows x b_cols`. `a_cols == b_rows` is the caller's
    /// responsibility. `result` is overwritten.
    #[allow(clippy::too_many_arguments)]
    fn dense_matrix_multiply(
        &self,
        a: &[T],
        a_rows: usize,
        a_cols: usize,
        b: &[T],
        b_rows: usize,
        b_cols: usize,
        result: &mut [T],
    );
}
