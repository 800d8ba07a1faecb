//! Numeric backend providers and the process-wide provider slot
//!
//! Every storage kind fetches the active provider for its element type
//! through [`backend`]. The slot holds an `Arc`, so a call that already
//! fetched its provider keeps using it even if [`set_backend`] swaps the
//! slot mid-flight; only later calls observe the replacement.

use std::sync::{Arc, LazyLock};

use linkern_core::{NumericBackend, Scalar};
use parking_lot::RwLock;
use tracing::info;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Shared handle to a provider
pub type SharedBackend<T> = Arc<dyn NumericBackend<T>>;

/// Element types with a process-wide provider slot
pub trait Element: Scalar {
    /// The slot holding this element type's active provider
    fn backend_slot() -> &'static RwLock<SharedBackend<Self>>;
}

static F32_BACKEND: LazyLock<RwLock<SharedBackend<f32>>> =
    LazyLock::new(|| RwLock::new(Arc::new(ReferenceBackend)));

static F64_BACKEND: LazyLock<RwLock<SharedBackend<f64>>> =
    LazyLock::new(|| RwLock::new(Arc::new(ReferenceBackend)));

impl Element for f32 {
    fn backend_slot() -> &'static RwLock<SharedBackend<Self>> {
        &F32_BACKEND
    }
}

impl Element for f64 {
    fn backend_slot() -> &'static RwLock<SharedBackend<Self>> {
        &F64_BACKEND
    }
}

/// Get the active provider for `T`
pub fn backend<T: Element>() -> SharedBackend<T> {
    T::backend_slot().read().clone()
}

/// Replace the active provider for `T`
pub fn set_backend<T: Element>(provider: SharedBackend<T>) {
    info!(
        provider = provider.name(),
        element = %T::data_type(),
        "numeric backend replaced"
    );
    *T::backend_slot().write() = provider;
}

/// Restore the reference provider for `T`
pub fn reset_backend<T: Element>() {
    set_backend::<T>(Arc::new(ReferenceBackend));
}

/// Portable straight-loop provider, the default for every element type
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceBackend;

impl<T: Scalar> NumericBackend<T> for ReferenceBackend {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn scale(&self, values: &mut [T], factor: T) {
        for value in values.iter_mut() {
            *value = *value * factor;
        }
    }

    fn scale_into(&self, source: &[T], factor: T, result: &mut [T]) {
        debug_assert_eq!(source.len(), result.len());
        for (r, &s) in result.iter_mut().zip(source) {
            *r = s * factor;
        }
    }

    fn add_arrays(&self, a: &[T], b: &[T], result: &mut [T]) {
        debug_assert!(a.len() == b.len() && a.len() == result.len());
        for ((r, &x), &y) in result.iter_mut().zip(a).zip(b) {
            *r = x + y;
        }
    }

    fn subtract_arrays(&self, a: &[T], b: &[T], result: &mut [T]) {
        debug_assert!(a.len() == b.len() && a.len() == result.len());
        for ((r, &x), &y) in result.iter_mut().zip(a).zip(b) {
            *r = x - y;
        }
    }

    fn pointwise_multiply(&self, a: &[T], b: &[T], result: &mut [T]) {
        debug_assert!(a.len() == b.len() && a.len() == result.len());
        for ((r, &x), &y) in result.iter_mut().zip(a).zip(b) {
            *r = x * y;
        }
    }

    fn dot_product(&self, a: &[T], b: &[T]) -> T {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .fold(T::zero(), |sum, (&x, &y)| sum + x * y)
    }

    fn dense_matrix_multiply(
        &self,
        a: &[T],
        a_rows: usize,
        a_cols: usize,
        b: &[T],
        b_rows: usize,
        b_cols: usize,
        result: &mut [T],
    ) {
        debug_assert_eq!(a_cols, b_rows);
        debug_assert_eq!(result.len(), a_rows * b_cols);
        for (j, out_col) in result.chunks_mut(a_rows).enumerate() {
            multiply_column(a, a_rows, a_cols, &b[j * b_rows..(j + 1) * b_rows], out_col);
        }
    }
}

/// `out_col = a * b_col` for one column of a column-major product
#[inline]
fn multiply_column<T: Scalar>(a: &[T], a_rows: usize, a_cols: usize, b_col: &[T], out_col: &mut [T]) {
    out_col.fill(T::zero());
    // No term is skipped: inf * 0 and 0 * NaN both yield NaN
    for (k, &factor) in b_col.iter().enumerate().take(a_cols) {
        let a_col = &a[k * a_rows..(k + 1) * a_rows];
        for (o, &x) in out_col.iter_mut().zip(a_col) {
            *o = *o + x * factor;
        }
    }
}

/// Rayon provider that splits bulk work into chunks
///
/// Inputs shorter than `threshold` run serially. Dot products combine
/// per-chunk partial sums in chunk order, so results may differ from
/// the reference provider in the last bits.
#[cfg(feature = "parallel")]
#[derive(Debug, Clone, Copy)]
pub struct ParallelBackend {
    threshold: usize,
    chunk_size: usize,
}

#[cfg(feature = "parallel")]
impl ParallelBackend {
    /// Create a provider using the active kernel configuration's threshold
    pub fn new() -> Self {
        Self::with_threshold(crate::config::kernel_config().parallel_threshold)
    }

    /// Create a provider with an explicit serial/parallel threshold
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            chunk_size: 4096,
        }
    }

    /// Set the chunk size handed to each rayon task
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn serial(&self, len: usize) -> bool {
        len < self.threshold
    }
}

#[cfg(feature = "parallel")]
impl Default for ParallelBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "parallel")]
impl<T: Scalar> NumericBackend<T> for ParallelBackend {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn scale(&self, values: &mut [T], factor: T) {
        if self.serial(values.len()) {
            return ReferenceBackend.scale(values, factor);
        }
        values.par_chunks_mut(self.chunk_size).for_each(|chunk| {
            for value in chunk {
                *value = *value * factor;
            }
        });
    }

    fn scale_into(&self, source: &[T], factor: T, result: &mut [T]) {
        if self.serial(source.len()) {
            return ReferenceBackend.scale_into(source, factor, result);
        }
        result
            .par_chunks_mut(self.chunk_size)
            .zip(source.par_chunks(self.chunk_size))
            .for_each(|(out, src)| {
                for (o, &s) in out.iter_mut().zip(src) {
                    *o = s * factor;
                }
            });
    }

    fn add_arrays(&self, a: &[T], b: &[T], result: &mut [T]) {
        if self.serial(a.len()) {
            return ReferenceBackend.add_arrays(a, b, result);
        }
        result
            .par_chunks_mut(self.chunk_size)
            .zip(a.par_chunks(self.chunk_size))
            .zip(b.par_chunks(self.chunk_size))
            .for_each(|((out, x), y)| ReferenceBackend.add_arrays(x, y, out));
    }

    fn subtract_arrays(&self, a: &[T], b: &[T], result: &mut [T]) {
        if self.serial(a.len()) {
            return ReferenceBackend.subtract_arrays(a, b, result);
        }
        result
            .par_chunks_mut(self.chunk_size)
            .zip(a.par_chunks(self.chunk_size))
            .zip(b.par_chunks(self.chunk_size))
            .for_each(|((out, x), y)| ReferenceBackend.subtract_arrays(x, y, out));
    }

    fn pointwise_multiply(&self, a: &[T], b: &[T], result: &mut [T]) {
        if self.serial(a.len()) {
            return ReferenceBackend.pointwise_multiply(a, b, result);
        }
        result
            .par_chunks_mut(self.chunk_size)
            .zip(a.par_chunks(self.chunk_size))
            .zip(b.par_chunks(self.chunk_size))
            .for_each(|((out, x), y)| ReferenceBackend.pointwise_multiply(x, y, out));
    }

    fn dot_product(&self, a: &[T], b: &[T]) -> T {
        if self.serial(a.len()) {
            return ReferenceBackend.dot_product(a, b);
        }
        let partials: Vec<T> = a
            .par_chunks(self.chunk_size)
            .zip(b.par_chunks(self.chunk_size))
            .map(|(x, y)| ReferenceBackend.dot_product(x, y))
            .collect();
        partials.into_iter().fold(T::zero(), |sum, part| sum + part)
    }

    fn dense_matrix_multiply(
        &self,
        a: &[T],
        a_rows: usize,
        a_cols: usize,
        b: &[T],
        b_rows: usize,
        b_cols: usize,
        result: &mut [T],
    ) {
        if self.serial(a_rows * a_cols * b_cols) {
            return ReferenceBackend
                .dense_matrix_multiply(a, a_rows, a_cols, b, b_rows, b_cols, result);
        }
        // Output columns are disjoint
        result
            .par_chunks_mut(a_rows)
            .enumerate()
            .for_each(|(j, out_col)| {
                multiply_column(a, a_rows, a_cols, &b[j * b_rows..(j + 1) * b_rows], out_col)
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_backend() {
        let backend = ReferenceBackend;
        let a = [1.0f64, 2.0, 3.0];
        let b = [4.0f64, 5.0, 6.0];
        let mut out = [0.0f64; 3];

        backend.add_arrays(&a, &b, &mut out);
        assert_eq!(out, [5.0, 7.0, 9.0]);
        backend.subtract_arrays(&a, &b, &mut out);
        assert_eq!(out, [-3.0, -3.0, -3.0]);
        assert_eq!(backend.dot_product(&a, &b), 32.0);

        let mut values = [1.0f64, -2.0];
        backend.scale(&mut values, 3.0);
        assert_eq!(values, [3.0, -6.0]);
    }

    #[test]
    fn test_reference_matrix_multiply() {
        // a = [1 3; 2 4], b = [5 7; 6 8] column-major
        let a = [1.0f64, 2.0, 3.0, 4.0];
        let b = [5.0f64, 6.0, 7.0, 8.0];
        let mut out = [0.0f64; 4];
        ReferenceBackend.dense_matrix_multiply(&a, 2, 2, &b, 2, 2, &mut out);
        assert_eq!(out, [23.0, 34.0, 31.0, 46.0]);
    }

    #[test]
    fn test_matrix_multiply_propagates_nan_from_either_side() {
        let mut out = [0.0f64; 1];
        ReferenceBackend.dense_matrix_multiply(&[f64::INFINITY], 1, 1, &[0.0], 1, 1, &mut out);
        assert!(out[0].is_nan());
        ReferenceBackend.dense_matrix_multiply(&[0.0], 1, 1, &[f64::NAN], 1, 1, &mut out);
        assert!(out[0].is_nan());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_reference() {
        let parallel = ParallelBackend::with_threshold(8).with_chunk_size(3);
        let a: Vec<f64> = (0..50).map(|i| i as f64 * 0.5).collect();
        let b: Vec<f64> = (0..50).map(|i| 1.0 - i as f64).collect();

        let mut expected = vec![0.0; 50];
        let mut actual = vec![0.0; 50];
        ReferenceBackend.add_arrays(&a, &b, &mut expected);
        parallel.add_arrays(&a, &b, &mut actual);
        assert_eq!(expected, actual);

        let reference_dot = ReferenceBackend.dot_product(&a, &b);
        let parallel_dot = parallel.dot_product(&a, &b);
        assert!((reference_dot - parallel_dot).abs() < 1e-9);

        let mut expected = vec![0.0; 25];
        let mut actual = vec![0.0; 25];
        ReferenceBackend.dense_matrix_multiply(&a[..25], 5, 5, &b[..25], 5, 5, &mut expected);
        parallel.dense_matrix_multiply(&a[..25], 5, 5, &b[..25], 5, 5, &mut actual);
        assert_eq!(expected, actual);
    }
}
