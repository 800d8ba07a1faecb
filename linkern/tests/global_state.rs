//! Tests that replace the process-wide provider or configuration
//!
//! They share one lock so that no two of them observe each other's
//! replacement.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use linkern::{
    backend, kernel_config, reset_backend, set_backend, set_kernel_config, KernelConfig, Matrix,
    NumericBackend, ReferenceBackend, Vector,
};
use parking_lot::{const_mutex, Mutex};

static GLOBAL_STATE: Mutex<()> = const_mutex(());

/// Restores the default configuration and provider when dropped
struct Restore;

impl Drop for Restore {
    fn drop(&mut self) {
        set_kernel_config(KernelConfig::default());
        reset_backend::<f64>();
    }
}

/// Reference arithmetic that counts every bulk call
struct CountingBackend {
    calls: Arc<AtomicUsize>,
}

impl CountingBackend {
    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl NumericBackend<f64> for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn scale(&self, values: &mut [f64], factor: f64) {
        self.tick();
        ReferenceBackend.scale(values, factor)
    }

    fn scale_into(&self, source: &[f64], factor: f64, result: &mut [f64]) {
        self.tick();
        ReferenceBackend.scale_into(source, factor, result)
    }

    fn add_arrays(&self, a: &[f64], b: &[f64], result: &mut [f64]) {
        self.tick();
        ReferenceBackend.add_arrays(a, b, result)
    }

    fn subtract_arrays(&self, a: &[f64], b: &[f64], result: &mut [f64]) {
        self.tick();
        ReferenceBackend.subtract_arrays(a, b, result)
    }

    fn pointwise_multiply(&self, a: &[f64], b: &[f64], result: &mut [f64]) {
        self.tick();
        ReferenceBackend.pointwise_multiply(a, b, result)
    }

    fn dot_product(&self, a: &[f64], b: &[f64]) -> f64 {
        self.tick();
        ReferenceBackend.dot_product(a, b)
    }

    fn dense_matrix_multiply(
        &self,
        a: &[f64],
        a_rows: usize,
        a_cols: usize,
        b: &[f64],
        b_rows: usize,
        b_cols: usize,
        result: &mut [f64],
    ) {
        self.tick();
        ReferenceBackend.dense_matrix_multiply(a, a_rows, a_cols, b, b_rows, b_cols, result)
    }
}

#[test]
fn replaced_backend_receives_dispatch_until_reset() {
    let _lock = GLOBAL_STATE.lock();
    let _restore = Restore;

    let a = Matrix::dense_from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
    let x = Vector::dense_from_slice(&[1.0, -1.0]).unwrap();

    let held = backend::<f64>();
    let calls = Arc::new(AtomicUsize::new(0));
    set_backend::<f64>(Arc::new(CountingBackend {
        calls: Arc::clone(&calls),
    }));
    assert_eq!(held.name(), "reference");
    assert_eq!(backend::<f64>().name(), "counting");
    assert_eq!(backend::<f32>().name(), "reference");

    let sum = a.add(&a).unwrap();
    assert_eq!(sum.get(1, 1).unwrap(), 8.0);
    assert_eq!(x.dot(&x).unwrap(), 2.0);
    let product = a.multiply(&a).unwrap();
    assert_eq!(product.get(0, 0).unwrap(), 7.0);
    let seen = calls.load(Ordering::SeqCst);
    assert!(seen >= 3);

    reset_backend::<f64>();
    assert_eq!(backend::<f64>().name(), "reference");
    a.add(&a).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), seen);
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_kernels_match_serial_kernels() {
    let _lock = GLOBAL_STATE.lock();
    let _restore = Restore;

    let values: Vec<f64> = (0..48).map(|i| if i % 3 == 0 { 0.0 } else { i as f64 * 0.25 }).collect();
    let dense = Matrix::dense_from_column_major(6, 8, values).unwrap();
    let other = dense.scale(-0.5);
    let csr = dense.transpose().to_csr();

    let serial_sum = {
        let mut m = dense.clone();
        m.add_in_place((&other).into()).unwrap();
        m
    };
    let serial_lower = dense.lower_triangle();
    let serial_transpose = dense.transpose();
    let serial_product = csr.multiply(&dense).unwrap();

    set_kernel_config(KernelConfig::default().with_parallel_threshold(1));
    assert!(kernel_config().should_parallelize(1));

    let mut parallel_sum = dense.clone();
    parallel_sum.add_in_place((&other).into()).unwrap();
    assert_eq!(parallel_sum, serial_sum);
    assert_eq!(dense.lower_triangle(), serial_lower);
    assert_eq!(dense.transpose(), serial_transpose);
    assert_eq!(csr.multiply(&dense).unwrap(), serial_product);
}

#[test]
fn configuration_reads_environment_overrides() {
    let _lock = GLOBAL_STATE.lock();
    let _restore = Restore;

    std::env::set_var(linkern::config::PARALLEL_THRESHOLD_ENV, " 17 ");
    std::env::set_var(linkern::config::SPARSE_SHRINK_THRESHOLD_ENV, "many");
    let config = KernelConfig::from_env();
    assert_eq!(config.parallel_threshold, 17);
    assert_eq!(config.sparse_shrink_threshold, KernelConfig::DEFAULT.sparse_shrink_threshold);
    assert_eq!(kernel_config(), KernelConfig::DEFAULT);

    std::env::remove_var(linkern::config::PARALLEL_THRESHOLD_ENV);
    std::env::remove_var(linkern::config::SPARSE_SHRINK_THRESHOLD_ENV);
    assert_eq!(KernelConfig::from_env(), KernelConfig::DEFAULT);

    set_kernel_config(config);
    assert_eq!(kernel_config().parallel_threshold, 17);
}
