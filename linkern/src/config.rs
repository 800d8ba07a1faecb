//! Process-wide kernel configuration
//!
//! Thresholds that decide when dense loops go parallel and when sparse
//! storage gives memory back. Read once per operation, so replacing the
//! configuration only affects operations that start afterwards.

use parking_lot::RwLock;
use tracing::info;

/// Environment variable overriding [`KernelConfig::parallel_threshold`]
pub const PARALLEL_THRESHOLD_ENV: &str = "LINKERN_PARALLEL_THRESHOLD";

/// Environment variable overriding [`KernelConfig::sparse_shrink_threshold`]
pub const SPARSE_SHRINK_THRESHOLD_ENV: &str = "LINKERN_SPARSE_SHRINK_THRESHOLD";

/// Tuning knobs shared by every kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Minimum iteration count before a loop is split across rayon workers
    pub parallel_threshold: usize,
    /// Minimum sparse capacity before storage shrinks at under half utilization
    pub sparse_shrink_threshold: usize,
}

impl KernelConfig {
    /// Defaults used until [`set_kernel_config`] is called
    pub const DEFAULT: Self = Self {
        parallel_threshold: 4096,
        sparse_shrink_threshold: 1024,
    };

    /// Set the parallel loop threshold
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Set the sparse shrink threshold
    pub fn with_sparse_shrink_threshold(mut self, threshold: usize) -> Self {
        self.sparse_shrink_threshold = threshold;
        self
    }

    /// Build a configuration from environment variables
    ///
    /// Unset or unparsable variables keep their default.
    pub fn from_env() -> Self {
        let mut config = Self::DEFAULT;
        if let Some(value) = read_env_usize(PARALLEL_THRESHOLD_ENV) {
            config.parallel_threshold = value;
        }
        if let Some(value) = read_env_usize(SPARSE_SHRINK_THRESHOLD_ENV) {
            config.sparse_shrink_threshold = value;
        }
        config
    }

    /// Whether a loop over `len` independent iterations should run in parallel
    pub fn should_parallelize(&self, len: usize) -> bool {
        cfg!(feature = "parallel") && len >= self.parallel_threshold
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn read_env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok()?.trim().parse().ok()
}

static CONFIG: RwLock<KernelConfig> = parking_lot::const_rwlock(KernelConfig::DEFAULT);

/// Get a copy of the active configuration
pub fn kernel_config() -> KernelConfig {
    *CONFIG.read()
}

/// Replace the active configuration
pub fn set_kernel_config(config: KernelConfig) {
    info!(
        parallel_threshold = config.parallel_threshold,
        sparse_shrink_threshold = config.sparse_shrink_threshold,
        "kernel configuration replaced"
    );
    *CONFIG.write() = config;
}
