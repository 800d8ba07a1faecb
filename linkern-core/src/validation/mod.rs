//! Validation utilities for matrix and vector operations
//!
//! This module contains pure validation functions with no allocation.
//! Every public kernel runs the relevant checks before writing a value.

pub mod bounds;
pub mod format;

pub use bounds::{
    validate_count, validate_index, validate_position, validate_product_shape, validate_range,
    validate_same_shape, validate_size, validate_square,
};
pub use format::{validate_csr_parts, validate_sorted_indices, validate_sparse_parts};
