//! Abstract interfaces for the linkern kernel
//!
//! This module defines all trait abstractions shared between the storage
//! implementations and their external collaborators. Traits are pure
//! interfaces - no concrete implementations.

pub mod backend;
pub mod element;
pub mod matrix;
pub mod vector;

pub use backend::NumericBackend;
pub use element::Scalar;
pub use matrix::{MatrixAccess, MatrixAccessMut};
pub use vector::{VectorAccess, VectorAccessMut};
