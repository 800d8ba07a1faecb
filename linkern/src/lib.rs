//! linkern - Numeric linear-algebra kernel
//!
//! Matrices and vectors with several interchangeable storage kinds and
//! format-specialized arithmetic that falls back to a generic
//! accessor-driven kernel whenever the participating kinds have no
//! dedicated fast path.
//!
//! ## Architecture
//!
//! linkern follows a contract/implementation separation:
//!
//! - **linkern-core**: element trait, storage tags, accessor and
//!   numeric-provider contracts, errors and validation (no allocation)
//! - **linkern**: concrete storage, the dispatcher, the aliasing-safety
//!   layer and the process-wide provider and configuration slots
//!
//! ## Quick Start
//!
//! ```rust
//! use linkern::{Matrix, MatrixKind, Vector};
//!
//! fn example() -> linkern::Result<()> {
//!     let a = Matrix::csr_from_triplets(3, 3, &[(0, 0, 2.0), (1, 1, 3.0), (2, 2, 4.0)])?;
//!     let product = a.multiply(&a.transpose())?;
//!     assert_eq!(product.kind(), MatrixKind::Csr);
//!     assert_eq!(product.get(2, 2)?, 16.0);
//!
//!     let x = Vector::dense_from_slice(&[1.0, 1.0, 1.0])?;
//!     let y = a.multiply_vector(&x)?;
//!     assert_eq!(y.to_vec(), vec![2.0, 3.0, 4.0]);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```
//!
//! ## Features
//!
//! - **Storage kinds**: dense (column-major), CSR, diagonal, symmetric
//!   matrices and dense/sparse vectors
//! - **Dispatch**: fast kernels per kind pairing, generic fallback
//!   otherwise, `tracing` events whenever the fallback runs
//! - **Aliasing**: in-place operations name self-aliasing explicitly
//!   with [`Operand::This`]
//! - **Providers**: bulk numeric primitives behind a swappable
//!   [`NumericBackend`], with a rayon-parallel provider under the
//!   `parallel` feature

pub use linkern_core::{
    // Contracts
    MatrixAccess, MatrixAccessMut, NumericBackend, Scalar, VectorAccess, VectorAccessMut,
    // Storage tags
    DataType, MatrixKind, VectorKind,
    // Error handling
    ErrorCategory, LinalgError, Result,
};

pub mod alias;
pub mod config;
mod fallback;
pub mod matrix;
pub mod provider;
pub mod vector;

pub use alias::Operand;
pub use config::{kernel_config, set_kernel_config, KernelConfig};
pub use matrix::{CsrMatrix, DenseMatrix, DiagonalMatrix, Matrix, SymmetricMatrix, Triangle};
#[cfg(feature = "parallel")]
pub use provider::ParallelBackend;
pub use provider::{backend, reset_backend, set_backend, Element, ReferenceBackend, SharedBackend};
pub use vector::{DenseVector, SparseVector, Vector};
