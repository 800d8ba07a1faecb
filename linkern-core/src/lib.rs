#![no_std]

//! linkern Core - Storage-agnostic linear algebra contracts
//!
//! This crate provides the element trait, storage format tags, the
//! matrix/vector accessor contracts, the numeric backend provider
//! contract, the error taxonomy and pure validation helpers shared by
//! the kernel and its collaborators.

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod format;
pub mod traits;
pub mod validation;

pub use error::*;
pub use format::*;
pub use traits::*;
pub use validation::*;

/// Collect a matrix into column-major order through its accessor
#[cfg(feature = "alloc")]
pub fn to_column_major<M: MatrixAccess>(matrix: &M) -> alloc::vec::Vec<M::Element> {
    let (rows, cols) = matrix.dimensions();
    let mut values = alloc::vec::Vec::with_capacity(rows * cols);
    for col in 0..cols {
        for row in 0..rows {
            values.push(matrix.at_unchecked(row, col));
        }
    }
    values
}
