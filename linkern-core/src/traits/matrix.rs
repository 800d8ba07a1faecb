//! Storage-agnostic matrix contract
//!
//! These traits are the only surface the generic fallback kernels use.
//! Decompositions, distributions and other collaborators outside the
//! kernel program against them as well.

use super::element::Scalar;
use crate::error::Result;
use crate::format::MatrixKind;

/// Read access to a matrix of any storage kind
pub trait MatrixAccess {
    /// The element type stored in this matrix
    type Element: Scalar;

    /// Number of rows
    fn row_count(&self) -> usize;

    /// Number of columns
    fn column_count(&self) -> usize;

    /// Storage representation tag
    fn kind(&self) -> MatrixKind;

    /// Read the element at `(row, col)`
    ///
    /// Structural zeros read as `Element::zero()`. Fails with
    /// `IndexOutOfBounds` outside the declared shape.
    fn at(&self, row: usize, col: usize) -> Result<Self::Element>;

    /// Read without bounds validation beyond debug assertions
    ///
    /// Callers guarantee `row < row_count()` and `col < column_count()`.
    fn at_unchecked(&self, row: usize, col: usize) -> Self::Element;

    /// Get matrix dimensions as (rows, cols)
    fn dimensions(&self) -> (usize, usize) {
        (self.row_count(), self.column_count())
    }

    /// Whether the matrix is square
    fn is_square(&self) -> bool {
        self.row_count() == self.column_count()
    }
}

/// Write access to a matrix of any storage kind
pub trait MatrixAccessMut: MatrixAccess {
    /// Write the element at `(row, col)`
    ///
    /// Kinds with structural constraints reject writes they cannot
    /// represent, leaving the matrix untouched.
    fn set_at(&mut self, row: usize, col: usize, value: Self::Element) -> Result<()>;

    /// Whether a write of `value` at `(row, col)` would be accepted
    fn accepts(&self, row: usize, col: usize, value: Self::Element) -> bool;

    /// Reset every stored entry to zero
    fn clear(&mut self);
}
