//! Storage-agnostic vector contract

use super::element::Scalar;
use crate::error::Result;
use crate::format::VectorKind;

/// Read access to a vector of any storage kind
pub trait VectorAccess {
    /// The element type stored in this vector
    type Element: Scalar;

    /// Number of elements, fixed at construction
    fn count(&self) -> usize;

    /// Storage representation tag
    fn kind(&self) -> VectorKind;

    /// Read the element at `index`
    fn get(&self, index: usize) -> Result<Self::Element>;

    /// Read without bounds validation beyond debug assertions
    fn get_unchecked(&self, index: usize) -> Self::Element;
}

/// Write access to a vector of any storage kind
pub trait VectorAccessMut: VectorAccess {
    /// Write the element at `index`
    fn set(&mut self, index: usize, value: Self::Element) -> Result<()>;

    /// Reset every element to zero
    fn clear(&mut self);
}
