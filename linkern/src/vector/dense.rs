//! Dense vector storage

use linkern_core::{validate_count, validate_index, Result};
#[cfg(feature = "serde")]
use linkern_core::LinalgError;

use crate::provider::Element;

/// Owned contiguous array of exactly `count` elements
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        try_from = "DenseVectorParts<T>",
        bound(deserialize = "T: Element + serde::Deserialize<'de>")
    )
)]
pub struct DenseVector<T> {
    values: Vec<T>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct DenseVectorParts<T> {
    values: Vec<T>,
}

#[cfg(feature = "serde")]
impl<T: Element> TryFrom<DenseVectorParts<T>> for DenseVector<T> {
    type Error = LinalgError;

    fn try_from(parts: DenseVectorParts<T>) -> Result<Self> {
        Self::from_vec(parts.values)
    }
}

impl<T: Element> DenseVector<T> {
    /// Create a zero vector of `count` elements
    pub fn new(count: usize) -> Result<Self> {
        validate_count(count)?;
        Ok(Self {
            values: vec![T::zero(); count],
        })
    }

    /// Take ownership of `values` without copying
    pub fn from_vec(values: Vec<T>) -> Result<Self> {
        validate_count(values.len())?;
        Ok(Self { values })
    }

    /// Copy `values` into a new vector
    pub fn from_slice(values: &[T]) -> Result<Self> {
        Self::from_vec(values.to_vec())
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Release the backing array
    pub fn into_vec(self) -> Vec<T> {
        self.values
    }

    pub fn get(&self, index: usize) -> Result<T> {
        validate_index(index, self.values.len())?;
        Ok(self.values[index])
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        validate_index(index, self.values.len())?;
        self.values[index] = value;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.values.fill(T::zero());
    }

    pub fn non_zero_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_zero()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_vector_access() {
        let mut v = DenseVector::<f64>::new(3).unwrap();
        v.set(1, 2.5).unwrap();
        assert_eq!(v.values(), &[0.0, 2.5, 0.0]);
        assert!(v.get(3).is_err());
        assert_eq!(v.non_zero_count(), 1);
        assert!(DenseVector::<f64>::new(0).is_err());
        assert!(DenseVector::<f64>::from_vec(Vec::new()).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_rejects_empty() {
        let v: DenseVector<f64> = serde_json::from_str(r#"{"values":[1.0,2.0]}"#).unwrap();
        assert_eq!(v.count(), 2);
        assert!(serde_json::from_str::<DenseVector<f64>>(r#"{"values":[]}"#).is_err());
    }
}
