//! Structural validation of raw sparse storage parts
//!
//! Used when callers hand over pre-built index arrays instead of
//! constructing storage element by element.

use crate::LinalgError;

/// Validate that `indices` is strictly ascending and below `bound`
pub fn validate_sorted_indices(indices: &[usize], bound: usize) -> Result<(), LinalgError> {
    let mut previous: Option<usize> = None;
    for &index in indices {
        if index >= bound {
            return Err(LinalgError::IndexOutOfBounds { index, bound });
        }
        if let Some(prev) = previous {
            if index <= prev {
                return Err(LinalgError::InvalidStructure {
                    reason: "indices must be strictly ascending",
                });
            }
        }
        previous = Some(index);
    }
    Ok(())
}

/// Validate sparse vector parts
pub fn validate_sparse_parts(
    count: usize,
    indices: &[usize],
    value_count: usize,
) -> Result<(), LinalgError> {
    if indices.len() != value_count {
        return Err(LinalgError::InvalidStructure {
            reason: "index and value arrays differ in length",
        });
    }
    validate_sorted_indices(indices, count)
}

/// Validate compressed sparse row parts
///
/// Checks the row pointer length and monotonicity, that the last
/// pointer equals the value count, and that each row's column slice is
/// strictly ascending and inside `0..cols`.
pub fn validate_csr_parts(
    rows: usize,
    cols: usize,
    row_pointers: &[usize],
    column_indices: &[usize],
    value_count: usize,
) -> Result<(), LinalgError> {
    if rows.checked_add(1) != Some(row_pointers.len()) {
        return Err(LinalgError::InvalidStructure {
            reason: "row pointer array must have rows + 1 entries",
        });
    }
    if row_pointers[0] != 0 {
        return Err(LinalgError::InvalidStructure {
            reason: "first row pointer must be zero",
        });
    }
    if column_indices.len() != value_count || row_pointers[rows] != value_count {
        return Err(LinalgError::InvalidStructure {
            reason: "value count disagrees with column indices or row pointers",
        });
    }
    if row_pointers.windows(2).any(|window| window[0] > window[1]) {
        return Err(LinalgError::InvalidStructure {
            reason: "row pointers must be non-decreasing",
        });
    }
    for window in row_pointers.windows(2) {
        validate_sorted_indices(&column_indices[window[0]..window[1]], cols)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sorted_indices() {
        assert_eq!(validate_sorted_indices(&[0, 2, 5], 6), Ok(()));
        assert_eq!(validate_sorted_indices(&[], 6), Ok(()));
        assert!(validate_sorted_indices(&[0, 2, 2], 6).is_err());
        assert!(validate_sorted_indices(&[3, 1], 6).is_err());
        assert_eq!(
            validate_sorted_indices(&[0, 6], 6),
            Err(LinalgError::IndexOutOfBounds { index: 6, bound: 6 })
        );
    }

    #[test]
    fn test_validate_csr_parts() {
        // [1 0 2]
        // [0 0 0]
        // [0 3 0]
        assert_eq!(validate_csr_parts(3, 3, &[0, 2, 2, 3], &[0, 2, 1], 3), Ok(()));

        assert!(validate_csr_parts(3, 3, &[0, 2, 3], &[0, 2, 1], 3).is_err());
        assert!(validate_csr_parts(3, 3, &[0, 2, 1, 3], &[0, 2, 1], 3).is_err());
        assert!(validate_csr_parts(3, 3, &[0, 2, 2, 3], &[2, 0, 1], 3).is_err());
        assert!(validate_csr_parts(3, 3, &[0, 2, 2, 3], &[0, 2, 1], 4).is_err());
        assert!(validate_csr_parts(3, 3, &[1, 2, 2, 3], &[0, 2, 1], 3).is_err());
        assert!(validate_csr_parts(usize::MAX, 1, &[0], &[], 0).is_err());
    }

    #[test]
    fn test_validate_sparse_parts() {
        assert_eq!(validate_sparse_parts(5, &[1, 3], 2), Ok(()));
        assert!(validate_sparse_parts(5, &[1, 3], 1).is_err());
        assert!(validate_sparse_parts(3, &[1, 3], 2).is_err());
    }
}
