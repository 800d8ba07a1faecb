//! Shape and index validation
//!
//! Pure functions run before any storage is touched, so a failing
//! operation never leaves partially written output behind.

use crate::LinalgError;

/// Validate that both dimensions of a new matrix are positive
pub const fn validate_size(rows: usize, cols: usize) -> Result<(), LinalgError> {
    if rows == 0 || cols == 0 {
        return Err(LinalgError::InvalidSize { rows, cols });
    }

    // rows * cols must be addressable for dense storage
    if rows.checked_mul(cols).is_none() {
        return Err(LinalgError::InvalidSize { rows, cols });
    }

    Ok(())
}

/// Validate that a new vector has a positive length
pub const fn validate_count(count: usize) -> Result<(), LinalgError> {
    if count == 0 {
        return Err(LinalgError::InvalidSize {
            rows: count,
            cols: 1,
        });
    }
    Ok(())
}

/// Validate a single index against an exclusive bound
pub const fn validate_index(index: usize, bound: usize) -> Result<(), LinalgError> {
    if index >= bound {
        return Err(LinalgError::IndexOutOfBounds { index, bound });
    }
    Ok(())
}

/// Validate a `(row, col)` position against a shape
pub const fn validate_position(
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
) -> Result<(), LinalgError> {
    if let Err(e) = validate_index(row, rows) {
        return Err(e);
    }
    validate_index(col, cols)
}

/// Validate that `offset..offset + length` lies inside `0..bound`
pub const fn validate_range(offset: usize, length: usize, bound: usize) -> Result<(), LinalgError> {
    if length == 0 {
        return Err(LinalgError::InvalidSize {
            rows: length,
            cols: 1,
        });
    }
    match offset.checked_add(length) {
        Some(end) if end <= bound => Ok(()),
        _ => Err(LinalgError::IndexOutOfBounds {
            index: offset.saturating_add(length).saturating_sub(1),
            bound,
        }),
    }
}

/// Validate that two shapes are identical
pub const fn validate_same_shape(
    operation: &'static str,
    expected: (usize, usize),
    found: (usize, usize),
) -> Result<(), LinalgError> {
    if expected.0 != found.0 || expected.1 != found.1 {
        return Err(LinalgError::dimension_mismatch(operation, expected, found));
    }
    Ok(())
}

/// Validate the inner dimension of a product `left * right`
///
/// On mismatch the error reports the shape `right` needed to have.
pub const fn validate_product_shape(
    operation: &'static str,
    left: (usize, usize),
    right: (usize, usize),
) -> Result<(), LinalgError> {
    if left.1 != right.0 {
        return Err(LinalgError::dimension_mismatch(
            operation,
            (left.1, right.1),
            right,
        ));
    }
    Ok(())
}

/// Validate that a shape is square
pub const fn validate_square(operation: &'static str, shape: (usize, usize)) -> Result<(), LinalgError> {
    if shape.0 != shape.1 {
        return Err(LinalgError::dimension_mismatch(
            operation,
            (shape.0, shape.0),
            shape,
        ));
    }
    Ok(())
}
