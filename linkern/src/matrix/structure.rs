//! Structural operations: transpose, triangles, permutations, inverse

use linkern_core::{validate_index, validate_same_shape, LinalgError, MatrixKind, Result};

use super::arith::into_result;
use super::{DiagonalMatrix, Matrix};
use crate::fallback;
use crate::provider::Element;

/// Part of a matrix kept by triangular extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Triangle {
    /// `row >= col`
    Lower,
    /// `row <= col`
    Upper,
    /// `row > col`
    StrictlyLower,
    /// `row < col`
    StrictlyUpper,
}

impl Triangle {
    #[inline]
    pub fn contains(self, row: usize, col: usize) -> bool {
        match self {
            Triangle::Lower => row >= col,
            Triangle::Upper => row <= col,
            Triangle::StrictlyLower => row > col,
            Triangle::StrictlyUpper => row < col,
        }
    }

    fn includes_diagonal(self) -> bool {
        matches!(self, Triangle::Lower | Triangle::Upper)
    }

    fn name(self) -> &'static str {
        match self {
            Triangle::Lower => "lower_triangle",
            Triangle::Upper => "upper_triangle",
            Triangle::StrictlyLower => "strictly_lower_triangle",
            Triangle::StrictlyUpper => "strictly_upper_triangle",
        }
    }
}

fn validate_permutation(permutation: &[usize], bound: usize) -> Result<()> {
    if permutation.is_empty() {
        return Err(LinalgError::MissingArgument { name: "permutation" });
    }
    validate_same_shape("permute", (bound, 1), (permutation.len(), 1))?;
    let mut seen = vec![false; bound];
    for &target in permutation {
        validate_index(target, bound)?;
        if std::mem::replace(&mut seen[target], true) {
            return Err(LinalgError::InvalidStructure {
                reason: "permutation repeats an index",
            });
        }
    }
    Ok(())
}

impl<T: Element> Matrix<T> {
    /// Transposed copy
    ///
    /// Symmetric matrices are their own transpose and come back as a
    /// plain clone.
    pub fn transpose(&self) -> Self {
        match self {
            Matrix::Dense(m) => Matrix::Dense(m.transpose()),
            Matrix::Csr(m) => Matrix::Csr(m.transpose()),
            Matrix::Diagonal(m) => Matrix::Diagonal(m.transpose()),
            Matrix::Symmetric(_) => self.clone(),
        }
    }

    pub fn transpose_into(&self, result: &mut Self) -> Result<()> {
        validate_same_shape("transpose", (self.cols(), self.rows()), result.shape())?;
        into_result(
            "transpose",
            self.kind(),
            &[self.kind()],
            result,
            || Ok(self.transpose()),
            || fallback::transposed(self),
        )
    }

    fn triangle_kind(&self) -> MatrixKind {
        match self.kind() {
            MatrixKind::Symmetric => MatrixKind::Dense,
            kind => kind,
        }
    }

    /// Copy keeping only the entries inside `part`
    ///
    /// Symmetric storage yields dense output since a triangle of it is
    /// not symmetric.
    pub fn triangle(&self, part: Triangle) -> Self {
        match self {
            Matrix::Csr(m) => Matrix::Csr(m.filter(|row, col| part.contains(row, col))),
            Matrix::Diagonal(m) if part.includes_diagonal() => Matrix::Diagonal(m.clone()),
            Matrix::Diagonal(m) => Matrix::Diagonal(
                DiagonalMatrix::new(m.rows(), m.cols())
                    .unwrap_or_else(|_| unreachable!("shape taken from a live matrix")),
            ),
            _ => {
                let mut result = self.dense_storage().into_owned();
                result.map_indexed_in_place(|row, col, x| if part.contains(row, col) { x } else { T::zero() });
                Matrix::Dense(result)
            }
        }
    }

    pub fn triangle_into(&self, part: Triangle, result: &mut Self) -> Result<()> {
        validate_same_shape(part.name(), self.shape(), result.shape())?;
        into_result(
            part.name(),
            self.triangle_kind(),
            &[self.kind()],
            result,
            || Ok(self.triangle(part)),
            || {
                fallback::map_matrix(self, |row, col, x| {
                    if part.contains(row, col) {
                        x
                    } else {
                        T::zero()
                    }
                })
            },
        )
    }

    pub fn lower_triangle(&self) -> Self {
        self.triangle(Triangle::Lower)
    }

    pub fn upper_triangle(&self) -> Self {
        self.triangle(Triangle::Upper)
    }

    pub fn strictly_lower_triangle(&self) -> Self {
        self.triangle(Triangle::StrictlyLower)
    }

    pub fn strictly_upper_triangle(&self) -> Self {
        self.triangle(Triangle::StrictlyUpper)
    }

    fn reject_permutation(&self) -> Result<()> {
        match self.kind() {
            MatrixKind::Diagonal | MatrixKind::Symmetric => Err(LinalgError::structural(
                self.kind(),
                "permuting rows or columns would break the storage structure",
            )),
            _ => Ok(()),
        }
    }

    /// Move row `i` to row `permutation[i]`
    ///
    /// Diagonal and symmetric storage reject permutation outright.
    pub fn permute_rows(&mut self, permutation: &[usize]) -> Result<()> {
        self.reject_permutation()?;
        validate_permutation(permutation, self.rows())?;
        match self {
            Matrix::Dense(m) => {
                let source = m.clone();
                for col in 0..m.cols() {
                    let from = source.column(col);
                    let to = m.column_mut(col);
                    for (row, &value) in from.iter().enumerate() {
                        to[permutation[row]] = value;
                    }
                }
            }
            Matrix::Csr(m) => *m = m.permute_rows(permutation),
            Matrix::Diagonal(_) | Matrix::Symmetric(_) => unreachable!("rejected above"),
        }
        Ok(())
    }

    /// Move column `j` to column `permutation[j]`
    pub fn permute_columns(&mut self, permutation: &[usize]) -> Result<()> {
        self.reject_permutation()?;
        validate_permutation(permutation, self.cols())?;
        match self {
            Matrix::Dense(m) => {
                let source = m.clone();
                for (col, &target) in permutation.iter().enumerate() {
                    m.column_mut(target).copy_from_slice(source.column(col));
                }
            }
            Matrix::Csr(m) => *m = m.permute_columns(permutation),
            Matrix::Diagonal(_) | Matrix::Symmetric(_) => unreachable!("rejected above"),
        }
        Ok(())
    }

    /// Inverse of a diagonal matrix
    ///
    /// General inversion belongs to the decompositions; other kinds
    /// report [`LinalgError::Unsupported`].
    pub fn inverse(&self) -> Result<Self> {
        match self {
            Matrix::Diagonal(m) => m.inverse().map(Matrix::Diagonal),
            _ => Err(LinalgError::Unsupported {
                operation: "inverse",
                kind: self.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense() -> Matrix<f64> {
        Matrix::dense_from_rows(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]).unwrap()
    }

    #[test]
    fn test_transpose_every_kind() {
        let d = dense();
        assert_eq!(d.transpose().get(2, 1).unwrap(), 6.0);
        assert_eq!(d.to_csr().transpose().to_dense(), d.transpose());

        let s = Matrix::symmetric_from_upper(&[&[1.0, 2.0], &[3.0]]).unwrap();
        assert_eq!(s.transpose(), s);

        let mut result = Matrix::dense(3, 2).unwrap();
        d.to_csr().transpose_into(&mut result).unwrap();
        assert_eq!(result, d.transpose());
        assert!(d.transpose_into(&mut Matrix::dense(2, 3).unwrap()).is_err());
    }

    #[test]
    fn test_triangles() {
        let d = dense();
        let lower = d.lower_triangle();
        assert_eq!(lower.get(0, 1).unwrap(), 0.0);
        assert_eq!(lower.get(1, 1).unwrap(), 5.0);
        assert_eq!(d.strictly_upper_triangle().non_zero_count(), 3);
        assert_eq!(d.to_csr().upper_triangle().to_dense(), d.upper_triangle());

        let diagonal = Matrix::diagonal_from_values(2, 2, vec![1.0, 2.0]).unwrap();
        assert_eq!(diagonal.strictly_lower_triangle().non_zero_count(), 0);
        assert_eq!(diagonal.lower_triangle(), diagonal);

        let s = Matrix::symmetric_from_upper(&[&[1.0, 2.0], &[3.0]]).unwrap();
        let upper = s.upper_triangle();
        assert_eq!(upper.kind(), MatrixKind::Dense);
        assert_eq!(upper.get(1, 0).unwrap(), 0.0);

        let mut result = Matrix::csr(2, 3).unwrap();
        d.triangle_into(Triangle::StrictlyLower, &mut result).unwrap();
        assert_eq!(result.non_zero_count(), 1);
        assert_eq!(result.get(1, 0).unwrap(), 4.0);
    }

    #[test]
    fn test_permutations() {
        let mut d = dense();
        d.permute_rows(&[1, 0]).unwrap();
        assert_eq!(d.get(0, 2).unwrap(), 6.0);
        d.permute_columns(&[2, 0, 1]).unwrap();
        assert_eq!(d.get(0, 2).unwrap(), 4.0);
        assert_eq!(d.get(1, 0).unwrap(), 2.0);

        let mut c = dense().to_csr();
        c.permute_rows(&[1, 0]).unwrap();
        c.permute_columns(&[2, 0, 1]).unwrap();
        assert_eq!(c.to_dense(), d);

        assert_eq!(
            dense().permute_rows(&[]),
            Err(LinalgError::MissingArgument { name: "permutation" })
        );
        assert!(dense().permute_rows(&[0, 0]).is_err());
        assert!(dense().permute_rows(&[0, 2]).is_err());
    }

    #[test]
    fn test_constrained_kinds_reject_permutation() {
        let mut diagonal = Matrix::diagonal_from_values(2, 2, vec![1.0, 2.0]).unwrap();
        let before = diagonal.clone();
        assert!(matches!(
            diagonal.permute_rows(&[1, 0]),
            Err(LinalgError::StructuralViolation { .. })
        ));
        assert_eq!(diagonal, before);

        let mut s = Matrix::<f64>::symmetric(2).unwrap();
        assert!(s.permute_columns(&[1, 0]).is_err());
    }

    #[test]
    fn test_inverse() {
        let d = Matrix::diagonal_from_values(2, 2, vec![4.0, 0.5]).unwrap();
        let inv = d.inverse().unwrap();
        assert!(d.multiply(&inv).unwrap().almost_equal(&Matrix::identity(2).unwrap(), 0.0));
        assert_eq!(
            Matrix::diagonal_from_values(2, 2, vec![1.0, 0.0]).unwrap().inverse(),
            Err(LinalgError::Singular { index: 1 })
        );
        assert!(matches!(dense().inverse(), Err(LinalgError::Unsupported { .. })));
    }
}
