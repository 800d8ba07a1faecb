//! Matrix norms

use super::Matrix;
use crate::provider::{backend, Element};

fn max_abs<T: Element>(values: &[T]) -> T {
    values
        .iter()
        .map(|v| v.abs())
        .fold(T::zero(), |max, v| if v > max { v } else { max })
}

impl<T: Element> Matrix<T> {
    /// Maximum absolute column sum
    pub fn l1_norm(&self) -> T {
        match self {
            Matrix::Diagonal(m) => max_abs(m.values()),
            Matrix::Csr(m) => {
                let mut sums = vec![T::zero(); m.cols()];
                for (col, value) in m.column_indices().iter().zip(m.values()) {
                    sums[*col] = sums[*col] + value.abs();
                }
                max_abs(&sums)
            }
            Matrix::Dense(m) => {
                let sums: Vec<T> = (0..m.cols())
                    .map(|c| m.column(c).iter().fold(T::zero(), |s, v| s + v.abs()))
                    .collect();
                max_abs(&sums)
            }
            // Column sums equal row sums
            Matrix::Symmetric(_) => self.infinity_norm(),
        }
    }

    /// Maximum absolute row sum
    pub fn infinity_norm(&self) -> T {
        match self {
            Matrix::Diagonal(m) => max_abs(m.values()),
            Matrix::Csr(m) => {
                let sums: Vec<T> = (0..m.rows())
                    .map(|r| m.row_entries(r).fold(T::zero(), |s, (_, v)| s + v.abs()))
                    .collect();
                max_abs(&sums)
            }
            _ => {
                let mut sums = vec![T::zero(); self.rows()];
                for c in 0..self.cols() {
                    for (r, sum) in sums.iter_mut().enumerate() {
                        *sum = *sum + self.get_unchecked(r, c).abs();
                    }
                }
                max_abs(&sums)
            }
        }
    }

    /// Square root of the sum of squared elements
    pub fn frobenius_norm(&self) -> T {
        let sum_of_squares = match self {
            Matrix::Dense(m) => backend::<T>().dot_product(m.values(), m.values()).to_f64(),
            Matrix::Diagonal(m) => backend::<T>().dot_product(m.values(), m.values()).to_f64(),
            Matrix::Csr(m) => m.sum_of_squares(),
            Matrix::Symmetric(m) => {
                let n = m.order();
                let mut sum = 0.0;
                for c in 0..n {
                    for r in 0..=c {
                        let v = m.get_unchecked(r, c).to_f64();
                        // Off-diagonal entries appear twice
                        sum += if r == c { v * v } else { 2.0 * v * v };
                    }
                }
                sum
            }
        };
        T::from_f64(sum_of_squares.sqrt())
    }
}
