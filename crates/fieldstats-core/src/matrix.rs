//! SymmetricMatrix, DenseMatrix - Covariance storage
//!
//! Sums of cross-products and covariance matrices are symmetric, so only
//! the lower-left triangle (row >= col) is stored. Consumers that need
//! every element request the mirrored form explicitly with
//! [`SymmetricMatrix::as_square`]; the packed storage is never read as if
//! it were square.
//!
//! # Storage layout
//!
//! Packed row-major lower triangle: element `(r, c)` with `r >= c` lives at
//! `r * (r + 1) / 2 + c`. A matrix of `n` channels therefore holds
//! [`triangular_len`]`(n)` values.

use crate::error::{Error, Result};

/// Number of stored elements in a packed lower triangle of size `n`.
#[inline]
pub const fn triangular_len(n: usize) -> usize {
    n * (n + 1) / 2
}

#[inline]
fn packed_index(row: usize, col: usize) -> usize {
    let (r, c) = if row >= col { (row, col) } else { (col, row) };
    r * (r + 1) / 2 + c
}

/// Symmetric matrix stored as a packed lower triangle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SymmetricMatrix {
    size: usize,
    data: Vec<f64>,
}

impl SymmetricMatrix {
    /// Create a zero-filled matrix with `size` rows and columns.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            data: vec![0.0; triangular_len(size)],
        }
    }

    /// Create a matrix from packed lower-triangle data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `data.len()` is not
    /// `triangular_len(size)`.
    pub fn from_packed(size: usize, data: Vec<f64>) -> Result<Self> {
        let expected = triangular_len(size);
        if data.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { size, data })
    }

    /// Create a diagonal matrix.
    pub fn from_diagonal(diagonal: &[f64]) -> Self {
        let mut m = Self::new(diagonal.len());
        for (i, &v) in diagonal.iter().enumerate() {
            m.data[packed_index(i, i)] = v;
        }
        m
    }

    /// Create an identity matrix.
    pub fn identity(size: usize) -> Self {
        Self::from_diagonal(&vec![1.0; size])
    }

    /// Number of rows (and columns).
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Packed lower-triangle data.
    #[inline]
    pub fn packed(&self) -> &[f64] {
        &self.data
    }

    /// Mutable packed lower-triangle data.
    #[inline]
    pub fn packed_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Get an element. `(r, c)` and `(c, r)` address the same value.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.size && col < self.size, "matrix index out of range");
        self.data[packed_index(row, col)]
    }

    /// Set an element. Setting `(r, c)` also sets `(c, r)`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.size && col < self.size, "matrix index out of range");
        self.data[packed_index(row, col)] = value;
    }

    /// Add to an element.
    #[inline]
    pub fn add_at(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.size && col < self.size, "matrix index out of range");
        self.data[packed_index(row, col)] += value;
    }

    /// Set every element to `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Diagonal elements.
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.size)
            .map(|i| self.data[packed_index(i, i)])
            .collect()
    }

    /// Set the off-diagonal elements to zero.
    pub fn zero_off_diagonal(&mut self) {
        for r in 0..self.size {
            for c in 0..r {
                self.data[packed_index(r, c)] = 0.0;
            }
        }
    }

    /// Multiply every element by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// Add `weight * other` to this matrix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the sizes differ.
    pub fn add_scaled(&mut self, other: &SymmetricMatrix, weight: f64) -> Result<()> {
        if other.size != self.size {
            return Err(Error::DimensionMismatch {
                expected: self.size,
                actual: other.size,
            });
        }
        for (d, s) in self.data.iter_mut().zip(&other.data) {
            *d += weight * s;
        }
        Ok(())
    }

    /// Extract the sub-matrix for a subset of channels.
    ///
    /// Channel `channels[i]` of this matrix becomes row/column `i` of the
    /// result, so the subset also defines the output order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if a channel is out of range.
    pub fn reduce(&self, channels: &[usize]) -> Result<SymmetricMatrix> {
        if let Some(&bad) = channels.iter().find(|&&c| c >= self.size) {
            return Err(Error::IndexOutOfBounds {
                index: bad,
                len: self.size,
            });
        }
        let mut out = SymmetricMatrix::new(channels.len());
        for (i, &ci) in channels.iter().enumerate() {
            for (j, &cj) in channels.iter().enumerate().take(i + 1) {
                out.data[packed_index(i, j)] = self.data[packed_index(ci, cj)];
            }
        }
        Ok(out)
    }

    /// Full square form with the lower triangle mirrored to the upper.
    pub fn as_square(&self) -> DenseMatrix {
        let n = self.size;
        let mut data = vec![0.0; n * n];
        for r in 0..n {
            for c in 0..=r {
                let v = self.data[packed_index(r, c)];
                data[r * n + c] = v;
                data[c * n + r] = v;
            }
        }
        DenseMatrix {
            rows: n,
            cols: n,
            data,
        }
    }

    /// Compute `t * self * t'`.
    ///
    /// `t` has one row per output feature and one column per input
    /// channel, so the result has `t.rows()` rows and columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `t.cols()` differs from the
    /// matrix size.
    pub fn transform(&self, t: &DenseMatrix) -> Result<SymmetricMatrix> {
        if t.cols != self.size {
            return Err(Error::DimensionMismatch {
                expected: self.size,
                actual: t.cols,
            });
        }
        let square = self.as_square();
        let tc = t.multiply(&square)?;
        let mut out = SymmetricMatrix::new(t.rows);
        for r in 0..t.rows {
            for c in 0..=r {
                let mut sum = 0.0;
                for k in 0..self.size {
                    sum += tc.get(r, k) * t.get(c, k);
                }
                out.data[packed_index(r, c)] = sum;
            }
        }
        Ok(out)
    }
}

/// Dense row-major matrix.
///
/// Used for mirrored views of [`SymmetricMatrix`] and for feature
/// transformation matrices, which need not be square.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    /// Create a zero-filled matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Create a matrix from row-major data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `data.len() != rows * cols`.
    pub fn from_rows(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::DimensionMismatch {
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major data.
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Get an element.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols, "matrix index out of range");
        self.data[row * self.cols + col]
    }

    /// Set an element.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.rows && col < self.cols, "matrix index out of range");
        self.data[row * self.cols + col] = value;
    }

    /// Check whether the matrix is square and equal to its transpose.
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        if self.rows != self.cols {
            return false;
        }
        (0..self.rows).all(|r| {
            (0..r).all(|c| (self.get(r, c) - self.get(c, r)).abs() <= tolerance)
        })
    }

    /// Matrix product `self * other`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the inner dimensions differ.
    pub fn multiply(&self, other: &DenseMatrix) -> Result<DenseMatrix> {
        if self.cols != other.rows {
            return Err(Error::DimensionMismatch {
                expected: self.cols,
                actual: other.rows,
            });
        }
        let mut out = DenseMatrix::new(self.rows, other.cols);
        for r in 0..self.rows {
            for k in 0..self.cols {
                let a = self.data[r * self.cols + k];
                if a == 0.0 {
                    continue;
                }
                for c in 0..other.cols {
                    out.data[r * other.cols + c] += a * other.data[k * other.cols + c];
                }
            }
        }
        Ok(out)
    }

    /// Lower triangle as a [`SymmetricMatrix`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the matrix is not square.
    pub fn to_symmetric(&self) -> Result<SymmetricMatrix> {
        if self.rows != self.cols {
            return Err(Error::DimensionMismatch {
                expected: self.rows,
                actual: self.cols,
            });
        }
        let mut out = SymmetricMatrix::new(self.rows);
        for r in 0..self.rows {
            for c in 0..=r {
                out.set(r, c, self.get(r, c));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangular_len() {
        assert_eq!(triangular_len(0), 0);
        assert_eq!(triangular_len(1), 1);
        assert_eq!(triangular_len(4), 10);
    }

    #[test]
    fn test_symmetric_access() {
        let mut m = SymmetricMatrix::new(3);
        m.set(2, 0, 5.0);
        assert_eq!(m.get(0, 2), 5.0);
        assert_eq!(m.get(2, 0), 5.0);
        m.add_at(0, 2, 1.0);
        assert_eq!(m.get(2, 0), 6.0);
    }

    #[test]
    fn test_from_packed_length() {
        assert!(SymmetricMatrix::from_packed(2, vec![1.0, 2.0, 3.0]).is_ok());
        assert!(SymmetricMatrix::from_packed(2, vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_as_square_mirrors() {
        let m = SymmetricMatrix::from_packed(3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let sq = m.as_square();
        assert!(sq.is_symmetric(0.0));
        assert_eq!(sq.get(0, 1), 2.0);
        assert_eq!(sq.get(1, 0), 2.0);
        assert_eq!(sq.get(0, 2), 4.0);
        assert_eq!(sq.get(2, 1), 5.0);
        assert_eq!(sq.to_symmetric().unwrap(), m);
    }

    #[test]
    fn test_reduce_reorders() {
        let m = SymmetricMatrix::from_packed(3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let r = m.reduce(&[2, 0]).unwrap();
        assert_eq!(r.size(), 2);
        assert_eq!(r.get(0, 0), 6.0);
        assert_eq!(r.get(1, 1), 1.0);
        assert_eq!(r.get(0, 1), 4.0);
        assert!(m.reduce(&[3]).is_err());
    }

    #[test]
    fn test_transform_identity() {
        let m = SymmetricMatrix::from_packed(2, vec![4.0, 1.0, 9.0]).unwrap();
        let t = DenseMatrix::from_rows(2, 2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(m.transform(&t).unwrap(), m);
    }

    #[test]
    fn test_transform_projection() {
        // Sum of the two channels: var = 4 + 9 + 2 * 1
        let m = SymmetricMatrix::from_packed(2, vec![4.0, 1.0, 9.0]).unwrap();
        let t = DenseMatrix::from_rows(1, 2, vec![1.0, 1.0]).unwrap();
        let out = m.transform(&t).unwrap();
        assert_eq!(out.size(), 1);
        assert_eq!(out.get(0, 0), 15.0);
    }

    #[test]
    fn test_add_scaled() {
        let mut a = SymmetricMatrix::identity(2);
        let b = SymmetricMatrix::from_packed(2, vec![2.0, 4.0, 6.0]).unwrap();
        a.add_scaled(&b, 0.5).unwrap();
        assert_eq!(a.packed(), &[2.0, 2.0, 4.0]);
        assert!(a.add_scaled(&SymmetricMatrix::new(3), 1.0).is_err());
    }
}
