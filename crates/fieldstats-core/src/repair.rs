//! Degenerate covariance repair and correlation
//!
//! A covariance matrix with a zero variance, or one where every entry is
//! the same value (duplicated channels), cannot be inverted. The repairs
//! here substitute values so downstream classifiers can proceed; each
//! returns whether a substitution happened so callers can report it.

use crate::matrix::SymmetricMatrix;

/// Replace every zero diagonal entry with `factor`.
///
/// Returns `true` if any entry was replaced. Applying the repair twice
/// yields the same matrix as applying it once, as long as `factor` is
/// nonzero.
pub fn reset_zero_variances(matrix: &mut SymmetricMatrix, factor: f64) -> bool {
    let mut changed = false;
    for i in 0..matrix.size() {
        if matrix.get(i, i) == 0.0 {
            matrix.set(i, i, factor);
            changed = true;
        }
    }
    changed
}

/// Replace every zero entry of a variance vector with `factor`.
pub fn reset_zero_variance_vector(variances: &mut [f64], factor: f64) -> bool {
    let mut changed = false;
    for v in variances.iter_mut().filter(|v| **v == 0.0) {
        *v = factor;
        changed = true;
    }
    changed
}

/// Zero the off-diagonal entries when every stored entry is identical.
///
/// Matrices with one channel or fewer are left alone. Returns `true` if
/// the matrix was changed.
pub fn reset_for_all_variances_equal(matrix: &mut SymmetricMatrix) -> bool {
    if matrix.size() <= 1 {
        return false;
    }
    let packed = matrix.packed();
    let first = packed[0];
    if packed.iter().any(|&v| v != first) {
        return false;
    }
    matrix.zero_off_diagonal();
    true
}

/// Standard deviations from the diagonal of a covariance matrix.
pub fn std_devs_from_covariance(covariance: &SymmetricMatrix) -> Vec<f64> {
    covariance
        .diagonal()
        .into_iter()
        .map(|v| v.abs().sqrt())
        .collect()
}

/// Correlation matrix from a covariance matrix.
///
/// `r[i,j] = cov[i,j] / (sd_i * sd_j)`; entries involving a channel with
/// zero standard deviation are set to zero.
pub fn correlation_from_covariance(covariance: &SymmetricMatrix) -> SymmetricMatrix {
    let sd = std_devs_from_covariance(covariance);
    let n = covariance.size();
    let mut out = SymmetricMatrix::new(n);
    for i in 0..n {
        for j in 0..=i {
            let denom = sd[i] * sd[j];
            let v = if denom > 0.0 {
                covariance.get(i, j) / denom
            } else {
                0.0
            };
            out.set(i, j, v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_zero_variances() {
        let mut m = SymmetricMatrix::from_packed(2, vec![0.0, 0.0, 3.0]).unwrap();
        assert!(reset_zero_variances(&mut m, 0.1));
        assert_eq!(m.get(0, 0), 0.1);
        assert_eq!(m.get(1, 1), 3.0);
        let once = m.clone();
        assert!(!reset_zero_variances(&mut m, 0.1));
        assert_eq!(m, once);
    }

    #[test]
    fn test_reset_zero_variance_vector() {
        let mut v = vec![0.0, 2.0, 0.0];
        assert!(reset_zero_variance_vector(&mut v, 0.5));
        assert_eq!(v, vec![0.5, 2.0, 0.5]);
    }

    #[test]
    fn test_all_variances_equal() {
        let mut m = SymmetricMatrix::from_packed(2, vec![2.0, 2.0, 2.0]).unwrap();
        assert!(reset_for_all_variances_equal(&mut m));
        assert_eq!(m.packed(), &[2.0, 0.0, 2.0]);

        let mut single = SymmetricMatrix::from_packed(1, vec![2.0]).unwrap();
        assert!(!reset_for_all_variances_equal(&mut single));

        let mut distinct = SymmetricMatrix::from_packed(2, vec![2.0, 1.0, 2.0]).unwrap();
        assert!(!reset_for_all_variances_equal(&mut distinct));
    }

    #[test]
    fn test_correlation() {
        let cov = SymmetricMatrix::from_packed(3, vec![4.0, 3.0, 9.0, 0.0, 0.0, 0.0]).unwrap();
        let r = correlation_from_covariance(&cov);
        assert!((r.get(0, 0) - 1.0).abs() < 1e-12);
        assert!((r.get(1, 0) - 0.5).abs() < 1e-12);
        assert_eq!(r.get(2, 2), 0.0);
        assert_eq!(r.get(2, 0), 0.0);
    }
}
