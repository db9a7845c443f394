//! Leave-one-out covariance mixing
//!
//! A class covariance estimated from few samples is blended towards more
//! stable estimates as the mixing value `a` grows from 0 to 3:
//!
//! | `a`      | result                                   |
//! |----------|------------------------------------------|
//! | `0..=1`  | `(1-a) diag(C) + a C`                    |
//! | `1..=2`  | `(2-a) C + (a-1) S`                      |
//! | `2..=3`  | `(3-a) S + (a-2) diag(S)`                |
//!
//! where `C` is the class covariance and `S` the common covariance.

use fieldstats_core::{Error, SymmetricMatrix};
use fieldstats_project::MixingParameterCode;

use crate::error::{CovarianceError, CovarianceResult};

/// Largest valid mixing value
pub const MAX_MIXING_VALUE: f64 = 3.0;

/// Mixing value selected by a mixing code.
///
/// # Errors
///
/// Returns [`CovarianceError::MixingValueNotComputed`] for
/// [`MixingParameterCode::ComputedOptimum`] without an optimum, and an
/// invalid-parameter error for a value outside `0..=3`.
pub fn mixing_value(
    code: MixingParameterCode,
    optimum: Option<f64>,
    user_value: f64,
) -> CovarianceResult<f64> {
    let a = match code {
        MixingParameterCode::ComputedOptimum => {
            optimum.ok_or(CovarianceError::MixingValueNotComputed)?
        }
        MixingParameterCode::UserSet => user_value,
        MixingParameterCode::IdentityMatrix => 0.0,
    };
    if !(0.0..=MAX_MIXING_VALUE).contains(&a) {
        return Err(Error::InvalidParameter(format!(
            "mixing value must be in 0..=3, got {}",
            a
        ))
        .into());
    }
    Ok(a)
}

/// Whether a mixing value draws on the common covariance.
#[inline]
pub fn needs_common_covariance(a: f64) -> bool {
    a > 1.0
}

/// Blend a class covariance with the common covariance.
///
/// # Arguments
///
/// * `code` - How the mixing value is chosen
/// * `optimum` - Estimated optimum, used with `ComputedOptimum`
/// * `user_value` - Value used with `UserSet`
/// * `class_cov` - Class covariance
/// * `common_cov` - Common covariance, needed when the mixing value
///   exceeds 1
///
/// # Errors
///
/// Returns an error if the mixing value is missing or out of range, if the
/// common covariance is needed but absent, or if the sizes differ.
pub fn loo_covariance(
    code: MixingParameterCode,
    optimum: Option<f64>,
    user_value: f64,
    class_cov: &SymmetricMatrix,
    common_cov: Option<&SymmetricMatrix>,
) -> CovarianceResult<SymmetricMatrix> {
    let a = mixing_value(code, optimum, user_value)?;
    let n = class_cov.size();
    let mut out = SymmetricMatrix::new(n);

    if !needs_common_covariance(a) {
        let diagonal = SymmetricMatrix::from_diagonal(&class_cov.diagonal());
        out.add_scaled(&diagonal, 1.0 - a)?;
        out.add_scaled(class_cov, a)?;
        return Ok(out);
    }

    let common = common_cov.ok_or_else(|| {
        CovarianceError::NoStatistics(format!(
            "common covariance required for mixing value {}",
            a
        ))
    })?;
    if common.size() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: common.size(),
        }
        .into());
    }
    if a <= 2.0 {
        out.add_scaled(class_cov, 2.0 - a)?;
        out.add_scaled(common, a - 1.0)?;
    } else {
        let diagonal = SymmetricMatrix::from_diagonal(&common.diagonal());
        out.add_scaled(common, 3.0 - a)?;
        out.add_scaled(&diagonal, a - 2.0)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_cov() -> SymmetricMatrix {
        SymmetricMatrix::from_packed(2, vec![4.0, 2.0, 9.0]).unwrap()
    }

    fn common_cov() -> SymmetricMatrix {
        SymmetricMatrix::from_packed(2, vec![1.0, 0.5, 3.0]).unwrap()
    }

    fn mix(a: f64) -> SymmetricMatrix {
        loo_covariance(
            MixingParameterCode::UserSet,
            None,
            a,
            &class_cov(),
            Some(&common_cov()),
        )
        .unwrap()
    }

    #[test]
    fn test_mixing_breakpoints() {
        assert_eq!(mix(0.0).packed(), &[4.0, 0.0, 9.0]);
        assert_eq!(mix(1.0).packed(), class_cov().packed());
        assert_eq!(mix(2.0).packed(), common_cov().packed());
        assert_eq!(mix(3.0).packed(), &[1.0, 0.0, 3.0]);
        assert_eq!(mix(0.5).packed(), &[4.0, 1.0, 9.0]);
        assert_eq!(mix(1.5).packed(), &[2.5, 1.25, 6.0]);
    }

    #[test]
    fn test_identity_needs_no_common() {
        let out = loo_covariance(
            MixingParameterCode::IdentityMatrix,
            None,
            2.5,
            &class_cov(),
            None,
        )
        .unwrap();
        assert_eq!(out.packed(), &[4.0, 0.0, 9.0]);
    }

    #[test]
    fn test_missing_optimum_is_an_error() {
        let result = loo_covariance(
            MixingParameterCode::ComputedOptimum,
            None,
            1.0,
            &class_cov(),
            Some(&common_cov()),
        );
        assert!(matches!(result, Err(CovarianceError::MixingValueNotComputed)));
    }

    #[test]
    fn test_common_required_above_one() {
        let result = loo_covariance(
            MixingParameterCode::ComputedOptimum,
            Some(1.2),
            0.0,
            &class_cov(),
            None,
        );
        assert!(matches!(result, Err(CovarianceError::NoStatistics(_))));
        assert!(mixing_value(MixingParameterCode::UserSet, None, 3.5).is_err());
    }
}
