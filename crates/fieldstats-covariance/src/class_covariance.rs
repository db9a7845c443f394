//! Class covariance matrices
//!
//! Matrices are derived on demand from a class's statistics slot, reduced
//! to the caller's channel subset and, when requested, repaired so they
//! can be inverted. Which statistics feed the matrix follows the class's
//! covariance setting: original, enhanced or leave-one-out.

use fieldstats_core::{
    DenseMatrix, StatisticsCode, SymmetricMatrix, correlation_from_covariance,
    reset_for_all_variances_equal, reset_zero_variances,
};
use fieldstats_project::{ClassId, CovarianceStatsToUse, ProjectContext};
use tracing::warn;

use crate::common::project_common_covariance;
use crate::error::{CovarianceError, CovarianceResult};
use crate::loo::{loo_covariance, mixing_value, needs_common_covariance};

/// Form of the returned matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CovarianceOutput {
    /// Full covariance matrix
    #[default]
    Covariance,
    /// Variances only, off-diagonal entries zero
    VarianceOnly,
}

impl CovarianceOutput {
    /// Output form matching a statistics code.
    pub fn for_code(code: StatisticsCode) -> Self {
        if code.wants_covariance() {
            Self::Covariance
        } else {
            Self::VarianceOnly
        }
    }
}

/// Degenerate matrix conditions reported per class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Degenerate {
    ZeroVariance,
    AllVariancesEqual,
}

/// Covariance matrix of a class over a channel subset
///
/// # Arguments
///
/// * `project` - Project holding the class
/// * `class` - Class to read
/// * `channels` - Indices into the project channel list
/// * `output` - Full covariance or variances only
///
/// # Errors
///
/// Returns an error if the class is not up to date, if full covariance is
/// requested from standard-deviation-only statistics, or if leave-one-out
/// mixing cannot be applied.
pub fn class_covariance_matrix(
    project: &mut ProjectContext,
    class: ClassId,
    channels: &[usize],
    output: CovarianceOutput,
) -> CovarianceResult<SymmetricMatrix> {
    let stats = project.effective_covariance_stats(class)?;
    class_covariance_with(project, class, channels, output, stats, true)
}

/// Class covariance for an explicit statistics choice.
///
/// `Mixed` means the class's own setting and `Enhanced` falls back to the
/// original statistics when the class has none.
pub(crate) fn class_covariance_with(
    project: &mut ProjectContext,
    class: ClassId,
    channels: &[usize],
    output: CovarianceOutput,
    stats: CovarianceStatsToUse,
    repair: bool,
) -> CovarianceResult<SymmetricMatrix> {
    project.check_channel_subset(channels)?;
    let record = project.class(class)?;
    let stats = match stats {
        CovarianceStatsToUse::Mixed => record.covariance_stats_to_use(),
        other => other,
    };

    let mut matrix = match (stats, record.enhanced()) {
        (CovarianceStatsToUse::Enhanced, Some(enhanced)) => {
            let reduced = enhanced.covariance.reduce(channels)?;
            match output {
                CovarianceOutput::Covariance => reduced,
                CovarianceOutput::VarianceOnly => SymmetricMatrix::from_diagonal(&reduced.diagonal()),
            }
        }
        _ => original_covariance(project, class, channels, output)?,
    };

    if stats == CovarianceStatsToUse::LeaveOneOut && output == CovarianceOutput::Covariance {
        matrix = leave_one_out(project, class, channels, &matrix)?;
    }

    if repair && output == CovarianceOutput::Covariance && project.options().set_zero_variance {
        let factor = project.options().zero_variance_factor;
        if reset_zero_variances(&mut matrix, factor) {
            report_degenerate(project, class, Degenerate::ZeroVariance)?;
        }
    }
    Ok(matrix)
}

fn original_covariance(
    project: &ProjectContext,
    class: ClassId,
    channels: &[usize],
    output: CovarianceOutput,
) -> CovarianceResult<SymmetricMatrix> {
    let slot = project.class_statistics(class)?;
    let pixels = project.class(class)?.statistics_pixels();
    match output {
        CovarianceOutput::Covariance => {
            if !slot.code().wants_covariance() {
                return Err(CovarianceError::NoStatistics(
                    "covariance requested but only standard deviations were collected"
                        .to_string(),
                ));
            }
            Ok(slot.derive_covariance(pixels).reduce(channels)?)
        }
        CovarianceOutput::VarianceOnly => {
            let variances = slot.variances(pixels);
            let subset: Vec<f64> = channels.iter().map(|&c| variances[c]).collect();
            Ok(SymmetricMatrix::from_diagonal(&subset))
        }
    }
}

fn leave_one_out(
    project: &mut ProjectContext,
    class: ClassId,
    channels: &[usize],
    class_cov: &SymmetricMatrix,
) -> CovarianceResult<SymmetricMatrix> {
    let record = project.class(class)?;
    let code = record.mixing_parameter_code();
    let optimum = record.loo_covariance_value();
    let user_value = record.user_mixing_value();

    let a = mixing_value(code, optimum, user_value)?;
    let common = if needs_common_covariance(a) {
        Some(project_common_covariance(project)?.matrix.reduce(channels)?)
    } else {
        None
    };
    loo_covariance(code, optimum, user_value, class_cov, common.as_ref())
}

/// Class covariance transformed by a feature matrix, then checked
///
/// The matrix is derived without zero-variance repair so the transform
/// sees the statistics as collected; both repairs run on the result.
///
/// # Arguments
///
/// * `transform` - One row per output feature, one column per channel of
///   the subset. `None` checks the untransformed matrix.
pub fn transformed_class_covariance(
    project: &mut ProjectContext,
    class: ClassId,
    channels: &[usize],
    transform: Option<&DenseMatrix>,
    output: CovarianceOutput,
) -> CovarianceResult<SymmetricMatrix> {
    let stats = project.effective_covariance_stats(class)?;
    let matrix = class_covariance_with(project, class, channels, output, stats, false)?;
    let mut matrix = match transform {
        Some(t) => matrix.transform(t)?,
        None => matrix,
    };
    check_matrix(project, class, &mut matrix, output)?;
    Ok(matrix)
}

/// Repair a class matrix so it can be inverted
///
/// Zero variances are replaced when enabled in the project options, then
/// a matrix whose entries are all equal has its off-diagonal zeroed. Each
/// repair is reported for the class, once per class when the project asks
/// for one message per class.
///
/// # Returns
///
/// Whether the matrix was changed. Variance-only output is never changed.
pub fn check_matrix(
    project: &mut ProjectContext,
    class: ClassId,
    matrix: &mut SymmetricMatrix,
    output: CovarianceOutput,
) -> CovarianceResult<bool> {
    if output != CovarianceOutput::Covariance {
        return Ok(false);
    }
    let mut changed = false;
    if project.options().set_zero_variance
        && reset_zero_variances(matrix, project.options().zero_variance_factor)
    {
        report_degenerate(project, class, Degenerate::ZeroVariance)?;
        changed = true;
    }
    if reset_for_all_variances_equal(matrix) {
        report_degenerate(project, class, Degenerate::AllVariancesEqual)?;
        changed = true;
    }
    Ok(changed)
}

/// Correlation matrix of a class over a channel subset.
pub fn class_correlation_matrix(
    project: &mut ProjectContext,
    class: ClassId,
    channels: &[usize],
) -> CovarianceResult<SymmetricMatrix> {
    let covariance = class_covariance_matrix(project, class, channels, CovarianceOutput::Covariance)?;
    Ok(correlation_from_covariance(&covariance))
}

fn report_degenerate(
    project: &mut ProjectContext,
    class: ClassId,
    kind: Degenerate,
) -> CovarianceResult<()> {
    let once = project.options().list_one_message_per_class;
    let record = project.class(class)?;
    if !once || record.list_message() {
        match kind {
            Degenerate::ZeroVariance => warn!(
                class = class.0,
                name = record.name(),
                "zero variance set to the replacement factor"
            ),
            Degenerate::AllVariancesEqual => warn!(
                class = class.0,
                name = record.name(),
                "all variances and covariances equal; covariances set to zero"
            ),
        }
    }
    if once {
        project.set_class_list_message_flag(class, false)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldstats_core::{MultibandImage, Rect};
    use fieldstats_project::{
        EnhancedStatistics, FieldGeometry, FieldType, MixingParameterCode, NoProgress,
        StatisticsOptions, UpdateScope,
    };

    /// Class over a 2x2 block where channel 1 is constant.
    fn flat_channel_project(options: StatisticsOptions) -> (ProjectContext, ClassId) {
        let mut image = MultibandImage::from_fn(4, 4, 2, |x, y, c| {
            if c == 0 { (x + 2 * y) as f64 } else { 7.0 }
        })
        .unwrap();
        let mut p = ProjectContext::new(vec![0, 1], options).unwrap();
        let c = p.add_class("flat").unwrap();
        let g = FieldGeometry::Rectangle(Rect::new(0, 0, 2, 2).unwrap());
        p.add_field(c, "f", FieldType::Training, g).unwrap();
        p.try_update_statistics(UpdateScope::Project, &mut image, &mut NoProgress)
            .unwrap();
        (p, c)
    }

    #[test]
    fn test_zero_variance_repaired() {
        let (mut p, c) = flat_channel_project(StatisticsOptions::default());
        let m = class_covariance_matrix(&mut p, c, &[0, 1], CovarianceOutput::Covariance).unwrap();
        // Channel 0 values 0, 1, 2, 3
        assert!((m.get(0, 0) - 5.0 / 3.0).abs() < 1e-12);
        assert_eq!(m.get(1, 1), 0.1);
        assert_eq!(m.get(1, 0), 0.0);
        assert!(!p.class(c).unwrap().list_message());
    }

    #[test]
    fn test_repair_disabled() {
        let options = StatisticsOptions::default().with_set_zero_variance(false);
        let (mut p, c) = flat_channel_project(options);
        let m = class_covariance_matrix(&mut p, c, &[1], CovarianceOutput::Covariance).unwrap();
        assert_eq!(m.get(0, 0), 0.0);
        assert!(p.class(c).unwrap().list_message());
    }

    #[test]
    fn test_variance_only_and_subset_order() {
        let (mut p, c) = flat_channel_project(StatisticsOptions::default());
        let m = class_covariance_matrix(&mut p, c, &[1, 0], CovarianceOutput::VarianceOnly).unwrap();
        assert_eq!(m.get(0, 0), 0.0);
        assert!((m.get(1, 1) - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_enhanced_used_when_selected() {
        let (mut p, c) = flat_channel_project(StatisticsOptions::default());
        let enhanced = SymmetricMatrix::from_packed(2, vec![2.0, 0.5, 3.0]).unwrap();
        p.set_enhanced_statistics(
            c,
            EnhancedStatistics {
                means: vec![0.0, 0.0],
                covariance: enhanced.clone(),
            },
        )
        .unwrap();
        p.set_class_covariance_stats_to_use(c, CovarianceStatsToUse::Enhanced)
            .unwrap();
        let m = class_covariance_matrix(&mut p, c, &[0, 1], CovarianceOutput::Covariance).unwrap();
        assert_eq!(m, enhanced);
    }

    #[test]
    fn test_identity_mixing_is_diagonal() {
        let (mut p, c) = flat_channel_project(StatisticsOptions::default());
        p.set_loo_parameters(c, MixingParameterCode::IdentityMatrix, 0.0)
            .unwrap();
        p.set_class_covariance_stats_to_use(c, CovarianceStatsToUse::LeaveOneOut)
            .unwrap();
        let m = class_covariance_matrix(&mut p, c, &[0, 1], CovarianceOutput::Covariance).unwrap();
        assert_eq!(m.get(1, 0), 0.0);
    }

    #[test]
    fn test_transform_then_check() {
        let (mut p, c) = flat_channel_project(StatisticsOptions::default());
        // Both features read channel 1 only: every entry of the result is 0
        let t = DenseMatrix::from_rows(2, 2, vec![0.0, 1.0, 0.0, 1.0]).unwrap();
        let m = transformed_class_covariance(&mut p, c, &[0, 1], Some(&t), CovarianceOutput::Covariance)
            .unwrap();
        assert_eq!(m.packed(), &[0.1, 0.0, 0.1]);
    }

    #[test]
    fn test_correlation_matrix() {
        let (mut p, c) = flat_channel_project(StatisticsOptions::default());
        let r = class_correlation_matrix(&mut p, c, &[0, 1]).unwrap();
        assert!((r.get(0, 0) - 1.0).abs() < 1e-12);
        assert_eq!(r.get(1, 0), 0.0);
    }
}
