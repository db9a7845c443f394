//! Common covariance
//!
//! The common covariance is the weighted mean of class covariance
//! matrices. Weights are normalised by their total; a class with zero
//! weight does not contribute and is not counted.

use fieldstats_core::{Error, SymmetricMatrix};
use fieldstats_project::{ClassId, CommonCovariance, CovarianceStatsToUse, ProjectContext};
use tracing::debug;

use crate::class_covariance::{CovarianceOutput, class_covariance_with};
use crate::error::{CovarianceError, CovarianceResult};

/// Weighted common covariance of a set of classes
///
/// # Arguments
///
/// * `project` - Project holding the classes
/// * `classes` - Classes to combine
/// * `weights` - One non-negative weight per class
/// * `channels` - Indices into the project channel list
/// * `stats` - Statistics to use for every class, or `Mixed` for each
///   class's own setting
///
/// # Errors
///
/// Returns an error if the weights do not match the classes, if a weight
/// is negative, if no weight is positive, or if a contributing class has
/// no usable statistics.
pub fn common_covariance(
    project: &mut ProjectContext,
    classes: &[ClassId],
    weights: &[f64],
    channels: &[usize],
    stats: CovarianceStatsToUse,
) -> CovarianceResult<CommonCovariance> {
    if weights.len() != classes.len() {
        return Err(Error::DimensionMismatch {
            expected: classes.len(),
            actual: weights.len(),
        }
        .into());
    }
    if let Some(w) = weights.iter().find(|&&w| !(w >= 0.0)) {
        return Err(Error::InvalidParameter(format!("class weight must be non-negative, got {}", w)).into());
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(CovarianceError::NoStatistics(
            "no class has a positive weight".to_string(),
        ));
    }

    let mut matrix = SymmetricMatrix::new(channels.len());
    let mut number_classes = 0;
    for (&class, &weight) in classes.iter().zip(weights) {
        if weight <= 0.0 {
            continue;
        }
        let class_cov = class_covariance_with(
            project,
            class,
            channels,
            CovarianceOutput::Covariance,
            stats,
            true,
        )?;
        matrix.add_scaled(&class_cov, weight / total)?;
        number_classes += 1;
    }
    Ok(CommonCovariance {
        matrix,
        number_classes,
    })
}

/// Project common covariance over all channels, computed once and stored
///
/// Every class contributes its original statistics with its class weight,
/// so leave-one-out classes can mix with it without depending on it.
/// The stored value is dropped by any change that could affect it.
pub fn project_common_covariance(project: &mut ProjectContext) -> CovarianceResult<CommonCovariance> {
    if let Some(stored) = project.store().common_covariance() {
        return Ok(stored.clone());
    }
    let classes = project.class_ids();
    let mut weights = Vec::with_capacity(classes.len());
    for &class in &classes {
        weights.push(project.class(class)?.weight());
    }
    let channels: Vec<usize> = (0..project.channel_count()).collect();
    let common = common_covariance(
        project,
        &classes,
        &weights,
        &channels,
        CovarianceStatsToUse::Original,
    )?;
    debug!(classes = common.number_classes, "common covariance computed");
    project.set_common_covariance(common.matrix.clone(), common.number_classes);
    Ok(common)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldstats_core::{MultibandImage, Rect};
    use fieldstats_project::{FieldGeometry, FieldType, NoProgress, StatisticsOptions, UpdateScope};

    fn two_class_project() -> (ProjectContext, ClassId, ClassId) {
        let mut image =
            MultibandImage::from_fn(6, 6, 2, |x, y, c| ((x * (c as u32 + 1)) + y * y) as f64).unwrap();
        let mut p = ProjectContext::new(vec![0, 1], StatisticsOptions::default()).unwrap();
        let a = p.add_class("a").unwrap();
        let b = p.add_class("b").unwrap();
        let ga = FieldGeometry::Rectangle(Rect::new(0, 0, 3, 3).unwrap());
        let gb = FieldGeometry::Rectangle(Rect::new(2, 2, 4, 4).unwrap());
        p.add_field(a, "a", FieldType::Training, ga).unwrap();
        p.add_field(b, "b", FieldType::Training, gb).unwrap();
        p.try_update_statistics(UpdateScope::Project, &mut image, &mut NoProgress)
            .unwrap();
        (p, a, b)
    }

    #[test]
    fn test_weights_normalised() {
        let (mut p, a, b) = two_class_project();
        let ca = crate::class_covariance_matrix(&mut p, a, &[0, 1], CovarianceOutput::Covariance)
            .unwrap();
        let cb = crate::class_covariance_matrix(&mut p, b, &[0, 1], CovarianceOutput::Covariance)
            .unwrap();
        let common =
            common_covariance(&mut p, &[a, b], &[1.0, 3.0], &[0, 1], CovarianceStatsToUse::Mixed)
                .unwrap();
        assert_eq!(common.number_classes, 2);
        for (i, v) in common.matrix.packed().iter().enumerate() {
            let expected = 0.25 * ca.packed()[i] + 0.75 * cb.packed()[i];
            assert!((v - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_weight_excluded() {
        let (mut p, a, b) = two_class_project();
        let common =
            common_covariance(&mut p, &[a, b], &[0.0, 2.0], &[1], CovarianceStatsToUse::Original)
                .unwrap();
        assert_eq!(common.number_classes, 1);
        assert!(common_covariance(&mut p, &[a], &[0.0], &[1], CovarianceStatsToUse::Original).is_err());
        assert!(common_covariance(&mut p, &[a], &[1.0, 1.0], &[1], CovarianceStatsToUse::Original).is_err());
    }

    #[test]
    fn test_project_common_stored_and_invalidated() {
        let (mut p, a, _) = two_class_project();
        let common = project_common_covariance(&mut p).unwrap();
        assert_eq!(common.number_classes, 2);
        assert_eq!(p.store().common_covariance(), Some(&common));
        p.set_class_weight(a, 0.0).unwrap();
        assert!(p.store().common_covariance().is_none());
        assert_eq!(project_common_covariance(&mut p).unwrap().number_classes, 1);
    }
}
