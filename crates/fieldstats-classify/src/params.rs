//! Parameters for the statistical classifiers
//!
//! Maximum likelihood, correlation (spectral angle), matched filtering
//! (CEM) and parallelepiped classifiers have no training step of their own.
//! They read class means, covariance matrices or extremes straight from
//! the project and the covariance engine.

use fieldstats_core::SymmetricMatrix;
use fieldstats_covariance::{CovarianceOutput, class_covariance_matrix, common_covariance};
use fieldstats_project::{ClassId, CovarianceStatsToUse, ProjectContext};
use tracing::debug;

use crate::error::{ClassifyError, ClassifyResult};

/// Convert a correlation coefficient to the angle between two spectra.
///
/// The coefficient is clamped to `[-1, 1]`; the angle is in degrees.
pub fn correlation_to_angle(correlation: f64) -> f64 {
    correlation.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Convert an angle in degrees to a correlation coefficient.
pub fn angle_to_correlation(degrees: f64) -> f64 {
    degrees.to_radians().cos()
}

/// Maximum-likelihood statistics of one class
#[derive(Debug, Clone, PartialEq)]
pub struct MaximumLikelihoodClass {
    /// Class
    pub class: ClassId,
    /// Mean vector over the channel subset
    pub mean: Vec<f64>,
    /// Covariance over the channel subset, repaired if degenerate
    pub covariance: SymmetricMatrix,
    /// Prior weight of the class
    pub weight: f64,
}

/// Means and covariances for a maximum-likelihood classifier
///
/// Each class follows its own covariance setting (original, enhanced or
/// leave-one-out).
///
/// # Errors
///
/// Returns an error if a class is unknown or its statistics are not up to
/// date.
pub fn maximum_likelihood_parameters(
    project: &mut ProjectContext,
    classes: &[ClassId],
    channels: &[usize],
) -> ClassifyResult<Vec<MaximumLikelihoodClass>> {
    let mut params = Vec::with_capacity(classes.len());
    for &class in classes {
        let mean = project.class_mean_vector(class, channels)?;
        let covariance =
            class_covariance_matrix(project, class, channels, CovarianceOutput::Covariance)?;
        let weight = project.class(class)?.weight();
        params.push(MaximumLikelihoodClass {
            class,
            mean,
            covariance,
            weight,
        });
    }
    debug!(classes = params.len(), channels = channels.len(), "maximum likelihood parameters");
    Ok(params)
}

/// Reference spectra for a correlation classifier
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationParameters {
    /// Class mean vectors
    pub means: Vec<(ClassId, Vec<f64>)>,
    /// Largest accepted angle in degrees
    pub threshold_angle: f64,
}

impl CorrelationParameters {
    /// Smallest accepted correlation coefficient.
    pub fn threshold_correlation(&self) -> f64 {
        angle_to_correlation(self.threshold_angle)
    }
}

/// Class means and an angle threshold for a correlation classifier
///
/// # Errors
///
/// Returns an error if the angle is outside `0..=180` degrees or a class
/// has no statistics.
pub fn correlation_parameters(
    project: &ProjectContext,
    classes: &[ClassId],
    channels: &[usize],
    threshold_angle: f64,
) -> ClassifyResult<CorrelationParameters> {
    if !(0.0..=180.0).contains(&threshold_angle) {
        return Err(ClassifyError::InvalidParameter(format!(
            "threshold angle must be in 0..=180 degrees, got {}",
            threshold_angle
        )));
    }
    let means = class_means(project, classes, channels)?;
    Ok(CorrelationParameters {
        means,
        threshold_angle,
    })
}

/// Targets and background statistics for a matched filter
#[derive(Debug, Clone, PartialEq)]
pub struct CemParameters {
    /// Target class mean vectors
    pub targets: Vec<(ClassId, Vec<f64>)>,
    /// Weighted common covariance of every class in the project
    pub background: SymmetricMatrix,
    /// Classes that contributed to `background`
    pub background_classes: usize,
    /// Minimum filter response
    pub threshold: f64,
}

/// Target means and background covariance for a CEM classifier
///
/// The background is the common covariance of all project classes with
/// their class weights, each class following its own covariance setting.
///
/// # Errors
///
/// Returns an error if no class has a positive weight or a class has no
/// statistics.
pub fn cem_parameters(
    project: &mut ProjectContext,
    targets: &[ClassId],
    channels: &[usize],
    threshold: f64,
) -> ClassifyResult<CemParameters> {
    let all = project.class_ids();
    let mut weights = Vec::with_capacity(all.len());
    for &class in &all {
        weights.push(project.class(class)?.weight());
    }
    let common = common_covariance(project, &all, &weights, channels, CovarianceStatsToUse::Mixed)?;
    Ok(CemParameters {
        targets: class_means(project, targets, channels)?,
        background: common.matrix,
        background_classes: common.number_classes,
        threshold,
    })
}

/// How parallelepiped bounds are derived
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ParallelepipedMode {
    /// Class minimum and maximum per channel
    #[default]
    MinMax,
    /// Mean plus or minus the given number of standard deviations
    StdDev(f64),
}

impl ParallelepipedMode {
    /// Validate the standard deviation factor
    pub fn validate(&self) -> ClassifyResult<()> {
        match *self {
            ParallelepipedMode::StdDev(k) if !(k >= 0.0) => Err(ClassifyError::InvalidParameter(
                format!("standard deviation factor must be non-negative, got {}", k),
            )),
            _ => Ok(()),
        }
    }
}

/// Box of one class
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelepipedBox {
    /// Class
    pub class: ClassId,
    /// Lower bound per channel
    pub lower: Vec<f64>,
    /// Upper bound per channel
    pub upper: Vec<f64>,
}

impl ParallelepipedBox {
    /// Whether a channel vector lies inside the box, bounds included.
    pub fn contains(&self, values: &[f64]) -> bool {
        values
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .all(|(v, (lo, hi))| v >= lo && v <= hi)
    }
}

/// Per-class boxes for a parallelepiped classifier
///
/// # Errors
///
/// Returns an error for a negative standard deviation factor or a class
/// without statistics.
pub fn parallelepiped_parameters(
    project: &ProjectContext,
    classes: &[ClassId],
    channels: &[usize],
    mode: ParallelepipedMode,
) -> ClassifyResult<Vec<ParallelepipedBox>> {
    mode.validate()?;
    classes
        .iter()
        .map(|&class| {
            let (lower, upper) = match mode {
                ParallelepipedMode::MinMax => (
                    project.class_minimum_vector(class, channels)?,
                    project.class_maximum_vector(class, channels)?,
                ),
                ParallelepipedMode::StdDev(k) => {
                    let mean = project.class_mean_vector(class, channels)?;
                    let sd = project.class_std_dev_vector(class, channels)?;
                    let lower = mean.iter().zip(&sd).map(|(m, s)| m - k * s).collect();
                    let upper = mean.iter().zip(&sd).map(|(m, s)| m + k * s).collect();
                    (lower, upper)
                }
            };
            Ok(ParallelepipedBox {
                class,
                lower,
                upper,
            })
        })
        .collect()
}

fn class_means(
    project: &ProjectContext,
    classes: &[ClassId],
    channels: &[usize],
) -> ClassifyResult<Vec<(ClassId, Vec<f64>)>> {
    classes
        .iter()
        .map(|&c| Ok((c, project.class_mean_vector(c, channels)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldstats_core::{MultibandImage, Rect};
    use fieldstats_project::{FieldGeometry, FieldType, NoProgress, StatisticsOptions, UpdateScope};

    // Channel 0 is x, channel 1 is 2y
    fn project() -> (ProjectContext, ClassId) {
        let mut image = MultibandImage::from_fn(4, 4, 2, |x, y, c| {
            if c == 0 { x as f64 } else { 2.0 * y as f64 }
        })
        .unwrap();
        let mut p = ProjectContext::new(vec![0, 1], StatisticsOptions::default()).unwrap();
        let c = p.add_class("c").unwrap();
        let g = FieldGeometry::Rectangle(Rect::new(1, 0, 2, 3).unwrap());
        p.add_field(c, "f", FieldType::Training, g).unwrap();
        p.try_update_statistics(UpdateScope::Project, &mut image, &mut NoProgress)
            .unwrap();
        (p, c)
    }

    #[test]
    fn test_angle_conversion() {
        assert!((correlation_to_angle(1.0)).abs() < 1e-12);
        assert!((correlation_to_angle(0.0) - 90.0).abs() < 1e-12);
        assert!((correlation_to_angle(1.5)).abs() < 1e-12);
        assert!((angle_to_correlation(60.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_parallelepiped_min_max() {
        let (p, c) = project();
        let boxes = parallelepiped_parameters(&p, &[c], &[0, 1], ParallelepipedMode::MinMax).unwrap();
        assert_eq!(boxes[0].lower, vec![1.0, 0.0]);
        assert_eq!(boxes[0].upper, vec![2.0, 4.0]);
        assert!(boxes[0].contains(&[1.5, 4.0]));
        assert!(!boxes[0].contains(&[0.5, 1.0]));
    }

    #[test]
    fn test_parallelepiped_std_dev() {
        let (p, c) = project();
        let boxes =
            parallelepiped_parameters(&p, &[c], &[0], ParallelepipedMode::StdDev(0.0)).unwrap();
        assert_eq!(boxes[0].lower, vec![1.5]);
        assert_eq!(boxes[0].upper, vec![1.5]);
        assert!(parallelepiped_parameters(&p, &[c], &[0], ParallelepipedMode::StdDev(-1.0)).is_err());
    }

    #[test]
    fn test_correlation_threshold() {
        let (p, c) = project();
        let params = correlation_parameters(&p, &[c], &[1, 0], 60.0).unwrap();
        assert_eq!(params.means[0].1, vec![2.0, 1.5]);
        assert!((params.threshold_correlation() - 0.5).abs() < 1e-12);
        assert!(correlation_parameters(&p, &[c], &[0], 200.0).is_err());
    }
}
