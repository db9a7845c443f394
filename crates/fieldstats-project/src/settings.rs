//! Covariance statistics settings
//!
//! Each class chooses which covariance the classifiers see: the original
//! training statistics, externally enhanced statistics, or the
//! leave-one-out mix with the common covariance. The project setting
//! summarises the classes and reads `Mixed` when they disagree.

use tracing::debug;

use crate::error::{ProjectError, ProjectResult};
use crate::project::ProjectContext;
use crate::types::{ClassId, CovarianceStatsToUse, MixingParameterCode};

impl ProjectContext {
    /// Covariance statistics a class actually uses.
    ///
    /// `Enhanced` without enhanced statistics falls back to `Original`.
    pub fn effective_covariance_stats(&self, class: ClassId) -> ProjectResult<CovarianceStatsToUse> {
        let record = self.class(class)?;
        Ok(match record.covariance_stats_to_use {
            CovarianceStatsToUse::Enhanced if record.enhanced.is_none() => {
                CovarianceStatsToUse::Original
            }
            other => other,
        })
    }

    /// Whether the statistics needed for `stats` exist for a class.
    ///
    /// Original statistics always exist in this sense. Enhanced ones need
    /// to have been set; leave-one-out with a computed optimum needs the
    /// optimum value. `Mixed` checks each class's own setting.
    pub fn determine_if_specified_statistics_exist(
        &self,
        class: ClassId,
        stats: CovarianceStatsToUse,
    ) -> ProjectResult<bool> {
        let record = self.class(class)?;
        Ok(match stats {
            CovarianceStatsToUse::Original => true,
            CovarianceStatsToUse::Enhanced => record.enhanced.is_some(),
            CovarianceStatsToUse::LeaveOneOut => {
                record.mixing_parameter_code != MixingParameterCode::ComputedOptimum
                    || record.loo_covariance_value.is_some()
            }
            CovarianceStatsToUse::Mixed => match record.covariance_stats_to_use {
                CovarianceStatsToUse::Mixed => true,
                own => self.determine_if_specified_statistics_exist(class, own)?,
            },
        })
    }

    /// Set every class to the same covariance statistics.
    ///
    /// `Mixed` leaves the classes alone. Classes without enhanced
    /// statistics keep `Original` when `Enhanced` is requested.
    pub fn set_project_covariance_stats_to_use(
        &mut self,
        stats: CovarianceStatsToUse,
    ) -> ProjectResult<()> {
        if stats != CovarianceStatsToUse::Mixed {
            for class in self.class_ids() {
                self.apply_class_covariance_stats(class, stats)?;
            }
        }
        self.refresh_project_covariance_stats();
        Ok(())
    }

    /// Set one class's covariance statistics.
    ///
    /// # Errors
    ///
    /// Returns an error for `Mixed`, which only describes a project.
    pub fn set_class_covariance_stats_to_use(
        &mut self,
        class: ClassId,
        stats: CovarianceStatsToUse,
    ) -> ProjectResult<()> {
        if stats == CovarianceStatsToUse::Mixed {
            return Err(ProjectError::InvalidParameter(
                "a class cannot use mixed covariance statistics".to_string(),
            ));
        }
        self.apply_class_covariance_stats(class, stats)?;
        self.refresh_project_covariance_stats();
        Ok(())
    }

    fn apply_class_covariance_stats(
        &mut self,
        class: ClassId,
        stats: CovarianceStatsToUse,
    ) -> ProjectResult<()> {
        let record = self.class(class)?;
        let stats = match stats {
            CovarianceStatsToUse::Enhanced if record.enhanced.is_none() => {
                CovarianceStatsToUse::Original
            }
            other => other,
        };
        let needs_optimum = stats == CovarianceStatsToUse::LeaveOneOut
            && record.mixing_parameter_code == MixingParameterCode::ComputedOptimum
            && record.loo_covariance_value.is_none();
        if record.covariance_stats_to_use != stats {
            self.store.clear_common_covariance();
        }
        self.class_mut(class)?.covariance_stats_to_use = stats;
        if needs_optimum {
            // Stale until an estimator supplies the optimum
            debug!(class = class.0, "leave-one-out optimum missing; class marked stale");
            self.invalidate_class(class)?;
        }
        Ok(())
    }

    fn refresh_project_covariance_stats(&mut self) {
        let mut settings = self
            .classes
            .iter()
            .flatten()
            .map(|c| c.covariance_stats_to_use);
        self.covariance_stats_to_use = match settings.next() {
            None => CovarianceStatsToUse::Original,
            Some(first) if settings.all(|s| s == first) => first,
            Some(_) => CovarianceStatsToUse::Mixed,
        };
    }

    /// Set how a class's leave-one-out mixing value is chosen.
    ///
    /// # Errors
    ///
    /// Returns an error if `user_value` is outside `0..=3`.
    pub fn set_loo_parameters(
        &mut self,
        class: ClassId,
        code: MixingParameterCode,
        user_value: f64,
    ) -> ProjectResult<()> {
        if !(0.0..=3.0).contains(&user_value) {
            return Err(ProjectError::InvalidParameter(format!(
                "leave-one-out mixing value must be in 0..=3, got {}",
                user_value
            )));
        }
        let record = self.class_mut(class)?;
        record.mixing_parameter_code = code;
        record.user_mixing_value = user_value;
        self.store.clear_common_covariance();
        Ok(())
    }

    /// Record the optimum mixing value estimated for a class.
    ///
    /// `None` forgets a previous estimate.
    pub fn set_loo_covariance_value(
        &mut self,
        class: ClassId,
        value: Option<f64>,
    ) -> ProjectResult<()> {
        if let Some(v) = value {
            if !(0.0..=3.0).contains(&v) {
                return Err(ProjectError::InvalidParameter(format!(
                    "leave-one-out optimum must be in 0..=3, got {}",
                    v
                )));
            }
        }
        self.class_mut(class)?.loo_covariance_value = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::StatisticsOptions;
    use crate::types::EnhancedStatistics;
    use fieldstats_core::SymmetricMatrix;

    fn project_with_classes(n: usize) -> (ProjectContext, Vec<ClassId>) {
        let mut p = ProjectContext::new(vec![0, 1], StatisticsOptions::default()).unwrap();
        let ids = (0..n).map(|i| p.add_class(&format!("c{i}")).unwrap()).collect();
        (p, ids)
    }

    #[test]
    fn test_enhanced_falls_back() {
        let (mut p, ids) = project_with_classes(2);
        p.set_enhanced_statistics(
            ids[0],
            EnhancedStatistics {
                means: vec![1.0, 2.0],
                covariance: SymmetricMatrix::identity(2),
            },
        )
        .unwrap();
        p.set_project_covariance_stats_to_use(CovarianceStatsToUse::Enhanced)
            .unwrap();
        assert_eq!(
            p.class(ids[0]).unwrap().covariance_stats_to_use(),
            CovarianceStatsToUse::Enhanced
        );
        assert_eq!(
            p.class(ids[1]).unwrap().covariance_stats_to_use(),
            CovarianceStatsToUse::Original
        );
        assert_eq!(p.covariance_stats_to_use(), CovarianceStatsToUse::Mixed);
    }

    #[test]
    fn test_project_summary() {
        let (mut p, ids) = project_with_classes(2);
        p.set_loo_parameters(ids[0], MixingParameterCode::UserSet, 1.5)
            .unwrap();
        p.set_class_covariance_stats_to_use(ids[0], CovarianceStatsToUse::LeaveOneOut)
            .unwrap();
        assert_eq!(p.covariance_stats_to_use(), CovarianceStatsToUse::Mixed);
        p.set_class_covariance_stats_to_use(ids[1], CovarianceStatsToUse::LeaveOneOut)
            .unwrap();
        assert_eq!(p.covariance_stats_to_use(), CovarianceStatsToUse::LeaveOneOut);
        assert!(
            p.set_class_covariance_stats_to_use(ids[0], CovarianceStatsToUse::Mixed)
                .is_err()
        );
    }

    #[test]
    fn test_statistics_exist() {
        let (mut p, ids) = project_with_classes(1);
        let c = ids[0];
        assert!(p.determine_if_specified_statistics_exist(c, CovarianceStatsToUse::Original).unwrap());
        assert!(!p.determine_if_specified_statistics_exist(c, CovarianceStatsToUse::Enhanced).unwrap());
        assert!(!p.determine_if_specified_statistics_exist(c, CovarianceStatsToUse::LeaveOneOut).unwrap());
        p.set_loo_covariance_value(c, Some(0.5)).unwrap();
        assert!(p.determine_if_specified_statistics_exist(c, CovarianceStatsToUse::LeaveOneOut).unwrap());
        assert!(p.set_loo_covariance_value(c, Some(4.0)).is_err());
    }
}
