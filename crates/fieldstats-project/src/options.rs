//! Statistics options for a project

use fieldstats_core::{BadDataPolicy, StatisticsCode};

use crate::error::{ProjectError, ProjectResult};

/// Options controlling how statistics are collected and repaired
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsOptions {
    /// Collect full covariance or standard deviations only
    /// (default: MeanCovariance)
    pub statistics_code: StatisticsCode,

    /// Accumulate straight into class statistics without keeping per-field
    /// statistics (default: false)
    pub keep_class_stats_only: bool,

    /// Replace zero variances before handing matrices out (default: true)
    pub set_zero_variance: bool,

    /// Value substituted for zero variances (default: 0.1)
    pub zero_variance_factor: f64,

    /// Report a degenerate-matrix repair only once per class
    /// (default: true)
    pub list_one_message_per_class: bool,

    /// How bad pixels are recognised (default: none)
    pub bad_data: BadDataPolicy,

    /// Pixels between cancellation checks (default: 4096)
    pub cancel_check_interval: u64,
}

impl Default for StatisticsOptions {
    fn default() -> Self {
        Self {
            statistics_code: StatisticsCode::MeanCovariance,
            keep_class_stats_only: false,
            set_zero_variance: true,
            zero_variance_factor: 0.1,
            list_one_message_per_class: true,
            bad_data: BadDataPolicy::None,
            cancel_check_interval: 4096,
        }
    }
}

impl StatisticsOptions {
    /// Create new options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the statistics code
    pub fn with_statistics_code(mut self, code: StatisticsCode) -> Self {
        self.statistics_code = code;
        self
    }

    /// Keep class statistics only
    pub fn with_keep_class_stats_only(mut self, keep: bool) -> Self {
        self.keep_class_stats_only = keep;
        self
    }

    /// Enable or disable zero variance replacement
    pub fn with_set_zero_variance(mut self, enabled: bool) -> Self {
        self.set_zero_variance = enabled;
        self
    }

    /// Set the zero variance replacement value
    pub fn with_zero_variance_factor(mut self, factor: f64) -> Self {
        self.zero_variance_factor = factor;
        self
    }

    /// Report repairs once per class or every time
    pub fn with_list_one_message_per_class(mut self, once: bool) -> Self {
        self.list_one_message_per_class = once;
        self
    }

    /// Set the bad data policy
    pub fn with_bad_data(mut self, policy: BadDataPolicy) -> Self {
        self.bad_data = policy;
        self
    }

    /// Set the number of pixels between cancellation checks
    pub fn with_cancel_check_interval(mut self, pixels: u64) -> Self {
        self.cancel_check_interval = pixels;
        self
    }

    /// Validate options
    pub fn validate(&self) -> ProjectResult<()> {
        if !(self.zero_variance_factor > 0.0) {
            return Err(ProjectError::InvalidParameter(format!(
                "zero_variance_factor must be positive, got {}",
                self.zero_variance_factor
            )));
        }
        if self.cancel_check_interval == 0 {
            return Err(ProjectError::InvalidParameter(
                "cancel_check_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let opts = StatisticsOptions::new();
        assert!(opts.validate().is_ok());
        assert_eq!(opts.zero_variance_factor, 0.1);
        assert!(!opts.keep_class_stats_only);
    }

    #[test]
    fn test_builder_and_validation() {
        let opts = StatisticsOptions::new()
            .with_zero_variance_factor(0.0)
            .with_keep_class_stats_only(true);
        assert!(opts.keep_class_stats_only);
        assert!(opts.validate().is_err());
        assert!(
            StatisticsOptions::new()
                .with_cancel_check_interval(0)
                .validate()
                .is_err()
        );
    }
}
