//! Class and field statistics getters
//!
//! Every vector getter takes a channel subset: indices into the project
//! channel list, in the order the caller wants them back.

use fieldstats_core::{Error, StatisticsSlot};

use crate::error::{ProjectError, ProjectResult};
use crate::project::ProjectContext;
use crate::types::{ClassId, CovarianceStatsToUse, EnhancedStatistics, FieldId, FieldState};

/// Per-channel extremes over all up-to-date classes
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMinMax {
    /// Smallest value per requested channel
    pub minimums: Vec<f64>,
    /// Largest value per requested channel
    pub maximums: Vec<f64>,
    /// Smallest value over all requested channels
    pub overall_minimum: f64,
    /// Largest value over all requested channels
    pub overall_maximum: f64,
}

impl ProjectContext {
    /// Check that every index of a channel subset names a project channel.
    pub fn check_channel_subset(&self, channels: &[usize]) -> ProjectResult<()> {
        if channels.is_empty() {
            return Err(ProjectError::InvalidParameter(
                "channel subset is empty".to_string(),
            ));
        }
        if let Some(&bad) = channels.iter().find(|&&c| c >= self.channel_count()) {
            return Err(Error::IndexOutOfBounds {
                index: bad,
                len: self.channel_count(),
            }
            .into());
        }
        Ok(())
    }

    /// Statistics slot of an up-to-date class.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::NotUpToDate`] if the class needs an update
    /// and [`ProjectError::NoPixels`] if its fields lie outside the image
    /// or every pixel was filtered out.
    pub fn class_statistics(&self, class: ClassId) -> ProjectResult<&StatisticsSlot> {
        let record = self.class(class)?;
        if !record.stats_up_to_date {
            return Err(ProjectError::NotUpToDate(format!("{} ({})", class, record.name)));
        }
        if record.statistics_pixels == 0 {
            return Err(ProjectError::NoPixels(class));
        }
        self.store.slot(record.stats_slot)
    }

    /// Statistics slot of an up-to-date field.
    ///
    /// Not available when only class statistics are kept.
    pub fn field_statistics(&self, field: FieldId) -> ProjectResult<&StatisticsSlot> {
        let record = self.field(field)?;
        match (record.state, record.stats_slot) {
            (FieldState::Clean, Some(slot)) => self.store.slot(slot),
            _ => Err(ProjectError::NotUpToDate(format!("{} ({})", field, record.name))),
        }
    }

    /// Enhanced statistics of a class when they are the ones in use.
    fn enhanced_in_use(&self, class: ClassId) -> ProjectResult<Option<&EnhancedStatistics>> {
        if self.effective_covariance_stats(class)? == CovarianceStatsToUse::Enhanced {
            Ok(self.class(class)?.enhanced.as_ref())
        } else {
            Ok(None)
        }
    }

    /// Class mean vector.
    ///
    /// Enhanced means are returned when the class uses enhanced statistics.
    pub fn class_mean_vector(&self, class: ClassId, channels: &[usize]) -> ProjectResult<Vec<f64>> {
        self.check_channel_subset(channels)?;
        if let Some(enhanced) = self.enhanced_in_use(class)? {
            return Ok(channels.iter().map(|&c| enhanced.means[c]).collect());
        }
        let slot = self.class_statistics(class)?;
        let n = self.class(class)?.statistics_pixels;
        Ok(subset(&mean_vector(slot, n), channels))
    }

    /// Class standard deviation vector.
    pub fn class_std_dev_vector(
        &self,
        class: ClassId,
        channels: &[usize],
    ) -> ProjectResult<Vec<f64>> {
        self.check_channel_subset(channels)?;
        if let Some(enhanced) = self.enhanced_in_use(class)? {
            return Ok(channels
                .iter()
                .map(|&c| enhanced.covariance.get(c, c).abs().sqrt())
                .collect());
        }
        let slot = self.class_statistics(class)?;
        let n = self.class(class)?.statistics_pixels;
        Ok(subset(&std_dev_vector(slot, n), channels))
    }

    /// Class minimum vector.
    pub fn class_minimum_vector(
        &self,
        class: ClassId,
        channels: &[usize],
    ) -> ProjectResult<Vec<f64>> {
        self.check_channel_subset(channels)?;
        let slot = self.class_statistics(class)?;
        Ok(channels.iter().map(|&c| slot.channels()[c].minimum).collect())
    }

    /// Class maximum vector.
    pub fn class_maximum_vector(
        &self,
        class: ClassId,
        channels: &[usize],
    ) -> ProjectResult<Vec<f64>> {
        self.check_channel_subset(channels)?;
        let slot = self.class_statistics(class)?;
        Ok(channels.iter().map(|&c| slot.channels()[c].maximum).collect())
    }

    /// Field mean vector.
    pub fn field_mean_vector(&self, field: FieldId, channels: &[usize]) -> ProjectResult<Vec<f64>> {
        self.check_channel_subset(channels)?;
        let slot = self.field_statistics(field)?;
        let n = self.field(field)?.pixels_used;
        Ok(subset(&mean_vector(slot, n), channels))
    }

    /// Field standard deviation vector.
    pub fn field_std_dev_vector(
        &self,
        field: FieldId,
        channels: &[usize],
    ) -> ProjectResult<Vec<f64>> {
        self.check_channel_subset(channels)?;
        let slot = self.field_statistics(field)?;
        let n = self.field(field)?.pixels_used;
        Ok(subset(&std_dev_vector(slot, n), channels))
    }

    /// Pixels of the class's training fields that are folded into the
    /// class statistics.
    pub fn number_of_pixels_loaded_in_class(&self, class: ClassId) -> ProjectResult<u64> {
        let mut total = 0;
        for f in self.training_fields(class)? {
            let record = self.field(f)?;
            if record.loaded_into_class {
                total += record.pixels_used;
            }
        }
        Ok(total)
    }

    /// Per-channel and overall extremes across all up-to-date classes.
    ///
    /// Classes without usable pixels are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::NotUpToDate`] if no class is up to date.
    pub fn project_channel_min_maxes(&self, channels: &[usize]) -> ProjectResult<ChannelMinMax> {
        self.check_channel_subset(channels)?;
        let mut minimums = vec![f64::INFINITY; channels.len()];
        let mut maximums = vec![f64::NEG_INFINITY; channels.len()];
        let mut any = false;
        for class in self.class_ids() {
            let Ok(slot) = self.class_statistics(class) else {
                continue;
            };
            any = true;
            for (i, &c) in channels.iter().enumerate() {
                let stats = &slot.channels()[c];
                minimums[i] = minimums[i].min(stats.minimum);
                maximums[i] = maximums[i].max(stats.maximum);
            }
        }
        if !any {
            return Err(ProjectError::NotUpToDate("every class".to_string()));
        }
        let overall_minimum = minimums.iter().copied().fold(f64::INFINITY, f64::min);
        let overall_maximum = maximums.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(ChannelMinMax {
            minimums,
            maximums,
            overall_minimum,
            overall_maximum,
        })
    }

    /// Attach enhanced statistics to a class.
    ///
    /// # Errors
    ///
    /// Returns an error if the means or covariance do not cover every
    /// project channel.
    pub fn set_enhanced_statistics(
        &mut self,
        class: ClassId,
        statistics: EnhancedStatistics,
    ) -> ProjectResult<()> {
        let n = self.channel_count();
        if statistics.means.len() != n || statistics.covariance.size() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                actual: statistics.means.len().max(statistics.covariance.size()),
            }
            .into());
        }
        self.class_mut(class)?.enhanced = Some(statistics);
        self.store.clear_common_covariance();
        Ok(())
    }

    /// Remove a class's enhanced statistics.
    ///
    /// A class set to use them falls back to the original statistics.
    pub fn clear_enhanced_statistics(&mut self, class: ClassId) -> ProjectResult<()> {
        self.class_mut(class)?.enhanced = None;
        self.store.clear_common_covariance();
        Ok(())
    }
}

fn subset(values: &[f64], channels: &[usize]) -> Vec<f64> {
    channels.iter().map(|&c| values[c]).collect()
}

fn mean_vector(slot: &StatisticsSlot, pixels: u64) -> Vec<f64> {
    let fallback = slot.means(pixels);
    slot.channels()
        .iter()
        .zip(fallback)
        .map(|(s, m)| s.mean.unwrap_or(m))
        .collect()
}

fn std_dev_vector(slot: &StatisticsSlot, pixels: u64) -> Vec<f64> {
    let variances = slot.variances(pixels);
    slot.channels()
        .iter()
        .zip(variances)
        .map(|(s, v)| s.standard_deviation.unwrap_or_else(|| v.sqrt()))
        .collect()
}
