//! Channel and covariance accumulators
//!
//! A [`StatisticsSlot`] holds the running first- and second-order sums for
//! one field or class: per-channel sum/min/max plus the lower-triangle sum
//! of cross-products. Pixels are folded in with one pass; field slots are
//! combined into class slots without re-reading pixels.
//!
//! The diagonal of the cross-product matrix (sum of squares) is always
//! accumulated. Off-diagonal products are only accumulated for
//! [`StatisticsCode::MeanCovariance`].

use crate::error::{Error, Result};
use crate::matrix::SymmetricMatrix;

/// Which second-order statistics are collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatisticsCode {
    /// Means and standard deviations only
    MeanStdDev,
    /// Means and full covariance matrices
    #[default]
    MeanCovariance,
}

impl StatisticsCode {
    /// Whether off-diagonal cross-products are collected.
    #[inline]
    pub fn wants_covariance(self) -> bool {
        self == Self::MeanCovariance
    }
}

/// Running statistics for one channel.
///
/// `mean` and `standard_deviation` are `None` until derived from the sums
/// with [`StatisticsSlot::derive_mean_std_dev`]; readers must derive rather
/// than treat a missing value as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStatistics {
    /// Sum of the channel values
    pub sum: f64,
    /// Smallest value seen
    pub minimum: f64,
    /// Largest value seen
    pub maximum: f64,
    /// Mean, once derived
    pub mean: Option<f64>,
    /// Standard deviation, once derived
    pub standard_deviation: Option<f64>,
}

impl Default for ChannelStatistics {
    fn default() -> Self {
        Self {
            sum: 0.0,
            minimum: f64::INFINITY,
            maximum: f64::NEG_INFINITY,
            mean: None,
            standard_deviation: None,
        }
    }
}

impl ChannelStatistics {
    /// Whether mean and standard deviation have been derived.
    #[inline]
    pub fn is_derived(&self) -> bool {
        self.standard_deviation.is_some()
    }
}

/// Accumulators for one field or class.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsSlot {
    code: StatisticsCode,
    channels: Vec<ChannelStatistics>,
    cross_products: SymmetricMatrix,
}

impl StatisticsSlot {
    /// Create a zeroed slot for `channel_count` channels.
    pub fn new(channel_count: usize, code: StatisticsCode) -> Self {
        Self {
            code,
            channels: vec![ChannelStatistics::default(); channel_count],
            cross_products: SymmetricMatrix::new(channel_count),
        }
    }

    /// Number of channels.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Statistics code this slot collects for.
    #[inline]
    pub fn code(&self) -> StatisticsCode {
        self.code
    }

    /// Per-channel statistics.
    #[inline]
    pub fn channels(&self) -> &[ChannelStatistics] {
        &self.channels
    }

    /// Sums of cross-products (lower triangle).
    #[inline]
    pub fn cross_products(&self) -> &SymmetricMatrix {
        &self.cross_products
    }

    /// Reset sums, extremes, and derived values.
    pub fn zero(&mut self) {
        self.channels.fill(ChannelStatistics::default());
        self.cross_products.fill(0.0);
    }

    /// Whether nothing has been accumulated since the last [`zero`](Self::zero).
    pub fn is_zeroed(&self) -> bool {
        self.channels
            .iter()
            .all(|c| *c == ChannelStatistics::default())
            && self.cross_products.packed().iter().all(|&v| v == 0.0)
    }

    /// Fold one pixel vector into the accumulators.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelCountMismatch`] if `pixel` has the wrong
    /// number of values.
    pub fn accumulate(&mut self, pixel: &[f64]) -> Result<()> {
        if pixel.len() != self.channels.len() {
            return Err(Error::ChannelCountMismatch {
                expected: self.channels.len(),
                actual: pixel.len(),
            });
        }
        let full = self.code.wants_covariance();
        for (ch, &value) in pixel.iter().enumerate() {
            let stats = &mut self.channels[ch];
            stats.sum += value;
            stats.minimum = stats.minimum.min(value);
            stats.maximum = stats.maximum.max(value);

            if full {
                for (other, &value2) in pixel.iter().enumerate().take(ch) {
                    self.cross_products.add_at(ch, other, value * value2);
                }
            }
            self.cross_products.add_at(ch, ch, value * value);
        }
        Ok(())
    }

    /// Fold another slot into this one.
    ///
    /// With `initialize` set, sums and extremes are copied from `src`
    /// (first contributing field). Otherwise sums are added and extremes
    /// combined elementwise. Derived values are cleared either way.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelCountMismatch`] if the slots differ in size.
    pub fn combine(&mut self, src: &StatisticsSlot, initialize: bool) -> Result<()> {
        if src.channels.len() != self.channels.len() {
            return Err(Error::ChannelCountMismatch {
                expected: self.channels.len(),
                actual: src.channels.len(),
            });
        }
        for (dst, s) in self.channels.iter_mut().zip(&src.channels) {
            if initialize {
                dst.sum = s.sum;
                dst.minimum = s.minimum;
                dst.maximum = s.maximum;
            } else {
                dst.sum += s.sum;
                dst.minimum = dst.minimum.min(s.minimum);
                dst.maximum = dst.maximum.max(s.maximum);
            }
            dst.mean = None;
            dst.standard_deviation = None;
        }
        if initialize {
            self.cross_products
                .packed_mut()
                .copy_from_slice(src.cross_products.packed());
        } else {
            self.cross_products.add_scaled(&src.cross_products, 1.0)?;
        }
        Ok(())
    }

    /// Derive per-channel mean and standard deviation for `pixel_count`
    /// pixels.
    ///
    /// With one pixel or fewer the standard deviation is zero; with no
    /// pixels the mean is zero as well.
    pub fn derive_mean_std_dev(&mut self, pixel_count: u64) {
        let variances = self.variances(pixel_count);
        let n = pixel_count as f64;
        for (stats, variance) in self.channels.iter_mut().zip(variances) {
            stats.mean = Some(if pixel_count > 0 { stats.sum / n } else { 0.0 });
            stats.standard_deviation = Some(variance.sqrt());
        }
    }

    /// Per-channel variances for `pixel_count` pixels.
    ///
    /// Rounding can push a true zero variance slightly negative; such
    /// values are clamped to zero.
    pub fn variances(&self, pixel_count: u64) -> Vec<f64> {
        if pixel_count <= 1 {
            return vec![0.0; self.channels.len()];
        }
        let n = pixel_count as f64;
        self.channels
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let v = (self.cross_products.get(i, i) - s.sum * s.sum / n) / (n - 1.0);
                v.max(0.0)
            })
            .collect()
    }

    /// Covariance matrix for `pixel_count` pixels.
    ///
    /// `Cov[i,j] = (S_ij - S_i * S_j / n) / (n - 1)`. With one pixel or
    /// fewer every entry is zero. For [`StatisticsCode::MeanStdDev`] slots
    /// only the diagonal is populated.
    pub fn derive_covariance(&self, pixel_count: u64) -> SymmetricMatrix {
        let size = self.channels.len();
        let mut cov = SymmetricMatrix::new(size);
        if pixel_count <= 1 {
            return cov;
        }
        let n = pixel_count as f64;
        let full = self.code.wants_covariance();
        for i in 0..size {
            let si = self.channels[i].sum;
            let upto = if full { i + 1 } else { 0 };
            for j in 0..upto {
                let sj = self.channels[j].sum;
                let v = (self.cross_products.get(i, j) - si * sj / n) / (n - 1.0);
                cov.set(i, j, if i == j { v.max(0.0) } else { v });
            }
            if !full {
                let v = (self.cross_products.get(i, i) - si * si / n) / (n - 1.0);
                cov.set(i, i, v.max(0.0));
            }
        }
        cov
    }

    /// Means for `pixel_count` pixels, computed from the sums.
    pub fn means(&self, pixel_count: u64) -> Vec<f64> {
        let n = pixel_count as f64;
        self.channels
            .iter()
            .map(|s| if pixel_count > 0 { s.sum / n } else { 0.0 })
            .collect()
    }
}
