//! Bad-data filtering for statistics scans
//!
//! Pixels flagged as no-data, or carrying values that cannot be produced
//! by the sensor's bit depth, are left out of the statistics.

/// How bad pixels are recognised
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BadDataPolicy {
    /// Every pixel is used
    #[default]
    None,
    /// Pixels with any channel equal to this value (within a relative
    /// tolerance of 1e-8) are skipped
    NoDataValue(f64),
    /// Data is stored with more bits than the sensor produces; pixels with
    /// any channel above the largest `data_bits` value are skipped
    BitDepth {
        /// Significant bits per value
        data_bits: u32,
        /// Bytes used to store each value
        storage_bytes: u32,
    },
}

/// Per-pixel acceptance test built from a [`BadDataPolicy`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PixelFilter {
    /// Accept everything
    AcceptAll,
    /// Reject values inside `[low, high]`
    Window { low: f64, high: f64 },
    /// Reject values above `max_usable`
    Ceiling { max_usable: f64 },
}

impl PixelFilter {
    /// Build the filter for a policy.
    ///
    /// A bit-depth policy whose data bits fill the storage bytes cannot
    /// produce out-of-range values and accepts everything.
    pub fn new(policy: BadDataPolicy) -> Self {
        match policy {
            BadDataPolicy::None => Self::AcceptAll,
            BadDataPolicy::NoDataValue(value) => {
                let (a, b) = (0.99999999 * value, 1.00000001 * value);
                Self::Window {
                    low: a.min(b),
                    high: a.max(b),
                }
            }
            BadDataPolicy::BitDepth {
                data_bits,
                storage_bytes,
            } => {
                if data_bits == 0 || data_bits >= storage_bytes.saturating_mul(8) {
                    Self::AcceptAll
                } else {
                    Self::Ceiling {
                        max_usable: 2f64.powi(data_bits as i32) - 1.0,
                    }
                }
            }
        }
    }

    /// Whether a pixel vector should be used.
    #[inline]
    pub fn accepts(&self, pixel: &[f64]) -> bool {
        match *self {
            Self::AcceptAll => true,
            Self::Window { low, high } => !pixel.iter().any(|&v| v >= low && v <= high),
            Self::Ceiling { max_usable } => !pixel.iter().any(|&v| v > max_usable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_all() {
        let f = PixelFilter::new(BadDataPolicy::None);
        assert!(f.accepts(&[f64::MAX, -1.0]));
    }

    #[test]
    fn test_no_data_window() {
        let f = PixelFilter::new(BadDataPolicy::NoDataValue(-9999.0));
        assert!(!f.accepts(&[1.0, -9999.0]));
        assert!(f.accepts(&[1.0, -9998.0]));

        let zero = PixelFilter::new(BadDataPolicy::NoDataValue(0.0));
        assert!(!zero.accepts(&[0.0]));
        assert!(zero.accepts(&[1e-6]));
    }

    #[test]
    fn test_bit_depth_ceiling() {
        let f = PixelFilter::new(BadDataPolicy::BitDepth {
            data_bits: 10,
            storage_bytes: 2,
        });
        assert!(f.accepts(&[1023.0]));
        assert!(!f.accepts(&[5.0, 1024.0]));

        let full = PixelFilter::new(BadDataPolicy::BitDepth {
            data_bits: 16,
            storage_bytes: 2,
        });
        assert_eq!(full, PixelFilter::AcceptAll);
    }
}
