//! fieldstats-test - Regression test framework for fieldstats
//!
//! This crate provides the comparison harness used by the `*_reg.rs`
//! tests of every fieldstats crate, plus deterministic fixtures so scans
//! can be exercised without image files.
//!
//! # Usage
//!
//! ```ignore
//! use fieldstats_test::RegParams;
//!
//! let mut rp = RegParams::new("accumulator");
//! rp.compare_values(4.0, variance, 1e-12);
//! assert!(rp.cleanup());
//! ```
//!
//! # Environment Variables
//!
//! - `REGTEST_MODE`: Set to "compare" (default) or "display"

mod error;
mod params;

use std::ops::Range;

use fieldstats_core::{MultibandImage, PixelReader};

pub use error::{TestError, TestResult};
pub use params::{RegParams, RegTestMode};

/// Deterministic multiband test image.
///
/// Values vary with position and channel so that no two channels are
/// linearly dependent over a typical field.
pub fn synthetic_image(width: u32, height: u32, channels: usize) -> TestResult<MultibandImage> {
    MultibandImage::from_fn(width, height, channels, |x, y, c| {
        let c32 = c as u32;
        ((x * 7 + y * 13 + c32 * 29 + x * y * (c32 + 1)) % 97) as f64 + 10.0 * c as f64
    })
    .map_err(|e| TestError::Fixture {
        name: "synthetic_image".to_string(),
        message: e.to_string(),
    })
}

/// Reader that fails once a given row is requested.
///
/// Wraps another reader to simulate I/O failure part way through a scan.
pub struct FailingReader<R> {
    inner: R,
    fail_from_row: u32,
    rows_read: usize,
}

impl<R: PixelReader> FailingReader<R> {
    /// Fail on any read of `fail_from_row` or later.
    pub fn new(inner: R, fail_from_row: u32) -> Self {
        Self {
            inner,
            fail_from_row,
            rows_read: 0,
        }
    }

    /// Number of successful row reads so far.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Recover the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: PixelReader> PixelReader for FailingReader<R> {
    fn width(&self) -> u32 {
        self.inner.width()
    }

    fn height(&self) -> u32 {
        self.inner.height()
    }

    fn channel_count(&self) -> usize {
        self.inner.channel_count()
    }

    fn read_pixel_row(
        &mut self,
        row: u32,
        columns: Range<u32>,
        channels: &[usize],
        out: &mut Vec<f64>,
    ) -> fieldstats_core::Result<()> {
        if row >= self.fail_from_row {
            return Err(fieldstats_core::Error::Read(format!(
                "simulated failure reading row {}",
                row
            )));
        }
        self.inner.read_pixel_row(row, columns, channels, out)?;
        self.rows_read += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_image_is_deterministic() {
        let a = synthetic_image(5, 4, 3).unwrap();
        let b = synthetic_image(5, 4, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_failing_reader() {
        let image = synthetic_image(4, 4, 2).unwrap();
        let mut reader = FailingReader::new(image, 2);
        let mut out = Vec::new();
        reader.read_pixel_row(1, 0..4, &[0, 1], &mut out).unwrap();
        assert_eq!(out.len(), 8);
        assert!(reader.read_pixel_row(2, 0..4, &[0], &mut out).is_err());
        assert_eq!(reader.rows_read(), 1);
    }
}
