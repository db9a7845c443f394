//! MultibandImage, PixelReader - Pixel access for scans
//!
//! The statistics scanners never read files themselves. They pull rows of
//! channel values through the [`PixelReader`] trait; file-format readers
//! live outside this crate and implement it. [`MultibandImage`] is the
//! in-memory implementation.
//!
//! # Examples
//!
//! ```
//! use fieldstats_core::{MultibandImage, PixelReader};
//!
//! let mut image = MultibandImage::new(4, 2, 3).unwrap();
//! image.set_pixel(1, 0, &[10.0, 20.0, 30.0]).unwrap();
//!
//! let mut row = Vec::new();
//! image.read_pixel_row(0, 1..3, &[2, 0], &mut row).unwrap();
//! assert_eq!(row, vec![30.0, 10.0, 0.0, 0.0]);
//! ```

use std::ops::Range;

use crate::error::{Error, Result};

/// Source of multichannel pixel rows.
pub trait PixelReader {
    /// Image width in pixels.
    fn width(&self) -> u32;

    /// Image height in pixels.
    fn height(&self) -> u32;

    /// Number of channels available.
    fn channel_count(&self) -> usize;

    /// Read `columns` of image row `row` for the listed channels.
    ///
    /// `out` is cleared and filled pixel-interleaved: the values of
    /// `channels` for the first column, then for the next column, and so
    /// on.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be read; the caller aborts the
    /// current scan.
    fn read_pixel_row(
        &mut self,
        row: u32,
        columns: Range<u32>,
        channels: &[usize],
        out: &mut Vec<f64>,
    ) -> Result<()>;
}

/// In-memory multiband image
///
/// # Memory Layout
///
/// Band-interleaved by pixel, row-major with no padding. Channel `c` of
/// pixel `(x, y)` is at index `(y * width + x) * channels + c`.
#[derive(Debug, Clone, PartialEq)]
pub struct MultibandImage {
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<f64>,
}

impl MultibandImage {
    /// Create an image with every value set to zero
    ///
    /// # Arguments
    ///
    /// * `width` - Width in pixels (must be > 0)
    /// * `height` - Height in pixels (must be > 0)
    /// * `channels` - Channels per pixel (must be > 0)
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0, and
    /// `Error::InvalidParameter` if `channels` is 0.
    pub fn new(width: u32, height: u32, channels: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        if channels == 0 {
            return Err(Error::InvalidParameter(
                "image needs at least one channel".to_string(),
            ));
        }
        let size = width as usize * height as usize * channels;
        Ok(Self {
            width,
            height,
            channels,
            data: vec![0.0; size],
        })
    }

    /// Create an image whose value at `(x, y, channel)` is `f(x, y, channel)`
    pub fn from_fn<F>(width: u32, height: u32, channels: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(u32, u32, usize) -> f64,
    {
        let mut image = Self::new(width, height, channels)?;
        let mut i = 0;
        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    image.data[i] = f(x, y, c);
                    i += 1;
                }
            }
        }
        Ok(image)
    }

    /// Channel values of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[f64]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * self.channels;
        Some(&self.data[start..start + self.channels])
    }

    /// Set the channel values of one pixel.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is outside the image or `values`
    /// does not hold one value per channel.
    pub fn set_pixel(&mut self, x: u32, y: u32, values: &[f64]) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::IndexOutOfBounds {
                index: (y as usize) * self.width as usize + x as usize,
                len: self.width as usize * self.height as usize,
            });
        }
        if values.len() != self.channels {
            return Err(Error::ChannelCountMismatch {
                expected: self.channels,
                actual: values.len(),
            });
        }
        let start = (y as usize * self.width as usize + x as usize) * self.channels;
        self.data[start..start + self.channels].copy_from_slice(values);
        Ok(())
    }
}

impl PixelReader for MultibandImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn read_pixel_row(
        &mut self,
        row: u32,
        columns: Range<u32>,
        channels: &[usize],
        out: &mut Vec<f64>,
    ) -> Result<()> {
        if row >= self.height {
            return Err(Error::Read(format!(
                "row {} outside image of height {}",
                row, self.height
            )));
        }
        if columns.end > self.width {
            return Err(Error::Read(format!(
                "columns {:?} outside image of width {}",
                columns, self.width
            )));
        }
        if let Some(&bad) = channels.iter().find(|&&c| c >= self.channels) {
            return Err(Error::IndexOutOfBounds {
                index: bad,
                len: self.channels,
            });
        }
        out.clear();
        out.reserve(columns.len() * channels.len());
        for x in columns {
            let start = (row as usize * self.width as usize + x as usize) * self.channels;
            out.extend(channels.iter().map(|&c| self.data[start + c]));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates() {
        assert!(MultibandImage::new(0, 1, 1).is_err());
        assert!(MultibandImage::new(1, 1, 0).is_err());
    }

    #[test]
    fn test_from_fn_and_pixel() {
        let image = MultibandImage::from_fn(3, 2, 2, |x, y, c| (x * 10 + y) as f64 + c as f64 * 100.0)
            .unwrap();
        assert_eq!(image.pixel(2, 1), Some(&[21.0, 121.0][..]));
        assert_eq!(image.pixel(3, 0), None);
    }

    #[test]
    fn test_read_row_bounds() {
        let mut image = MultibandImage::new(2, 2, 1).unwrap();
        let mut out = Vec::new();
        assert!(image.read_pixel_row(2, 0..1, &[0], &mut out).is_err());
        assert!(image.read_pixel_row(0, 0..3, &[0], &mut out).is_err());
        assert!(image.read_pixel_row(0, 0..2, &[1], &mut out).is_err());
        image.read_pixel_row(1, 0..2, &[0], &mut out).unwrap();
        assert_eq!(out.len(), 2);
    }
}
