//! TrainingMask - Raster of field identifiers
//!
//! Each mask pixel holds a small integer. Zero means unassigned; a nonzero
//! value maps through a value-to-field table to the field that owns the
//! pixel. A per-line flag records whether a line holds any nonzero value,
//! so scans can skip empty lines without reading image pixels.
//!
//! The mask may be placed at an offset inside the image it describes.

use crate::error::{Error, Result};
use crate::geometry::Rect;

/// Mask raster with its value-to-field lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingMask {
    width: u32,
    height: u32,
    /// Image column of mask column 0
    origin_x: i32,
    /// Image row of mask row 0
    origin_y: i32,
    values: Vec<u16>,
    line_flags: Vec<bool>,
    value_to_field: Vec<Option<usize>>,
}

impl TrainingMask {
    /// Create an all-zero mask.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] if either dimension is zero.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        Ok(Self {
            width,
            height,
            origin_x: 0,
            origin_y: 0,
            values: vec![0; width as usize * height as usize],
            line_flags: vec![false; height as usize],
            value_to_field: Vec::new(),
        })
    }

    /// Create a mask from row-major values.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are zero or `values` has the
    /// wrong length.
    pub fn from_values(width: u32, height: u32, values: Vec<u16>) -> Result<Self> {
        let mut mask = Self::new(width, height)?;
        if values.len() != mask.values.len() {
            return Err(Error::DimensionMismatch {
                expected: mask.values.len(),
                actual: values.len(),
            });
        }
        mask.values = values;
        mask.refresh_line_flags();
        Ok(mask)
    }

    /// Place the mask so that mask pixel (0, 0) lies at image pixel
    /// `(x, y)`.
    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.origin_x = x;
        self.origin_y = y;
        self
    }

    /// Mask width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Area covered by the mask, in image coordinates.
    pub fn bounds(&self) -> Rect {
        Rect {
            x: self.origin_x,
            y: self.origin_y,
            w: self.width as i32,
            h: self.height as i32,
        }
    }

    /// Get a mask value by mask coordinates.
    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.values[(y * self.width + x) as usize])
    }

    /// Set a mask value by mask coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if the position is outside.
    pub fn set(&mut self, x: u32, y: u32, value: u16) -> Result<()> {
        if x >= self.width {
            return Err(Error::IndexOutOfBounds {
                index: x as usize,
                len: self.width as usize,
            });
        }
        if y >= self.height {
            return Err(Error::IndexOutOfBounds {
                index: y as usize,
                len: self.height as usize,
            });
        }
        let row = y as usize;
        self.values[row * self.width as usize + x as usize] = value;
        if value != 0 {
            self.line_flags[row] = true;
        } else {
            self.line_flags[row] = self.row(y).iter().any(|&v| v != 0);
        }
        Ok(())
    }

    /// Values of one mask row.
    pub fn row(&self, y: u32) -> &[u16] {
        let start = y as usize * self.width as usize;
        &self.values[start..start + self.width as usize]
    }

    /// Whether mask row `y` holds any nonzero value.
    #[inline]
    pub fn line_has_values(&self, y: u32) -> bool {
        self.line_flags.get(y as usize).copied().unwrap_or(false)
    }

    fn refresh_line_flags(&mut self) {
        let w = self.width as usize;
        for (flag, row) in self.line_flags.iter_mut().zip(self.values.chunks_exact(w)) {
            *flag = row.iter().any(|&v| v != 0);
        }
    }

    /// Map a mask value to a field index.
    ///
    /// # Errors
    ///
    /// Returns an error for value 0, which always means unassigned.
    pub fn assign_value(&mut self, value: u16, field: usize) -> Result<()> {
        if value == 0 {
            return Err(Error::InvalidParameter(
                "mask value 0 cannot be assigned to a field".to_string(),
            ));
        }
        let idx = value as usize;
        if self.value_to_field.len() <= idx {
            self.value_to_field.resize(idx + 1, None);
        }
        self.value_to_field[idx] = Some(field);
        Ok(())
    }

    /// Remove a value's field assignment.
    pub fn unassign_value(&mut self, value: u16) {
        if let Some(slot) = self.value_to_field.get_mut(value as usize) {
            *slot = None;
        }
    }

    /// Field index owning a mask value, if any.
    #[inline]
    pub fn field_for_value(&self, value: u16) -> Option<usize> {
        if value == 0 {
            return None;
        }
        self.value_to_field.get(value as usize).copied().flatten()
    }

    /// Number of pixels carrying `value`.
    pub fn count_value(&self, value: u16) -> u64 {
        self.values.iter().filter(|&&v| v == value).count() as u64
    }
}
