//! Rect, Polygon - Training field geometry
//!
//! Fields are defined either by a rectangle or by a closed polygon in
//! image pixel coordinates. Both resolve to horizontal pixel spans per
//! row, which is what the area scanner reads.
//!
//! # Pixel membership
//!
//! A pixel `(col, row)` belongs to a polygon when its centre
//! `(col + 0.5, row + 0.5)` is inside under the even-odd rule.

use crate::error::{Error, Result};

/// A rectangle in pixel coordinates
///
/// `x`/`y` is the top-left pixel; `right()`/`bottom()` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left column
    pub x: i32,
    /// Top row
    pub y: i32,
    /// Width in pixels
    pub w: i32,
    /// Height in pixels
    pub h: i32,
}

impl Rect {
    /// Create a new rectangle
    ///
    /// # Errors
    ///
    /// Returns an error if width or height is negative, or if the right
    /// or bottom edge does not fit in an `i32`.
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Result<Self> {
        if w < 0 || h < 0 {
            return Err(Error::InvalidParameter(format!(
                "rectangle dimensions must be non-negative: w={}, h={}",
                w, h
            )));
        }
        if x.checked_add(w).is_none() || y.checked_add(h).is_none() {
            return Err(Error::InvalidParameter(format!(
                "rectangle edge out of range: x={}, y={}, w={}, h={}",
                x, y, w, h
            )));
        }
        Ok(Self { x, y, w, h })
    }

    /// Create a rectangle from inclusive corner pixels, in either order
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        let (x, w) = if x1 <= x2 {
            (x1, x2 - x1 + 1)
        } else {
            (x2, x1 - x2 + 1)
        };
        let (y, h) = if y1 <= y2 {
            (y1, y2 - y1 + 1)
        } else {
            (y2, y1 - y2 + 1)
        };
        Self { x, y, w, h }
    }

    /// Right column (exclusive)
    #[inline]
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w)
    }

    /// Bottom row (exclusive)
    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h)
    }

    /// Number of pixels covered
    #[inline]
    pub fn area(&self) -> u64 {
        self.w.max(0) as u64 * self.h.max(0) as u64
    }

    /// Check if the rectangle is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Check if a pixel is inside
    #[inline]
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Intersection of two rectangles
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if x < right && y < bottom {
            Some(Rect {
                x,
                y,
                w: right - x,
                h: bottom - y,
            })
        } else {
            None
        }
    }
}

/// Closed polygon in pixel coordinates.
///
/// Vertices are stored as parallel x/y vectors; the last vertex connects
/// back to the first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Polygon {
    /// Create a polygon from vertex pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than three vertices are given.
    pub fn new(vertices: &[(f64, f64)]) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(Error::InvalidParameter(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        Ok(Self {
            x: vertices.iter().map(|v| v.0).collect(),
            y: vertices.iter().map(|v| v.1).collect(),
        })
    }

    /// Number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Check if there are no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Get a vertex by index.
    pub fn get(&self, index: usize) -> Option<(f64, f64)> {
        Some((*self.x.get(index)?, *self.y.get(index)?))
    }

    /// Smallest rectangle holding every member pixel.
    pub fn bounding_rect(&self) -> Rect {
        if self.is_empty() {
            return Rect::default();
        }
        let min_x = self.x.iter().copied().fold(f64::INFINITY, f64::min);
        let max_x = self.x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_y = self.y.iter().copied().fold(f64::INFINITY, f64::min);
        let max_y = self.y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let x = min_x.floor() as i32;
        let y = min_y.floor() as i32;
        Rect {
            x,
            y,
            w: max_x.ceil() as i32 - x,
            h: max_y.ceil() as i32 - y,
        }
    }

    /// x positions where the horizontal line at `yc` crosses an edge,
    /// sorted ascending
    fn crossings(&self, yc: f64) -> Vec<f64> {
        let n = self.len();
        let mut xs = Vec::new();
        for i in 0..n {
            let j = (i + 1) % n;
            let (y0, y1) = (self.y[i], self.y[j]);
            if (y0 > yc) != (y1 > yc) {
                let t = (yc - y0) / (y1 - y0);
                xs.push(self.x[i] + t * (self.x[j] - self.x[i]));
            }
        }
        xs.sort_by(f64::total_cmp);
        xs
    }

    /// Check if the pixel `(col, row)` is inside.
    pub fn contains_pixel(&self, col: i32, row: i32) -> bool {
        let xc = col as f64 + 0.5;
        let count = self
            .crossings(row as f64 + 0.5)
            .iter()
            .filter(|&&x| x > xc)
            .count();
        count % 2 == 1
    }

    /// Column spans `[start, end)` of member pixels on `row`.
    pub fn row_spans(&self, row: i32) -> Vec<(i32, i32)> {
        let xs = self.crossings(row as f64 + 0.5);
        xs.chunks_exact(2)
            .filter_map(|pair| {
                let start = (pair[0] - 0.5).ceil() as i32;
                let end = (pair[1] - 0.5).ceil() as i32;
                (start < end).then_some((start, end))
            })
            .collect()
    }

    /// Number of member pixels.
    pub fn pixel_count(&self) -> u64 {
        let bounds = self.bounding_rect();
        (bounds.y..bounds.bottom())
            .flat_map(|row| self.row_spans(row))
            .map(|(s, e)| (e - s) as u64)
            .sum()
    }
}
