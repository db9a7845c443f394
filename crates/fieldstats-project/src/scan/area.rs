//! Area scanner for rectangle and polygon fields

use fieldstats_core::{Error, PixelFilter, PixelReader, Rect};
use tracing::debug;

use super::{CancelPoll, ProgressSink, ScanSession};
use crate::error::ProjectResult;
use crate::project::ProjectContext;
use crate::types::{ClassId, FieldGeometry, FieldId, FieldState};

/// Pixel spans `(row, start, end)` of a geometry, clipped to the image.
///
/// Mask geometry has no spans of its own; it is read by the mask pass.
pub(crate) fn geometry_spans(
    geometry: &FieldGeometry,
    width: u32,
    height: u32,
) -> Vec<(u32, u32, u32)> {
    let image = Rect {
        x: 0,
        y: 0,
        w: width as i32,
        h: height as i32,
    };
    match geometry {
        FieldGeometry::Rectangle(rect) => match rect.intersect(&image) {
            Some(r) => (r.y..r.bottom())
                .map(|row| (row as u32, r.x as u32, r.right() as u32))
                .collect(),
            None => Vec::new(),
        },
        FieldGeometry::Polygon(polygon) => {
            let Some(bounds) = polygon.bounding_rect().intersect(&image) else {
                return Vec::new();
            };
            let mut spans = Vec::new();
            for row in bounds.y..bounds.bottom() {
                for (start, end) in polygon.row_spans(row) {
                    let start = start.max(0);
                    let end = end.min(image.w);
                    if start < end {
                        spans.push((row as u32, start as u32, end as u32));
                    }
                }
            }
            spans
        }
        FieldGeometry::Mask { .. } => Vec::new(),
    }
}

fn check_reader_channels(channels: &[usize], reader: &dyn PixelReader) -> ProjectResult<()> {
    if let Some(&bad) = channels.iter().find(|&&c| c >= reader.channel_count()) {
        return Err(Error::IndexOutOfBounds {
            index: bad,
            len: reader.channel_count(),
        }
        .into());
    }
    Ok(())
}

impl ProjectContext {
    /// Scan a rectangle or polygon field and bring its statistics up to
    /// date
    ///
    /// # Arguments
    ///
    /// * `id` - Field to scan
    /// * `reader` - Source of pixel rows
    /// * `progress` - Progress and cancellation sink
    ///
    /// # Returns
    ///
    /// `false` if the field is a mask field, which only the mask pass
    /// reads, and `true` once the scan is committed.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::Cancelled`](crate::ProjectError::Cancelled)
    /// on cancel and the reader's error on read failure. Either way the
    /// field is left zeroed and `Dirty`.
    pub fn update_field_area_stats(
        &mut self,
        id: FieldId,
        reader: &mut dyn PixelReader,
        progress: &mut dyn ProgressSink,
    ) -> ProjectResult<bool> {
        let geometry = self.field(id)?.geometry.clone();
        if geometry.is_mask() {
            return Ok(false);
        }
        let channels = self.channels.clone();
        check_reader_channels(&channels, reader)?;

        let spans = geometry_spans(&geometry, reader.width(), reader.height());
        let total: u64 = spans.iter().map(|&(_, s, e)| (e - s) as u64).sum();
        let filter = PixelFilter::new(self.options.bad_data);
        let mut poll = CancelPoll::new(self.options.cancel_check_interval, total);
        let use_scratch = self.options.keep_class_stats_only;

        let mut session = ScanSession::begin(self, &[id], use_scratch)?;
        let n = channels.len();
        let mut row_values = Vec::new();
        for (row, start, end) in spans {
            reader.read_pixel_row(row, start..end, &channels, &mut row_values)?;
            for pixel in row_values.chunks_exact(n) {
                if filter.accepts(pixel) {
                    session.accumulate(0, pixel)?;
                }
            }
            poll.tick((end - start) as u64, progress)?;
        }
        session.commit()?;

        debug!(
            field = id.0,
            pixels = self.field(id)?.pixels_used,
            "field area statistics updated"
        );
        Ok(true)
    }

    /// Bring every rectangle and polygon training field of a class up to
    /// date and fold each into the class once.
    pub fn update_class_area_stats(
        &mut self,
        class: ClassId,
        reader: &mut dyn PixelReader,
        progress: &mut dyn ProgressSink,
    ) -> ProjectResult<()> {
        let class_only = self.options.keep_class_stats_only;
        for f in self.training_fields(class)? {
            let field = self.field(f)?;
            if field.geometry.is_mask() {
                continue;
            }
            let current = if class_only {
                field.loaded_into_class
            } else {
                field.state == FieldState::Clean
            };
            if !current {
                self.update_field_area_stats(f, reader, progress)?;
            }
            self.fold_field_into_class(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::StatisticsOptions;
    use crate::scan::NoProgress;
    use crate::types::FieldType;
    use fieldstats_core::{MultibandImage, Polygon};

    #[test]
    fn test_rect_spans_clipped() {
        let g = FieldGeometry::Rectangle(Rect::new(-2, 8, 5, 5).unwrap());
        let spans = geometry_spans(&g, 10, 10);
        assert_eq!(spans, vec![(8, 0, 3), (9, 0, 3)]);
    }

    #[test]
    fn test_polygon_spans() {
        let p = Polygon::new(&[(0.0, 0.0), (3.0, 0.0), (3.0, 2.0), (0.0, 2.0)]).unwrap();
        let spans = geometry_spans(&FieldGeometry::Polygon(p), 10, 10);
        assert_eq!(spans, vec![(0, 0, 3), (1, 0, 3)]);
    }

    #[test]
    fn test_field_scan_sums() {
        let mut image = MultibandImage::from_fn(4, 4, 2, |x, y, c| (x + y) as f64 + c as f64).unwrap();
        let mut p = ProjectContext::new(vec![0, 1], StatisticsOptions::default()).unwrap();
        let c = p.add_class("a").unwrap();
        let g = FieldGeometry::Rectangle(Rect::new(1, 1, 2, 2).unwrap());
        let f = p.add_field(c, "f", FieldType::Training, g).unwrap();

        assert!(p.update_field_area_stats(f, &mut image, &mut NoProgress).unwrap());
        let record = p.field(f).unwrap();
        assert_eq!(record.pixels_used(), 4);
        assert_eq!(record.state(), FieldState::Clean);
        let slot = p.store().slot(record.stats_slot.unwrap()).unwrap();
        // (1+1) + (2+1) + (1+2) + (2+2)
        assert_eq!(slot.channels()[0].sum, 12.0);
        assert_eq!(slot.channels()[1].sum, 16.0);
        assert_eq!(slot.channels()[0].mean, Some(3.0));
    }

    #[test]
    fn test_reader_channel_check() {
        let mut image = MultibandImage::new(2, 2, 1).unwrap();
        let mut p = ProjectContext::new(vec![0, 1], StatisticsOptions::default()).unwrap();
        let c = p.add_class("a").unwrap();
        let g = FieldGeometry::Rectangle(Rect::new(0, 0, 1, 1).unwrap());
        let f = p.add_field(c, "f", FieldType::Training, g).unwrap();
        assert!(p.update_field_area_stats(f, &mut image, &mut NoProgress).is_err());
        assert_eq!(p.field(f).unwrap().state(), FieldState::Dirty);
    }
}
