//! Mask statistics updater
//!
//! One pass over the training mask updates every requested mask field at
//! once. Each masked pixel is routed through the mask's value-to-field
//! table to its field's accumulators, or to the class accumulators when
//! only class statistics are kept.

use fieldstats_core::{PixelFilter, PixelReader, Rect, TrainingMask};
use tracing::debug;

use super::{CancelPoll, ProgressSink, ScanSession};
use crate::error::{ProjectError, ProjectResult};
use crate::project::ProjectContext;
use crate::types::{FieldId, FieldState};

impl ProjectContext {
    /// Mask fields among `candidates` whose statistics need a scan.
    ///
    /// Fields already folded into their class are skipped so their pixels
    /// are never counted twice.
    pub(crate) fn mask_fields_needing_update(&self, candidates: &[FieldId]) -> Vec<FieldId> {
        let class_only = self.options.keep_class_stats_only;
        candidates
            .iter()
            .copied()
            .filter(|&f| {
                self.field(f).is_ok_and(|r| {
                    r.geometry.is_mask()
                        && !r.loaded_into_class
                        && (class_only || r.state != FieldState::Clean)
                })
            })
            .collect()
    }

    /// Update the listed mask fields with a single pass over the mask
    ///
    /// # Errors
    ///
    /// Returns an error if no mask is loaded, on cancellation and on read
    /// failure. On error every listed field is left zeroed and `Dirty`.
    pub fn update_mask_fields(
        &mut self,
        fields: &[FieldId],
        reader: &mut dyn PixelReader,
        progress: &mut dyn ProgressSink,
    ) -> ProjectResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mask = self.mask.take().ok_or_else(|| {
            ProjectError::InvalidParameter("mask fields present but no training mask".into())
        })?;
        let result = self.scan_mask(&mask, fields, reader, progress);
        self.mask = Some(mask);
        result
    }

    fn scan_mask(
        &mut self,
        mask: &TrainingMask,
        fields: &[FieldId],
        reader: &mut dyn PixelReader,
        progress: &mut dyn ProgressSink,
    ) -> ProjectResult<()> {
        let channels = self.channels.clone();
        let n = channels.len();
        let filter = PixelFilter::new(self.options.bad_data);
        let interval = self.options.cancel_check_interval;
        let image = Rect {
            x: 0,
            y: 0,
            w: reader.width() as i32,
            h: reader.height() as i32,
        };
        let origin = mask.bounds();
        let area = origin.intersect(&image);

        let mut session = ScanSession::begin(self, fields, false)?;
        let lookup = session.member_lookup();

        if let Some(area) = area {
            let rows: Vec<i32> = (area.y..area.bottom())
                .filter(|&row| mask.line_has_values((row - origin.y) as u32))
                .collect();
            let total = rows.len() as u64 * area.w as u64;
            let mut poll = CancelPoll::new(interval, total);
            let mut row_values = Vec::new();
            let first_col = (area.x - origin.x) as usize;

            for row in rows {
                let values = mask.row((row - origin.y) as u32);
                reader.read_pixel_row(
                    row as u32,
                    area.x as u32..area.right() as u32,
                    &channels,
                    &mut row_values,
                )?;
                for (i, pixel) in row_values.chunks_exact(n).enumerate() {
                    let member = mask
                        .field_for_value(values[first_col + i])
                        .and_then(|field| lookup.get(field).copied().flatten());
                    if let Some(member) = member {
                        if filter.accepts(pixel) {
                            session.accumulate(member, pixel)?;
                        }
                    }
                }
                poll.tick(area.w as u64, progress)?;
            }
        }

        let project = session.project();
        debug!(
            fields = fields.len(),
            channels = project.channel_count(),
            "mask pass complete"
        );
        session.commit()
    }
}

#[cfg(test)]
mod tests {
    use crate::options::StatisticsOptions;
    use crate::project::ProjectContext;
    use crate::scan::NoProgress;
    use crate::types::{FieldGeometry, FieldState, FieldType};
    use fieldstats_core::{MultibandImage, TrainingMask};

    #[test]
    fn test_one_pass_updates_two_fields() {
        let mut image =
            MultibandImage::from_fn(4, 3, 1, |x, y, _| (10 * y + x) as f64).unwrap();
        let mask = TrainingMask::from_values(
            3,
            2,
            vec![
                1, 1, 0, //
                2, 0, 2,
            ],
        )
        .unwrap()
        .with_origin(1, 1);

        let mut p = ProjectContext::new(vec![0], StatisticsOptions::default()).unwrap();
        p.set_training_mask(mask).unwrap();
        let c = p.add_class("a").unwrap();
        let f1 = p
            .add_field(c, "one", FieldType::Training, FieldGeometry::Mask { value: 1 })
            .unwrap();
        let f2 = p
            .add_field(c, "two", FieldType::Training, FieldGeometry::Mask { value: 2 })
            .unwrap();

        let wanted = p.mask_fields_needing_update(&[f1, f2]);
        assert_eq!(wanted, vec![f1, f2]);
        p.update_mask_fields(&wanted, &mut image, &mut NoProgress)
            .unwrap();

        let r1 = p.field(f1).unwrap();
        assert_eq!(r1.pixels_used(), 2);
        assert_eq!(r1.state(), FieldState::Clean);
        // Image pixels (1,1) and (2,1)
        let s1 = p.store().slot(r1.stats_slot.unwrap()).unwrap();
        assert_eq!(s1.channels()[0].sum, 11.0 + 12.0);

        // Image pixels (1,2) and (3,2)
        let r2 = p.field(f2).unwrap();
        let s2 = p.store().slot(r2.stats_slot.unwrap()).unwrap();
        assert_eq!(s2.channels()[0].sum, 21.0 + 23.0);

        assert!(p.mask_fields_needing_update(&[f1, f2]).is_empty());
        assert!(p.mask().is_some());
    }
}
