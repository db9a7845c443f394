//! Training sample collection
//!
//! Sample-based trainers (decision tree, SVM, k-NN) need the individual
//! pixel vectors of the training fields rather than their sums. This
//! reads them with the same geometry and bad-data rules as the scanners.

use fieldstats_core::{PixelFilter, PixelReader, Rect};

use crate::error::{ProjectError, ProjectResult};
use crate::project::ProjectContext;
use crate::scan::area::geometry_spans;
use crate::scan::{CancelPoll, ProgressSink};
use crate::types::{ClassId, FieldGeometry};

/// Pixel vectors with their class labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSamples {
    /// One vector per pixel, in the requested channel order
    pub samples: Vec<Vec<f64>>,
    /// Class of each sample
    pub labels: Vec<ClassId>,
}

impl TrainingSamples {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl ProjectContext {
    /// Read the training pixels of `classes`
    ///
    /// # Arguments
    ///
    /// * `classes` - Classes whose training fields are read
    /// * `channels` - Indices into the project channel list
    /// * `reader` - Source of pixel rows
    /// * `progress` - Progress and cancellation sink
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid channel subset, on cancellation and
    /// on read failure.
    pub fn collect_training_samples(
        &self,
        classes: &[ClassId],
        channels: &[usize],
        reader: &mut dyn PixelReader,
        progress: &mut dyn ProgressSink,
    ) -> ProjectResult<TrainingSamples> {
        self.check_channel_subset(channels)?;
        let image_channels: Vec<usize> = channels.iter().map(|&c| self.channels[c]).collect();
        let n = image_channels.len();
        let filter = PixelFilter::new(self.options.bad_data);
        let (width, height) = (reader.width(), reader.height());

        let mut spans = Vec::new();
        let mut mask_values = Vec::new();
        for &class in classes {
            for f in self.training_fields(class)? {
                match &self.field(f)?.geometry {
                    FieldGeometry::Mask { value } => mask_values.push((*value, class)),
                    geometry => spans.extend(
                        geometry_spans(geometry, width, height)
                            .into_iter()
                            .map(|s| (s, class)),
                    ),
                }
            }
        }

        let total = spans.iter().map(|&((_, s, e), _)| (e - s) as u64).sum();
        let mut poll = CancelPoll::new(self.options.cancel_check_interval, total);
        let mut out = TrainingSamples::default();
        let mut row_values = Vec::new();

        for ((row, start, end), class) in spans {
            reader.read_pixel_row(row, start..end, &image_channels, &mut row_values)?;
            for pixel in row_values.chunks_exact(n) {
                if filter.accepts(pixel) {
                    out.samples.push(pixel.to_vec());
                    out.labels.push(class);
                }
            }
            poll.tick((end - start) as u64, progress)?;
        }

        if !mask_values.is_empty() {
            let mask = self.mask.as_ref().ok_or_else(|| {
                ProjectError::InvalidParameter("mask fields present but no training mask".into())
            })?;
            let origin = mask.bounds();
            let image = Rect {
                x: 0,
                y: 0,
                w: width as i32,
                h: height as i32,
            };
            if let Some(area) = origin.intersect(&image) {
                let first_col = (area.x - origin.x) as usize;
                for row in area.y..area.bottom() {
                    let mask_row = (row - origin.y) as u32;
                    if !mask.line_has_values(mask_row) {
                        continue;
                    }
                    let values = mask.row(mask_row);
                    reader.read_pixel_row(
                        row as u32,
                        area.x as u32..area.right() as u32,
                        &image_channels,
                        &mut row_values,
                    )?;
                    for (i, pixel) in row_values.chunks_exact(n).enumerate() {
                        let value = values[first_col + i];
                        let class = mask_values
                            .iter()
                            .find(|(v, _)| *v == value)
                            .map(|&(_, c)| c);
                        if let (Some(class), true) = (class, filter.accepts(pixel)) {
                            out.samples.push(pixel.to_vec());
                            out.labels.push(class);
                        }
                    }
                    poll.tick(area.w as u64, progress)?;
                }
            }
        }

        Ok(out)
    }
}
