//! Statistics update control
//!
//! An update brings a scope (the whole project, one class or one field)
//! up to date in four steps: zero whatever is stale, scan rectangle and
//! polygon fields, run one mask pass for all stale mask fields, then fold
//! fields into their classes and settle the class and project flags.

use fieldstats_core::PixelReader;
use tracing::{info, warn};

use crate::error::{ProjectError, ProjectResult};
use crate::project::ProjectContext;
use crate::scan::ProgressSink;
use crate::types::{ClassId, FieldId, FieldState};

/// What an update covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateScope {
    /// Every class
    Project,
    /// One class and its training fields
    Class(ClassId),
    /// One field
    Field(FieldId),
}

/// Outcome of [`ProjectContext::update_statistics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The scope is up to date
    Done,
    /// The progress sink cancelled the update
    Cancelled,
    /// The update failed; the scope stays stale
    Failed,
}

impl ProjectContext {
    /// Bring `scope` up to date, reporting the outcome as a status.
    ///
    /// Errors are logged; use [`try_update_statistics`](Self::try_update_statistics)
    /// to receive them.
    pub fn update_statistics(
        &mut self,
        scope: UpdateScope,
        reader: &mut dyn PixelReader,
        progress: &mut dyn ProgressSink,
    ) -> UpdateStatus {
        match self.try_update_statistics(scope, reader, progress) {
            Ok(()) => UpdateStatus::Done,
            Err(ProjectError::Cancelled) => {
                warn!(?scope, "statistics update cancelled");
                UpdateStatus::Cancelled
            }
            Err(e) => {
                warn!(?scope, error = %e, "statistics update failed");
                UpdateStatus::Failed
            }
        }
    }

    /// Bring `scope` up to date.
    ///
    /// When only class statistics are kept a field scope is widened to
    /// the field's class, since fields have no statistics of their own.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::Cancelled`] on cancellation and the
    /// reader's error on read failure; nothing partially scanned survives
    /// either.
    pub fn try_update_statistics(
        &mut self,
        scope: UpdateScope,
        reader: &mut dyn PixelReader,
        progress: &mut dyn ProgressSink,
    ) -> ProjectResult<()> {
        let classes = match scope {
            UpdateScope::Project => self.class_ids(),
            UpdateScope::Class(c) => {
                self.class(c)?;
                vec![c]
            }
            UpdateScope::Field(f) => {
                let class = self.field(f)?.class;
                if !self.options.keep_class_stats_only {
                    return self.update_single_field(f, reader, progress);
                }
                vec![class]
            }
        };

        let stale: Vec<ClassId> = classes
            .into_iter()
            .filter(|&c| self.class(c).is_ok_and(|r| !r.stats_up_to_date))
            .collect();

        // Zero everything that is stale
        let mut training = Vec::new();
        for &c in &stale {
            self.reset_class_statistics(c)?;
            for f in self.training_fields(c)? {
                self.clear_field_statistics(f)?;
                training.push(f);
            }
        }

        // Rectangles and polygons, one field at a time
        for &c in &stale {
            self.update_class_area_stats(c, reader, progress)?;
        }

        // All mask fields in one pass
        let wanted = self.mask_fields_needing_update(&training);
        self.update_mask_fields(&wanted, reader, progress)?;

        let mut pixels = 0;
        for &c in &stale {
            self.finish_class_update(c)?;
            pixels += self.class(c)?.statistics_pixels;
        }
        self.refresh_project_flag();

        info!(
            ?scope,
            classes = stale.len(),
            pixels,
            up_to_date = self.stats_up_to_date,
            "statistics updated"
        );
        Ok(())
    }

    fn update_single_field(
        &mut self,
        id: FieldId,
        reader: &mut dyn PixelReader,
        progress: &mut dyn ProgressSink,
    ) -> ProjectResult<()> {
        if self.field(id)?.state == FieldState::Clean {
            return Ok(());
        }
        self.clear_field_statistics(id)?;
        if self.field(id)?.geometry.is_mask() {
            self.update_mask_fields(&[id], reader, progress)?;
        } else {
            self.update_field_area_stats(id, reader, progress)?;
        }
        info!(field = id.0, pixels = self.field(id)?.pixels_used, "field statistics updated");
        Ok(())
    }
}
