//! Area and mask scanning
//!
//! Scans pull pixel rows from a [`PixelReader`](fieldstats_core::PixelReader)
//! and fold accepted pixels into statistics slots. Every scan runs inside
//! a [`ScanSession`], which marks its fields `Scanning` and, unless the
//! scan is committed, re-zeroes everything it touched when it goes out of
//! scope. Cancellation and reader errors therefore never leave partial
//! sums behind.

pub(crate) mod area;
mod mask;

use tracing::warn;

use crate::error::{ProjectError, ProjectResult};
use crate::project::ProjectContext;
use crate::types::{ClassId, FieldId, FieldState};

/// Progress and cancellation channel for long scans.
pub trait ProgressSink {
    /// Report that `current` of `total` pixels have been visited.
    fn report_progress(&mut self, _current: u64, _total: u64) {}

    /// Whether the user asked to stop.
    fn is_cancelled(&mut self) -> bool {
        false
    }
}

/// Sink that ignores progress and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Polls a [`ProgressSink`] once per `interval` pixels.
#[derive(Debug)]
pub(crate) struct CancelPoll {
    interval: u64,
    since_last: u64,
    visited: u64,
    total: u64,
}

impl CancelPoll {
    pub(crate) fn new(interval: u64, total: u64) -> Self {
        Self {
            interval: interval.max(1),
            since_last: 0,
            visited: 0,
            total,
        }
    }

    /// Count visited pixels and poll the sink when the interval is
    /// reached.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::Cancelled`] if the sink reports a cancel.
    pub(crate) fn tick(&mut self, pixels: u64, sink: &mut dyn ProgressSink) -> ProjectResult<()> {
        self.visited += pixels;
        self.since_last += pixels;
        if self.since_last >= self.interval {
            self.since_last = 0;
            sink.report_progress(self.visited, self.total);
            if sink.is_cancelled() {
                return Err(ProjectError::Cancelled);
            }
        }
        Ok(())
    }
}

/// Where a field's pixels are accumulated during a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotTarget {
    /// A slot of the store
    Pool(usize),
    /// The store's shared scratch slot
    Scratch,
}

#[derive(Debug)]
struct Member {
    field: FieldId,
    class: ClassId,
    target: SlotTarget,
    pixels: u64,
}

/// Scoped claim on the statistics of a set of fields.
///
/// Creating a session zeroes the fields' accumulators and marks them
/// `Scanning`. [`commit`](Self::commit) publishes the counts and derived
/// values. Dropping an uncommitted session rolls every member back to
/// zeroed and `Dirty`; when only class statistics are kept the owning
/// classes are reset as well, since their sums may already hold part of
/// the scan.
pub(crate) struct ScanSession<'a> {
    project: &'a mut ProjectContext,
    members: Vec<Member>,
    classes: Vec<ClassId>,
    committed: bool,
}

impl<'a> ScanSession<'a> {
    /// Claim `fields` for a scan.
    ///
    /// `use_scratch` sends class-only area scans to the scratch slot; mask
    /// scans in class-only mode accumulate straight into the class slot.
    pub(crate) fn begin(
        project: &'a mut ProjectContext,
        fields: &[FieldId],
        use_scratch: bool,
    ) -> ProjectResult<Self> {
        let mut session = Self {
            project,
            members: Vec::with_capacity(fields.len()),
            classes: Vec::new(),
            committed: false,
        };
        let class_only = session.project.options.keep_class_stats_only;
        if use_scratch {
            session.project.store.scratch_mut().zero();
        }
        for &id in fields {
            let (class, own_slot) = {
                let field = session.project.field_mut(id)?;
                field.state = FieldState::Scanning;
                field.pixels_used = 0;
                field.loaded_into_class = false;
                (field.class, field.stats_slot)
            };
            let target = match (class_only, own_slot) {
                (false, Some(slot)) => {
                    session.project.store.slot_mut(slot)?.zero();
                    SlotTarget::Pool(slot)
                }
                _ if use_scratch => SlotTarget::Scratch,
                _ => SlotTarget::Pool(session.project.class(class)?.stats_slot),
            };
            if class_only && !session.classes.contains(&class) {
                session.classes.push(class);
            }
            session.members.push(Member {
                field: id,
                class,
                target,
                pixels: 0,
            });
        }
        Ok(session)
    }

    /// Session index of each member's field, by field index.
    pub(crate) fn member_lookup(&self) -> Vec<Option<usize>> {
        let mut lookup = vec![None; self.project.fields.len()];
        for (i, m) in self.members.iter().enumerate() {
            lookup[m.field.0] = Some(i);
        }
        lookup
    }

    pub(crate) fn project(&self) -> &ProjectContext {
        self.project
    }

    /// Fold one pixel into member `index`.
    pub(crate) fn accumulate(&mut self, index: usize, pixel: &[f64]) -> ProjectResult<()> {
        let member = &mut self.members[index];
        let slot = match member.target {
            SlotTarget::Pool(slot) => self.project.store.slot_mut(slot)?,
            SlotTarget::Scratch => self.project.store.scratch_mut(),
        };
        slot.accumulate(pixel)?;
        member.pixels += 1;
        Ok(())
    }

    /// Publish the scan.
    ///
    /// Field slots get their counts and derived mean/standard deviation
    /// and become `Clean`. In class-only mode each field is counted into
    /// its class and marked as folded in; scratch results are combined
    /// into the class slot first.
    pub(crate) fn commit(mut self) -> ProjectResult<()> {
        let class_only = self.project.options.keep_class_stats_only;
        for i in 0..self.members.len() {
            let (field, class, target, pixels) = {
                let m = &self.members[i];
                (m.field, m.class, m.target, m.pixels)
            };
            if class_only {
                let class_slot = self.project.class(class)?.stats_slot;
                if target == SlotTarget::Scratch {
                    let initialize = self.project.class(class)?.statistics_pixels == 0;
                    let (scratch, dst) = self.project.store.scratch_and_slot_mut(class_slot)?;
                    dst.combine(scratch, initialize)?;
                }
                self.project.class_mut(class)?.statistics_pixels += pixels;
                let record = self.project.field_mut(field)?;
                record.pixels_used = pixels;
                record.loaded_into_class = true;
                record.state = FieldState::Dirty;
            } else {
                if let SlotTarget::Pool(slot) = target {
                    self.project.store.slot_mut(slot)?.derive_mean_std_dev(pixels);
                }
                let record = self.project.field_mut(field)?;
                record.pixels_used = pixels;
                record.state = FieldState::Clean;
            }
        }
        self.committed = true;
        Ok(())
    }

    fn rollback(&mut self) {
        let class_only = self.project.options.keep_class_stats_only;
        for m in &self.members {
            if let Ok(record) = self.project.field_mut(m.field) {
                record.state = FieldState::Dirty;
                record.pixels_used = 0;
                record.loaded_into_class = false;
            }
            if let (false, SlotTarget::Pool(slot)) = (class_only, m.target) {
                if let Ok(s) = self.project.store.slot_mut(slot) {
                    s.zero();
                }
            }
            let _ = self.project.invalidate_class(m.class);
        }
        self.project.store.scratch_mut().zero();
        for &class in &self.classes {
            let _ = self.project.reset_class_statistics(class);
        }
    }
}

impl Drop for ScanSession<'_> {
    fn drop(&mut self) {
        if !self.committed {
            warn!(
                fields = self.members.len(),
                "statistics scan did not complete; accumulators re-zeroed"
            );
            self.rollback();
        }
    }
}
