//! Statistics store - the project's pool of accumulator slots
//!
//! Fields and classes never own their statistics. They hold an index into
//! this pool, which hands slots out, takes them back on deletion and
//! reuses them. The store also owns the shared scratch slot used when only
//! class statistics are kept, and the common covariance buffer.

use fieldstats_core::{Error, StatisticsCode, StatisticsSlot, SymmetricMatrix};
use tracing::debug;

use crate::error::ProjectResult;

/// Pool of accumulator slots for one project.
#[derive(Debug, Clone)]
pub struct StatisticsStore {
    channel_count: usize,
    code: StatisticsCode,
    slots: Vec<StatisticsSlot>,
    in_use: Vec<bool>,
    free: Vec<usize>,
    scratch: StatisticsSlot,
    common_covariance: Option<CommonCovariance>,
}

/// Stored common covariance and the number of classes behind it
#[derive(Debug, Clone, PartialEq)]
pub struct CommonCovariance {
    /// Weighted covariance over all project channels
    pub matrix: SymmetricMatrix,
    /// Classes that contributed with a positive weight
    pub number_classes: usize,
}

impl StatisticsStore {
    /// Create an empty store.
    pub fn new(channel_count: usize, code: StatisticsCode) -> Self {
        Self {
            channel_count,
            code,
            slots: Vec::new(),
            in_use: Vec::new(),
            free: Vec::new(),
            scratch: StatisticsSlot::new(channel_count, code),
            common_covariance: None,
        }
    }

    /// Channels per slot.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Statistics code of every slot.
    #[inline]
    pub fn code(&self) -> StatisticsCode {
        self.code
    }

    /// Bytes needed for `slot_count` slots of `channel_count` channels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationTooLarge`] if the byte count cannot be
    /// represented.
    pub fn bytes_needed(slot_count: usize, channel_count: usize) -> ProjectResult<usize> {
        let per_channel = std::mem::size_of::<fieldstats_core::ChannelStatistics>();
        let too_large = || {
            Error::AllocationTooLarge(format!(
                "{} slots of {} channels",
                slot_count, channel_count
            ))
        };
        let triangle = channel_count
            .checked_add(1)
            .and_then(|n| n.checked_mul(channel_count))
            .map(|n| n / 2);
        let per_slot = channel_count
            .checked_mul(per_channel)
            .zip(triangle.and_then(|t| t.checked_mul(std::mem::size_of::<f64>())))
            .and_then(|(a, b)| a.checked_add(b))
            .ok_or_else(too_large)?;
        let total = per_slot.checked_mul(slot_count).ok_or_else(too_large)?;
        if total > isize::MAX as usize {
            return Err(too_large().into());
        }
        Ok(total)
    }

    /// Hand out a zeroed slot, reusing a released one when possible.
    ///
    /// # Errors
    ///
    /// Returns an error if the grown pool would exceed the representable
    /// allocation size.
    pub(crate) fn allocate(&mut self) -> ProjectResult<usize> {
        if let Some(index) = self.free.pop() {
            self.slots[index].zero();
            self.in_use[index] = true;
            debug!(slot = index, "reusing statistics slot");
            return Ok(index);
        }
        Self::bytes_needed(self.slots.len() + 1, self.channel_count)?;
        self.slots
            .push(StatisticsSlot::new(self.channel_count, self.code));
        self.in_use.push(true);
        let index = self.slots.len() - 1;
        debug!(slot = index, "allocated statistics slot");
        Ok(index)
    }

    /// Return a slot to the pool.
    pub(crate) fn release(&mut self, index: usize) {
        if self.in_use.get(index).copied().unwrap_or(false) {
            self.in_use[index] = false;
            self.slots[index].zero();
            self.free.push(index);
        }
    }

    /// Number of slots currently handed out.
    pub fn slots_in_use(&self) -> usize {
        self.in_use.iter().filter(|&&u| u).count()
    }

    /// Borrow a slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] for an unknown or released slot.
    pub fn slot(&self, index: usize) -> ProjectResult<&StatisticsSlot> {
        match self.in_use.get(index) {
            Some(true) => Ok(&self.slots[index]),
            _ => Err(Error::IndexOutOfBounds {
                index,
                len: self.slots.len(),
            }
            .into()),
        }
    }

    /// Mutably borrow a slot.
    pub(crate) fn slot_mut(&mut self, index: usize) -> ProjectResult<&mut StatisticsSlot> {
        match self.in_use.get(index) {
            Some(true) => Ok(&mut self.slots[index]),
            _ => Err(Error::IndexOutOfBounds {
                index,
                len: self.slots.len(),
            }
            .into()),
        }
    }

    /// Borrow the scratch slot and one pool slot at once.
    pub(crate) fn scratch_and_slot_mut(
        &mut self,
        index: usize,
    ) -> ProjectResult<(&mut StatisticsSlot, &mut StatisticsSlot)> {
        if !self.in_use.get(index).copied().unwrap_or(false) {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.slots.len(),
            }
            .into());
        }
        Ok((&mut self.scratch, &mut self.slots[index]))
    }

    /// Fold slot `src` into slot `dst`.
    pub(crate) fn combine(&mut self, dst: usize, src: usize, initialize: bool) -> ProjectResult<()> {
        if dst == src {
            return Err(fieldstats_core::Error::InvalidParameter(
                "cannot combine a slot into itself".to_string(),
            )
            .into());
        }
        let source = self.slot(src)?.clone();
        self.slot_mut(dst)?.combine(&source, initialize)?;
        Ok(())
    }

    /// Scratch slot shared by fields when only class statistics are kept.
    pub fn scratch(&self) -> &StatisticsSlot {
        &self.scratch
    }

    pub(crate) fn scratch_mut(&mut self) -> &mut StatisticsSlot {
        &mut self.scratch
    }

    /// Stored common covariance, if computed since the last invalidation.
    pub fn common_covariance(&self) -> Option<&CommonCovariance> {
        self.common_covariance.as_ref()
    }

    /// Store a newly computed common covariance.
    pub(crate) fn set_common_covariance(&mut self, matrix: SymmetricMatrix, number_classes: usize) {
        self.common_covariance = Some(CommonCovariance {
            matrix,
            number_classes,
        });
    }

    /// Forget the stored common covariance.
    pub(crate) fn clear_common_covariance(&mut self) {
        self.common_covariance = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_reuse() {
        let mut store = StatisticsStore::new(3, StatisticsCode::MeanCovariance);
        let a = store.allocate().unwrap();
        let b = store.allocate().unwrap();
        assert_ne!(a, b);
        store.slot_mut(a).unwrap().accumulate(&[1.0, 2.0, 3.0]).unwrap();
        store.release(a);
        assert!(store.slot(a).is_err());
        let c = store.allocate().unwrap();
        assert_eq!(c, a);
        assert!(store.slot(c).unwrap().is_zeroed());
        assert_eq!(store.slots_in_use(), 2);
    }

    #[test]
    fn test_bytes_needed_overflow() {
        assert!(StatisticsStore::bytes_needed(10, 4).is_ok());
        assert!(StatisticsStore::bytes_needed(usize::MAX / 2, 1000).is_err());
        assert!(StatisticsStore::bytes_needed(2, usize::MAX / 4).is_err());
    }

    #[test]
    fn test_combine_slots() {
        let mut store = StatisticsStore::new(1, StatisticsCode::MeanStdDev);
        let a = store.allocate().unwrap();
        let b = store.allocate().unwrap();
        store.slot_mut(a).unwrap().accumulate(&[4.0]).unwrap();
        store.combine(b, a, true).unwrap();
        assert_eq!(store.slot(b).unwrap().channels()[0].sum, 4.0);
        assert!(store.combine(a, a, false).is_err());
    }
}
