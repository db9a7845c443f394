//! ProjectContext - explicit owner of every field, class and statistic
//!
//! All statistics operations take the project they work on. The project
//! owns the statistics store; fields and classes refer to store slots by
//! index only. Edits to fields go through the project so the consistency
//! tracker sees every change.

use fieldstats_core::{SymmetricMatrix, TrainingMask};
use tracing::debug;

use crate::error::{ProjectError, ProjectResult};
use crate::options::StatisticsOptions;
use crate::store::StatisticsStore;
use crate::types::{
    ClassId, ClassRecord, CovarianceStatsToUse, FieldGeometry, FieldId, FieldRecord, FieldState,
    FieldType, MixingParameterCode,
};

/// A statistics project: image channels, classes, fields and their
/// statistics.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub(crate) channels: Vec<usize>,
    pub(crate) options: StatisticsOptions,
    pub(crate) store: StatisticsStore,
    pub(crate) fields: Vec<Option<FieldRecord>>,
    pub(crate) classes: Vec<Option<ClassRecord>>,
    pub(crate) mask: Option<TrainingMask>,
    pub(crate) stats_up_to_date: bool,
    pub(crate) covariance_stats_to_use: CovarianceStatsToUse,
}

impl ProjectContext {
    /// Create a project over the given image channels
    ///
    /// # Arguments
    ///
    /// * `channels` - Image channel indices whose statistics are kept, in
    ///   project order
    /// * `options` - Statistics options
    ///
    /// # Errors
    ///
    /// Returns an error if the channel list is empty or repeats a channel,
    /// or the options are invalid.
    pub fn new(channels: Vec<usize>, options: StatisticsOptions) -> ProjectResult<Self> {
        options.validate()?;
        validate_channels(&channels)?;
        let store = StatisticsStore::new(channels.len(), options.statistics_code);
        Ok(Self {
            channels,
            options,
            store,
            fields: Vec::new(),
            classes: Vec::new(),
            mask: None,
            stats_up_to_date: false,
            covariance_stats_to_use: CovarianceStatsToUse::Original,
        })
    }

    /// Image channels in project order.
    pub fn channels(&self) -> &[usize] {
        &self.channels
    }

    /// Number of project channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Statistics options.
    pub fn options(&self) -> &StatisticsOptions {
        &self.options
    }

    /// Statistics store.
    pub fn store(&self) -> &StatisticsStore {
        &self.store
    }

    /// Keep a common covariance computed from this project's classes.
    ///
    /// The store drops it on the next change that could affect it. Slots
    /// themselves are only written by scans and the consistency tracker.
    pub fn set_common_covariance(&mut self, matrix: SymmetricMatrix, number_classes: usize) {
        self.store.set_common_covariance(matrix, number_classes);
    }

    /// Training mask, if one is loaded.
    pub fn mask(&self) -> Option<&TrainingMask> {
        self.mask.as_ref()
    }

    /// Project-level covariance statistics setting.
    pub fn covariance_stats_to_use(&self) -> CovarianceStatsToUse {
        self.covariance_stats_to_use
    }

    /// Whether every class's statistics are current.
    pub fn is_project_statistics_up_to_date(&self) -> bool {
        self.stats_up_to_date
    }

    // --------------------------------------------------------------------
    // Lookup
    // --------------------------------------------------------------------

    /// Get a field.
    pub fn field(&self, id: FieldId) -> ProjectResult<&FieldRecord> {
        self.fields
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(ProjectError::UnknownField(id))
    }

    pub(crate) fn field_mut(&mut self, id: FieldId) -> ProjectResult<&mut FieldRecord> {
        self.fields
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(ProjectError::UnknownField(id))
    }

    /// Get a class.
    pub fn class(&self, id: ClassId) -> ProjectResult<&ClassRecord> {
        self.classes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(ProjectError::UnknownClass(id))
    }

    pub(crate) fn class_mut(&mut self, id: ClassId) -> ProjectResult<&mut ClassRecord> {
        self.classes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(ProjectError::UnknownClass(id))
    }

    /// Live classes in creation order.
    pub fn class_ids(&self) -> Vec<ClassId> {
        self.classes
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_some())
            .map(|(i, _)| ClassId(i))
            .collect()
    }

    /// Live fields in creation order.
    pub fn field_ids(&self) -> Vec<FieldId> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_some())
            .map(|(i, _)| FieldId(i))
            .collect()
    }

    /// Training fields of a class, in class order.
    pub fn training_fields(&self, class: ClassId) -> ProjectResult<Vec<FieldId>> {
        let record = self.class(class)?;
        Ok(record
            .fields
            .iter()
            .copied()
            .filter(|&f| self.field(f).map(FieldRecord::is_training).unwrap_or(false))
            .collect())
    }

    /// Number of training fields in a class.
    pub fn number_of_train_fields(&self, class: ClassId) -> ProjectResult<usize> {
        Ok(self.training_fields(class)?.len())
    }

    // --------------------------------------------------------------------
    // Classes
    // --------------------------------------------------------------------

    /// Add an empty class.
    pub fn add_class(&mut self, name: &str) -> ProjectResult<ClassId> {
        let stats_slot = self.store.allocate()?;
        let id = ClassId(self.classes.len());
        self.classes.push(Some(ClassRecord {
            name: name.to_string(),
            fields: Vec::new(),
            stats_slot,
            statistics_pixels: 0,
            stats_up_to_date: false,
            covariance_stats_to_use: CovarianceStatsToUse::Original,
            mixing_parameter_code: MixingParameterCode::ComputedOptimum,
            loo_covariance_value: None,
            user_mixing_value: 1.0,
            enhanced: None,
            weight: 1.0,
            list_message: true,
        }));
        self.stats_up_to_date = false;
        self.store.clear_common_covariance();
        debug!(class = id.0, name, "added class");
        Ok(id)
    }

    /// Delete a class and all of its fields.
    pub fn delete_class(&mut self, id: ClassId) -> ProjectResult<()> {
        let fields = self.class(id)?.fields.clone();
        for field in fields {
            self.delete_field(field)?;
        }
        if let Some(record) = self.classes[id.0].take() {
            self.store.release(record.stats_slot);
        }
        self.store.clear_common_covariance();
        self.refresh_project_flag();
        Ok(())
    }

    /// Set a class's prior weight.
    pub fn set_class_weight(&mut self, id: ClassId, weight: f64) -> ProjectResult<()> {
        if !(weight >= 0.0) {
            return Err(ProjectError::InvalidParameter(format!(
                "class weight must be non-negative, got {}",
                weight
            )));
        }
        self.class_mut(id)?.weight = weight;
        self.store.clear_common_covariance();
        Ok(())
    }

    /// Allow or suppress further degenerate-matrix messages for a class.
    pub fn set_class_list_message_flag(&mut self, id: ClassId, flag: bool) -> ProjectResult<()> {
        self.class_mut(id)?.list_message = flag;
        Ok(())
    }

    /// Allow degenerate-matrix messages again for every class.
    pub fn reset_list_message_flags(&mut self) {
        for class in self.classes.iter_mut().flatten() {
            class.list_message = true;
        }
    }

    // --------------------------------------------------------------------
    // Fields
    // --------------------------------------------------------------------

    /// Add a field to a class.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown class, for a mask field when no
    /// mask is loaded, or if the statistics slot cannot be allocated.
    pub fn add_field(
        &mut self,
        class: ClassId,
        name: &str,
        field_type: FieldType,
        geometry: FieldGeometry,
    ) -> ProjectResult<FieldId> {
        self.class(class)?;
        let id = FieldId(self.fields.len());
        let stats_slot = if self.options.keep_class_stats_only {
            None
        } else {
            Some(self.store.allocate()?)
        };
        if let Err(e) = self.assign_mask_value(&geometry, id) {
            if let Some(slot) = stats_slot {
                self.store.release(slot);
            }
            return Err(e);
        }
        self.fields.push(Some(FieldRecord {
            name: name.to_string(),
            field_type,
            geometry,
            class,
            stats_slot,
            pixels_used: 0,
            state: FieldState::Dirty,
            loaded_into_class: false,
        }));
        self.class_mut(class)?.fields.push(id);
        self.invalidate_class(class)?;
        debug!(field = id.0, class = class.0, name, "added field");
        Ok(id)
    }

    /// Delete a field and return its statistics slot to the store.
    pub fn delete_field(&mut self, id: FieldId) -> ProjectResult<()> {
        let record = self.field(id)?.clone();
        if let FieldGeometry::Mask { value } = record.geometry {
            if let Some(mask) = self.mask.as_mut() {
                mask.unassign_value(value);
            }
        }
        if let Some(slot) = record.stats_slot {
            self.store.release(slot);
        }
        self.fields[id.0] = None;
        self.class_mut(record.class)?.fields.retain(|&f| f != id);
        self.invalidate_class(record.class)
    }

    /// Replace a field's geometry.
    pub fn set_field_geometry(&mut self, id: FieldId, geometry: FieldGeometry) -> ProjectResult<()> {
        let old = self.field(id)?.geometry.clone();
        self.assign_mask_value(&geometry, id)?;
        if let FieldGeometry::Mask { value } = old {
            let still_used = matches!(geometry, FieldGeometry::Mask { value: v } if v == value);
            if let (Some(mask), false) = (self.mask.as_mut(), still_used) {
                mask.unassign_value(value);
            }
        }
        self.field_mut(id)?.geometry = geometry;
        self.invalidate_field(id)
    }

    /// Change a field's type.
    pub fn set_field_type(&mut self, id: FieldId, field_type: FieldType) -> ProjectResult<()> {
        self.field_mut(id)?.field_type = field_type;
        self.invalidate_field(id)
    }

    /// Move a field to another class.
    pub fn move_field(&mut self, id: FieldId, to: ClassId) -> ProjectResult<()> {
        self.class(to)?;
        let from = self.field(id)?.class;
        if from == to {
            return Ok(());
        }
        self.class_mut(from)?.fields.retain(|&f| f != id);
        self.class_mut(to)?.fields.push(id);
        self.field_mut(id)?.class = to;
        self.invalidate_class(from)?;
        self.invalidate_field(id)
    }

    /// Load a training mask, replacing any previous one.
    ///
    /// Every mask field is re-registered in the new mask's value table
    /// and marked dirty.
    pub fn set_training_mask(&mut self, mut mask: TrainingMask) -> ProjectResult<()> {
        let mask_fields: Vec<(FieldId, u16)> = self
            .field_ids()
            .into_iter()
            .filter_map(|id| match self.field(id).ok()?.geometry {
                FieldGeometry::Mask { value } => Some((id, value)),
                _ => None,
            })
            .collect();
        for &(id, value) in &mask_fields {
            mask.assign_value(value, id.0)?;
        }
        self.mask = Some(mask);
        for (id, _) in mask_fields {
            self.invalidate_field(id)?;
        }
        Ok(())
    }

    /// Change the project channels.
    ///
    /// All statistics are discarded and every slot is reallocated.
    pub fn set_channels(&mut self, channels: Vec<usize>) -> ProjectResult<()> {
        validate_channels(&channels)?;
        let mut store = StatisticsStore::new(channels.len(), self.options.statistics_code);
        for class in self.classes.iter_mut().flatten() {
            class.stats_slot = store.allocate()?;
            class.enhanced = None;
        }
        for field in self.fields.iter_mut().flatten() {
            if field.stats_slot.is_some() {
                field.stats_slot = Some(store.allocate()?);
            }
        }
        self.store = store;
        self.channels = channels;
        for id in self.field_ids() {
            self.invalidate_field(id)?;
        }
        for id in self.class_ids() {
            self.invalidate_class(id)?;
        }
        Ok(())
    }

    fn assign_mask_value(&mut self, geometry: &FieldGeometry, id: FieldId) -> ProjectResult<()> {
        if let FieldGeometry::Mask { value } = *geometry {
            let mask = self.mask.as_mut().ok_or_else(|| {
                ProjectError::InvalidParameter("mask field added without a training mask".into())
            })?;
            if mask.field_for_value(value).is_some_and(|f| f != id.0) {
                return Err(ProjectError::InvalidParameter(format!(
                    "mask value {} already belongs to another field",
                    value
                )));
            }
            mask.assign_value(value, id.0)?;
        }
        Ok(())
    }
}

fn validate_channels(channels: &[usize]) -> ProjectResult<()> {
    if channels.is_empty() {
        return Err(ProjectError::InvalidParameter(
            "project needs at least one channel".to_string(),
        ));
    }
    for (i, c) in channels.iter().enumerate() {
        if channels[..i].contains(c) {
            return Err(ProjectError::InvalidParameter(format!(
                "channel {} listed twice",
                c
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldstats_core::Rect;

    fn rect(x: i32, y: i32, w: i32, h: i32) -> FieldGeometry {
        FieldGeometry::Rectangle(Rect::new(x, y, w, h).unwrap())
    }

    #[test]
    fn test_new_validates_channels() {
        assert!(ProjectContext::new(vec![], StatisticsOptions::default()).is_err());
        assert!(ProjectContext::new(vec![0, 0], StatisticsOptions::default()).is_err());
        assert!(ProjectContext::new(vec![2, 0], StatisticsOptions::default()).is_ok());
    }

    #[test]
    fn test_add_and_delete_field() {
        let mut p = ProjectContext::new(vec![0, 1], StatisticsOptions::default()).unwrap();
        let c = p.add_class("water").unwrap();
        let f1 = p.add_field(c, "a", FieldType::Training, rect(0, 0, 2, 2)).unwrap();
        let f2 = p.add_field(c, "b", FieldType::Test, rect(2, 2, 2, 2)).unwrap();
        assert_eq!(p.class(c).unwrap().fields(), &[f1, f2]);
        assert_eq!(p.training_fields(c).unwrap(), vec![f1]);
        assert_eq!(p.store().slots_in_use(), 3);

        p.delete_field(f1).unwrap();
        assert!(p.field(f1).is_err());
        assert_eq!(p.class(c).unwrap().fields(), &[f2]);
        assert_eq!(p.store().slots_in_use(), 2);
    }

    #[test]
    fn test_class_only_mode_has_no_field_slots() {
        let opts = StatisticsOptions::new().with_keep_class_stats_only(true);
        let mut p = ProjectContext::new(vec![0], opts).unwrap();
        let c = p.add_class("soil").unwrap();
        p.add_field(c, "a", FieldType::Training, rect(0, 0, 1, 1)).unwrap();
        assert_eq!(p.store().slots_in_use(), 1);
    }

    #[test]
    fn test_mask_field_needs_mask() {
        let mut p = ProjectContext::new(vec![0], StatisticsOptions::default()).unwrap();
        let c = p.add_class("crop").unwrap();
        let geometry = FieldGeometry::Mask { value: 3 };
        assert!(p.add_field(c, "m", FieldType::Training, geometry.clone()).is_err());

        p.set_training_mask(TrainingMask::new(4, 4).unwrap()).unwrap();
        let f = p.add_field(c, "m", FieldType::Training, geometry.clone()).unwrap();
        assert_eq!(p.mask().unwrap().field_for_value(3), Some(f.0));
        assert!(p.add_field(c, "dup", FieldType::Training, geometry).is_err());

        p.delete_field(f).unwrap();
        assert_eq!(p.mask().unwrap().field_for_value(3), None);
    }

    #[test]
    fn test_delete_class_releases_everything() {
        let mut p = ProjectContext::new(vec![0], StatisticsOptions::default()).unwrap();
        let c = p.add_class("a").unwrap();
        p.add_field(c, "f", FieldType::Training, rect(0, 0, 1, 1)).unwrap();
        p.delete_class(c).unwrap();
        assert!(p.class(c).is_err());
        assert_eq!(p.store().slots_in_use(), 0);
        assert!(p.class_ids().is_empty());
    }

    #[test]
    fn test_common_covariance_only_entry_point() {
        let mut p = ProjectContext::new(vec![0, 1], StatisticsOptions::default()).unwrap();
        let c = p.add_class("a").unwrap();
        let f = p.add_field(c, "f", FieldType::Training, rect(0, 0, 2, 2)).unwrap();
        let slots = p.store().slots_in_use();
        p.set_common_covariance(SymmetricMatrix::identity(2), 1);
        assert_eq!(p.store().common_covariance().unwrap().number_classes, 1);
        assert_eq!(p.store().slots_in_use(), slots);

        p.invalidate_field(f).unwrap();
        assert!(p.store().common_covariance().is_none());
    }

    #[test]
    fn test_class_weight_validation() {
        let mut p = ProjectContext::new(vec![0], StatisticsOptions::default()).unwrap();
        let c = p.add_class("a").unwrap();
        assert!(p.set_class_weight(c, -1.0).is_err());
        p.set_class_weight(c, 0.0).unwrap();
        assert_eq!(p.class(c).unwrap().weight(), 0.0);
    }
}
