//! Consistency tracker
//!
//! Per field: `Dirty -> Scanning -> Clean`, and any edit forces `Dirty`.
//! Per class: up to date only when it has training fields and every one
//! of them has been folded into the class statistics exactly once. The
//! project flag is the conjunction of the class flags.
//!
//! A class that goes stale is rebuilt from zero on the next update; sums
//! are never patched by subtracting a field back out.

use crate::error::ProjectResult;
use crate::project::ProjectContext;
use crate::types::{ClassId, FieldId, FieldState};

impl ProjectContext {
    /// Mark a field dirty, and with it its class and the project.
    pub fn invalidate_field(&mut self, id: FieldId) -> ProjectResult<()> {
        let field = self.field_mut(id)?;
        field.state = FieldState::Dirty;
        field.loaded_into_class = false;
        let class = field.class;
        self.invalidate_class(class)
    }

    /// Mark a class and the project stale.
    pub fn invalidate_class(&mut self, id: ClassId) -> ProjectResult<()> {
        self.class_mut(id)?.stats_up_to_date = false;
        self.stats_up_to_date = false;
        self.store.clear_common_covariance();
        Ok(())
    }

    /// Zero a stale class's statistics so it is rebuilt from scratch.
    ///
    /// Every member field is marked as not folded in. When only class
    /// statistics are kept the fields hold nothing of their own, so they
    /// are reset too.
    pub(crate) fn reset_class_statistics(&mut self, id: ClassId) -> ProjectResult<()> {
        let class_only = self.options.keep_class_stats_only;
        let (slot, fields) = {
            let class = self.class_mut(id)?;
            class.statistics_pixels = 0;
            class.stats_up_to_date = false;
            (class.stats_slot, class.fields.clone())
        };
        self.store.slot_mut(slot)?.zero();
        for f in fields {
            let field = self.field_mut(f)?;
            field.loaded_into_class = false;
            if class_only {
                field.pixels_used = 0;
                field.state = FieldState::Dirty;
            }
        }
        Ok(())
    }

    /// Zero the statistics of a field that is not up to date.
    pub(crate) fn clear_field_statistics(&mut self, id: FieldId) -> ProjectResult<()> {
        let field = self.field_mut(id)?;
        if field.state == FieldState::Clean {
            return Ok(());
        }
        field.pixels_used = 0;
        field.loaded_into_class = false;
        if let Some(slot) = field.stats_slot {
            self.store.slot_mut(slot)?.zero();
        }
        Ok(())
    }

    /// Fold a current field's own statistics into its class, once.
    ///
    /// Does nothing for fields that are stale, already folded in, or have
    /// no slot of their own.
    pub(crate) fn fold_field_into_class(&mut self, id: FieldId) -> ProjectResult<()> {
        let field = self.field(id)?;
        if field.loaded_into_class || field.state != FieldState::Clean || !field.is_training() {
            return Ok(());
        }
        let Some(slot) = field.stats_slot else {
            return Ok(());
        };
        let (class, pixels) = (field.class, field.pixels_used);
        let class_slot = self.class(class)?.stats_slot;
        let initialize = self.class(class)?.statistics_pixels == 0;
        self.store.combine(class_slot, slot, initialize)?;
        self.class_mut(class)?.statistics_pixels += pixels;
        self.field_mut(id)?.loaded_into_class = true;
        Ok(())
    }

    /// Fold current, not yet loaded training fields into the class and
    /// settle the class flag.
    ///
    /// Returns whether the class is up to date.
    pub(crate) fn finish_class_update(&mut self, id: ClassId) -> ProjectResult<bool> {
        let class_only = self.options.keep_class_stats_only;
        let class_slot = self.class(id)?.stats_slot;
        let training = self.training_fields(id)?;

        if !class_only {
            for &f in &training {
                self.fold_field_into_class(f)?;
            }
        }

        let all_loaded = !training.is_empty()
            && training
                .iter()
                .all(|&f| self.field(f).map(|r| r.loaded_into_class).unwrap_or(false));
        let pixels = self.class(id)?.statistics_pixels;
        if all_loaded {
            self.store.slot_mut(class_slot)?.derive_mean_std_dev(pixels);
        }
        self.class_mut(id)?.stats_up_to_date = all_loaded;
        Ok(all_loaded)
    }

    /// Recompute the project flag from the class flags.
    pub(crate) fn refresh_project_flag(&mut self) {
        let classes: Vec<_> = self.classes.iter().flatten().collect();
        self.stats_up_to_date =
            !classes.is_empty() && classes.iter().all(|c| c.stats_up_to_date);
    }
}

#[cfg(test)]
mod tests {
    use crate::options::StatisticsOptions;
    use crate::project::ProjectContext;
    use crate::types::{FieldGeometry, FieldState, FieldType};
    use fieldstats_core::Rect;

    #[test]
    fn test_edit_invalidates_upwards() {
        let mut p = ProjectContext::new(vec![0], StatisticsOptions::default()).unwrap();
        let c = p.add_class("a").unwrap();
        let geometry = FieldGeometry::Rectangle(Rect::new(0, 0, 1, 1).unwrap());
        let f = p.add_field(c, "f", FieldType::Training, geometry).unwrap();

        p.field_mut(f).unwrap().state = FieldState::Clean;
        p.field_mut(f).unwrap().loaded_into_class = true;
        p.class_mut(c).unwrap().stats_up_to_date = true;
        p.stats_up_to_date = true;

        p.set_field_type(f, FieldType::Training).unwrap();
        assert_eq!(p.field(f).unwrap().state(), FieldState::Dirty);
        assert!(!p.field(f).unwrap().loaded_into_class());
        assert!(!p.class(c).unwrap().stats_up_to_date());
        assert!(!p.is_project_statistics_up_to_date());
    }

    #[test]
    fn test_empty_class_is_never_up_to_date() {
        let mut p = ProjectContext::new(vec![0], StatisticsOptions::default()).unwrap();
        let c = p.add_class("empty").unwrap();
        assert!(!p.finish_class_update(c).unwrap());
        p.refresh_project_flag();
        assert!(!p.is_project_statistics_up_to_date());
    }
}
