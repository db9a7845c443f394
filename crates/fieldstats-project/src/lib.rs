//! Fieldstats Project - Training field and class statistics
//!
//! A [`ProjectContext`] owns the classes, their training fields, the
//! training mask and the pool of statistics slots. It keeps every field
//! and class marked stale or up to date and rebuilds exactly the stale
//! parts on [`ProjectContext::update_statistics`]:
//!
//! - Rectangle and polygon fields are scanned one at a time
//! - All mask fields are gathered in a single pass over the mask
//! - Field sums are folded into their class once
//!
//! Scans run inside a scoped session that re-zeroes everything it touched
//! if it is cancelled or the pixel reader fails.
//!
//! # Example
//!
//! ```
//! use fieldstats_core::{MultibandImage, Rect};
//! use fieldstats_project::{
//!     FieldGeometry, FieldType, NoProgress, ProjectContext, StatisticsOptions, UpdateScope,
//!     UpdateStatus,
//! };
//!
//! let mut image = MultibandImage::from_fn(8, 8, 3, |x, y, c| (x + y + c as u32) as f64).unwrap();
//! let mut project = ProjectContext::new(vec![0, 2], StatisticsOptions::default()).unwrap();
//! let water = project.add_class("water").unwrap();
//! let rect = FieldGeometry::Rectangle(Rect::new(1, 1, 3, 2).unwrap());
//! project.add_field(water, "lake", FieldType::Training, rect).unwrap();
//!
//! let status = project.update_statistics(UpdateScope::Project, &mut image, &mut NoProgress);
//! assert_eq!(status, UpdateStatus::Done);
//! assert_eq!(project.class(water).unwrap().statistics_pixels(), 6);
//! ```

pub mod class_stats;
pub mod error;
pub mod options;
pub mod project;
pub mod samples;
pub mod scan;
pub mod settings;
pub mod store;
pub mod tracker;
pub mod types;
pub mod update;

pub use class_stats::ChannelMinMax;
pub use error::{ProjectError, ProjectResult};
pub use options::StatisticsOptions;
pub use project::ProjectContext;
pub use samples::TrainingSamples;
pub use scan::{NoProgress, ProgressSink};
pub use store::{CommonCovariance, StatisticsStore};
pub use types::{
    ClassId, ClassRecord, CovarianceStatsToUse, EnhancedStatistics, FieldGeometry, FieldId,
    FieldRecord, FieldState, FieldType, MixingParameterCode,
};
pub use update::{UpdateScope, UpdateStatus};
