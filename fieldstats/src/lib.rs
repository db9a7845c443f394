//! Fieldstats - Training-field statistics for multiband imagery
//!
//! Gathers per-field and per-class channel statistics from rectangle,
//! polygon and mask training fields, keeps them consistent as fields
//! change, and derives the matrices supervised classifiers are trained
//! on.
//!
//! # Overview
//!
//! - Core data structures: matrices, accumulators, geometry, masks
//! - [`project`] - Project context, consistency tracking and scans
//! - [`covariance`] - Class, common and leave-one-out covariance
//! - [`classify`] - Decision tree, SVM, k-NN and statistical classifier
//!   parameters
//!
//! # Example
//!
//! ```
//! use fieldstats::project::{
//!     FieldGeometry, FieldType, NoProgress, ProjectContext, StatisticsOptions, UpdateScope,
//! };
//! use fieldstats::{MultibandImage, Rect};
//!
//! let mut image = MultibandImage::from_fn(8, 8, 3, |x, y, c| (x + y) as f64 + c as f64).unwrap();
//! let mut project = ProjectContext::new(vec![0, 1, 2], StatisticsOptions::default()).unwrap();
//! let class = project.add_class("water").unwrap();
//! let rect = FieldGeometry::Rectangle(Rect::new(1, 1, 3, 2).unwrap());
//! project.add_field(class, "lake", FieldType::Training, rect).unwrap();
//! project
//!     .try_update_statistics(UpdateScope::Project, &mut image, &mut NoProgress)
//!     .unwrap();
//!
//! let cov = fieldstats::covariance::class_covariance_matrix(
//!     &mut project,
//!     class,
//!     &[0, 2],
//!     fieldstats::covariance::CovarianceOutput::Covariance,
//! )
//! .unwrap();
//! assert_eq!(cov.size(), 2);
//! ```

// Re-export core types (primary data structures used everywhere)
pub use fieldstats_core::*;

// Re-export domain crates as modules to avoid name conflicts
pub use fieldstats_classify as classify;
pub use fieldstats_covariance as covariance;
pub use fieldstats_project as project;
