//! Fieldstats Covariance - Covariance engine for training statistics
//!
//! Turns up-to-date class statistics into the matrices classifiers use:
//!
//! - [`class_covariance_matrix`] - Class covariance or variances over a
//!   channel subset, following the class's covariance setting
//! - [`transformed_class_covariance`] - Covariance in a transformed
//!   feature space, repaired after the transform
//! - [`class_correlation_matrix`] - Correlation from covariance
//! - [`common_covariance`] / [`project_common_covariance`] - Weighted mean
//!   of class covariances
//! - [`loo_covariance`] - Leave-one-out mixing of class and common
//!   covariance
//!
//! Degenerate matrices (a zero variance, or every entry equal) are
//! repaired on the way out and reported per class through `tracing`.

pub mod class_covariance;
pub mod common;
pub mod error;
pub mod loo;

pub use class_covariance::{
    CovarianceOutput, check_matrix, class_correlation_matrix, class_covariance_matrix,
    transformed_class_covariance,
};
pub use common::{common_covariance, project_common_covariance};
pub use error::{CovarianceError, CovarianceResult};
pub use loo::{MAX_MIXING_VALUE, loo_covariance, mixing_value, needs_common_covariance};
