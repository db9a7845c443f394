//! Error types for fieldstats-covariance

use thiserror::Error;

/// Errors that can occur while deriving covariance matrices
#[derive(Debug, Error)]
pub enum CovarianceError {
    /// Project error, including statistics that are not up to date
    #[error("project error: {0}")]
    Project(#[from] fieldstats_project::ProjectError),

    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] fieldstats_core::Error),

    /// Leave-one-out mixing with a computed optimum that was never supplied
    #[error("leave-one-out mixing value has not been computed")]
    MixingValueNotComputed,

    /// The requested statistics are not available
    #[error("statistics not available: {0}")]
    NoStatistics(String),
}

/// Result type for covariance operations
pub type CovarianceResult<T> = Result<T, CovarianceError>;
