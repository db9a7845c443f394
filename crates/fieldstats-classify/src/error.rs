//! Error types for fieldstats-classify

use thiserror::Error;

/// Errors that can occur while training classifiers
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Covariance engine error
    #[error("covariance error: {0}")]
    Covariance(#[from] fieldstats_covariance::CovarianceError),

    /// Project error
    #[error("project error: {0}")]
    Project(#[from] fieldstats_project::ProjectError),

    /// Invalid parameter provided
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No samples to train on
    #[error("training set is empty")]
    EmptyTrainingSet,

    /// Samples and labels differ in number
    #[error("label count mismatch: {samples} samples, {labels} labels")]
    LabelCountMismatch { samples: usize, labels: usize },

    /// The external SVM solver failed
    #[error("solver failed: {0}")]
    Solver(String),
}

/// Result type for classifier training
pub type ClassifyResult<T> = Result<T, ClassifyError>;
