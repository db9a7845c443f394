//! Error types for fieldstats-project

use thiserror::Error;

use crate::types::{ClassId, FieldId};

/// Errors that can occur while maintaining project statistics
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Core library error, including pixel reader failures
    #[error("core error: {0}")]
    Core(#[from] fieldstats_core::Error),

    /// Class index does not name a live class
    #[error("unknown class: {0}")]
    UnknownClass(ClassId),

    /// Field index does not name a live field
    #[error("unknown field: {0}")]
    UnknownField(FieldId),

    /// Invalid parameter provided
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The update was cancelled through the progress sink
    #[error("statistics update cancelled")]
    Cancelled,

    /// A class has no training fields to derive statistics from
    #[error("class {0} has no training fields")]
    NoTrainingFields(ClassId),

    /// A class is up to date but none of its pixels were usable
    #[error("class {0} has no usable training pixels")]
    NoPixels(ClassId),

    /// Statistics requested before they were brought up to date
    #[error("statistics not up to date for {0}")]
    NotUpToDate(String),
}

/// Result type for project operations
pub type ProjectResult<T> = Result<T, ProjectError>;
