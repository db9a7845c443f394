//! Error types for fieldstats-core
//!
//! Provides a unified error type for all operations in the core crate.
//! Each variant captures enough context for diagnostics without exposing
//! internal implementation details.

use thiserror::Error;

/// Fieldstats core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid raster dimensions
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    /// Index out of bounds
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Matrix or vector size mismatch
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Pixel vector does not match the accumulator's channel count
    #[error("channel count mismatch: expected {expected} channels, got {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },

    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Requested statistics memory cannot be represented
    #[error("statistics memory request too large: {0}")]
    AllocationTooLarge(String),

    /// Pixel or mask reader failure
    #[error("read failed: {0}")]
    Read(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for fieldstats core operations
pub type Result<T> = std::result::Result<T, Error>;
