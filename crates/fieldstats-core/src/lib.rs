//! Fieldstats Core - Data structures for training-field statistics
//!
//! This crate provides the building blocks shared by the statistics
//! engine and the classifier trainers:
//!
//! - [`SymmetricMatrix`] / [`DenseMatrix`] - Packed covariance storage and
//!   its mirrored square form
//! - [`StatisticsSlot`] / [`ChannelStatistics`] - Running sums, extremes
//!   and cross-products for one field or class
//! - [`reset_zero_variances`] and friends - Degenerate matrix repair
//! - [`Rect`] / [`Polygon`] - Field geometry
//! - [`TrainingMask`] - Raster of field identifiers
//! - [`PixelReader`] / [`MultibandImage`] - Pixel row access
//! - [`PixelFilter`] - No-data and bad-data rejection

pub mod accumulator;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod image;
pub mod mask;
pub mod matrix;
pub mod repair;

pub use accumulator::{ChannelStatistics, StatisticsCode, StatisticsSlot};
pub use error::{Error, Result};
pub use filter::{BadDataPolicy, PixelFilter};
pub use geometry::{Polygon, Rect};
pub use image::{MultibandImage, PixelReader};
pub use mask::TrainingMask;
pub use matrix::{DenseMatrix, SymmetricMatrix, triangular_len};
pub use repair::{
    correlation_from_covariance, reset_for_all_variances_equal, reset_zero_variance_vector,
    reset_zero_variances, std_devs_from_covariance,
};
