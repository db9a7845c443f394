//! k-nearest-neighbour parameters
//!
//! Training a k-NN classifier stores nothing but the neighbourhood size
//! and the training samples themselves.

use fieldstats_project::TrainingSamples;

use crate::check_training_set;
use crate::error::{ClassifyError, ClassifyResult};

/// Default neighbourhood size
pub const DEFAULT_K: usize = 5;

/// k-NN options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnnParameters {
    /// Neighbourhood size (default: 5)
    pub k: usize,
}

impl Default for KnnParameters {
    fn default() -> Self {
        Self { k: DEFAULT_K }
    }
}

impl KnnParameters {
    /// Create parameters with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the neighbourhood size
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Validate the parameters
    pub fn validate(&self) -> ClassifyResult<()> {
        if self.k == 0 {
            return Err(ClassifyError::InvalidParameter(
                "k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Training samples kept for neighbour search
#[derive(Debug, Clone, PartialEq)]
pub struct KnnModel {
    /// Neighbourhood size
    pub parameters: KnnParameters,
    /// Reference samples and their classes
    pub samples: TrainingSamples,
}

/// "Train" k-NN: validate and keep the samples.
///
/// # Errors
///
/// Returns an error for `k == 0` or an unusable training set. A `k` larger
/// than the sample count is accepted; the search then uses every sample.
pub fn train_knn(samples: TrainingSamples, parameters: KnnParameters) -> ClassifyResult<KnnModel> {
    parameters.validate()?;
    check_training_set(&samples.samples, samples.labels.len())?;
    Ok(KnnModel {
        parameters,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldstats_project::ClassId;

    #[test]
    fn test_default_k() {
        assert_eq!(KnnParameters::default().k, 5);
        assert!(KnnParameters::new().with_k(0).validate().is_err());
    }

    #[test]
    fn test_train_keeps_samples() {
        let samples = TrainingSamples {
            samples: vec![vec![1.0], vec![2.0]],
            labels: vec![ClassId(0), ClassId(1)],
        };
        let model = train_knn(samples.clone(), KnnParameters::default()).unwrap();
        assert_eq!(model.samples, samples);
        assert!(train_knn(TrainingSamples::default(), KnnParameters::default()).is_err());
    }
}
