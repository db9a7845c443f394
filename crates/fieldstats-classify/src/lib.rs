//! Fieldstats Classify - Classifier trainers on training statistics
//!
//! Sample-based trainers work on per-pixel channel vectors gathered with
//! [`ProjectContext::collect_training_samples`]:
//!
//! - [`DecisionTree`] - Binary tree split by Gini information gain
//! - [`train_svm`] - Sparse problem building for an external SVM solver
//! - [`train_knn`] - Neighbourhood size plus the stored samples
//!
//! Statistics-based classifiers only need matrices and vectors from the
//! covariance engine: see [`maximum_likelihood_parameters`],
//! [`correlation_parameters`], [`cem_parameters`] and
//! [`parallelepiped_parameters`].
//!
//! [`ProjectContext::collect_training_samples`]: fieldstats_project::ProjectContext::collect_training_samples

pub mod decision_tree;
pub mod error;
pub mod knn;
pub mod params;
pub mod svm;

pub use decision_tree::{DecisionTree, Split, TreeNode, find_best_split, gini, info_gain};
pub use error::{ClassifyError, ClassifyResult};
pub use knn::{DEFAULT_K, KnnModel, KnnParameters, train_knn};
pub use params::{
    CemParameters, CorrelationParameters, MaximumLikelihoodClass, ParallelepipedBox,
    ParallelepipedMode, angle_to_correlation, cem_parameters, correlation_parameters,
    correlation_to_angle, maximum_likelihood_parameters, parallelepiped_parameters,
};
pub use svm::{
    KernelType, SvmNode, SvmParameter, SvmProblem, SvmSolver, SvmType, label_class, train_svm,
};

/// Check a training set and return its channel count.
pub(crate) fn check_training_set(samples: &[Vec<f64>], label_count: usize) -> ClassifyResult<usize> {
    if samples.is_empty() {
        return Err(ClassifyError::EmptyTrainingSet);
    }
    if samples.len() != label_count {
        return Err(ClassifyError::LabelCountMismatch {
            samples: samples.len(),
            labels: label_count,
        });
    }
    let channels = samples[0].len();
    if channels == 0 {
        return Err(ClassifyError::InvalidParameter(
            "samples have no channels".to_string(),
        ));
    }
    if let Some(i) = samples.iter().position(|s| s.len() != channels) {
        return Err(ClassifyError::InvalidParameter(format!(
            "sample {} has {} channels, expected {}",
            i,
            samples[i].len(),
            channels
        )));
    }
    Ok(channels)
}
