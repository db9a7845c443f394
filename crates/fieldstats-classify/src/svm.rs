//! Support vector machine training glue
//!
//! Builds the sparse problem a libsvm-style solver expects from per-pixel
//! channel vectors and class labels, and hands it to an [`SvmSolver`]. The
//! quadratic optimisation itself lives behind that trait.

use fieldstats_project::{ClassId, TrainingSamples};
use tracing::info;

use crate::check_training_set;
use crate::error::{ClassifyError, ClassifyResult};

/// SVM formulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SvmType {
    /// C-support vector classification
    #[default]
    CSvc,
    /// nu-support vector classification
    NuSvc,
    /// Distribution estimation
    OneClass,
    /// epsilon-support vector regression
    EpsilonSvr,
    /// nu-support vector regression
    NuSvr,
}

/// Kernel function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelType {
    /// `u'v`
    Linear,
    /// `(gamma u'v + coef0)^degree`
    Polynomial,
    /// `exp(-gamma |u-v|^2)`
    #[default]
    Rbf,
    /// `tanh(gamma u'v + coef0)`
    Sigmoid,
    /// Kernel values supplied in the samples
    Precomputed,
}

/// SVM training parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SvmParameter {
    /// Formulation (default: C-SVC)
    pub svm_type: SvmType,
    /// Kernel (default: RBF)
    pub kernel_type: KernelType,
    /// Polynomial degree (default: 3)
    pub degree: i32,
    /// Kernel coefficient (default: 0.001)
    pub gamma: f64,
    /// Kernel offset (default: 0)
    pub coef0: f64,
    /// Kernel cache in MB (default: 100)
    pub cache_size: f64,
    /// Stopping tolerance (default: 0.1)
    pub eps: f64,
    /// Regularisation cost C (default: 10)
    pub cost: f64,
    /// nu for the nu formulations (default: 0.5)
    pub nu: f64,
    /// Insensitive-loss width for epsilon-SVR (default: 0.0001)
    pub p: f64,
    /// Use the shrinking heuristics (default: true)
    pub shrinking: bool,
    /// Train a probability model (default: false)
    pub probability: bool,
    /// Per-label cost multipliers (default: none)
    pub class_weights: Vec<(i32, f64)>,
}

impl Default for SvmParameter {
    fn default() -> Self {
        Self {
            svm_type: SvmType::CSvc,
            kernel_type: KernelType::Rbf,
            degree: 3,
            gamma: 0.001,
            coef0: 0.0,
            cache_size: 100.0,
            eps: 0.1,
            cost: 10.0,
            nu: 0.5,
            p: 0.0001,
            shrinking: true,
            probability: false,
            class_weights: Vec::new(),
        }
    }
}

impl SvmParameter {
    /// Create parameters with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the formulation
    pub fn with_svm_type(mut self, svm_type: SvmType) -> Self {
        self.svm_type = svm_type;
        self
    }

    /// Set the kernel
    pub fn with_kernel(mut self, kernel_type: KernelType) -> Self {
        self.kernel_type = kernel_type;
        self
    }

    /// Set the kernel coefficient
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the regularisation cost
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Set the polynomial degree
    pub fn with_degree(mut self, degree: i32) -> Self {
        self.degree = degree;
        self
    }

    /// Set nu
    pub fn with_nu(mut self, nu: f64) -> Self {
        self.nu = nu;
        self
    }

    /// Validate the parameters
    pub fn validate(&self) -> ClassifyResult<()> {
        let invalid = |msg: &str| Err(ClassifyError::InvalidParameter(msg.to_string()));
        if self.gamma < 0.0 {
            return invalid("gamma must be non-negative");
        }
        if self.kernel_type == KernelType::Polynomial && self.degree < 0 {
            return invalid("degree must be non-negative");
        }
        if self.cache_size <= 0.0 {
            return invalid("cache size must be positive");
        }
        if self.eps <= 0.0 {
            return invalid("eps must be positive");
        }
        if matches!(self.svm_type, SvmType::CSvc | SvmType::EpsilonSvr | SvmType::NuSvr)
            && self.cost <= 0.0
        {
            return invalid("cost must be positive");
        }
        if matches!(self.svm_type, SvmType::NuSvc | SvmType::OneClass | SvmType::NuSvr)
            && !(self.nu > 0.0 && self.nu <= 1.0)
        {
            return invalid("nu must be in (0, 1]");
        }
        if self.svm_type == SvmType::EpsilonSvr && self.p < 0.0 {
            return invalid("p must be non-negative");
        }
        Ok(())
    }
}

/// One feature of a sparse sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvmNode {
    /// One-based feature index, or [`SvmNode::TERMINATOR`]
    pub index: i32,
    /// Feature value
    pub value: f64,
}

impl SvmNode {
    /// Index marking the end of a sample
    pub const TERMINATOR: i32 = -1;

    /// Whether this node ends its sample.
    pub fn is_terminator(&self) -> bool {
        self.index == Self::TERMINATOR
    }
}

/// Training problem in sparse form
///
/// Every sample lists channel `j` as feature `j + 1` and ends with a
/// terminator node.
#[derive(Debug, Clone, PartialEq)]
pub struct SvmProblem {
    labels: Vec<f64>,
    rows: Vec<Vec<SvmNode>>,
}

impl SvmProblem {
    /// Build a problem from channel vectors and numeric labels.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty set, mismatched counts or ragged
    /// vectors.
    pub fn new(samples: &[Vec<f64>], labels: &[f64]) -> ClassifyResult<Self> {
        check_training_set(samples, labels.len())?;
        let rows = samples
            .iter()
            .map(|sample| {
                sample
                    .iter()
                    .enumerate()
                    .map(|(j, &value)| SvmNode {
                        index: j as i32 + 1,
                        value,
                    })
                    .chain(std::iter::once(SvmNode {
                        index: SvmNode::TERMINATOR,
                        value: 0.0,
                    }))
                    .collect()
            })
            .collect();
        Ok(Self {
            labels: labels.to_vec(),
            rows,
        })
    }

    /// Build a problem from samples collected from a project.
    ///
    /// A sample of class `c` gets the label `c.0`.
    pub fn from_training_samples(samples: &TrainingSamples) -> ClassifyResult<Self> {
        let labels: Vec<f64> = samples.labels.iter().map(|c| c.0 as f64).collect();
        Self::new(&samples.samples, &labels)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the problem has no samples.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sample labels.
    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// Sparse samples, each ending with a terminator.
    pub fn rows(&self) -> &[Vec<SvmNode>] {
        &self.rows
    }
}

/// Class a numeric label from [`SvmProblem::from_training_samples`]
/// stands for.
pub fn label_class(label: f64) -> Option<ClassId> {
    (label >= 0.0 && label.fract() == 0.0).then(|| ClassId(label as usize))
}

/// Quadratic optimiser behind [`train_svm`]
pub trait SvmSolver {
    /// Trained model
    type Model;

    /// Solve `problem` with `param`.
    fn train(&mut self, problem: &SvmProblem, param: &SvmParameter) -> Result<Self::Model, String>;
}

/// Train an SVM on samples collected from a project
///
/// # Errors
///
/// Returns an error for invalid parameters, an unusable training set, or
/// a solver failure.
pub fn train_svm<S: SvmSolver>(
    solver: &mut S,
    samples: &TrainingSamples,
    param: &SvmParameter,
) -> ClassifyResult<S::Model> {
    param.validate()?;
    let problem = SvmProblem::from_training_samples(samples)?;
    let model = solver.train(&problem, param).map_err(ClassifyError::Solver)?;
    info!(
        samples = problem.len(),
        svm_type = ?param.svm_type,
        kernel = ?param.kernel_type,
        "svm trained"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingSolver {
        seen: Option<SvmProblem>,
        fail: bool,
    }

    impl SvmSolver for RecordingSolver {
        type Model = usize;

        fn train(&mut self, problem: &SvmProblem, _param: &SvmParameter) -> Result<usize, String> {
            if self.fail {
                return Err("did not converge".to_string());
            }
            self.seen = Some(problem.clone());
            Ok(problem.len())
        }
    }

    fn samples() -> TrainingSamples {
        TrainingSamples {
            samples: vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
            labels: vec![ClassId(2), ClassId(0)],
        }
    }

    #[test]
    fn test_defaults() {
        let p = SvmParameter::default();
        assert_eq!(p.svm_type, SvmType::CSvc);
        assert_eq!(p.kernel_type, KernelType::Rbf);
        assert_eq!(p.gamma, 0.001);
        assert_eq!(p.cost, 10.0);
        assert!(p.shrinking && !p.probability);
        assert!(p.validate().is_ok());
        assert!(p.clone().with_cost(0.0).validate().is_err());
        assert!(p.with_svm_type(SvmType::NuSvc).with_nu(1.5).validate().is_err());
    }

    #[test]
    fn test_problem_layout() {
        let problem = SvmProblem::from_training_samples(&samples()).unwrap();
        assert_eq!(problem.labels(), &[2.0, 0.0]);
        let row = &problem.rows()[1];
        assert_eq!(row.len(), 4);
        assert_eq!(row[0], SvmNode { index: 1, value: 4.0 });
        assert_eq!(row[2], SvmNode { index: 3, value: 6.0 });
        assert!(row[3].is_terminator());
        assert_eq!(label_class(problem.labels()[0]), Some(ClassId(2)));
    }

    #[test]
    fn test_train_delegates() {
        let mut solver = RecordingSolver { seen: None, fail: false };
        let model = train_svm(&mut solver, &samples(), &SvmParameter::default()).unwrap();
        assert_eq!(model, 2);
        assert!(solver.seen.is_some());

        let mut failing = RecordingSolver { seen: None, fail: true };
        let result = train_svm(&mut failing, &samples(), &SvmParameter::default());
        assert!(matches!(result, Err(ClassifyError::Solver(_))));
    }
}
