//! Project records: fields, classes and their statistics settings

use std::fmt;

use fieldstats_core::{Polygon, Rect, SymmetricMatrix};

/// Index of a field within a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub usize);

/// Index of a class within a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub usize);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field #{}", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class #{}", self.0)
    }
}

/// What a field's pixels are used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldType {
    /// Contributes to class statistics
    #[default]
    Training,
    /// Held out for accuracy assessment
    Test,
    /// Produced by clustering
    Cluster,
}

/// How a field's pixels are selected
#[derive(Debug, Clone, PartialEq)]
pub enum FieldGeometry {
    /// All pixels of a rectangle
    Rectangle(Rect),
    /// Pixels whose centres lie inside a polygon
    Polygon(Polygon),
    /// Pixels of the project training mask carrying this value
    Mask {
        /// Nonzero mask value
        value: u16,
    },
}

impl FieldGeometry {
    /// Whether the field is read by the mask pass rather than the area scan.
    #[inline]
    pub fn is_mask(&self) -> bool {
        matches!(self, Self::Mask { .. })
    }
}

/// Statistics state of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldState {
    /// Accumulators do not reflect the field's pixels
    #[default]
    Dirty,
    /// A scan into the field's accumulators is in progress
    Scanning,
    /// Accumulators reflect exactly the field's current pixels
    Clean,
}

/// Which covariance statistics a class feeds to the classifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CovarianceStatsToUse {
    /// Statistics computed from the training pixels
    #[default]
    Original,
    /// Externally enhanced statistics
    Enhanced,
    /// Class covariance mixed with the common covariance
    LeaveOneOut,
    /// Classes use different settings (project level only)
    Mixed,
}

/// How the leave-one-out mixing value is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixingParameterCode {
    /// Use the optimum value computed by the estimator
    #[default]
    ComputedOptimum,
    /// Use a value set by the user
    UserSet,
    /// Use the diagonal of the class covariance
    IdentityMatrix,
}

/// Enhanced class statistics supplied from outside the scanner
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedStatistics {
    /// One mean per project channel
    pub means: Vec<f64>,
    /// Covariance over all project channels
    pub covariance: SymmetricMatrix,
}

/// A training, test or cluster field.
#[derive(Debug, Clone)]
pub struct FieldRecord {
    pub(crate) name: String,
    pub(crate) field_type: FieldType,
    pub(crate) geometry: FieldGeometry,
    pub(crate) class: ClassId,
    /// Own statistics slot; `None` when class statistics only are kept
    pub(crate) stats_slot: Option<usize>,
    pub(crate) pixels_used: u64,
    pub(crate) state: FieldState,
    pub(crate) loaded_into_class: bool,
}

impl FieldRecord {
    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Field geometry.
    pub fn geometry(&self) -> &FieldGeometry {
        &self.geometry
    }

    /// Owning class.
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Pixels that passed filtering in the last completed scan.
    pub fn pixels_used(&self) -> u64 {
        self.pixels_used
    }

    /// Statistics state.
    pub fn state(&self) -> FieldState {
        self.state
    }

    /// Whether the field's statistics are current.
    pub fn stats_up_to_date(&self) -> bool {
        self.state == FieldState::Clean
    }

    /// Whether the field has been folded into its class statistics.
    pub fn loaded_into_class(&self) -> bool {
        self.loaded_into_class
    }

    /// Whether the field contributes to class statistics.
    pub fn is_training(&self) -> bool {
        self.field_type == FieldType::Training
    }
}

/// A class and its ordered list of member fields.
#[derive(Debug, Clone)]
pub struct ClassRecord {
    pub(crate) name: String,
    pub(crate) fields: Vec<FieldId>,
    pub(crate) stats_slot: usize,
    pub(crate) statistics_pixels: u64,
    pub(crate) stats_up_to_date: bool,
    pub(crate) covariance_stats_to_use: CovarianceStatsToUse,
    pub(crate) mixing_parameter_code: MixingParameterCode,
    pub(crate) loo_covariance_value: Option<f64>,
    pub(crate) user_mixing_value: f64,
    pub(crate) enhanced: Option<EnhancedStatistics>,
    pub(crate) weight: f64,
    pub(crate) list_message: bool,
}

impl ClassRecord {
    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member fields in creation order.
    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    /// Pixels folded into the class statistics.
    pub fn statistics_pixels(&self) -> u64 {
        self.statistics_pixels
    }

    /// Whether every training field is current and folded in once.
    pub fn stats_up_to_date(&self) -> bool {
        self.stats_up_to_date
    }

    /// Requested covariance statistics.
    pub fn covariance_stats_to_use(&self) -> CovarianceStatsToUse {
        self.covariance_stats_to_use
    }

    /// Leave-one-out mixing code.
    pub fn mixing_parameter_code(&self) -> MixingParameterCode {
        self.mixing_parameter_code
    }

    /// Computed optimum mixing value, once an estimator has set it.
    pub fn loo_covariance_value(&self) -> Option<f64> {
        self.loo_covariance_value
    }

    /// User-set mixing value.
    pub fn user_mixing_value(&self) -> f64 {
        self.user_mixing_value
    }

    /// Enhanced statistics, if set.
    pub fn enhanced(&self) -> Option<&EnhancedStatistics> {
        self.enhanced.as_ref()
    }

    /// Prior weight used for common covariance.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Whether a degenerate-matrix message may still be listed for this
    /// class.
    pub fn list_message(&self) -> bool {
        self.list_message
    }
}
