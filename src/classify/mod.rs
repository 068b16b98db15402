//! Field classification
//!
//! Labels every field of a record with a data category and sensitivity
//! level before any policy decision is made. Two composable strategies,
//! consulted in order:
//! - Deterministic rule table keyed by field-name pattern
//! - Pluggable statistical/model classifier for fields no rule covers
//!
//! Low model confidence, model errors, and model timeouts all take the same
//! fail-safe path: the field is classified `highly_sensitive` and flagged
//! for manual review.

pub mod classifier;
pub mod model;
pub mod rules;

pub use classifier::{ClassifiedField, ClassifiedRecord, FieldClassifier};
pub use model::{ModelClassifier, ModelPrediction, NullModel};
pub use rules::RuleTable;

use serde::{Deserialize, Serialize};

/// Ordinal risk tier assigned to a category
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityLevel {
    /// Safe to expose anywhere
    Public,
    /// Internal operational data
    #[default]
    Internal,
    /// Personal data requiring restriction
    Sensitive,
    /// Personal data requiring the strongest restriction
    HighlySensitive,
}

impl std::fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Internal => write!(f, "internal"),
            Self::Sensitive => write!(f, "sensitive"),
            Self::HighlySensitive => write!(f, "highly_sensitive"),
        }
    }
}

/// Which strategy produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// Matched a field-name rule
    Rules,
    /// Model prediction above the confidence threshold
    Model,
    /// Fail-safe default (no rule, and the model was unavailable,
    /// timed out, or reported low confidence)
    Fallback,
}

/// Classification assigned to a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Semantic data category (e.g. `contact_info`, `health_info`)
    pub category: String,
    /// Sensitivity tier of the field
    pub sensitivity: SensitivityLevel,
    /// Confidence in the assignment (rules are 1.0)
    pub confidence: f64,
    /// Set by the fail-safe path; the field should be reviewed manually
    pub needs_review: bool,
    /// Which strategy produced this classification
    pub source: ClassificationSource,
}
