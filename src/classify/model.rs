//! Pluggable model classification strategy
//!
//! Defines the [`ModelClassifier`] trait for statistical or model-backed
//! field classification. An implementation may delegate to an out-of-process
//! inference service; the pipeline bounds every call with a timeout and
//! falls back to the fail-safe classification on expiry, so a slow model
//! can never leave a request pending.

use crate::classify::SensitivityLevel;
use async_trait::async_trait;
use serde_json::Value;

/// A model's prediction for one field
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPrediction {
    /// Predicted data category
    pub category: String,
    /// Predicted sensitivity tier
    pub sensitivity: SensitivityLevel,
    /// Confidence score (0.0 to 1.0)
    pub confidence: f64,
}

/// Pluggable model classification interface.
///
/// Implementations can use embeddings, an inference service, or any other
/// technique to predict the category of a field no rule covers. Rule-based
/// and model-based classification are interchangeable implementations of the
/// same capability; the pipeline selects between them by configuration.
#[async_trait]
pub trait ModelClassifier: Send + Sync {
    /// Predict a category for a field, or an error message on failure.
    async fn classify_field(
        &self,
        field_name: &str,
        value: &Value,
    ) -> Result<ModelPrediction, String>;

    /// Human-readable name for this model (used in logs).
    fn name(&self) -> &str;
}

/// Default model used when no inference backend is configured.
///
/// Always reports zero confidence, which routes every field the rule table
/// does not cover through the fail-safe `highly_sensitive` path.
pub struct NullModel;

#[async_trait]
impl ModelClassifier for NullModel {
    async fn classify_field(
        &self,
        _field_name: &str,
        _value: &Value,
    ) -> Result<ModelPrediction, String> {
        Ok(ModelPrediction {
            category: "unclassified".to_string(),
            sensitivity: SensitivityLevel::HighlySensitive,
            confidence: 0.0,
        })
    }

    fn name(&self) -> &str {
        "null"
    }
}
