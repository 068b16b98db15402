//! Field classifier driving the rule-table and model strategies

use crate::classify::{
    Classification, ClassificationSource, ModelClassifier, RuleTable, SensitivityLevel,
};
use crate::config::ClassifierConfig;
use crate::error::Result;
use crate::record::{DataRecord, RecordNote};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// A classified field, mirroring the nesting of the input value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedField {
    /// Field name
    pub name: String,
    /// Raw value (leaves hold the value to be transformed)
    pub value: Value,
    /// Classification of this node; composites carry the maximum
    /// sensitivity of their descendants
    pub classification: Classification,
    /// Child fields for nested object values, empty for leaves
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ClassifiedField>,
}

impl ClassifiedField {
    /// True when this field has no nested children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A fully classified record: every surviving field carries a classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    /// Classified fields, in input order (duplicates already resolved)
    pub fields: Vec<ClassifiedField>,
    /// Record-level observations (duplicate field names)
    pub notes: Vec<RecordNote>,
}

/// Field classifier.
///
/// Consults the rule table first; fields with no matching rule go to the
/// model strategy, bounded by the configured timeout. Every field is always
/// assigned a classification; there is no error path out of this stage.
pub struct FieldClassifier {
    rules: RuleTable,
    model: Arc<dyn ModelClassifier>,
    confidence_threshold: f64,
    model_timeout: Duration,
    fallback_category: String,
}

impl FieldClassifier {
    /// Create a classifier from configuration and a model strategy
    pub fn new(config: &ClassifierConfig, model: Arc<dyn ModelClassifier>) -> Result<Self> {
        Ok(Self {
            rules: RuleTable::new(&config.rules)?,
            model,
            confidence_threshold: config.confidence_threshold,
            model_timeout: Duration::from_millis(config.model_timeout_ms),
            fallback_category: config.fallback_category.clone(),
        })
    }

    /// Classify every field of a record.
    ///
    /// Duplicate field names resolve to the last occurrence, with a note for
    /// each superseded occurrence. Nested objects classify recursively.
    pub async fn classify(&self, record: &DataRecord) -> ClassifiedRecord {
        let (kept, notes) = record.deduped_fields();

        let mut fields = Vec::with_capacity(kept.len());
        for field in kept {
            fields.push(self.classify_value(&field.name, &field.value).await);
        }

        ClassifiedRecord { fields, notes }
    }

    fn classify_value<'a>(
        &'a self,
        name: &'a str,
        value: &'a Value,
    ) -> BoxFuture<'a, ClassifiedField> {
        async move {
            match value {
                Value::Object(map) if !map.is_empty() => {
                    let mut children = Vec::with_capacity(map.len());
                    for (child_name, child_value) in map {
                        children.push(self.classify_value(child_name, child_value).await);
                    }
                    let classification = self.composite_classification(name, &children);
                    ClassifiedField {
                        name: name.to_string(),
                        value: value.clone(),
                        classification,
                        children,
                    }
                }
                _ => ClassifiedField {
                    name: name.to_string(),
                    value: value.clone(),
                    classification: self.classify_leaf(name, value).await,
                    children: Vec::new(),
                },
            }
        }
        .boxed()
    }

    async fn classify_leaf(&self, name: &str, value: &Value) -> Classification {
        if let Some(hit) = self.rules.lookup(name) {
            return Classification {
                category: hit.category.to_string(),
                sensitivity: hit.sensitivity,
                confidence: 1.0,
                needs_review: false,
                source: ClassificationSource::Rules,
            };
        }

        match tokio::time::timeout(self.model_timeout, self.model.classify_field(name, value))
            .await
        {
            Ok(Ok(prediction)) if prediction.confidence >= self.confidence_threshold => {
                Classification {
                    category: prediction.category,
                    sensitivity: prediction.sensitivity,
                    confidence: prediction.confidence,
                    needs_review: false,
                    source: ClassificationSource::Model,
                }
            }
            Ok(Ok(prediction)) => {
                tracing::debug!(
                    field = name,
                    confidence = prediction.confidence,
                    threshold = self.confidence_threshold,
                    "model confidence below threshold, applying fail-safe classification"
                );
                self.fallback()
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    field = name,
                    model = self.model.name(),
                    error = %err,
                    "model classification failed, applying fail-safe classification"
                );
                self.fallback()
            }
            Err(_) => {
                tracing::warn!(
                    field = name,
                    model = self.model.name(),
                    timeout_ms = self.model_timeout.as_millis() as u64,
                    "model classification timed out, applying fail-safe classification"
                );
                self.fallback()
            }
        }
    }

    /// A composite inherits the maximum sensitivity of its descendants for
    /// coarse-grained rule matching. Its category comes from a rule on its
    /// own name when one matches, otherwise from its highest-sensitivity
    /// descendant.
    fn composite_classification(
        &self,
        name: &str,
        children: &[ClassifiedField],
    ) -> Classification {
        let max_child = children
            .iter()
            .map(|c| c.classification.sensitivity)
            .max()
            .unwrap_or(SensitivityLevel::Internal);
        let needs_review = children.iter().any(|c| c.classification.needs_review);
        let confidence = children
            .iter()
            .map(|c| c.classification.confidence)
            .fold(1.0_f64, f64::min);

        if let Some(hit) = self.rules.lookup(name) {
            return Classification {
                category: hit.category.to_string(),
                sensitivity: hit.sensitivity.max(max_child),
                confidence,
                needs_review,
                source: ClassificationSource::Rules,
            };
        }

        let top = children
            .iter()
            .max_by_key(|c| c.classification.sensitivity)
            .map(|c| &c.classification);
        match top {
            Some(classification) => Classification {
                category: classification.category.clone(),
                sensitivity: max_child,
                confidence,
                needs_review,
                source: classification.source,
            },
            None => self.fallback(),
        }
    }

    /// Least-trust default when neither strategy produced a usable answer
    fn fallback(&self) -> Classification {
        Classification {
            category: self.fallback_category.clone(),
            sensitivity: SensitivityLevel::HighlySensitive,
            confidence: 0.0,
            needs_review: true,
            source: ClassificationSource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ModelPrediction, NullModel};
    use async_trait::async_trait;
    use serde_json::json;

    fn classifier() -> FieldClassifier {
        FieldClassifier::new(&ClassifierConfig::default(), Arc::new(NullModel)).unwrap()
    }

    fn classifier_with_model(model: Arc<dyn ModelClassifier>) -> FieldClassifier {
        FieldClassifier::new(&ClassifierConfig::default(), model).unwrap()
    }

    /// Mock model that returns a canned prediction
    struct CannedModel {
        prediction: ModelPrediction,
    }

    #[async_trait]
    impl ModelClassifier for CannedModel {
        async fn classify_field(
            &self,
            _field_name: &str,
            _value: &Value,
        ) -> std::result::Result<ModelPrediction, String> {
            Ok(self.prediction.clone())
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    /// Mock model that never answers within any reasonable timeout
    struct StalledModel;

    #[async_trait]
    impl ModelClassifier for StalledModel {
        async fn classify_field(
            &self,
            _field_name: &str,
            _value: &Value,
        ) -> std::result::Result<ModelPrediction, String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err("unreachable".to_string())
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    /// Mock model that always errors
    struct FailingModel;

    #[async_trait]
    impl ModelClassifier for FailingModel {
        async fn classify_field(
            &self,
            _field_name: &str,
            _value: &Value,
        ) -> std::result::Result<ModelPrediction, String> {
            Err("inference service unavailable".to_string())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_rule_match_wins_over_model() {
        let record = DataRecord::from_fields(vec![("email".to_string(), json!("a@b.com"))]);
        let classified = classifier().classify(&record).await;

        let field = &classified.fields[0];
        assert_eq!(field.classification.category, "contact_info");
        assert_eq!(field.classification.source, ClassificationSource::Rules);
        assert_eq!(field.classification.confidence, 1.0);
        assert!(!field.classification.needs_review);
    }

    #[tokio::test]
    async fn test_every_field_is_classified() {
        let record = DataRecord::from_json(
            r#"{"email": "a@b.com", "mystery": 42, "gps": "40.7,-74.0"}"#,
        )
        .unwrap();
        let classified = classifier().classify(&record).await;
        assert_eq!(classified.fields.len(), 3);
    }

    #[tokio::test]
    async fn test_unmatched_field_falls_back_highly_sensitive() {
        let record = DataRecord::from_fields(vec![("mystery".to_string(), json!("?"))]);
        let classified = classifier().classify(&record).await;

        let field = &classified.fields[0];
        assert_eq!(
            field.classification.sensitivity,
            SensitivityLevel::HighlySensitive
        );
        assert!(field.classification.needs_review);
        assert_eq!(field.classification.source, ClassificationSource::Fallback);
    }

    #[tokio::test]
    async fn test_confident_model_prediction_is_used() {
        let model = Arc::new(CannedModel {
            prediction: ModelPrediction {
                category: "usage_data".to_string(),
                sensitivity: SensitivityLevel::Internal,
                confidence: 0.93,
            },
        });
        let record = DataRecord::from_fields(vec![("mystery".to_string(), json!("?"))]);
        let classified = classifier_with_model(model).classify(&record).await;

        let field = &classified.fields[0];
        assert_eq!(field.classification.category, "usage_data");
        assert_eq!(field.classification.source, ClassificationSource::Model);
        assert!(!field.classification.needs_review);
    }

    #[tokio::test]
    async fn test_low_confidence_prediction_falls_back() {
        let model = Arc::new(CannedModel {
            prediction: ModelPrediction {
                category: "usage_data".to_string(),
                sensitivity: SensitivityLevel::Public,
                confidence: 0.2,
            },
        });
        let record = DataRecord::from_fields(vec![("mystery".to_string(), json!("?"))]);
        let classified = classifier_with_model(model).classify(&record).await;

        let field = &classified.fields[0];
        assert_eq!(
            field.classification.sensitivity,
            SensitivityLevel::HighlySensitive
        );
        assert!(field.classification.needs_review);
    }

    #[tokio::test]
    async fn test_stalled_model_times_out_to_fallback() {
        let config = ClassifierConfig {
            model_timeout_ms: 20,
            ..ClassifierConfig::default()
        };
        let classifier = FieldClassifier::new(&config, Arc::new(StalledModel)).unwrap();
        let record = DataRecord::from_fields(vec![("mystery".to_string(), json!("?"))]);

        let classified = classifier.classify(&record).await;
        let field = &classified.fields[0];
        assert_eq!(field.classification.source, ClassificationSource::Fallback);
        assert!(field.classification.needs_review);
    }

    #[tokio::test]
    async fn test_failing_model_falls_back() {
        let record = DataRecord::from_fields(vec![("mystery".to_string(), json!("?"))]);
        let classified = classifier_with_model(Arc::new(FailingModel))
            .classify(&record)
            .await;
        assert_eq!(
            classified.fields[0].classification.source,
            ClassificationSource::Fallback
        );
    }

    #[tokio::test]
    async fn test_composite_inherits_max_descendant_sensitivity() {
        let record = DataRecord::from_fields(vec![(
            "profile".to_string(),
            json!({"email": "a@b.com", "diagnosis": "flu"}),
        )]);
        let classified = classifier().classify(&record).await;

        let field = &classified.fields[0];
        assert!(!field.is_leaf());
        assert_eq!(
            field.classification.sensitivity,
            SensitivityLevel::HighlySensitive
        );
        assert_eq!(field.classification.category, "health_info");
    }

    #[tokio::test]
    async fn test_composite_with_own_rule_keeps_rule_category() {
        let record = DataRecord::from_fields(vec![(
            "address".to_string(),
            json!({"diagnosis": "flu"}),
        )]);
        let classified = classifier().classify(&record).await;

        let field = &classified.fields[0];
        assert_eq!(field.classification.category, "contact_info");
        // still inherits the stronger descendant sensitivity
        assert_eq!(
            field.classification.sensitivity,
            SensitivityLevel::HighlySensitive
        );
    }

    #[test]
    fn test_duplicate_fields_noted() {
        let record = DataRecord::from_json(r#"{"email": "a@b.com", "email": "c@d.com"}"#).unwrap();
        let classified = tokio_test::block_on(classifier().classify(&record));

        assert_eq!(classified.fields.len(), 1);
        assert_eq!(classified.fields[0].value, json!("c@d.com"));
        assert_eq!(classified.notes.len(), 1);
    }
}
