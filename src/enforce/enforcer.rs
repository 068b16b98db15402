//! Privacy enforcer orchestrating the pipeline stages

use crate::classify::{
    ClassifiedField, FieldClassifier, ModelClassifier, NullModel, SensitivityLevel,
};
use crate::config::EnforcerConfig;
use crate::enforce::{
    AuditEntry, AuditTrail, FieldOutput, FieldStatus, ProcessedField, ProcessedRecord,
};
use crate::error::Result;
use crate::obfuscate::{ObfuscationEngine, TechniqueKind};
use crate::policy::{Consent, Decision, Policy, PolicyEvaluator, VerdictReason};
use crate::record::{DataRecord, RecordNote};
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Lifecycle of one enforcement request. `Error` is reachable from any
/// state and leads to a fail-closed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestState {
    Received,
    Classified,
    Evaluated,
    Obfuscated,
    Finalized,
    Error,
}

/// End-to-end privacy enforcer.
///
/// Stateless across requests: the only state it holds is the read-only
/// configuration snapshot it was built from, so any number of records may
/// be processed concurrently on one instance.
pub struct PrivacyEnforcer {
    classifier: FieldClassifier,
    evaluator: PolicyEvaluator,
    obfuscator: ObfuscationEngine,
    fallback_category: String,
}

impl PrivacyEnforcer {
    /// Build an enforcer with no model strategy configured
    pub fn new(config: &EnforcerConfig) -> Result<Self> {
        Self::with_model(config, Arc::new(NullModel))
    }

    /// Build an enforcer with a model classification strategy
    pub fn with_model(config: &EnforcerConfig, model: Arc<dyn ModelClassifier>) -> Result<Self> {
        Ok(Self {
            classifier: FieldClassifier::new(&config.classifier, model)?,
            evaluator: PolicyEvaluator::new(),
            obfuscator: ObfuscationEngine::new(&config.obfuscation)?,
            fallback_category: config.classifier.fallback_category.clone(),
        })
    }

    /// Process one record for a purpose under a policy and consent document.
    ///
    /// Always returns a well-formed [`ProcessedRecord`]; enforcement-time
    /// failures degrade to the most restrictive safe behavior and are
    /// recorded in the audit trail instead of escaping as errors.
    pub async fn process(
        &self,
        record: &DataRecord,
        purpose: &str,
        policy: &Policy,
        consent: &Consent,
    ) -> ProcessedRecord {
        let span = tracing::debug_span!(
            "process",
            request_id = %Uuid::new_v4(),
            purpose,
            fields = record.len(),
        );
        self.run(record, purpose, policy, consent)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        record: &DataRecord,
        purpose: &str,
        policy: &Policy,
        consent: &Consent,
    ) -> ProcessedRecord {
        let mut state = RequestState::Received;
        tracing::debug!(state = ?state, "request received");

        if let Err(err) = policy.validate() {
            state = RequestState::Error;
            tracing::warn!(state = ?state, error = %err, "policy unavailable, failing closed");
            return self.fail_closed(record, purpose);
        }

        let classified = self.classifier.classify(record).await;
        state = RequestState::Classified;
        tracing::debug!(state = ?state, fields = classified.fields.len(), "record classified");

        let mut audit = AuditTrail::new();
        audit.extend_notes(classified.notes.iter().cloned());
        for field in &classified.fields {
            if field.classification.needs_review {
                audit.note(RecordNote {
                    field: field.name.clone(),
                    note: "low-confidence classification, flagged for manual review".to_string(),
                });
            }
        }

        let verdicts: Vec<_> = classified
            .fields
            .iter()
            .map(|field| {
                self.evaluator
                    .evaluate(&field.classification, purpose, policy, consent)
            })
            .collect();
        state = RequestState::Evaluated;
        tracing::debug!(state = ?state, "verdicts assigned");

        let mut obfuscated_any = false;
        let mut fields = Vec::with_capacity(classified.fields.len());
        for (field, verdict) in classified.fields.iter().zip(&verdicts) {
            let (output, technique_applied) = match verdict.decision {
                Decision::Allow => (
                    FieldOutput {
                        status: FieldStatus::Passthrough,
                        value: Some(field.value.clone()),
                        technique: None,
                    },
                    None,
                ),
                Decision::Deny => (
                    FieldOutput {
                        status: FieldStatus::Dropped,
                        value: None,
                        technique: None,
                    },
                    None,
                ),
                Decision::AllowWithObfuscation => {
                    obfuscated_any = true;
                    let (value, technique) = self.obfuscate_field(field, policy, &mut audit);
                    (
                        FieldOutput {
                            status: FieldStatus::Obfuscated,
                            value: Some(value),
                            technique: Some(technique),
                        },
                        Some(technique),
                    )
                }
            };

            audit.append(AuditEntry {
                field: field.name.clone(),
                category: field.classification.category.clone(),
                sensitivity: field.classification.sensitivity,
                purpose: purpose.to_string(),
                decision: verdict.decision,
                matched_rule_id: verdict.matched_rule_id.clone(),
                technique_applied,
                reason: verdict.reason,
            });
            fields.push(ProcessedField {
                name: field.name.clone(),
                output,
            });
        }

        if obfuscated_any {
            state = RequestState::Obfuscated;
            tracing::debug!(state = ?state, "conditional transforms applied");
        }

        state = RequestState::Finalized;
        let result = ProcessedRecord::assemble(fields, audit);
        tracing::debug!(
            state = ?state,
            privacy_status = ?result.privacy_status(),
            "request finalized"
        );
        result
    }

    /// Transform one field at leaf granularity.
    ///
    /// Leaves apply the technique the policy selects for their own category;
    /// the technique reported for a composite is the selection for the
    /// composite's category. Fallbacks to redaction are noted in the trail.
    fn obfuscate_field(
        &self,
        field: &ClassifiedField,
        policy: &Policy,
        audit: &mut AuditTrail,
    ) -> (Value, TechniqueKind) {
        if field.is_leaf() {
            let selected = policy.technique_for(&field.classification.category);
            let result =
                self.obfuscator
                    .obfuscate(&field.value, &field.classification.category, selected);
            if result.fallback {
                audit.note(RecordNote {
                    field: field.name.clone(),
                    note: "selected technique not applicable, redaction applied".to_string(),
                });
            }
            (result.value, result.technique)
        } else {
            let mut map = serde_json::Map::new();
            for child in &field.children {
                let (value, _) = self.obfuscate_field(child, policy, audit);
                map.insert(child.name.clone(), value);
            }
            let technique = policy
                .technique_for(&field.classification.category)
                .unwrap_or(TechniqueKind::Redaction);
            (Value::Object(map), technique)
        }
    }

    /// Deny-everything output used when the policy is unavailable
    fn fail_closed(&self, record: &DataRecord, purpose: &str) -> ProcessedRecord {
        let (kept, notes) = record.deduped_fields();

        let mut audit = AuditTrail::new();
        audit.extend_notes(notes);
        let mut fields = Vec::with_capacity(kept.len());
        for field in kept {
            audit.append(AuditEntry {
                field: field.name.clone(),
                category: self.fallback_category.clone(),
                sensitivity: SensitivityLevel::HighlySensitive,
                purpose: purpose.to_string(),
                decision: Decision::Deny,
                matched_rule_id: None,
                technique_applied: None,
                reason: VerdictReason::PolicyUnavailable,
            });
            fields.push(ProcessedField {
                name: field.name.clone(),
                output: FieldOutput {
                    status: FieldStatus::Dropped,
                    value: None,
                    technique: None,
                },
            });
        }

        ProcessedRecord::assemble(fields, audit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforce::PrivacyStatus;
    use crate::policy::{ConsentState, PolicyRule, RuleDecision};
    use serde_json::json;

    fn enforcer() -> PrivacyEnforcer {
        let mut config = EnforcerConfig::default();
        // fixed key so substitution output is stable within the test
        config.obfuscation.substitution_key =
            Some("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=".to_string());
        PrivacyEnforcer::new(&config).unwrap()
    }

    fn rule(
        category: &str,
        purpose: &str,
        decision: RuleDecision,
        obfuscation_required: bool,
    ) -> PolicyRule {
        PolicyRule {
            id: None,
            category: category.to_string(),
            purpose: purpose.to_string(),
            decision,
            obfuscation_required,
        }
    }

    fn policy_with(rules: Vec<PolicyRule>) -> Policy {
        Policy {
            version: "test-1".to_string(),
            rules,
            techniques: Default::default(),
            purpose_thresholds: Default::default(),
        }
    }

    fn grant(consent: &mut Consent, category: &str, purpose: &str) {
        consent.record(category, purpose, ConsentState::Granted);
    }

    #[tokio::test]
    async fn test_scenario_consent_denied_location() {
        // Policy allows usage_data for analytics; consent grants that pair
        // and denies location_info for all purposes.
        let policy = policy_with(vec![rule(
            "usage_data",
            "analytics",
            RuleDecision::Allow,
            false,
        )]);
        let mut consent = Consent::empty();
        grant(&mut consent, "usage_data", "analytics");
        consent.record("location_info", "*", ConsentState::Denied);

        let record = DataRecord::from_fields(vec![
            ("user_id".to_string(), json!("123")),
            ("gps".to_string(), json!("40.7,-74.0")),
        ]);

        let processed = enforcer()
            .process(&record, "analytics", &policy, &consent)
            .await;

        assert_eq!(
            processed.get("user_id").unwrap().status,
            FieldStatus::Passthrough
        );
        assert_eq!(processed.get("user_id").unwrap().value, Some(json!("123")));
        assert_eq!(processed.get("gps").unwrap().status, FieldStatus::Dropped);
        assert!(processed.get("gps").unwrap().value.is_none());
        assert_eq!(processed.privacy_status(), PrivacyStatus::Redacted);
    }

    #[tokio::test]
    async fn test_consent_denial_beats_policy_allow() {
        let policy = policy_with(vec![rule("location_info", "*", RuleDecision::Allow, false)]);
        let mut consent = Consent::empty();
        consent.record("location_info", "*", ConsentState::Denied);

        let record = DataRecord::from_fields(vec![("gps".to_string(), json!("40.7,-74.0"))]);
        let processed = enforcer()
            .process(&record, "analytics", &policy, &consent)
            .await;

        // never present unobfuscated, regardless of policy
        assert_eq!(processed.get("gps").unwrap().status, FieldStatus::Dropped);
        assert_eq!(
            processed.audit().entries()[0].reason,
            VerdictReason::ConsentDenied
        );
    }

    #[tokio::test]
    async fn test_scenario_no_matching_rule_default_deny() {
        let policy = policy_with(vec![rule(
            "usage_data",
            "analytics",
            RuleDecision::Allow,
            false,
        )]);
        let mut consent = Consent::empty();
        grant(&mut consent, "financial_info", "marketing");

        let record =
            DataRecord::from_fields(vec![("card_number".to_string(), json!("4111111111111111"))]);
        let processed = enforcer()
            .process(&record, "marketing", &policy, &consent)
            .await;

        assert_eq!(
            processed.get("card_number").unwrap().status,
            FieldStatus::Dropped
        );
        let entry = &processed.audit().entries()[0];
        assert_eq!(entry.category, "financial_info");
        assert_eq!(entry.reason, VerdictReason::NoMatchingRule);
        assert!(entry.matched_rule_id.is_none());
    }

    #[tokio::test]
    async fn test_scenario_substitution_for_health_info() {
        let mut policy = policy_with(vec![rule("health_info", "*", RuleDecision::Allow, true)]);
        policy
            .techniques
            .insert("health_info".to_string(), TechniqueKind::Substitution);
        let mut consent = Consent::empty();
        grant(&mut consent, "health_info", "analytics");

        let record = DataRecord::from_fields(vec![("diagnosis".to_string(), json!("flu"))]);
        let enforcer = enforcer();

        let first = enforcer
            .process(&record, "analytics", &policy, &consent)
            .await;
        let second = enforcer
            .process(&record, "analytics", &policy, &consent)
            .await;

        let output = first.get("diagnosis").unwrap();
        assert_eq!(output.status, FieldStatus::Obfuscated);
        assert_ne!(output.value, Some(json!("flu")));
        assert_eq!(output.technique, Some(TechniqueKind::Substitution));
        // deterministic across repeats
        assert_eq!(output.value, second.get("diagnosis").unwrap().value);
        assert_eq!(first.privacy_status(), PrivacyStatus::Redacted);
    }

    #[tokio::test]
    async fn test_process_is_idempotent_byte_for_byte() {
        let mut policy = policy_with(vec![
            rule("usage_data", "analytics", RuleDecision::Allow, false),
            rule("contact_info", "analytics", RuleDecision::Allow, true),
        ]);
        policy
            .techniques
            .insert("contact_info".to_string(), TechniqueKind::Redaction);
        let mut consent = Consent::empty();
        grant(&mut consent, "usage_data", "analytics");
        grant(&mut consent, "contact_info", "analytics");

        let record = DataRecord::from_json(
            r#"{"user_id": "123", "email": "a@b.com", "mystery": "x"}"#,
        )
        .unwrap();
        let enforcer = enforcer();

        let first = enforcer
            .process(&record, "analytics", &policy, &consent)
            .await;
        let second = enforcer
            .process(&record, "analytics", &policy, &consent)
            .await;

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_output_field_count_never_exceeds_input() {
        let policy = policy_with(vec![rule("*", "*", RuleDecision::Allow, false)]);
        let record =
            DataRecord::from_json(r#"{"a": 1, "b": 2, "a": 3, "c": {"email": "x@y.z"}}"#).unwrap();

        let processed = enforcer()
            .process(&record, "analytics", &policy, &Consent::empty())
            .await;
        assert!(processed.field_count() <= record.len());
        // duplicate "a" collapsed to one entry
        assert_eq!(processed.field_count(), 3);
    }

    #[tokio::test]
    async fn test_policy_unavailable_fails_closed() {
        let invalid = Policy {
            version: "v".to_string(),
            rules: Vec::new(),
            techniques: Default::default(),
            purpose_thresholds: Default::default(),
        };
        let record = DataRecord::from_json(r#"{"user_id": "123", "email": "a@b.com"}"#).unwrap();

        let processed = enforcer()
            .process(&record, "analytics", &invalid, &Consent::empty())
            .await;

        assert_eq!(processed.privacy_status(), PrivacyStatus::Blocked);
        assert_eq!(processed.field_count(), 2);
        for entry in processed.audit().entries() {
            assert_eq!(entry.decision, Decision::Deny);
            assert_eq!(entry.reason, VerdictReason::PolicyUnavailable);
        }
        for field in processed.fields() {
            assert_eq!(field.output.status, FieldStatus::Dropped);
        }
    }

    #[tokio::test]
    async fn test_empty_record_is_clear() {
        let policy = policy_with(vec![rule("*", "*", RuleDecision::Allow, false)]);
        let processed = enforcer()
            .process(&DataRecord::new(), "analytics", &policy, &Consent::empty())
            .await;
        assert_eq!(processed.privacy_status(), PrivacyStatus::Clear);
        assert!(processed.audit().is_empty());
    }

    #[tokio::test]
    async fn test_all_passthrough_is_clear() {
        let policy = policy_with(vec![rule("usage_data", "*", RuleDecision::Allow, false)]);
        let mut consent = Consent::empty();
        grant(&mut consent, "usage_data", "analytics");

        let record = DataRecord::from_fields(vec![
            ("user_id".to_string(), json!("123")),
            ("clicks".to_string(), json!(8)),
        ]);
        let processed = enforcer()
            .process(&record, "analytics", &policy, &consent)
            .await;
        assert_eq!(processed.privacy_status(), PrivacyStatus::Clear);
    }

    #[tokio::test]
    async fn test_everything_dropped_is_blocked() {
        let policy = policy_with(vec![rule("*", "*", RuleDecision::Deny, false)]);
        let record = DataRecord::from_fields(vec![("email".to_string(), json!("a@b.com"))]);

        let processed = enforcer()
            .process(&record, "analytics", &policy, &Consent::empty())
            .await;
        assert_eq!(processed.privacy_status(), PrivacyStatus::Blocked);
    }

    #[tokio::test]
    async fn test_audit_preserves_input_field_order() {
        let policy = policy_with(vec![rule("*", "*", RuleDecision::Allow, false)]);
        let record =
            DataRecord::from_json(r#"{"zeta": 1, "email": "a@b.com", "alpha": 2}"#).unwrap();

        let processed = enforcer()
            .process(&record, "analytics", &policy, &Consent::empty())
            .await;
        let order: Vec<&str> = processed
            .audit()
            .entries()
            .iter()
            .map(|e| e.field.as_str())
            .collect();
        assert_eq!(order, vec!["zeta", "email", "alpha"]);
    }

    #[tokio::test]
    async fn test_nested_fields_obfuscate_at_leaf_granularity() {
        let mut policy = policy_with(vec![rule("contact_info", "*", RuleDecision::Allow, true)]);
        policy
            .techniques
            .insert("contact_info".to_string(), TechniqueKind::Redaction);
        let mut consent = Consent::empty();
        grant(&mut consent, "contact_info", "analytics");

        let record = DataRecord::from_fields(vec![(
            "profile".to_string(),
            json!({"email": "user@example.com", "phone": "555-123-4567"}),
        )]);
        let processed = enforcer()
            .process(&record, "analytics", &policy, &consent)
            .await;

        let output = processed.get("profile").unwrap();
        assert_eq!(output.status, FieldStatus::Obfuscated);
        let value = output.value.as_ref().unwrap();
        assert_eq!(value["email"], json!("****@example.com"));
        assert_eq!(value["phone"], json!("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_technique_fallback_is_noted() {
        let mut policy = policy_with(vec![rule("contact_info", "*", RuleDecision::Allow, true)]);
        // generalization cannot apply to an email string
        policy
            .techniques
            .insert("contact_info".to_string(), TechniqueKind::Generalization);
        let mut consent = Consent::empty();
        grant(&mut consent, "contact_info", "analytics");

        let record = DataRecord::from_fields(vec![("email".to_string(), json!("a@b.com"))]);
        let processed = enforcer()
            .process(&record, "analytics", &policy, &consent)
            .await;

        let output = processed.get("email").unwrap();
        assert_eq!(output.technique, Some(TechniqueKind::Redaction));
        assert!(processed
            .audit()
            .notes()
            .iter()
            .any(|n| n.field == "email"));
    }

    #[tokio::test]
    async fn test_unclassified_field_is_flagged_for_review() {
        let policy = policy_with(vec![rule("*", "*", RuleDecision::Deny, false)]);
        let record = DataRecord::from_fields(vec![("mystery".to_string(), json!("x"))]);

        let processed = enforcer()
            .process(&record, "analytics", &policy, &Consent::empty())
            .await;
        assert!(processed
            .audit()
            .notes()
            .iter()
            .any(|n| n.field == "mystery" && n.note.contains("manual review")));
        assert_eq!(
            processed.audit().entries()[0].sensitivity,
            SensitivityLevel::HighlySensitive
        );
    }

    #[tokio::test]
    async fn test_duplicate_field_noted_in_trail() {
        let policy = policy_with(vec![rule("*", "*", RuleDecision::Deny, false)]);
        let record = DataRecord::from_json(r#"{"email": "a@b.com", "email": "c@d.com"}"#).unwrap();

        let processed = enforcer()
            .process(&record, "analytics", &policy, &Consent::empty())
            .await;
        assert_eq!(processed.field_count(), 1);
        assert!(processed
            .audit()
            .notes()
            .iter()
            .any(|n| n.field == "email" && n.note.contains("duplicate")));
    }
}
