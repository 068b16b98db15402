//! Privacy policy and consent evaluation
//!
//! A [`Policy`] is a versioned, ordered list of rules deciding whether a
//! (category, purpose) pair may be processed, together with the
//! per-category obfuscation technique selection and per-purpose sensitivity
//! thresholds. [`Consent`] is the user-supplied ceiling on top of the
//! policy. [`PolicyEvaluator`] combines both into a per-field [`Verdict`].

pub mod consent;
pub mod evaluator;

pub use consent::{Consent, ConsentEntry, ConsentState, ConsentStatus};
pub use evaluator::PolicyEvaluator;

use crate::classify::SensitivityLevel;
use crate::error::{Error, Result};
use crate::obfuscate::TechniqueKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wildcard accepted in rule categories/purposes and consent purposes
pub const WILDCARD: &str = "*";

/// What a policy rule decides for its (category, purpose) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleDecision {
    /// Processing is permitted
    Allow,
    /// Processing is forbidden
    Deny,
}

/// A single policy rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Optional stable identifier; assigned from declaration order if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Data category this rule covers, or `*`
    pub category: String,
    /// Processing purpose this rule covers, or `*`
    pub purpose: String,
    /// Allow or deny
    pub decision: RuleDecision,
    /// Force obfuscation even when the decision is allow
    #[serde(default)]
    pub obfuscation_required: bool,
}

/// A versioned privacy policy document. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Policy version identifier
    pub version: String,
    /// Ordered rule list; declaration order breaks specificity ties
    pub rules: Vec<PolicyRule>,
    /// Obfuscation technique per category (`*` allowed as a default entry)
    #[serde(default)]
    pub techniques: BTreeMap<String, TechniqueKind>,
    /// Per-purpose sensitivity ceiling: an allow above the ceiling is
    /// downgraded to allow-with-obfuscation
    #[serde(default)]
    pub purpose_thresholds: BTreeMap<String, SensitivityLevel>,
}

impl Policy {
    /// Parse and validate a policy document from JSON.
    ///
    /// A document that fails to parse or validate is unavailable for
    /// enforcement purposes and the whole request must be denied.
    pub fn from_json(json: &str) -> Result<Self> {
        let policy: Policy = serde_json::from_str(json)
            .map_err(|e| Error::PolicyUnavailable(format!("malformed policy document: {e}")))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Validate the document shape: a version and at least one rule.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::PolicyUnavailable(
                "policy has no version".to_string(),
            ));
        }
        if self.rules.is_empty() {
            return Err(Error::PolicyUnavailable("policy has no rules".to_string()));
        }
        Ok(())
    }

    /// Stable identifier for the rule at `index`: the explicit id when the
    /// author set one, otherwise derived from declaration order.
    pub fn rule_id(&self, index: usize) -> String {
        self.rules[index]
            .id
            .clone()
            .unwrap_or_else(|| format!("r{index}"))
    }

    /// Technique selected for a category, falling back to a `*` entry
    pub fn technique_for(&self, category: &str) -> Option<TechniqueKind> {
        self.techniques
            .get(category)
            .or_else(|| self.techniques.get(WILDCARD))
            .copied()
    }

    /// Sensitivity ceiling for a purpose, if one is configured
    pub fn threshold_for(&self, purpose: &str) -> Option<SensitivityLevel> {
        self.purpose_thresholds.get(purpose).copied()
    }
}

/// The evaluator's decision for one field under one purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Pass the field through unmodified
    Allow,
    /// Drop the field
    Deny,
    /// Keep the field, but transform it first
    AllowWithObfuscation,
}

/// Why a verdict came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    /// A rule allowed the pair and nothing restricted it further
    PolicyAllowed,
    /// A rule denied the pair outright
    PolicyDenied,
    /// The matching rule demands obfuscation
    ObfuscationRequired,
    /// Sensitivity exceeded the purpose's ceiling
    SensitivityThreshold,
    /// The user explicitly denied consent for the pair
    ConsentDenied,
    /// No consent was recorded for the pair; treated as denial
    ConsentUnspecified,
    /// No rule covered the pair; default-closed
    NoMatchingRule,
    /// The policy document was missing or malformed
    PolicyUnavailable,
}

impl std::fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PolicyAllowed => "policy_allowed",
            Self::PolicyDenied => "policy_denied",
            Self::ObfuscationRequired => "obfuscation_required",
            Self::SensitivityThreshold => "sensitivity_threshold",
            Self::ConsentDenied => "consent_denied",
            Self::ConsentUnspecified => "consent_unspecified",
            Self::NoMatchingRule => "no_matching_rule",
            Self::PolicyUnavailable => "policy_unavailable",
        };
        f.write_str(s)
    }
}

/// Per-field evaluation outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// What happens to the field
    pub decision: Decision,
    /// Id of the rule that decided, when one matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule_id: Option<String>,
    /// Cause of the decision
    pub reason: VerdictReason,
}

impl Verdict {
    /// A denying verdict
    pub fn deny(reason: VerdictReason, matched_rule_id: Option<String>) -> Self {
        Self {
            decision: Decision::Deny,
            matched_rule_id,
            reason,
        }
    }
}
