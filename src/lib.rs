//! FieldGuard - Per-field privacy enforcement for structured data records
//!
//! FieldGuard decides, field by field, whether a data record may be
//! processed for a stated purpose under a governing policy and the user's
//! consent preferences, and irreversibly transforms any field that is only
//! conditionally permitted before it leaves the system.
//!
//! ## Architecture
//!
//! ```text
//!  DataRecord ──► DataClassifier ──► PolicyEvaluator ──► ObfuscationEngine
//!                 (rule table +       (ranked rule        (redaction /
//!                  model strategy)     match + consent     substitution /
//!                       │              ceiling)            generalization)
//!                       │                   │                   │
//!                       └───────────► PrivacyEnforcer ◄────────┘
//!                                          │
//!                              ProcessedRecord + AuditTrail
//! ```
//!
//! Per field: classify once; evaluate the classification against
//! (policy, consent, purpose); `deny` drops the field, `allow` passes it
//! through, `allow_with_obfuscation` transforms it with the technique the
//! policy selects for its category. Every decision lands in an append-only
//! audit trail, one entry per input field, in input order.
//!
//! ## Fail-closed behavior
//!
//! Missing information never widens access: an unclassifiable field is
//! treated as `highly_sensitive`, a (category, purpose) pair without
//! recorded consent is denied, a pair no rule covers is denied, an
//! inapplicable obfuscation technique falls back to redaction, and an
//! unavailable policy denies the entire request. The caller always receives
//! a well-formed [`ProcessedRecord`]; only document parsing and constructor
//! edges return errors.
//!
//! ## Modules
//!
//! - [`classify`]: field classification (rule table + pluggable model)
//! - [`policy`]: policy/consent documents and the per-field evaluator
//! - [`obfuscate`]: redaction, keyed substitution, generalization
//! - [`enforce`]: the orchestrator, output types, and audit trail
//! - [`config`]: process-wide configuration and snapshot swapping
//! - [`record`]: the ordered input record model

pub mod classify;
pub mod config;
pub mod enforce;
pub mod error;
pub mod obfuscate;
pub mod policy;
pub mod record;

pub use classify::{
    Classification, ClassificationSource, ClassifiedField, ClassifiedRecord, FieldClassifier,
    ModelClassifier, ModelPrediction, NullModel, SensitivityLevel,
};
pub use config::{ConfigHandle, EnforcerConfig};
pub use enforce::{
    AuditEntry, AuditTrail, FieldOutput, FieldStatus, PrivacyEnforcer, PrivacyStatus,
    ProcessedField, ProcessedRecord,
};
pub use error::{Error, Result};
pub use obfuscate::{ObfuscatedValue, ObfuscationEngine, TechniqueKind};
pub use policy::{
    Consent, ConsentEntry, ConsentState, ConsentStatus, Decision, Policy, PolicyEvaluator,
    PolicyRule, RuleDecision, Verdict, VerdictReason,
};
pub use record::{DataRecord, RecordField, RecordNote};
