//! End-to-end privacy enforcement
//!
//! [`PrivacyEnforcer`] drives classification, policy evaluation, and
//! obfuscation for one record and assembles the [`ProcessedRecord`] plus its
//! append-only [`AuditTrail`]. The pipeline is a pure, stateless function
//! per request; the only failure that aborts a request is an unavailable
//! policy, and even that surfaces as a well-formed fail-closed output.

pub mod audit;
pub mod enforcer;
pub mod output;

pub use audit::{AuditEntry, AuditTrail};
pub use enforcer::PrivacyEnforcer;
pub use output::{FieldOutput, FieldStatus, PrivacyStatus, ProcessedField, ProcessedRecord};
