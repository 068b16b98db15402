//! Append-only audit trail
//!
//! One entry per input field, in input field order, so two runs over the
//! same inputs diff cleanly. The trail is immutable once written: the crate
//! appends while assembling a result, the public surface is read-only, and
//! entries carry no timestamps or random ids.

use crate::classify::SensitivityLevel;
use crate::obfuscate::TechniqueKind;
use crate::policy::{Decision, VerdictReason};
use crate::record::RecordNote;
use serde::Serialize;

/// Audit record for one field decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    /// Field name
    pub field: String,
    /// Category the field was classified as
    pub category: String,
    /// Sensitivity the field was classified at
    pub sensitivity: SensitivityLevel,
    /// Purpose the request was made for
    pub purpose: String,
    /// Decision taken for the field
    pub decision: Decision,
    /// Rule that decided, when one matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule_id: Option<String>,
    /// Transform actually applied, when the field was obfuscated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technique_applied: Option<TechniqueKind>,
    /// Cause of the decision
    pub reason: VerdictReason,
}

/// Ordered, append-only audit trail for one request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
    notes: Vec<RecordNote>,
}

impl AuditTrail {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn note(&mut self, note: RecordNote) {
        self.notes.push(note);
    }

    pub(crate) fn extend_notes(&mut self, notes: impl IntoIterator<Item = RecordNote>) {
        self.notes.extend(notes);
    }

    /// Entries in input field order
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Record-level notes (duplicates, technique fallbacks)
    pub fn notes(&self) -> &[RecordNote] {
        &self.notes
    }

    /// Number of field entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries were written
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
