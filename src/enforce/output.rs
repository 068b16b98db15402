//! Processed-record output types

use crate::enforce::AuditTrail;
use crate::obfuscate::TechniqueKind;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// What happened to one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    /// Passed through unmodified
    Passthrough,
    /// Transformed before release
    Obfuscated,
    /// Removed from the output
    Dropped,
}

/// Record-level privacy outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyStatus {
    /// Every field passed through unmodified
    Clear,
    /// At least one field was altered or dropped, but some survived
    Redacted,
    /// Every field was dropped; nothing survives
    Blocked,
}

/// Per-field output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOutput {
    /// What happened to the field
    pub status: FieldStatus,
    /// Surviving value, absent for dropped fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Transform applied, when the field was obfuscated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technique: Option<TechniqueKind>,
}

/// A named field output
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedField {
    /// Field name
    pub name: String,
    /// Outcome for the field
    pub output: FieldOutput,
}

/// The enforcement result for one record
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedRecord {
    fields: Vec<ProcessedField>,
    privacy_status: PrivacyStatus,
    audit: AuditTrail,
}

impl ProcessedRecord {
    pub(crate) fn assemble(fields: Vec<ProcessedField>, audit: AuditTrail) -> Self {
        let privacy_status = compute_status(&fields);
        Self {
            fields,
            privacy_status,
            audit,
        }
    }

    /// Field outputs in input order
    pub fn fields(&self) -> &[ProcessedField] {
        &self.fields
    }

    /// Look up one field's outcome by name
    pub fn get(&self, name: &str) -> Option<&FieldOutput> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.output)
    }

    /// Record-level privacy outcome
    pub fn privacy_status(&self) -> PrivacyStatus {
        self.privacy_status
    }

    /// The request's audit trail
    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// Number of field entries in the output
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// `blocked` only when nothing survives, `clear` only when nothing changed.
fn compute_status(fields: &[ProcessedField]) -> PrivacyStatus {
    if fields.is_empty() {
        return PrivacyStatus::Clear;
    }
    let survivors = fields
        .iter()
        .filter(|field| field.output.status != FieldStatus::Dropped)
        .count();
    let altered = fields
        .iter()
        .any(|field| field.output.status != FieldStatus::Passthrough);

    if survivors == 0 {
        PrivacyStatus::Blocked
    } else if altered {
        PrivacyStatus::Redacted
    } else {
        PrivacyStatus::Clear
    }
}

impl Serialize for ProcessedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Fields<'a>(&'a [ProcessedField]);

        impl Serialize for Fields<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for field in self.0 {
                    map.serialize_entry(&field.name, &field.output)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("fields", &Fields(&self.fields))?;
        map.serialize_entry("privacy_status", &self.privacy_status)?;
        map.serialize_entry("audit", &self.audit)?;
        map.end()
    }
}
