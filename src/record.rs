//! Data records entering the enforcement pipeline
//!
//! A [`DataRecord`] is an ordered mapping of field name to raw value. Field
//! order is preserved exactly as supplied by the ingestion layer, including
//! duplicate names; deduplication happens at classification time so the
//! duplicate can be noted in the audit trail.

use crate::error::{Error, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

/// A single named field of a record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    /// Field name as supplied by the caller
    pub name: String,
    /// Raw value; may be a nested structure
    pub value: Value,
}

/// An ordered field-name → value mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataRecord {
    fields: Vec<RecordField>,
}

/// A record-level observation made while processing (e.g. a duplicate field
/// name being superseded). Notes ride alongside the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordNote {
    /// Field the note refers to
    pub field: String,
    /// What was observed
    pub note: String,
}

impl DataRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from name/value pairs, preserving their order
    pub fn from_fields(fields: Vec<(String, Value)>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, value)| RecordField { name, value })
                .collect(),
        }
    }

    /// Parse a record from a JSON object, preserving document field order
    pub fn from_json(json: &str) -> Result<Self> {
        let record: DataRecord = serde_json::from_str(json)?;
        Ok(record)
    }

    /// Append a field
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push(RecordField {
            name: name.into(),
            value,
        });
    }

    /// Iterate fields in input order
    pub fn fields(&self) -> impl Iterator<Item = &RecordField> {
        self.fields.iter()
    }

    /// Number of fields, duplicates included
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolve duplicate field names: the last occurrence wins and takes the
    /// position where it appeared; each superseded occurrence yields a note.
    pub fn deduped_fields(&self) -> (Vec<&RecordField>, Vec<RecordNote>) {
        let mut kept: Vec<&RecordField> = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut notes = Vec::new();

        for field in &self.fields {
            if let Some(&existing) = seen.get(field.name.as_str()) {
                kept.remove(existing);
                for slot in seen.values_mut() {
                    if *slot > existing {
                        *slot -= 1;
                    }
                }
                notes.push(RecordNote {
                    field: field.name.clone(),
                    note: "duplicate field name, earlier occurrence superseded".to_string(),
                });
            }
            seen.insert(field.name.as_str(), kept.len());
            kept.push(field);
        }

        (kept, notes)
    }
}

impl Serialize for DataRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.name, &field.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DataRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = DataRecord;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a JSON object of record fields")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut fields = Vec::new();
                while let Some((name, value)) = access.next_entry::<String, Value>()? {
                    fields.push(RecordField { name, value });
                }
                Ok(DataRecord { fields })
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

impl TryFrom<&str> for DataRecord {
    type Error = Error;

    fn try_from(json: &str) -> Result<Self> {
        Self::from_json(json)
    }
}
