//! Per-user consent documents
//!
//! Consent is a ceiling, never a floor: it can restrict what the policy
//! allows but can never relax it. The mapping may be partial; a pair with
//! no recorded consent is treated conservatively as denial.

use crate::policy::WILDCARD;
use serde::{Deserialize, Serialize};

/// Recorded consent state for one (category, purpose) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentState {
    /// The user granted processing
    Granted,
    /// The user denied processing
    Denied,
}

/// One entry of a consent document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentEntry {
    /// Data category the entry covers (concrete, no wildcard)
    pub category: String,
    /// Purpose the entry covers, or `*` for all purposes
    pub purpose: String,
    /// Granted or denied
    pub state: ConsentState,
}

/// A per-user consent document, possibly partial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Consent {
    /// Subject the document belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Recorded consent entries
    #[serde(default)]
    pub entries: Vec<ConsentEntry>,
}

/// Resolved consent for one (category, purpose) lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentStatus {
    /// Explicitly granted
    Granted,
    /// Explicitly denied
    Denied,
    /// No entry covers the pair
    Unspecified,
}

impl Consent {
    /// An empty consent document (denies everything by omission)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Record an entry
    pub fn record(
        &mut self,
        category: impl Into<String>,
        purpose: impl Into<String>,
        state: ConsentState,
    ) {
        self.entries.push(ConsentEntry {
            category: category.into(),
            purpose: purpose.into(),
            state,
        });
    }

    /// Resolve the consent status for a (category, purpose) pair.
    ///
    /// Entries with the exact purpose take precedence over wildcard-purpose
    /// entries; within the same specificity a denial always wins.
    pub fn status(&self, category: &str, purpose: &str) -> ConsentStatus {
        let mut exact: Option<ConsentState> = None;
        let mut wildcard: Option<ConsentState> = None;

        for entry in &self.entries {
            if entry.category != category {
                continue;
            }
            if entry.purpose == purpose {
                exact = Some(merge(exact, entry.state));
            } else if entry.purpose == WILDCARD {
                wildcard = Some(merge(wildcard, entry.state));
            }
        }

        match exact.or(wildcard) {
            Some(ConsentState::Granted) => ConsentStatus::Granted,
            Some(ConsentState::Denied) => ConsentStatus::Denied,
            None => ConsentStatus::Unspecified,
        }
    }
}

// Denial wins over grant at equal specificity.
fn merge(current: Option<ConsentState>, new: ConsentState) -> ConsentState {
    match (current, new) {
        (Some(ConsentState::Denied), _) | (_, ConsentState::Denied) => ConsentState::Denied,
        _ => ConsentState::Granted,
    }
}
