//! Obfuscation engine
//!
//! Irreversibly transforms field values whose verdict permits processing
//! only in degraded form. Three techniques, selected per category by the
//! policy document, never hardcoded:
//! - Redaction: fixed mask, irreversible
//! - Substitution: deterministic keyed pseudonymization (joinable within a
//!   key epoch, one-way without the key, keys separated per category)
//! - Generalization: precision reduction (date → year, coordinate → region,
//!   numeric → bucket)
//!
//! A technique that cannot be applied to a given value falls back to
//! redaction with a warning; sensitive data is never passed through
//! unmodified by default.

pub mod generalize;

use crate::config::ObfuscationConfig;
use crate::error::{Error, Result};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A specific transform applied to a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechniqueKind {
    /// Replace with a fixed mask
    Redaction,
    /// Deterministic keyed pseudonymization
    Substitution,
    /// Precision reduction
    Generalization,
}

impl std::fmt::Display for TechniqueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redaction => write!(f, "redaction"),
            Self::Substitution => write!(f, "substitution"),
            Self::Generalization => write!(f, "generalization"),
        }
    }
}

/// Result of obfuscating one value
#[derive(Debug, Clone, PartialEq)]
pub struct ObfuscatedValue {
    /// The transformed value
    pub value: Value,
    /// Technique actually applied (redaction when a fallback occurred)
    pub technique: TechniqueKind,
    /// True when the requested technique could not be applied
    pub fallback: bool,
}

/// Epoch master key for substitution. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct MasterKey(Vec<u8>);

/// Obfuscation engine holding the process-wide transform settings
pub struct ObfuscationEngine {
    mask: String,
    key_epoch: String,
    master_key: MasterKey,
    numeric_bucket_width: u64,
    coordinate_decimals: u32,
}

impl ObfuscationEngine {
    /// Create an engine from configuration.
    ///
    /// When no substitution key is configured an ephemeral key is generated;
    /// pseudonyms stay deterministic within the process but will not be
    /// stable across restarts.
    pub fn new(config: &ObfuscationConfig) -> Result<Self> {
        let master_key = match &config.substitution_key {
            Some(encoded) => MasterKey(STANDARD.decode(encoded).map_err(|e| {
                Error::Config(format!("substitution_key is not valid base64: {e}"))
            })?),
            None => {
                tracing::warn!(
                    "no substitution key configured, generating an ephemeral key; \
                     pseudonyms will not be stable across restarts"
                );
                MasterKey(generate_key()?)
            }
        };

        Ok(Self {
            mask: config.mask.clone(),
            key_epoch: config.key_epoch.clone(),
            master_key,
            numeric_bucket_width: config.numeric_bucket_width,
            coordinate_decimals: config.coordinate_decimals,
        })
    }

    /// Apply the technique selected for a category.
    ///
    /// `technique` is `None` when the policy selects nothing for the
    /// category; that and any per-value inapplicability both fall back to
    /// redaction.
    pub fn obfuscate(
        &self,
        value: &Value,
        category: &str,
        technique: Option<TechniqueKind>,
    ) -> ObfuscatedValue {
        let Some(technique) = technique else {
            tracing::warn!(
                category,
                "no obfuscation technique selected for category, falling back to redaction"
            );
            return ObfuscatedValue {
                value: self.redact(value, category),
                technique: TechniqueKind::Redaction,
                fallback: true,
            };
        };

        match technique {
            TechniqueKind::Redaction => ObfuscatedValue {
                value: self.redact(value, category),
                technique: TechniqueKind::Redaction,
                fallback: false,
            },
            TechniqueKind::Substitution => ObfuscatedValue {
                value: self.substitute(value, category),
                technique: TechniqueKind::Substitution,
                fallback: false,
            },
            TechniqueKind::Generalization => match generalize::generalize(
                value,
                self.numeric_bucket_width,
                self.coordinate_decimals,
            ) {
                Some(generalized) => ObfuscatedValue {
                    value: generalized,
                    technique: TechniqueKind::Generalization,
                    fallback: false,
                },
                None => {
                    tracing::warn!(
                        category,
                        "value cannot be generalized, falling back to redaction"
                    );
                    ObfuscatedValue {
                        value: self.redact(value, category),
                        technique: TechniqueKind::Redaction,
                        fallback: true,
                    }
                }
            },
        }
    }

    /// Replace a value with a mask. Shape-preserving for a few well-known
    /// categories, the configured fixed mask otherwise.
    fn redact(&self, value: &Value, category: &str) -> Value {
        let Value::String(text) = value else {
            return Value::String(self.mask.clone());
        };

        let masked = match category {
            "contact_info" => match text.find('@') {
                Some(at) => format!("****{}", &text[at..]),
                None => self.mask.clone(),
            },
            "financial_info" => {
                let chars: Vec<char> = text.chars().collect();
                if chars.len() >= 4 {
                    let tail: String = chars[chars.len() - 4..].iter().collect();
                    format!("****{tail}")
                } else {
                    self.mask.clone()
                }
            }
            _ => self.mask.clone(),
        };

        Value::String(masked)
    }

    /// Deterministic keyed pseudonym for a value.
    ///
    /// The per-category key is derived from the epoch master key, so equal
    /// raw values in different categories never correlate, and rotating the
    /// epoch breaks joinability with older output.
    fn substitute(&self, value: &Value, category: &str) -> Value {
        let root = hmac::Key::new(hmac::HMAC_SHA256, &self.master_key.0);
        let derived = hmac::sign(
            &root,
            format!("{}:{}", self.key_epoch, category).as_bytes(),
        );
        let category_key = hmac::Key::new(hmac::HMAC_SHA256, derived.as_ref());

        let payload = canonical(value);
        let tag = hmac::sign(&category_key, payload.as_bytes());
        Value::String(format!("sub_{}", URL_SAFE_NO_PAD.encode(tag.as_ref())))
    }
}

/// Canonical byte representation of a value for pseudonymization
fn canonical(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn generate_key() -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; 32];
    rng.fill(&mut bytes)
        .map_err(|_| Error::Obfuscation("failed to generate substitution key".to_string()))?;
    Ok(bytes)
}
