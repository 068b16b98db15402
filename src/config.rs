//! FieldGuard configuration management
//!
//! Process-wide, read-only settings: the classifier rule table, model
//! strategy knobs, and obfuscation parameters. Loaded once at startup and
//! swapped atomically on update via [`ConfigHandle`]; per-request inputs
//! (policy, consent, record) never live here.

use crate::classify::SensitivityLevel;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Main FieldGuard configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnforcerConfig {
    /// Classifier configuration
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Obfuscation configuration
    #[serde(default)]
    pub obfuscation: ObfuscationConfig,
}

/// A field-name classification rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Rule name (used in logs)
    pub name: String,
    /// Regex matched against the field name
    pub name_pattern: String,
    /// Category assigned on match
    pub category: String,
    /// Sensitivity assigned on match
    pub sensitivity: SensitivityLevel,
}

/// Classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Field-name rules, consulted in order before the model strategy
    pub rules: Vec<FieldRule>,

    /// Category assigned by the fail-safe path
    pub fallback_category: String,

    /// Minimum model confidence; predictions below it take the fail-safe path
    pub confidence_threshold: f64,

    /// Upper bound on a single model call, in milliseconds
    pub model_timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules: default_field_rules(),
            fallback_category: "unclassified".to_string(),
            confidence_threshold: 0.75,
            model_timeout_ms: 250,
        }
    }
}

/// Obfuscation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObfuscationConfig {
    /// Fixed mask used by redaction when no shape-preserving mask applies
    pub mask: String,

    /// Key epoch identifier; rotating it breaks pseudonym joinability
    pub key_epoch: String,

    /// Base64-encoded substitution master key; an ephemeral key is
    /// generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitution_key: Option<String>,

    /// Bucket width for numeric generalization
    pub numeric_bucket_width: u64,

    /// Maximum fractional digits kept by coordinate generalization
    pub coordinate_decimals: u32,
}

impl Default for ObfuscationConfig {
    fn default() -> Self {
        Self {
            mask: "[REDACTED]".to_string(),
            key_epoch: "epoch-1".to_string(),
            substitution_key: None,
            numeric_bucket_width: 10,
            coordinate_decimals: 1,
        }
    }
}

impl EnforcerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Default field-name classification rules
pub fn default_field_rules() -> Vec<FieldRule> {
    fn rule(
        name: &str,
        name_pattern: &str,
        category: &str,
        sensitivity: SensitivityLevel,
    ) -> FieldRule {
        FieldRule {
            name: name.to_string(),
            name_pattern: name_pattern.to_string(),
            category: category.to_string(),
            sensitivity,
        }
    }

    vec![
        rule(
            "email",
            r"(?i)^(e[-_]?mail|email_address|contact_email)$",
            "contact_info",
            SensitivityLevel::Sensitive,
        ),
        rule(
            "phone",
            r"(?i)^(phone|phone_number|mobile|tel)$",
            "contact_info",
            SensitivityLevel::Sensitive,
        ),
        rule(
            "person_name",
            r"(?i)^(name|full_name|first_name|last_name|surname)$",
            "contact_info",
            SensitivityLevel::Sensitive,
        ),
        rule(
            "postal_address",
            r"(?i)^(address|street|postal_code|zip|zip_code|city)$",
            "contact_info",
            SensitivityLevel::Sensitive,
        ),
        rule(
            "location",
            r"(?i)^(gps|lat|latitude|lon|lng|longitude|location|coordinates|geo)$",
            "location_info",
            SensitivityLevel::Sensitive,
        ),
        rule(
            "health",
            r"(?i)^(diagnosis|medical_\w+|health_\w+|blood_type|prescription)$",
            "health_info",
            SensitivityLevel::HighlySensitive,
        ),
        rule(
            "financial",
            r"(?i)^(card_number|credit_card|iban|account_number|routing_number|salary|income)$",
            "financial_info",
            SensitivityLevel::HighlySensitive,
        ),
        rule(
            "credentials",
            r"(?i)^(password|secret|api_key|token|access_token)$",
            "credential_info",
            SensitivityLevel::HighlySensitive,
        ),
        rule(
            "identifier",
            r"(?i)^(user_id|account_id|customer_id|session_id|id)$",
            "usage_data",
            SensitivityLevel::Internal,
        ),
        rule(
            "device",
            r"(?i)^(ip|ip_address|device_id|user_agent)$",
            "device_info",
            SensitivityLevel::Internal,
        ),
        rule(
            "usage",
            r"(?i)^(clicks|page_views|events|usage_\w+|visits)$",
            "usage_data",
            SensitivityLevel::Internal,
        ),
        rule(
            "timestamps",
            r"(?i)^(created_at|updated_at|timestamp|last_login)$",
            "usage_data",
            SensitivityLevel::Public,
        ),
    ]
}

/// Copy-on-write handle to the process-wide configuration snapshot.
///
/// Readers clone the `Arc` once at request start and keep that snapshot for
/// the whole request; a reload builds a complete new snapshot and swaps it
/// in. Concurrent requests observe either the old or the new snapshot in
/// full, never a partial mix. Two concurrent reloads resolve last-write-wins.
pub struct ConfigHandle {
    current: RwLock<Arc<EnforcerConfig>>,
}

impl ConfigHandle {
    /// Wrap an initial configuration
    pub fn new(config: EnforcerConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<EnforcerConfig> {
        // A poisoned lock still holds a complete snapshot.
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Atomically swap in a new snapshot, returning the previous one
    pub fn swap(&self, config: EnforcerConfig) -> Arc<EnforcerConfig> {
        let next = Arc::new(config);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}
