//! FieldGuard error types

use thiserror::Error;

/// FieldGuard error type
///
/// Only [`Error::PolicyUnavailable`] is fatal to an in-flight request; every
/// other enforcement-time condition degrades to the most restrictive safe
/// behavior inside the pipeline and is surfaced through the audit trail
/// instead of an error return.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Classification error
    #[error("Classification error: {0}")]
    Classification(String),

    /// Policy document is missing, empty, or malformed
    #[error("Policy unavailable: {0}")]
    PolicyUnavailable(String),

    /// Consent document error
    #[error("Consent error: {0}")]
    Consent(String),

    /// Obfuscation error
    #[error("Obfuscation error: {0}")]
    Obfuscation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for FieldGuard operations
pub type Result<T> = std::result::Result<T, Error>;
