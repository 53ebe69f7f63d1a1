//! Error types shared by every store and client in this crate.

use thiserror::Error;

use crate::cert::CertificateInfo;

/// Errors produced by the core library.
#[derive(Debug, Error)]
pub enum NhnError {
    /// Transport-level HTTP failure (connect, timeout, TLS).
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status.
    #[error("Request failed with status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Platform API reported `isSuccessful = false`.
    #[error("API error ({code}): {message}")]
    Api { code: i64, message: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Cache or store entry not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input rejected by a validator.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A certificate with the same id, type and instance is already stored.
    #[error("Certificate already exists: {} ({})", .0.id, .0.file_path.display())]
    CertificateExists(Box<CertificateInfo>),

    /// Required parameters without a value in non-interactive mode.
    #[error("Missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<String>),

    /// Store integrity problems.
    #[error("Store validation failed: {}", .0.join("; "))]
    Integrity(Vec<String>),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Terminal prompt failure.
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Private key parsing error.
    #[error("Key error: {0}")]
    Key(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NhnError>;

impl NhnError {
    /// Whether this error means "nothing stored under that key".
    pub fn is_not_found(&self) -> bool {
        matches!(self, NhnError::NotFound(_))
    }
}

impl From<std::io::Error> for NhnError {
    fn from(e: std::io::Error) -> Self {
        NhnError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for NhnError {
    fn from(e: serde_json::Error) -> Self {
        NhnError::Json(e.to_string())
    }
}

impl From<reqwest::Error> for NhnError {
    fn from(e: reqwest::Error) -> Self {
        NhnError::Network(e.to_string())
    }
}

impl From<dialoguer::Error> for NhnError {
    fn from(e: dialoguer::Error) -> Self {
        NhnError::Prompt(e.to_string())
    }
}
