//! Triad error types

use std::path::PathBuf;

/// Triad error types
#[derive(Debug, thiserror::Error)]
pub enum TriadError {
    // Artifact loading errors
    #[error("failed to read manifest {path:?}: {message}")]
    ManifestRead { path: PathBuf, message: String },

    #[error("model version {version} not found in manifest")]
    VersionNotFound { version: String },

    /// The artifact body does not hash to the recorded digest.
    ///
    /// Treated as tampering or corruption; the load that observed it fails.
    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("invalid model artifact {file}: {message}")]
    ArtifactParse { file: String, message: String },

    // Scoring errors
    /// A rule entry could not be evaluated. Aborts one scoring call only.
    #[error("rule evaluation error: {0}")]
    RuleEvaluation(String),

    #[error("no model loaded")]
    NotLoaded,

    // Request errors
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("input contains disallowed content")]
    PolicyBlocked { request_id: String },

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TriadError {
    /// Short machine-readable label, used for metric labels and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            TriadError::ManifestRead { .. } => "manifest_read_error",
            TriadError::VersionNotFound { .. } => "version_not_found",
            TriadError::ChecksumMismatch { .. } => "checksum_mismatch",
            TriadError::ArtifactParse { .. } => "artifact_parse_error",
            TriadError::RuleEvaluation(_) => "rule_evaluation_error",
            TriadError::NotLoaded => "model_not_loaded",
            TriadError::InvalidInput(_) => "validation_error",
            TriadError::PolicyBlocked { .. } => "policy_block",
            TriadError::Configuration(_) => "configuration_error",
            TriadError::Json(_) => "json_error",
            TriadError::Io(_) => "io_error",
        }
    }
}

/// Result type alias for Triad operations
pub type Result<T> = std::result::Result<T, TriadError>;
