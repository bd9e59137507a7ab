//! SDK error types

use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Configuration source could not be read or deserialized
    #[error("Configuration error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON document could not be parsed
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML document could not be parsed
    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// File extension not recognised as JSON or YAML
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Policy failed strict validation
    #[error("Invalid policy {policy_id}: {}", .errors.join("; "))]
    InvalidPolicy {
        policy_id: String,
        errors: Vec<String>,
    },

    /// Policy id not loaded into the engine
    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    /// Tracing subscriber could not be installed
    #[error("Telemetry error: {0}")]
    TelemetryError(String),
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
