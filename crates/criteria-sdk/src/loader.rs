//! Policy and patient document loading
//!
//! Documents are JSON or YAML; the format is chosen from the file extension.

use crate::error::{Result, SdkError};
use criteria_core::{DigitizedPolicy, NormalizedPatientRecord};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Detect the format from a path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Ok(DocumentFormat::Json),
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            _ => Err(SdkError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn parse<T: DeserializeOwned>(self, content: &str) -> Result<T> {
        match self {
            DocumentFormat::Json => Ok(serde_json::from_str(content)?),
            DocumentFormat::Yaml => Ok(serde_yaml::from_str(content)?),
        }
    }
}

/// Parse a policy document
pub fn parse_policy(content: &str, format: DocumentFormat) -> Result<DigitizedPolicy> {
    format.parse(content)
}

/// Parse a patient record document
pub fn parse_patient(content: &str, format: DocumentFormat) -> Result<NormalizedPatientRecord> {
    format.parse(content)
}

/// Load a policy from a JSON or YAML file
pub async fn load_policy(path: impl AsRef<Path>) -> Result<DigitizedPolicy> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)?;
    let content = tokio::fs::read_to_string(path).await?;
    let policy = parse_policy(&content, format)?;
    debug!(
        path = %path.display(),
        policy_id = %policy.policy_id,
        criteria = policy.atomic_criteria.len(),
        "Loaded policy"
    );
    Ok(policy)
}

/// Load a patient record from a JSON or YAML file
pub async fn load_patient(path: impl AsRef<Path>) -> Result<NormalizedPatientRecord> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)?;
    let content = tokio::fs::read_to_string(path).await?;
    parse_patient(&content, format)
}
