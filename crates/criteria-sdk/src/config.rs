//! Configuration types for CoverageEngine

use crate::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Policy file path(s), JSON or YAML
    pub policy_files: Vec<PathBuf>,

    /// Fixed evaluation date; today when unset
    pub as_of: Option<NaiveDate>,

    /// Pair renumbered criteria when diffing
    pub reconcile_ids: bool,

    /// Install the tracing subscriber on build
    pub enable_tracing: bool,

    /// Reject policies with validation errors at build time
    pub strict_validation: bool,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            policy_files: Vec::new(),
            as_of: None,
            reconcile_ids: false,
            enable_tracing: false,
            strict_validation: true,
        }
    }

    /// Load configuration from `.env`, an optional `config/criteria` file and
    /// `CRITERIA_*` environment variables, in increasing precedence.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/criteria").required(false))
            .add_source(
                config::Environment::with_prefix("CRITERIA")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("policy_files"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        tracing::debug!(
            policy_files = config.policy_files.len(),
            strict = config.strict_validation,
            "Loaded engine configuration"
        );
        Ok(config)
    }

    /// Add a policy file
    pub fn with_policy_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.policy_files.push(path.into());
        self
    }

    /// Pin the evaluation date
    pub fn with_as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn with_reconciliation(mut self, enable: bool) -> Self {
        self.reconcile_ids = enable;
        self
    }

    pub fn with_strict_validation(mut self, enable: bool) -> Self {
        self.strict_validation = enable;
        self
    }

    /// Enable tracing
    pub fn enable_tracing(mut self, enable: bool) -> Self {
        self.enable_tracing = enable;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
