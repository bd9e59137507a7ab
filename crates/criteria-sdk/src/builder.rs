//! Builder pattern for CoverageEngine

use crate::config::EngineConfig;
use crate::engine::CoverageEngine;
use crate::error::Result;
use crate::loader::load_policy;
use crate::telemetry::init_tracing;
use chrono::NaiveDate;
use criteria_core::DigitizedPolicy;
use criteria_runtime::{EvaluatorRegistry, PolicyEvaluator};
use std::path::PathBuf;

/// Builder for CoverageEngine
///
/// # Example
///
/// ```rust,ignore
/// use criteria_sdk::CoverageEngineBuilder;
///
/// let engine = CoverageEngineBuilder::new()
///     .add_policy_file("policies/adalimumab.yaml")
///     .with_as_of(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
///     .build()
///     .await?;
///
/// let result = engine.evaluate("ADALIMUMAB-2024", &patient)?;
/// ```
pub struct CoverageEngineBuilder {
    config: EngineConfig,
    policies: Vec<DigitizedPolicy>,
    registry: Option<EvaluatorRegistry>,
}

impl CoverageEngineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::with_config(EngineConfig::new())
    }

    /// Start from an existing configuration, e.g. one from [`EngineConfig::load`]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            policies: Vec::new(),
            registry: None,
        }
    }

    /// Add a policy file
    pub fn add_policy_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.policy_files.push(path.into());
        self
    }

    /// Add multiple policy files
    pub fn add_policy_files(mut self, paths: Vec<PathBuf>) -> Self {
        self.config.policy_files.extend(paths);
        self
    }

    /// Add an in-memory policy (alternative to file path)
    pub fn add_policy(mut self, policy: DigitizedPolicy) -> Self {
        self.policies.push(policy);
        self
    }

    /// Replace the standard evaluator registry
    pub fn with_registry(mut self, registry: EvaluatorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_as_of(mut self, date: NaiveDate) -> Self {
        self.config.as_of = Some(date);
        self
    }

    pub fn with_reconciliation(mut self, enable: bool) -> Self {
        self.config.reconcile_ids = enable;
        self
    }

    pub fn strict_validation(mut self, enable: bool) -> Self {
        self.config.strict_validation = enable;
        self
    }

    /// Enable tracing
    pub fn enable_tracing(mut self, enable: bool) -> Self {
        self.config.enable_tracing = enable;
        self
    }

    /// Build the coverage engine
    ///
    /// Policy files are loaded first, then in-memory policies; a later policy with the
    /// same id replaces an earlier one.
    pub async fn build(self) -> Result<CoverageEngine> {
        if self.config.enable_tracing {
            if let Err(e) = init_tracing() {
                // A host application may already own the global subscriber
                tracing::debug!("{}", e);
            }
        }

        let mut loaded = Vec::with_capacity(self.config.policy_files.len() + self.policies.len());
        for path in &self.config.policy_files {
            loaded.push(load_policy(path).await?);
        }
        loaded.extend(self.policies);

        let registry = self.registry.unwrap_or_else(EvaluatorRegistry::standard);
        let mut engine = CoverageEngine::new(self.config, PolicyEvaluator::new(registry));
        for policy in loaded {
            engine.add_policy(policy)?;
        }

        tracing::info!(policies = engine.policy_ids().count(), "Coverage engine ready");
        Ok(engine)
    }
}

impl Default for CoverageEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
