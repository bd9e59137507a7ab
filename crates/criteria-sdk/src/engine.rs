//! CoverageEngine - evaluation and diffing over a set of loaded policies

use crate::config::EngineConfig;
use crate::error::{Result, SdkError};
use crate::validator::{PolicyValidator, ValidationResult};
use chrono::NaiveDate;
use criteria_core::{DigitizedPolicy, NormalizedPatientRecord};
use criteria_diff::{PolicyDiffResult, PolicyDiffer};
use criteria_runtime::{EvaluationContext, PolicyEvaluationResult, PolicyEvaluator};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Coverage engine
///
/// Holds validated policies keyed by policy id. Evaluation and diffing are
/// synchronous; an engine can be shared across threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CoverageEngine {
    policies: BTreeMap<String, Arc<DigitizedPolicy>>,
    evaluator: PolicyEvaluator,
    differ: PolicyDiffer,
    validator: PolicyValidator,
    config: EngineConfig,
}

impl CoverageEngine {
    pub(crate) fn new(config: EngineConfig, evaluator: PolicyEvaluator) -> Self {
        let differ = PolicyDiffer::new().with_reconciliation(config.reconcile_ids);
        Self {
            policies: BTreeMap::new(),
            evaluator,
            differ,
            validator: PolicyValidator::new(),
            config,
        }
    }

    /// Validate and register a policy, replacing any policy with the same id.
    ///
    /// With strict validation enabled a policy with errors is rejected; otherwise the
    /// diagnostics are logged and the policy is kept.
    pub fn add_policy(&mut self, policy: DigitizedPolicy) -> Result<ValidationResult> {
        let validation = self.validator.validate(&policy);
        if !validation.valid {
            if self.config.strict_validation {
                return Err(SdkError::InvalidPolicy {
                    policy_id: policy.policy_id.clone(),
                    errors: validation.errors.iter().map(ToString::to_string).collect(),
                });
            }
            for error in &validation.errors {
                warn!(policy_id = %policy.policy_id, code = %error.code, "{}", error.message);
            }
        }
        for warning in &validation.warnings {
            warn!(policy_id = %policy.policy_id, code = %warning.code, "{}", warning.message);
        }

        info!(
            policy_id = %policy.policy_id,
            version = %policy.version,
            criteria = policy.atomic_criteria.len(),
            "Registered policy"
        );
        self.policies
            .insert(policy.policy_id.clone(), Arc::new(policy));
        Ok(validation)
    }

    pub fn policy(&self, policy_id: &str) -> Option<&DigitizedPolicy> {
        self.policies.get(policy_id).map(Arc::as_ref)
    }

    pub fn policy_ids(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    /// Evaluation date: the configured `as_of`, else today in local time
    pub fn as_of(&self) -> NaiveDate {
        self.config
            .as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn context(&self) -> EvaluationContext {
        EvaluationContext::new(self.as_of())
    }

    /// Evaluate a patient against a registered policy
    pub fn evaluate(
        &self,
        policy_id: &str,
        patient: &NormalizedPatientRecord,
    ) -> Result<PolicyEvaluationResult> {
        let policy = self
            .policies
            .get(policy_id)
            .ok_or_else(|| SdkError::PolicyNotFound(policy_id.to_string()))?;
        Ok(self.evaluate_policy(policy, patient))
    }

    /// Evaluate a patient against any policy, registered or not
    pub fn evaluate_policy(
        &self,
        policy: &DigitizedPolicy,
        patient: &NormalizedPatientRecord,
    ) -> PolicyEvaluationResult {
        self.evaluator.evaluate(policy, patient, &self.context())
    }

    /// Diff two registered policies by id
    pub fn diff(&self, old_policy_id: &str, new_policy_id: &str) -> Result<PolicyDiffResult> {
        let old = self
            .policies
            .get(old_policy_id)
            .ok_or_else(|| SdkError::PolicyNotFound(old_policy_id.to_string()))?;
        let new = self
            .policies
            .get(new_policy_id)
            .ok_or_else(|| SdkError::PolicyNotFound(new_policy_id.to_string()))?;
        Ok(self.differ.diff(old, new))
    }

    /// Diff two policy versions directly
    pub fn diff_policies(&self, old: &DigitizedPolicy, new: &DigitizedPolicy) -> PolicyDiffResult {
        self.differ.diff(old, new)
    }

    pub fn validate(&self, policy: &DigitizedPolicy) -> ValidationResult {
        self.validator.validate(policy)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
