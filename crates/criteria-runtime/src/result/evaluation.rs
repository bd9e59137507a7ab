//! Criterion and group evaluation traces
//!
//! These structures capture what each evaluator saw and concluded, so a reviewer can
//! follow a verdict back to the facts that produced it.

use criteria_core::{AtomicCriterion, LogicalOperator, Verdict};
use serde::{Deserialize, Serialize};

/// Result of evaluating one atomic criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionEvaluation {
    pub criterion_id: String,

    pub criterion_name: String,

    /// Type tag of the evaluated criterion
    pub criterion_type: String,

    pub verdict: Verdict,

    /// Patient facts that the verdict rests on
    #[serde(default)]
    pub evidence: Vec<String>,

    /// Human readable explanation of the verdict
    pub reasoning: String,

    pub is_required: bool,
}

impl CriterionEvaluation {
    /// Create an evaluation for a criterion
    pub fn new(criterion: &AtomicCriterion, verdict: Verdict, reasoning: impl Into<String>) -> Self {
        Self {
            criterion_id: criterion.criterion_id.clone(),
            criterion_name: criterion.name.clone(),
            criterion_type: criterion.criterion_type.to_string(),
            verdict,
            evidence: Vec::new(),
            reasoning: reasoning.into(),
            is_required: criterion.is_required,
        }
    }

    pub fn met(criterion: &AtomicCriterion, reasoning: impl Into<String>) -> Self {
        Self::new(criterion, Verdict::Met, reasoning)
    }

    pub fn not_met(criterion: &AtomicCriterion, reasoning: impl Into<String>) -> Self {
        Self::new(criterion, Verdict::NotMet, reasoning)
    }

    pub fn insufficient(criterion: &AtomicCriterion, reasoning: impl Into<String>) -> Self {
        Self::new(criterion, Verdict::InsufficientData, reasoning)
    }

    /// `Met` or `NotMet` depending on `met`
    pub fn decided(criterion: &AtomicCriterion, met: bool, reasoning: impl Into<String>) -> Self {
        Self::new(criterion, Verdict::from_bool(met), reasoning)
    }

    /// Placeholder for a criterion id that has no definition in the policy
    pub fn missing(criterion_id: &str) -> Self {
        Self {
            criterion_id: criterion_id.to_string(),
            criterion_name: criterion_id.to_string(),
            criterion_type: "unknown".to_string(),
            verdict: Verdict::InsufficientData,
            evidence: Vec::new(),
            reasoning: format!("Criterion '{}' is not defined in the policy", criterion_id),
            is_required: true,
        }
    }

    /// Add an evidence line
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }
}

/// Result of evaluating a criterion group and everything below it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEvaluation {
    pub group_id: String,

    pub operator: LogicalOperator,

    #[serde(default)]
    pub negated: bool,

    pub verdict: Verdict,

    #[serde(default)]
    pub criteria_results: Vec<CriterionEvaluation>,

    #[serde(default)]
    pub subgroup_results: Vec<GroupEvaluation>,

    /// Set when the group was short-circuited (cycle, missing definition)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl GroupEvaluation {
    pub fn new(group_id: impl Into<String>, operator: LogicalOperator, verdict: Verdict) -> Self {
        Self {
            group_id: group_id.into(),
            operator,
            negated: false,
            verdict,
            criteria_results: Vec::new(),
            subgroup_results: Vec::new(),
            reasoning: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Every criterion evaluation in this tree, depth first, criteria before subgroups
    pub fn leaves(&self) -> Vec<&CriterionEvaluation> {
        let mut out = Vec::new();
        let mut stack: Vec<&GroupEvaluation> = vec![self];
        while let Some(group) = stack.pop() {
            out.extend(group.criteria_results.iter());
            stack.extend(group.subgroup_results.iter().rev());
        }
        out
    }
}
