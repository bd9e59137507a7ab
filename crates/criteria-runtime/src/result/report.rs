//! Policy-level evaluation report
//!
//! [`PolicyEvaluationResult`] is the output handed to reporting layers: per-indication
//! verdicts, the readiness score, exclusion and step therapy sub-results, and the
//! list of gaps a reviewer has to close.

use crate::result::{CriterionEvaluation, GroupEvaluation};
use chrono::NaiveDate;
use criteria_core::{TreatmentOutcome, Verdict};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a gap was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    NotMet,
    InsufficientData,
    StepTherapyReview,
    ExclusionReview,
}

impl fmt::Display for GapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GapType::NotMet => "not_met",
            GapType::InsufficientData => "insufficient_data",
            GapType::StepTherapyReview => "step_therapy_review",
            GapType::ExclusionReview => "exclusion_review",
        };
        f.write_str(s)
    }
}

/// Something that stands between the patient and approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub criterion_id: String,
    pub criterion_name: String,
    /// Indication (or exclusion / step therapy bucket) the gap belongs to
    pub indication: String,
    pub gap_type: GapType,
    /// Suggested next step
    pub action: String,
}

impl Gap {
    pub fn not_met(eval: &CriterionEvaluation, indication: &str) -> Self {
        Self {
            criterion_id: eval.criterion_id.clone(),
            criterion_name: eval.criterion_name.clone(),
            indication: indication.to_string(),
            gap_type: GapType::NotMet,
            action: format!("Address unmet criterion: {}", eval.criterion_name),
        }
    }

    pub fn insufficient(eval: &CriterionEvaluation, indication: &str) -> Self {
        Self {
            criterion_id: eval.criterion_id.clone(),
            criterion_name: eval.criterion_name.clone(),
            indication: indication.to_string(),
            gap_type: GapType::InsufficientData,
            action: format!("Obtain documentation for: {}", eval.criterion_name),
        }
    }

    pub fn step_therapy(reason: &str) -> Self {
        Self {
            criterion_id: "STEP_THERAPY".to_string(),
            criterion_name: "Step Therapy Requirements".to_string(),
            indication: "step_therapy".to_string(),
            gap_type: GapType::StepTherapyReview,
            action: format!("Review step therapy: {}", reason),
        }
    }

    pub fn exclusion_review(eval: &CriterionEvaluation, exclusion_name: &str) -> Self {
        Self {
            criterion_id: eval.criterion_id.clone(),
            criterion_name: eval.criterion_name.clone(),
            indication: exclusion_name.to_string(),
            gap_type: GapType::ExclusionReview,
            action: format!("Verify exclusion trigger: {}", eval.criterion_name),
        }
    }
}

/// Evaluation of one indication's approval criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicationEvaluation {
    pub indication_id: String,

    pub indication_name: String,

    pub overall_verdict: Verdict,

    /// Root group trace; absent when the root group is not defined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_criteria_result: Option<GroupEvaluation>,

    pub criteria_met_count: usize,

    pub criteria_total_count: usize,

    /// Required leaves that evaluated to `NotMet`
    #[serde(default)]
    pub unmet_criteria: Vec<CriterionEvaluation>,

    /// Leaves that evaluated to `InsufficientData`
    #[serde(default)]
    pub insufficient_criteria: Vec<CriterionEvaluation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_duration_months: Option<u32>,
}

impl IndicationEvaluation {
    /// Fraction of leaves met for this indication alone
    pub fn readiness(&self) -> f64 {
        if self.criteria_total_count == 0 {
            0.0
        } else {
            self.criteria_met_count as f64 / self.criteria_total_count as f64
        }
    }
}

/// Evaluation of an exclusion's trigger criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionEvaluation {
    pub exclusion_id: String,
    pub name: String,
    #[serde(default)]
    pub trigger_results: Vec<CriterionEvaluation>,
}

/// How one patient treatment was matched against a step therapy item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTherapyDrugDetail {
    /// Required drug or class as written in the policy
    pub required_item: String,
    /// Patient medication that matched it
    pub drug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TreatmentOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_weeks: Option<f64>,
    pub adequate_trial: bool,
    /// Whether the trial counts toward `minimum_trials`
    pub counted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTherapyRequirementResult {
    pub requirement_id: String,
    pub indication: String,
    pub minimum_trials: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_duration_days: Option<u32>,
    pub drugs_tried: u32,
    pub drugs_failed: u32,
    pub satisfied: bool,
    #[serde(default)]
    pub details: Vec<StepTherapyDrugDetail>,
}

/// Step therapy across all requirements of a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTherapyEvaluation {
    /// False when the policy declares no step therapy requirements
    pub required: bool,
    pub satisfied: bool,
    #[serde(default)]
    pub requirements: Vec<StepTherapyRequirementResult>,
}

impl StepTherapyEvaluation {
    pub fn not_required() -> Self {
        Self {
            required: false,
            satisfied: true,
            requirements: Vec::new(),
        }
    }

    /// Summary of the unsatisfied requirements
    pub fn reason(&self) -> String {
        let unsatisfied: Vec<String> = self
            .requirements
            .iter()
            .filter(|r| !r.satisfied)
            .map(|r| {
                format!(
                    "{} has {} of {} required trials documented",
                    r.requirement_id, r.drugs_failed, r.minimum_trials
                )
            })
            .collect();
        if unsatisfied.is_empty() {
            "requirements may not be fully satisfied".to_string()
        } else {
            unsatisfied.join("; ")
        }
    }
}

/// Full result of evaluating a patient against a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEvaluationResult {
    pub policy_id: String,

    pub patient_id: String,

    /// Date the evaluation was computed for
    pub evaluated_on: NaiveDate,

    pub overall_verdict: Verdict,

    /// Met leaves over all leaves, rounded to 3 decimals
    pub overall_readiness: f64,

    #[serde(default)]
    pub indication_evaluations: Vec<IndicationEvaluation>,

    #[serde(default)]
    pub exclusion_evaluations: Vec<ExclusionEvaluation>,

    pub step_therapy_evaluation: StepTherapyEvaluation,

    #[serde(default)]
    pub gaps: Vec<Gap>,
}

impl PolicyEvaluationResult {
    pub fn indication(&self, indication_id: &str) -> Option<&IndicationEvaluation> {
        self.indication_evaluations
            .iter()
            .find(|i| i.indication_id == indication_id)
    }

    pub fn gaps_of_type(&self, gap_type: GapType) -> impl Iterator<Item = &Gap> {
        self.gaps.iter().filter(move |g| g.gap_type == gap_type)
    }
}
