//! Step therapy evaluation
//!
//! Each required drug or drug class is matched to the first patient treatment whose
//! name or class contains it. A match is a trial; it counts toward `minimum_trials`
//! when the outcome is a failure, or an intolerance / contraindication the requirement
//! accepts. `minimum_duration_days` and `failure_required` are reported but do not
//! gate satisfaction.

use crate::result::{StepTherapyDrugDetail, StepTherapyEvaluation, StepTherapyRequirementResult};
use criteria_core::{
    DigitizedPolicy, NormalizedPatientRecord, PriorTreatment, StepTherapyRequirement,
    TreatmentOutcome,
};
use tracing::debug;

fn counts_as_trial(requirement: &StepTherapyRequirement, tx: &PriorTreatment) -> bool {
    match &tx.outcome {
        Some(outcome) if outcome.is_failure() => true,
        Some(TreatmentOutcome::Intolerant) => requirement.intolerance_acceptable,
        Some(TreatmentOutcome::Contraindicated) => requirement.contraindication_acceptable,
        _ => false,
    }
}

fn evaluate_requirement(
    requirement: &StepTherapyRequirement,
    patient: &NormalizedPatientRecord,
) -> StepTherapyRequirementResult {
    let mut details = Vec::new();
    let mut drugs_tried = 0u32;
    let mut drugs_failed = 0u32;

    for item in requirement.required_items() {
        let needle = item.trim().to_lowercase();
        if needle.is_empty() {
            continue;
        }
        let Some(tx) = patient
            .prior_treatments
            .iter()
            .find(|tx| tx.name_lower().contains(&needle) || tx.class_lower().contains(&needle))
        else {
            continue;
        };

        drugs_tried += 1;
        let counted = counts_as_trial(requirement, tx);
        if counted {
            drugs_failed += 1;
        }
        details.push(StepTherapyDrugDetail {
            required_item: item.to_string(),
            drug: tx.medication_name.clone(),
            outcome: tx.outcome.clone(),
            duration_weeks: tx.duration_weeks,
            adequate_trial: tx.adequate_trial,
            counted,
        });
    }

    let satisfied = drugs_failed >= requirement.minimum_trials;
    debug!(
        requirement_id = %requirement.requirement_id,
        drugs_tried,
        drugs_failed,
        satisfied,
        "step therapy requirement evaluated"
    );

    StepTherapyRequirementResult {
        requirement_id: requirement.requirement_id.clone(),
        indication: requirement.indication.clone(),
        minimum_trials: requirement.minimum_trials,
        minimum_duration_days: requirement.minimum_duration_days,
        drugs_tried,
        drugs_failed,
        satisfied,
        details,
    }
}

/// Evaluate every step therapy requirement of a policy. Satisfied only when all are.
pub fn evaluate_step_therapy(
    policy: &DigitizedPolicy,
    patient: &NormalizedPatientRecord,
) -> StepTherapyEvaluation {
    if policy.step_therapy_requirements.is_empty() {
        return StepTherapyEvaluation::not_required();
    }

    let requirements: Vec<StepTherapyRequirementResult> = policy
        .step_therapy_requirements
        .iter()
        .map(|req| evaluate_requirement(req, patient))
        .collect();
    StepTherapyEvaluation {
        required: true,
        satisfied: requirements.iter().all(|r| r.satisfied),
        requirements,
    }
}
