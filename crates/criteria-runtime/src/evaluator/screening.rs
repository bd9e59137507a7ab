//! Safety screenings (TB, hepatitis B, hepatitis C and similar)

use super::matching::find_screening;
use crate::context::EvaluationContext;
use crate::result::CriterionEvaluation;
use criteria_core::{AtomicCriterion, NormalizedPatientRecord};

const NO_SCREENINGS: &str = "No screening data available";

pub(crate) fn evaluate_screening_completed(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    if patient.completed_screenings.is_empty() {
        return CriterionEvaluation::insufficient(criterion, NO_SCREENINGS);
    }
    match find_screening(criterion, patient) {
        Some(s) if s.completed => CriterionEvaluation::met(
            criterion,
            format!("Safety screening {} completed", s.screening_type),
        )
        .with_evidence(format!("Screening '{}' completed", s.screening_type)),
        Some(_) => CriterionEvaluation::not_met(criterion, "Screening not completed"),
        None => CriterionEvaluation::insufficient(criterion, "Screening not found"),
    }
}

/// Requires a completed screening with an explicitly negative result.
pub(crate) fn evaluate_screening_negative(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    if patient.completed_screenings.is_empty() {
        return CriterionEvaluation::insufficient(criterion, NO_SCREENINGS);
    }
    match find_screening(criterion, patient) {
        Some(s) if s.completed && s.result_negative == Some(true) => CriterionEvaluation::met(
            criterion,
            format!("Safety screening {} negative", s.screening_type),
        )
        .with_evidence(format!("Screening '{}' completed and negative", s.screening_type)),
        Some(s) if s.completed && s.result_negative == Some(false) => {
            CriterionEvaluation::not_met(
                criterion,
                format!("Safety screening {} not negative", s.screening_type),
            )
            .with_evidence(format!("Screening '{}' positive/not negative", s.screening_type))
        }
        _ => CriterionEvaluation::insufficient(criterion, "Screening result not available"),
    }
}
