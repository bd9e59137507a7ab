//! Lab values and lab test completion

use super::compare::compare_numeric;
use super::matching::find_lab_result;
use crate::context::EvaluationContext;
use crate::result::CriterionEvaluation;
use criteria_core::{AtomicCriterion, LabResult, NormalizedPatientRecord};

fn lab_evidence(lab: &LabResult, value: f64) -> String {
    format!("{}: {} {}", lab.test_name, value, lab.unit.as_deref().unwrap_or_default())
        .trim_end()
        .to_string()
}

pub(crate) fn evaluate_lab_value(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    if patient.lab_results.is_empty() {
        return CriterionEvaluation::insufficient(criterion, "No lab results available");
    }
    let Some((lab, value)) =
        find_lab_result(criterion, patient).and_then(|lab| lab.value.map(|v| (lab, v)))
    else {
        return CriterionEvaluation::insufficient(
            criterion,
            format!("Lab result '{}' not found in patient data", criterion.name),
        );
    };

    let Some(raw) = criterion.threshold_value.as_ref() else {
        return CriterionEvaluation::met(criterion, "Lab present; no threshold to compare")
            .with_evidence(lab_evidence(lab, value));
    };
    let Some(threshold) = raw.as_f64() else {
        return CriterionEvaluation::insufficient(
            criterion,
            format!("Non-numeric threshold value: {}", raw),
        );
    };

    let met = compare_numeric(
        value,
        threshold,
        criterion.comparison_operator,
        criterion.threshold_value_upper.as_ref(),
    );
    CriterionEvaluation::decided(
        criterion,
        met,
        format!(
            "Lab {} = {} {} threshold {} {}",
            lab.test_name,
            value,
            if met { "meets" } else { "does not meet" },
            criterion
                .comparison_operator
                .map(|op| op.as_str())
                .unwrap_or("gte"),
            threshold
        ),
    )
    .with_evidence(lab_evidence(lab, value))
}

/// A matching lab on file is enough; absence is a documentation gap, not a failure.
pub(crate) fn evaluate_lab_test_completed(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    if patient.lab_results.is_empty() {
        return CriterionEvaluation::insufficient(criterion, "No lab results available");
    }
    match find_lab_result(criterion, patient) {
        Some(lab) => CriterionEvaluation::met(criterion, "Lab test completed")
            .with_evidence(format!("Lab {} found", lab.test_name)),
        None => CriterionEvaluation::insufficient(criterion, "Lab test not found")
            .with_evidence(format!("Lab '{}' not found", criterion.name)),
    }
}
