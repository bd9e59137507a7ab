//! Age and gender

use super::compare::compare_numeric;
use crate::context::EvaluationContext;
use crate::result::CriterionEvaluation;
use criteria_core::{AtomicCriterion, NormalizedPatientRecord};

pub(crate) fn evaluate_age(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    ctx: &EvaluationContext,
) -> CriterionEvaluation {
    let Some(age) = patient.age_on(ctx.as_of) else {
        return CriterionEvaluation::insufficient(criterion, "Patient age not available");
    };
    let Some(raw) = criterion.threshold_value.as_ref() else {
        return CriterionEvaluation::insufficient(criterion, "No threshold defined in criterion");
    };
    let Some(threshold) = raw.as_f64() else {
        return CriterionEvaluation::insufficient(
            criterion,
            format!("Non-numeric threshold value: {}", raw),
        );
    };

    let met = compare_numeric(
        f64::from(age),
        threshold,
        criterion.comparison_operator,
        criterion.threshold_value_upper.as_ref(),
    );
    let op = criterion
        .comparison_operator
        .map(|op| op.as_str())
        .unwrap_or("gte");
    CriterionEvaluation::decided(
        criterion,
        met,
        format!(
            "Age {} {} {} {}",
            age,
            if met { "meets" } else { "does not meet" },
            op,
            threshold
        ),
    )
    .with_evidence(format!("Patient age: {} years", age))
}

pub(crate) fn evaluate_gender(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    let Some(gender) = patient.gender_lower() else {
        return CriterionEvaluation::insufficient(criterion, "Patient gender not available");
    };

    let mut allowed: Vec<String> = criterion
        .allowed_lower()
        .into_iter()
        .filter(|v| !v.is_empty())
        .collect();
    if allowed.is_empty() {
        if let Some(threshold) = &criterion.threshold_value {
            let value = threshold.to_string().trim().to_lowercase();
            if !value.is_empty() {
                allowed.push(value);
            }
        }
    }

    let met = allowed.is_empty() || allowed.contains(&gender);
    CriterionEvaluation::decided(
        criterion,
        met,
        format!(
            "Gender '{}' {} in allowed values {:?}",
            gender,
            if met { "is" } else { "is not" },
            allowed
        ),
    )
    .with_evidence(format!("Patient gender: {}", gender))
}
