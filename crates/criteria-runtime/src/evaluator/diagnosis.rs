//! Diagnosis, severity and disease duration

use super::matching::MIN_WORD;
use crate::context::EvaluationContext;
use crate::result::CriterionEvaluation;
use criteria_core::{AtomicCriterion, NormalizedPatientRecord};

/// Uppercase and drop dots so "k50.10" and "K5010" compare equal
fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase().replace('.', "")
}

fn normalize_severity(value: &str) -> String {
    value.trim().to_lowercase().replace(['-', ' '], "_")
}

/// Patient code must equal the criterion code or be a more specific child of it.
pub(crate) fn evaluate_diagnosis_confirmed(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    if patient.diagnosis_codes.is_empty() {
        return CriterionEvaluation::insufficient(criterion, "No diagnosis codes available");
    }

    let criterion_codes: Vec<String> = criterion
        .clinical_codes
        .iter()
        .map(|c| normalize_code(&c.code))
        .filter(|c| !c.is_empty())
        .collect();

    if criterion_codes.is_empty() {
        let mut context = patient.diagnosis_codes.join(" ").to_lowercase();
        if let Some(severity) = &patient.disease_severity {
            context.push(' ');
            context.push_str(&severity.to_lowercase());
        }
        let name = criterion.name_lower().replace('_', " ");
        let hit = name
            .split_whitespace()
            .filter(|w| w.chars().count() >= MIN_WORD)
            .any(|w| context.contains(w));
        return if hit {
            CriterionEvaluation::met(criterion, "Diagnosis confirmed by keyword match")
                .with_evidence(format!("Diagnosis keyword match: {}", criterion.name))
        } else {
            CriterionEvaluation::insufficient(
                criterion,
                "Cannot verify diagnosis without criterion clinical codes",
            )
            .with_evidence("Criterion has no clinical codes; keyword match inconclusive")
        };
    }

    let matched: Vec<&String> = patient
        .diagnosis_codes
        .iter()
        .filter(|pc| {
            let pc = normalize_code(pc);
            criterion_codes.iter().any(|cc| pc.starts_with(cc.as_str()))
        })
        .collect();

    let met = !matched.is_empty();
    let eval = CriterionEvaluation::decided(
        criterion,
        met,
        format!(
            "Diagnosis {} against criterion codes",
            if met { "confirmed" } else { "not confirmed" }
        ),
    );
    matched.into_iter().fold(eval, |eval, code| {
        eval.with_evidence(format!("Diagnosis {} matches criterion code", code))
    })
}

pub(crate) fn evaluate_diagnosis_severity(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    let Some(severity) = patient
        .disease_severity
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    else {
        return CriterionEvaluation::insufficient(criterion, "Disease severity not documented");
    };

    let normalized = normalize_severity(severity);
    let met = if criterion.allowed_values.is_empty() {
        let description = criterion.description_lower();
        ["moderate", "severe"]
            .iter()
            .any(|kw| description.contains(kw) && normalized.contains(kw))
    } else {
        criterion
            .allowed_values
            .iter()
            .any(|allowed| normalize_severity(allowed) == normalized)
    };

    CriterionEvaluation::decided(
        criterion,
        met,
        format!(
            "Severity '{}' {} criterion",
            severity,
            if met { "matches" } else { "does not match" }
        ),
    )
    .with_evidence(format!("Disease severity: {}", severity))
}

pub(crate) fn evaluate_disease_duration(
    criterion: &AtomicCriterion,
    _patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    CriterionEvaluation::insufficient(criterion, "Disease duration requires clinical notes review")
}
