//! Prescriber specialty and consultation requirements

use crate::context::EvaluationContext;
use crate::result::CriterionEvaluation;
use criteria_core::{AtomicCriterion, NormalizedPatientRecord};

/// Specialty stems recognised in free-text criteria
const SPECIALTY_STEMS: [&str; 5] = [
    "gastroenterolog",
    "rheumatolog",
    "dermatolog",
    "neurolog",
    "oncolog",
];

/// Attestations that are signed by the provider and never appear in chart data
const ATTESTATION_KEYWORDS: [&str; 9] = [
    "monitoring agreement",
    "monitoring plan",
    "attestation",
    "rems",
    "crs monitor",
    "neurotox",
    "neuro_tox",
    "neurological toxicity monitor",
    "cytokine release monitor",
];

pub(crate) fn evaluate_specialty(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    let Some(specialty) = patient
        .prescriber_specialty
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    else {
        return CriterionEvaluation::insufficient(criterion, "Prescriber specialty not available");
    };
    let specialty_lower = specialty.trim().to_lowercase();

    let allowed = criterion.allowed_lower();
    let met = if !allowed.is_empty() {
        allowed.contains(&specialty_lower)
    } else {
        let description = criterion.description_lower();
        let name = criterion.name_lower();
        [description, name].iter().any(|text| {
            SPECIALTY_STEMS
                .iter()
                .any(|stem| text.contains(stem) && specialty_lower.contains(stem))
        })
    };

    CriterionEvaluation::decided(
        criterion,
        met,
        format!(
            "Specialty '{}' {} requirement",
            specialty,
            if met { "matches" } else { "does not match" }
        ),
    )
    .with_evidence(format!("Prescriber specialty: {}", specialty))
}

/// Attestation-style consultations surface as documentation gaps; the rest are
/// specialty checks.
pub(crate) fn evaluate_consultation(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    ctx: &EvaluationContext,
) -> CriterionEvaluation {
    let combined = criterion.text_lower();
    if ATTESTATION_KEYWORDS.iter().any(|kw| combined.contains(kw)) {
        return CriterionEvaluation::insufficient(
            criterion,
            "Attestation or monitoring agreement requires provider documentation",
        );
    }
    evaluate_specialty(criterion, patient, ctx)
}
