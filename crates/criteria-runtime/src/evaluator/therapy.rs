//! Concurrent therapy requirements and exclusions, and custom criteria

use super::matching::contains_either;
use crate::context::EvaluationContext;
use crate::result::CriterionEvaluation;
use criteria_core::{AtomicCriterion, NormalizedPatientRecord, PriorTreatment, TreatmentOutcome, Verdict};

/// Agents that satisfy a "combination with an aromatase inhibitor or fulvestrant" requirement
const COMBINATION_AGENTS: [&str; 6] = [
    "aromatase",
    "fulvestrant",
    "letrozole",
    "anastrozole",
    "exemestane",
    "inavolisib",
];

const CLINICAL_REVIEW: &str = "Concurrent therapy status requires clinical review";

/// Outcomes that mean the therapy has ended and cannot be concurrent
fn has_ended(tx: &PriorTreatment) -> bool {
    matches!(
        tx.outcome,
        Some(TreatmentOutcome::Failed)
            | Some(TreatmentOutcome::Completed)
            | Some(TreatmentOutcome::InadequateResponse)
            | Some(TreatmentOutcome::Intolerant)
    )
}

fn drug_names_lower(criterion: &AtomicCriterion) -> Vec<String> {
    criterion
        .drug_names
        .iter()
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

/// Boolean marker check where a truthy marker means the exclusion applies
fn exclusion_marker(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    key: &str,
    label: &str,
) -> Option<CriterionEvaluation> {
    let present = patient.marker(key)?.is_truthy();
    Some(
        CriterionEvaluation::decided(
            criterion,
            !present,
            format!("{} {}", label, if present { "present" } else { "not present" }),
        )
        .with_evidence(format!("{}: {}", label, present)),
    )
}

pub(crate) fn evaluate_no_concurrent(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    let combined = criterion.text_lower();
    let drugs = drug_names_lower(criterion);

    if combined.contains("gene therapy") {
        let gene = patient.marker("prior_gene_therapy");
        let car_t = patient.marker("prior_car_t_therapy");
        if gene.is_some() || car_t.is_some() {
            let flagged = gene.map(|m| m.is_truthy()).unwrap_or(false)
                || car_t.map(|m| m.is_truthy()).unwrap_or(false);
            let received = flagged
                || patient.prior_treatments.iter().any(|tx| {
                    let tx_name = tx.name_lower();
                    drugs.iter().any(|dn| contains_either(dn, &tx_name))
                });
            return CriterionEvaluation::decided(
                criterion,
                !received,
                format!(
                    "Gene therapy {}",
                    if received { "previously received" } else { "not received" }
                ),
            )
            .with_evidence(format!("Prior gene therapy: {}", received));
        }
    }

    if combined.contains("risdiplam") {
        if let Some(eval) =
            exclusion_marker(criterion, patient, "concurrent_risdiplam", "Concurrent risdiplam")
        {
            return eval;
        }
    }

    if combined.contains("clinical trial") {
        if let Some(eval) = exclusion_marker(
            criterion,
            patient,
            "clinical_trial_enrollment",
            "Clinical trial enrollment",
        ) {
            return eval;
        }
    }

    if drugs.is_empty() {
        return CriterionEvaluation::insufficient(criterion, CLINICAL_REVIEW);
    }

    let active = patient.prior_treatments.iter().find(|tx| {
        let tx_name = tx.name_lower();
        !has_ended(tx) && drugs.iter().any(|dn| contains_either(dn, &tx_name))
    });
    match active {
        Some(tx) => CriterionEvaluation::not_met(
            criterion,
            format!(
                "Excluded therapy {} found (outcome: {})",
                tx.medication_name,
                tx.outcome.as_ref().map(|o| o.as_str()).unwrap_or("unknown")
            ),
        )
        .with_evidence(format!("Patient on excluded therapy: {}", tx.medication_name)),
        None => CriterionEvaluation::met(
            criterion,
            "None of the excluded drugs found in active or ongoing treatment",
        )
        .with_evidence("No excluded therapies found in current treatment"),
    }
}

pub(crate) fn evaluate_concurrent(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    let combined = criterion.text_lower();

    if combined.contains("testicular") || combined.contains("steroidogenesis") {
        if patient.gender_lower().as_deref() == Some("female") {
            return CriterionEvaluation::new(
                criterion,
                Verdict::NotApplicable,
                "Male testicular suppression not applicable to female patients",
            )
            .with_evidence("Patient is female");
        }
        if let Some(suppressed) = patient
            .marker("male_testicular_suppression")
            .map(|m| m.is_truthy())
        {
            return CriterionEvaluation::decided(
                criterion,
                suppressed,
                format!(
                    "Testicular suppression {}",
                    if suppressed { "confirmed" } else { "not confirmed" }
                ),
            )
            .with_evidence(format!("Male testicular suppression: {}", suppressed));
        }
    }

    if ["combination", "aromatase", "fulvestrant"]
        .iter()
        .any(|kw| combined.contains(kw))
    {
        let partner = patient.prior_treatments.iter().find(|tx| {
            let name = tx.name_lower();
            let class = tx.class_lower();
            COMBINATION_AGENTS
                .iter()
                .any(|agent| name.contains(agent) || class.contains(agent))
        });
        if let Some(tx) = partner {
            return CriterionEvaluation::met(
                criterion,
                format!("Patient receiving combination therapy with {}", tx.medication_name),
            )
            .with_evidence(format!("Combination therapy with {}", tx.medication_name));
        }
    }

    CriterionEvaluation::insufficient(criterion, CLINICAL_REVIEW)
}

pub(crate) fn evaluate_custom(
    criterion: &AtomicCriterion,
    _patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    CriterionEvaluation::insufficient(criterion, "Custom criterion requires manual evaluation")
}
