//! Clinical markers and documentation presence
//!
//! Clinical marker criteria are free text ("HER2-negative", "ECOG 0-1", "No permanent
//! ventilator dependence"). Each check below recognises one family of phrasing and
//! either decides the criterion or passes. A check that recognises its phrasing but
//! finds no patient data also passes, so later checks still get a chance. Anything
//! left over needs a human.

use super::compare::compare_numeric;
use crate::context::EvaluationContext;
use crate::result::CriterionEvaluation;
use criteria_core::{
    AtomicCriterion, Biomarker, ComparisonOperator, NormalizedPatientRecord, TreatmentOutcome,
};

/// Criterion phrases and the biomarker names that answer them
const BIOMARKER_KEYWORDS: [(&str, &[&str]); 10] = [
    ("hormone receptor", &["HR", "ER"]),
    ("hr-positive", &["HR", "ER"]),
    ("hr positive", &["HR", "ER"]),
    ("estrogen receptor", &["ER"]),
    ("progesterone receptor", &["PR"]),
    ("her2", &["HER2"]),
    ("bcma", &["BCMA"]),
    ("pik3ca", &["PIK3CA"]),
    ("ki-67", &["Ki-67"]),
    ("ki67", &["Ki-67"]),
];

/// Motor function scales used for neuromuscular assessments
const MOTOR_SCORE_TYPES: [&str; 6] = ["CHOP-INTEND", "HFMSE", "HINE", "ULM", "MFM32", "RULM"];

fn is_motor_score(score_type: &str) -> bool {
    MOTOR_SCORE_TYPES.contains(&score_type.trim().to_uppercase().as_str())
}

/// Text of a criterion in the forms the checks need
struct MarkerText {
    name: String,
    combined: String,
}

impl MarkerText {
    fn of(criterion: &AtomicCriterion) -> Self {
        Self {
            name: criterion.name_lower(),
            combined: criterion.text_lower(),
        }
    }

    fn mentions(&self, phrase: &str) -> bool {
        self.combined.contains(phrase)
    }
}

type MarkerCheck =
    fn(&AtomicCriterion, &NormalizedPatientRecord, &MarkerText) -> Option<CriterionEvaluation>;

const MARKER_CHECKS: [MarkerCheck; 8] = [
    check_biomarker,
    check_organ_function,
    check_ventilator,
    check_symptom_status,
    check_performance_status,
    check_progression,
    check_motor_improvement,
    check_endocrine_resistance,
];

pub(crate) fn evaluate_clinical_marker(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    let text = MarkerText::of(criterion);
    MARKER_CHECKS
        .iter()
        .find_map(|check| check(criterion, patient, &text))
        .unwrap_or_else(|| {
            CriterionEvaluation::insufficient(
                criterion,
                format!("Clinical marker '{}' requires manual verification", criterion.name),
            )
        })
}

fn biomarker_matches(bm: &Biomarker, allowed: &[String], name: &str) -> bool {
    let result = bm.result.as_deref().map(str::to_lowercase);
    if !allowed.is_empty() {
        return result.map(|r| allowed.contains(&r)).unwrap_or(false);
    }
    if name.contains("negative") {
        bm.positive == Some(false) || result.as_deref() == Some("negative")
    } else if name.contains("positive") {
        bm.positive == Some(true) || result.as_deref() == Some("positive")
    } else {
        bm.result.is_some()
    }
}

/// Biomarker phrasing always decides: a recognised keyword without patient data is a gap.
fn check_biomarker(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    text: &MarkerText,
) -> Option<CriterionEvaluation> {
    let (keyword, marker_names) = BIOMARKER_KEYWORDS
        .iter()
        .find(|(keyword, _)| text.mentions(keyword))?;

    let found = marker_names.iter().find_map(|marker| {
        patient
            .biomarkers
            .iter()
            .find(|bm| bm.biomarker_name.trim().eq_ignore_ascii_case(marker))
    });
    let Some(bm) = found else {
        return Some(CriterionEvaluation::insufficient(
            criterion,
            format!("Biomarker data for '{}' not available", keyword),
        ));
    };

    let result = bm.result.as_deref().unwrap_or("unknown");
    let met = biomarker_matches(bm, &criterion.allowed_lower(), &text.name);
    Some(
        CriterionEvaluation::decided(
            criterion,
            met,
            format!(
                "Biomarker {}={} {} criterion",
                bm.biomarker_name,
                result,
                if met { "matches" } else { "does not match" }
            ),
        )
        .with_evidence(format!("{}: {}", bm.biomarker_name, result)),
    )
}

fn check_organ_function(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    text: &MarkerText,
) -> Option<CriterionEvaluation> {
    if !(text.mentions("organ function") || text.mentions("organ and bone marrow")) {
        return None;
    }
    let adequate = patient.marker("organ_function_adequate")?.is_truthy();
    Some(
        CriterionEvaluation::decided(
            criterion,
            adequate,
            format!(
                "Organ function {}",
                if adequate { "adequate" } else { "not adequate" }
            ),
        )
        .with_evidence(format!("Organ function adequate: {}", adequate)),
    )
}

/// "No permanent ventilator dependence" is met when the patient is not dependent.
fn check_ventilator(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    text: &MarkerText,
) -> Option<CriterionEvaluation> {
    if !text.mentions("ventilator") {
        return None;
    }
    let dependent = patient.marker("ventilator_dependent")?.is_truthy();
    Some(
        CriterionEvaluation::decided(
            criterion,
            !dependent,
            format!("Ventilator dependent={}", dependent),
        )
        .with_evidence(format!("Ventilator dependent: {}", dependent)),
    )
}

fn check_symptom_status(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    text: &MarkerText,
) -> Option<CriterionEvaluation> {
    // "asymptomatic" contains "symptomatic"
    if !text.mentions("symptomatic") {
        return None;
    }
    let status = patient
        .marker_str("symptom_status")
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())?;
    let met = if text.name.contains("asymptomatic") {
        status == "asymptomatic"
    } else if text.name.contains("symptomatic") {
        status == "symptomatic"
    } else {
        true
    };
    Some(
        CriterionEvaluation::decided(
            criterion,
            met,
            format!(
                "Symptom status '{}' {} criterion",
                status,
                if met { "matches" } else { "does not match" }
            ),
        )
        .with_evidence(format!("Symptom status: {}", status)),
    )
}

/// ECOG score compared to the threshold, defaulting to `lte`. A documented score with
/// no usable threshold is met.
fn check_performance_status(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    text: &MarkerText,
) -> Option<CriterionEvaluation> {
    if !(text.mentions("performance status") || text.mentions("ecog")) {
        return None;
    }
    let score = patient
        .functional_scores
        .iter()
        .find(|fs| fs.score_type.trim().eq_ignore_ascii_case("ECOG"))?;

    let threshold = criterion.threshold_value.as_ref().and_then(|t| t.as_f64());
    let met = match (score.score_value, threshold) {
        (Some(value), Some(threshold)) => compare_numeric(
            value,
            threshold,
            Some(criterion.comparison_operator.unwrap_or(ComparisonOperator::Lte)),
            criterion.threshold_value_upper.as_ref(),
        ),
        _ => true,
    };
    let shown = score
        .score_value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let reasoning = match criterion.threshold_value.as_ref() {
        Some(t) => format!("ECOG performance status {} vs threshold {}", shown, t),
        None => format!("ECOG performance status {}", shown),
    };
    Some(CriterionEvaluation::decided(criterion, met, reasoning).with_evidence(format!("ECOG: {}", shown)))
}

fn check_progression(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    text: &MarkerText,
) -> Option<CriterionEvaluation> {
    if !(text.mentions("no disease progression") || text.mentions("no progression")) {
        return None;
    }
    let status = patient
        .marker_str("disease_status")
        .filter(|s| !s.trim().is_empty())?;
    let progressed = status.to_lowercase().contains("progress");
    Some(
        CriterionEvaluation::decided(
            criterion,
            !progressed,
            format!(
                "Disease status '{}' {} progression",
                status,
                if progressed { "shows" } else { "does not show" }
            ),
        )
        .with_evidence(format!("Disease status: {}", status)),
    )
}

/// Motor score at or above baseline counts as improvement or stabilization. With no
/// baseline on file a documented score is enough.
fn check_motor_improvement(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    text: &MarkerText,
) -> Option<CriterionEvaluation> {
    if !(text.mentions("clinical improvement") || text.mentions("stabilization")) {
        return None;
    }
    let score = patient
        .functional_scores
        .iter()
        .find(|fs| is_motor_score(&fs.score_type))?;
    let shown = score
        .score_value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let baseline = patient
        .marker_f64("hfmse_prior")
        .or_else(|| patient.marker_f64("baseline_motor_score"));
    if let (Some(value), Some(baseline)) = (score.score_value, baseline) {
        let stable = value >= baseline;
        return Some(
            CriterionEvaluation::decided(
                criterion,
                stable,
                format!(
                    "Motor score {} vs baseline {}: {}",
                    value,
                    baseline,
                    if stable { "stable/improved" } else { "declined" }
                ),
            )
            .with_evidence(format!(
                "{}: {} (baseline: {})",
                score.score_type, value, baseline
            )),
        );
    }

    Some(
        CriterionEvaluation::met(
            criterion,
            format!("Motor assessment documented: {}={}", score.score_type, shown),
        )
        .with_evidence(format!("{}: {}", score.score_type, shown)),
    )
}

fn check_endocrine_resistance(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    text: &MarkerText,
) -> Option<CriterionEvaluation> {
    if !(text.mentions("endocrine") && text.mentions("resist")) {
        return None;
    }
    let tx = patient.prior_treatments.iter().find(|tx| {
        tx.class_lower().contains("endocrine")
            && matches!(
                tx.outcome,
                Some(TreatmentOutcome::Failed)
                    | Some(TreatmentOutcome::InadequateResponse)
                    | Some(TreatmentOutcome::PartialResponse)
            )
    })?;
    Some(
        CriterionEvaluation::met(
            criterion,
            format!("Endocrine resistance documented: {}", tx.medication_name),
        )
        .with_evidence(format!("Failed endocrine therapy: {}", tx.medication_name)),
    )
}

pub(crate) fn evaluate_documentation(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    let combined = criterion.text_lower();

    if combined.contains("rems") {
        if let Some(enrolled) = patient.marker("rems_enrolled").map(|m| m.is_truthy()) {
            return CriterionEvaluation::decided(
                criterion,
                enrolled,
                format!(
                    "REMS enrollment {}",
                    if enrolled { "confirmed" } else { "not confirmed" }
                ),
            )
            .with_evidence(format!("REMS enrolled: {}", enrolled));
        }
    }

    if combined.contains("motor milestone") || combined.contains("motor assessment") {
        let allowed: Vec<String> = criterion
            .allowed_values
            .iter()
            .map(|v| v.trim().to_uppercase())
            .collect();
        let documented = patient.functional_scores.iter().find(|fs| {
            allowed.contains(&fs.score_type.trim().to_uppercase()) || is_motor_score(&fs.score_type)
        });
        if let Some(fs) = documented {
            let shown = fs
                .score_value
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            return CriterionEvaluation::met(
                criterion,
                format!("Baseline motor score available: {}", fs.score_type),
            )
            .with_evidence(format!("Motor score documented: {}={}", fs.score_type, shown));
        }
    }

    CriterionEvaluation::insufficient(criterion, "Documentation presence requires manual verification")
}
