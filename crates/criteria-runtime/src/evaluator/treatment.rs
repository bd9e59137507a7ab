//! Prior treatment history: tried, failed, intolerant, contraindicated, duration

use super::matching::{contains_either, find_treatment};
use crate::context::EvaluationContext;
use crate::result::CriterionEvaluation;
use criteria_core::{AtomicCriterion, NormalizedPatientRecord, PriorTreatment, TreatmentOutcome};
use regex::Regex;
use std::sync::OnceLock;

const NO_HISTORY: &str = "No prior treatment history available";

/// Patterns for "two or more prior lines of therapy" and "at least 3 lines of therapy"
fn lines_of_therapy_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(\w+)\s+or more\s+(?:prior\s+)?lines?\s+of\s+(?:systemic\s+)?therapy",
            r"(?:at least|received)\s+(\w+)\s+(?:prior\s+)?lines?\s+of\s+(?:systemic\s+)?therapy",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

fn count_word(word: &str) -> Option<u32> {
    match word {
        "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        other => other.parse().ok(),
    }
}

fn required_lines(description: &str) -> Option<u32> {
    lines_of_therapy_patterns()
        .iter()
        .find_map(|re| re.captures(description))
        .and_then(|caps| caps.get(1))
        .and_then(|m| count_word(m.as_str()))
}

fn outcome_label(tx: &PriorTreatment) -> &str {
    tx.outcome.as_ref().map(|o| o.as_str()).unwrap_or("unknown")
}

fn treatment_names(patient: &NormalizedPatientRecord) -> String {
    patient
        .prior_treatments
        .iter()
        .map(|t| t.medication_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn evaluate_tried(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    if patient.prior_treatments.is_empty() {
        return CriterionEvaluation::insufficient(criterion, NO_HISTORY);
    }
    let matched = find_treatment(criterion, patient);
    CriterionEvaluation::decided(
        criterion,
        matched.is_some(),
        format!(
            "Prior treatment {} matching criterion",
            if matched.is_some() { "found" } else { "not found" }
        ),
    )
    .with_evidence(format!("Prior treatments: {}", treatment_names(patient)))
}

pub(crate) fn evaluate_failed(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    if patient.prior_treatments.is_empty() {
        return CriterionEvaluation::insufficient(criterion, NO_HISTORY);
    }

    let description = criterion.description_lower();
    let name = criterion.name_lower().replace('_', " ");

    if let Some(required) = required_lines(&description) {
        return lines_of_therapy(criterion, patient, required);
    }

    if description.contains("refractory")
        && (description.contains("lenalidomide") || description.contains("revlimid"))
    {
        return lenalidomide_refractory(criterion, patient);
    }

    if (description.contains("not previously received gene therapy") || name.contains("no prior"))
        && !criterion.drug_names.is_empty()
    {
        return no_prior_exposure(criterion, patient);
    }

    let Some(tx) = find_treatment(criterion, patient) else {
        return CriterionEvaluation::not_met(criterion, "No matching treatment found in history");
    };
    if tx.has_failure_outcome() {
        CriterionEvaluation::met(
            criterion,
            format!(
                "Treatment {} failed with outcome: {}",
                tx.medication_name,
                outcome_label(tx)
            ),
        )
        .with_evidence(format!("{}: outcome={}", tx.medication_name, outcome_label(tx)))
    } else {
        CriterionEvaluation::not_met(criterion, "Treatment was tried but failure not documented")
            .with_evidence(format!(
                "Treatment found but outcome not a failure: {}",
                outcome_label(tx)
            ))
    }
}

fn lines_of_therapy(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    required: u32,
) -> CriterionEvaluation {
    if let Some(actual) = patient.marker_f64("lines_of_therapy") {
        let met = actual >= f64::from(required);
        return CriterionEvaluation::decided(
            criterion,
            met,
            format!(
                "{} lines {} requirement of {}+",
                actual,
                if met { "meets" } else { "does not meet" },
                required
            ),
        )
        .with_evidence(format!("Lines of therapy: {} (required: {}+)", actual, required));
    }

    let actual = patient.prior_treatments.len();
    let met = actual >= required as usize;
    CriterionEvaluation::decided(
        criterion,
        met,
        format!(
            "{} prior treatments {} {}+ requirement",
            actual,
            if met { "meets" } else { "does not meet" },
            required
        ),
    )
    .with_evidence(format!(
        "Prior treatments count: {} (required: {}+)",
        actual, required
    ))
}

fn is_lenalidomide(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("lenalidomide") || name.contains("revlimid")
}

fn lenalidomide_refractory(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
) -> CriterionEvaluation {
    let refractory_to = patient
        .marker("refractory_to")
        .map(|m| m.as_str_list())
        .unwrap_or_default();
    if let Some(drug) = refractory_to.iter().find(|d| is_lenalidomide(d)) {
        return CriterionEvaluation::met(criterion, "Patient is refractory to lenalidomide")
            .with_evidence(format!("Refractory to: {}", drug));
    }

    let failed = patient.prior_treatments.iter().find(|tx| {
        is_lenalidomide(&tx.medication_name)
            && matches!(
                tx.outcome,
                Some(TreatmentOutcome::Failed)
                    | Some(TreatmentOutcome::InadequateResponse)
                    | Some(TreatmentOutcome::PartialResponse)
            )
    });
    match failed {
        Some(tx) => CriterionEvaluation::met(
            criterion,
            format!("Lenalidomide failure documented: {}", outcome_label(tx)),
        )
        .with_evidence(format!("Lenalidomide: outcome={}", outcome_label(tx))),
        None => CriterionEvaluation::not_met(criterion, "Lenalidomide refractoriness not documented"),
    }
}

/// "No prior X" phrased as a failure criterion: receiving a listed drug fails it.
fn no_prior_exposure(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
) -> CriterionEvaluation {
    let excluded: Vec<String> = criterion
        .drug_names
        .iter()
        .map(|d| d.trim().to_lowercase())
        .collect();
    if let Some(tx) = patient.prior_treatments.iter().find(|tx| {
        let tx_name = tx.name_lower();
        excluded.iter().any(|dn| contains_either(dn, &tx_name))
    }) {
        return CriterionEvaluation::not_met(
            criterion,
            format!("Excluded therapy found: {}", tx.medication_name),
        )
        .with_evidence(format!("Patient received excluded drug: {}", tx.medication_name));
    }

    if let Some(prior) = patient.marker("prior_gene_therapy") {
        let received = prior.is_truthy();
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

    CriterionEvaluation::met(criterion, "None of the excluded drugs found in patient history")
        .with_evidence("No excluded drugs found in treatment history")
}

pub(crate) fn evaluate_intolerant(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    if patient.prior_treatments.is_empty() {
        return CriterionEvaluation::insufficient(criterion, NO_HISTORY);
    }
    match find_treatment(criterion, patient) {
        Some(tx) if tx.outcome_is(&TreatmentOutcome::Intolerant) => CriterionEvaluation::met(
            criterion,
            format!("Patient was intolerant to {}", tx.medication_name),
        )
        .with_evidence(format!("{}: intolerant", tx.medication_name)),
        _ => CriterionEvaluation::not_met(criterion, "Intolerance not documented for matched treatment"),
    }
}

pub(crate) fn evaluate_contraindicated(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    if patient.prior_treatments.is_empty() {
        return CriterionEvaluation::insufficient(criterion, NO_HISTORY);
    }
    match find_treatment(criterion, patient) {
        Some(tx) if tx.outcome_is(&TreatmentOutcome::Contraindicated) => {
            CriterionEvaluation::met(
                criterion,
                format!("Contraindication documented for {}", tx.medication_name),
            )
            .with_evidence(format!("{}: contraindicated", tx.medication_name))
        }
        _ => CriterionEvaluation::not_met(
            criterion,
            "Contraindication not documented for matched treatment",
        ),
    }
}

pub(crate) fn evaluate_duration(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientRecord,
    _ctx: &EvaluationContext,
) -> CriterionEvaluation {
    if patient.prior_treatments.is_empty() {
        return CriterionEvaluation::insufficient(criterion, NO_HISTORY);
    }
    let Some(tx) = find_treatment(criterion, patient) else {
        return CriterionEvaluation::not_met(criterion, "No matching treatment found");
    };
    let Some(weeks) = tx.duration_weeks.filter(|w| w.is_finite()) else {
        return CriterionEvaluation::insufficient(
            criterion,
            format!("Duration not documented for {}", tx.medication_name),
        );
    };

    let threshold_days = criterion
        .threshold_value
        .as_ref()
        .and_then(|t| t.as_f64())
        .map(|d| d.trunc());
    let minimum_days = criterion
        .minimum_duration_days
        .filter(|d| *d > 0)
        .map(f64::from)
        .or(threshold_days);

    let Some(minimum_days) = minimum_days else {
        return CriterionEvaluation::met(criterion, "No minimum duration specified; treatment documented")
            .with_evidence(format!("{}: {} weeks", tx.medication_name, weeks));
    };

    let minimum_weeks = minimum_days / 7.0;
    let met = weeks >= minimum_weeks;
    CriterionEvaluation::decided(
        criterion,
        met,
        format!(
            "Duration {}w {} minimum {:.0}w",
            weeks,
            if met { "meets" } else { "does not meet" },
            minimum_weeks
        ),
    )
    .with_evidence(format!(
        "{}: {} weeks (required: {:.0} weeks)",
        tx.medication_name, weeks, minimum_weeks
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use criteria_core::{ComparisonOperator, CriterionType, MarkerValue, Verdict};

    fn ctx() -> EvaluationContext {
        EvaluationContext::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    fn failed_mtx() -> AtomicCriterion {
        AtomicCriterion::new("MTX", CriterionType::PriorTreatmentFailed, "Methotrexate failure")
            .with_drug_names(["methotrexate"])
    }

    #[test]
    fn test_empty_history_is_insufficient() {
        let empty = NormalizedPatientRecord::new("p");
        for f in [evaluate_tried, evaluate_failed, evaluate_intolerant, evaluate_contraindicated, evaluate_duration] {
            assert_eq!(f(&failed_mtx(), &empty, &ctx()).verdict, Verdict::InsufficientData);
        }
    }

    #[test]
    fn test_tried() {
        let patient = NormalizedPatientRecord::new("p")
            .with_treatment(PriorTreatment::new("Methotrexate"));
        let eval = evaluate_tried(&failed_mtx(), &patient, &ctx());
        assert_eq!(eval.verdict, Verdict::Met);
        assert_eq!(eval.evidence, vec!["Prior treatments: Methotrexate".to_string()]);

        let other = NormalizedPatientRecord::new("p").with_treatment(PriorTreatment::new("Aspirin"));
        assert_eq!(evaluate_tried(&failed_mtx(), &other, &ctx()).verdict, Verdict::NotMet);
    }

    #[test]
    fn test_failed_standard() {
        let failed = NormalizedPatientRecord::new("p").with_treatment(
            PriorTreatment::new("Methotrexate").with_outcome(TreatmentOutcome::SteroidDependent),
        );
        assert_eq!(evaluate_failed(&failed_mtx(), &failed, &ctx()).verdict, Verdict::Met);

        let completed = NormalizedPatientRecord::new("p").with_treatment(
            PriorTreatment::new("Methotrexate").with_outcome(TreatmentOutcome::Completed),
        );
        assert_eq!(evaluate_failed(&failed_mtx(), &completed, &ctx()).verdict, Verdict::NotMet);

        let unrelated = NormalizedPatientRecord::new("p").with_treatment(PriorTreatment::new("Aspirin"));
        assert_eq!(evaluate_failed(&failed_mtx(), &unrelated, &ctx()).verdict, Verdict::NotMet);
    }

    #[test]
    fn test_failed_uses_first_matching_record() {
        let c = AtomicCriterion::new("ADA", CriterionType::PriorTreatmentFailed, "Adalimumab failure")
            .with_drug_names(["adalimumab"]);
        let patient = NormalizedPatientRecord::new("p")
            .with_treatment(PriorTreatment::new("adalimumab-atto").with_outcome(TreatmentOutcome::Ongoing))
            .with_treatment(PriorTreatment::new("Adalimumab").with_outcome(TreatmentOutcome::Failed));
        let eval = evaluate_failed(&c, &patient, &ctx());
        assert_eq!(eval.verdict, Verdict::NotMet);
    }

    #[test]
    fn test_lines_of_therapy() {
        let c = AtomicCriterion::new("LOT", CriterionType::PriorTreatmentFailed, "Prior lines")
            .with_description("Patient has received three or more prior lines of therapy");
        let by_marker = NormalizedPatientRecord::new("p")
            .with_treatment(PriorTreatment::new("A"))
            .with_marker("lines_of_therapy", 4.0);
        assert_eq!(evaluate_failed(&c, &by_marker, &ctx()).verdict, Verdict::Met);

        let by_count = NormalizedPatientRecord::new("p")
            .with_treatment(PriorTreatment::new("A"))
            .with_treatment(PriorTreatment::new("B"));
        let eval = evaluate_failed(&c, &by_count, &ctx());
        assert_eq!(eval.verdict, Verdict::NotMet);
        assert!(eval.evidence[0].contains("required: 3+"));

        let c = c.with_description("received at least 2 lines of systemic therapy");
        assert_eq!(evaluate_failed(&c, &by_count, &ctx()).verdict, Verdict::Met);
    }

    #[test]
    fn test_lenalidomide_refractory() {
        let c = AtomicCriterion::new("LEN", CriterionType::PriorTreatmentFailed, "Len refractory")
            .with_description("Disease refractory to lenalidomide");
        let marker = NormalizedPatientRecord::new("p")
            .with_treatment(PriorTreatment::new("Bortezomib"))
            .with_marker(
                "refractory_to",
                MarkerValue::Array(vec![MarkerValue::from("Revlimid")]),
            );
        assert_eq!(evaluate_failed(&c, &marker, &ctx()).verdict, Verdict::Met);

        let outcome = NormalizedPatientRecord::new("p").with_treatment(
            PriorTreatment::new("Lenalidomide").with_outcome(TreatmentOutcome::PartialResponse),
        );
        assert_eq!(evaluate_failed(&c, &outcome, &ctx()).verdict, Verdict::Met);

        let none = NormalizedPatientRecord::new("p").with_treatment(PriorTreatment::new("Bortezomib"));
        assert_eq!(evaluate_failed(&c, &none, &ctx()).verdict, Verdict::NotMet);
    }

    #[test]
    fn test_no_prior_gene_therapy() {
        let c = AtomicCriterion::new("NOGT", CriterionType::PriorTreatmentFailed, "No_prior gene therapy")
            .with_drug_names(["onasemnogene"]);
        let received = NormalizedPatientRecord::new("p")
            .with_treatment(PriorTreatment::new("Onasemnogene abeparvovec"));
        assert_eq!(evaluate_failed(&c, &received, &ctx()).verdict, Verdict::NotMet);

        let flagged = NormalizedPatientRecord::new("p")
            .with_treatment(PriorTreatment::new("Nusinersen"))
            .with_marker("prior_gene_therapy", true);
        assert_eq!(evaluate_failed(&c, &flagged, &ctx()).verdict, Verdict::NotMet);

        let clean = NormalizedPatientRecord::new("p").with_treatment(PriorTreatment::new("Nusinersen"));
        assert_eq!(evaluate_failed(&c, &clean, &ctx()).verdict, Verdict::Met);
    }

    #[test]
    fn test_intolerant_and_contraindicated() {
        let patient = NormalizedPatientRecord::new("p").with_treatment(
            PriorTreatment::new("Methotrexate").with_outcome(TreatmentOutcome::Intolerant),
        );
        assert_eq!(evaluate_intolerant(&failed_mtx(), &patient, &ctx()).verdict, Verdict::Met);
        assert_eq!(
            evaluate_contraindicated(&failed_mtx(), &patient, &ctx()).verdict,
            Verdict::NotMet
        );
    }

    #[test]
    fn test_duration() {
        let c = AtomicCriterion::new("DUR", CriterionType::PriorTreatmentDuration, "MTX 12 weeks")
            .with_drug_names(["methotrexate"])
            .with_minimum_duration_days(84);
        let long = NormalizedPatientRecord::new("p")
            .with_treatment(PriorTreatment::new("Methotrexate").with_duration_weeks(12.0));
        assert_eq!(evaluate_duration(&c, &long, &ctx()).verdict, Verdict::Met);

        let short = NormalizedPatientRecord::new("p")
            .with_treatment(PriorTreatment::new("Methotrexate").with_duration_weeks(8.0));
        assert_eq!(evaluate_duration(&c, &short, &ctx()).verdict, Verdict::NotMet);

        let unknown = NormalizedPatientRecord::new("p").with_treatment(PriorTreatment::new("Methotrexate"));
        assert_eq!(evaluate_duration(&c, &unknown, &ctx()).verdict, Verdict::InsufficientData);

        let by_threshold = AtomicCriterion::new("DUR", CriterionType::PriorTreatmentDuration, "MTX")
            .with_drug_names(["methotrexate"])
            .with_threshold(ComparisonOperator::Gte, 90.0);
        assert_eq!(evaluate_duration(&by_threshold, &long, &ctx()).verdict, Verdict::NotMet);

        let open = AtomicCriterion::new("DUR", CriterionType::PriorTreatmentDuration, "MTX")
            .with_drug_names(["methotrexate"]);
        assert_eq!(evaluate_duration(&open, &long, &ctx()).verdict, Verdict::Met);
    }
}
