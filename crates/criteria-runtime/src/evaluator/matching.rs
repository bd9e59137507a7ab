//! Matching heuristics between criteria and patient facts
//!
//! Each finder walks the patient's records in order and returns the first record that
//! satisfies any of its match rules. Rules are tried in priority order per record, so an
//! earlier record matched by a weak rule wins over a later record matched by a strong
//! one. LOINC codes are the exception: a LOINC hit anywhere in the lab list wins.

use criteria_core::{AtomicCriterion, LabResult, NormalizedPatientRecord, PriorTreatment, Screening};

/// Minimum length for free-text containment matches
pub(crate) const MIN_WORD: usize = 4;

/// Words that never identify a lab test on their own
const LAB_NOISE_WORDS: [&str; 12] = [
    "test", "level", "value", "result", "lab", "blood", "serum", "plasma", "the", "and", "for",
    "with",
];

/// Criterion text fragments mapped to canonical screening types
const SCREENING_ALIASES: [(&str, &str); 6] = [
    ("tb", "tb"),
    ("tuberculosis", "tb"),
    ("hepatitis b", "hepatitis_b"),
    ("hep b", "hepatitis_b"),
    ("hepatitis c", "hepatitis_c"),
    ("hep c", "hepatitis_c"),
];

fn lowered(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Split on anything that is not alphanumeric
pub(crate) fn word_tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Does `text` contain a substring match of `needle` in either direction
pub(crate) fn contains_either(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}

/// Find the first prior treatment that matches a criterion's drug requirements.
///
/// Rules per record: exact drug name, drug name substring (either direction), exact drug
/// class, drug class substring, treatment name inside the criterion text, then a drug
/// class word inside the description.
pub fn find_treatment<'p>(
    criterion: &AtomicCriterion,
    patient: &'p NormalizedPatientRecord,
) -> Option<&'p PriorTreatment> {
    let names = lowered(&criterion.drug_names);
    let classes = lowered(&criterion.drug_classes);
    let name = criterion.name_lower();
    let description = criterion.description_lower();
    let treatments = &patient.prior_treatments;

    let rules: [&dyn Fn(&PriorTreatment) -> bool; 6] = [
        &|tx| names.contains(&tx.name_lower()),
        &|tx| {
            let tx_name = tx.name_lower();
            names.iter().any(|dn| contains_either(dn, &tx_name))
        },
        &|tx| {
            let class = tx.class_lower();
            !class.is_empty() && classes.contains(&class)
        },
        &|tx| {
            let class = tx.class_lower();
            classes.iter().any(|dc| contains_either(dc, &class))
        },
        &|tx| {
            let tx_name = tx.name_lower();
            tx_name.chars().count() >= MIN_WORD
                && (description.contains(&tx_name) || name.contains(&tx_name))
        },
        &|tx| {
            tx.class_lower()
                .split_whitespace()
                .any(|word| word.chars().count() >= MIN_WORD && description.contains(word))
        },
    ];

    treatments
        .iter()
        .find(|tx| rules.iter().any(|rule| rule(tx)))
}

/// Find the lab result a criterion refers to.
///
/// LOINC code across all labs first; then, per lab in order: exact test name, name containment (at least 4 characters),
/// short test name as a whole word, then keyword overlap ignoring noise words.
pub fn find_lab_result<'p>(
    criterion: &AtomicCriterion,
    patient: &'p NormalizedPatientRecord,
) -> Option<&'p LabResult> {
    let labs = &patient.lab_results;

    let loinc: Vec<&str> = criterion
        .codes_in_system("LOINC")
        .map(|c| c.code.trim())
        .collect();
    if let Some(lab) = labs.iter().find(|lab| {
        lab.loinc_code
            .as_deref()
            .map(|code| loinc.contains(&code.trim()))
            .unwrap_or(false)
    }) {
        return Some(lab);
    }

    let name = criterion.name_lower();
    let description = criterion.description_lower();
    let name_words = word_tokens(&name);
    let description_words = word_tokens(&description);
    let keywords: Vec<&str> = name
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_WORD && !LAB_NOISE_WORDS.contains(w))
        .collect();

    let rules: [&dyn Fn(&str) -> bool; 4] = [
        &|lab| lab == name,
        &|lab| {
            (lab.chars().count() >= MIN_WORD
                && (name.contains(lab) || description.contains(lab)))
                || (name.chars().count() >= MIN_WORD && lab.contains(name.as_str()))
        },
        &|lab| {
            lab.chars().count() < MIN_WORD
                && lab.chars().all(char::is_alphabetic)
                && (name_words.contains(&lab) || description_words.contains(&lab))
        },
        &|lab| {
            let tokens: Vec<&str> = lab.split_whitespace().collect();
            keywords.iter().any(|kw| tokens.contains(kw))
        },
    ];

    labs.iter().find(|lab| {
        let lab_name = lab.test_name.trim().to_lowercase();
        !lab_name.is_empty() && rules.iter().any(|rule| rule(lab_name.as_str()))
    })
}

/// Find the screening a criterion refers to, by type name or a known alias.
pub fn find_screening<'p>(
    criterion: &AtomicCriterion,
    patient: &'p NormalizedPatientRecord,
) -> Option<&'p Screening> {
    let text = criterion.text_lower();
    patient.completed_screenings.iter().find(|screening| {
        let kind = screening.screening_type.trim().to_lowercase();
        if kind.is_empty() {
            return false;
        }
        text.contains(&kind)
            || SCREENING_ALIASES
                .iter()
                .any(|(alias, canonical)| *canonical == kind && text.contains(alias))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use criteria_core::{ClinicalCode, CriterionType};

    fn treatment_criterion() -> AtomicCriterion {
        AtomicCriterion::new("TX", CriterionType::PriorTreatmentFailed, "Prior therapy")
    }

    #[test]
    fn test_earlier_record_wins_over_stronger_rule() {
        let c = treatment_criterion().with_drug_names(["adalimumab"]);
        let patient = NormalizedPatientRecord::new("p")
            .with_treatment(PriorTreatment::new("adalimumab-atto"))
            .with_treatment(PriorTreatment::new("Adalimumab"));
        let tx = find_treatment(&c, &patient).unwrap();
        assert_eq!(tx.medication_name, "adalimumab-atto");
    }

    #[test]
    fn test_earlier_lab_wins_over_exact_name() {
        let c = AtomicCriterion::new("HGB", CriterionType::LabValue, "hemoglobin")
            .with_description("Hemoglobin A1c below 7");
        let patient = NormalizedPatientRecord::new("p")
            .with_lab(LabResult::new("Hemoglobin A1c", Some(6.5)))
            .with_lab(LabResult::new("Hemoglobin", Some(12.0)));
        assert_eq!(find_lab_result(&c, &patient).unwrap().test_name, "Hemoglobin A1c");
    }

    #[test]
    fn test_name_substring_either_direction() {
        let c = treatment_criterion().with_drug_names(["infliximab-dyyb"]);
        let patient =
            NormalizedPatientRecord::new("p").with_treatment(PriorTreatment::new("Infliximab"));
        assert!(find_treatment(&c, &patient).is_some());
    }

    #[test]
    fn test_class_exact_and_substring() {
        let c = treatment_criterion().with_drug_classes(["TNF inhibitor"]);
        let exact = NormalizedPatientRecord::new("p")
            .with_treatment(PriorTreatment::new("Humira").with_class("tnf inhibitor"));
        assert!(find_treatment(&c, &exact).is_some());

        let partial = NormalizedPatientRecord::new("p")
            .with_treatment(PriorTreatment::new("Humira").with_class("TNF inhibitor (biologic)"));
        assert!(find_treatment(&c, &partial).is_some());
    }

    #[test]
    fn test_description_name_needs_four_chars() {
        let c = treatment_criterion().with_description("Failure of MTX or methotrexate");
        let short =
            NormalizedPatientRecord::new("p").with_treatment(PriorTreatment::new("MTX"));
        assert!(find_treatment(&c, &short).is_none());

        let long =
            NormalizedPatientRecord::new("p").with_treatment(PriorTreatment::new("Methotrexate"));
        assert!(find_treatment(&c, &long).is_some());
    }

    #[test]
    fn test_class_keyword_in_description() {
        let c = treatment_criterion().with_description("Trial of a conventional corticosteroid");
        let patient = NormalizedPatientRecord::new("p")
            .with_treatment(PriorTreatment::new("Prednisone").with_class("systemic corticosteroid"));
        assert!(find_treatment(&c, &patient).is_some());
    }

    #[test]
    fn test_empty_drug_name_does_not_match_everything() {
        let c = treatment_criterion().with_drug_names([""]);
        let patient =
            NormalizedPatientRecord::new("p").with_treatment(PriorTreatment::new("Aspirin"));
        assert!(find_treatment(&c, &patient).is_none());
    }

    #[test]
    fn test_lab_loinc_first() {
        let c = AtomicCriterion::new("CRP", CriterionType::LabValue, "Hemoglobin")
            .with_code(ClinicalCode::new("LOINC", "1988-5"));
        let patient = NormalizedPatientRecord::new("p")
            .with_lab(LabResult::new("Hemoglobin", Some(12.0)))
            .with_lab(LabResult::new("C-reactive protein", Some(3.0)).with_loinc("1988-5"));
        assert_eq!(
            find_lab_result(&c, &patient).unwrap().test_name,
            "C-reactive protein"
        );
    }

    #[test]
    fn test_lab_short_name_word_boundary() {
        let c = AtomicCriterion::new("CRP", CriterionType::LabValue, "Elevated CRP, mg/L");
        let patient = NormalizedPatientRecord::new("p")
            .with_lab(LabResult::new("ESR", Some(40.0)))
            .with_lab(LabResult::new("CRP", Some(12.0)));
        assert_eq!(find_lab_result(&c, &patient).unwrap().test_name, "CRP");

        let c = AtomicCriterion::new("X", CriterionType::LabValue, "Scrpt marker");
        assert!(find_lab_result(&c, &patient).is_none());
    }

    #[test]
    fn test_lab_containment_and_keywords() {
        let c = AtomicCriterion::new("ALC", CriterionType::LabValue, "Absolute lymphocyte count");
        let patient = NormalizedPatientRecord::new("p")
            .with_lab(LabResult::new("Lymphocyte count, absolute", Some(1.2)));
        assert!(find_lab_result(&c, &patient).is_some());

        let c = AtomicCriterion::new("X", CriterionType::LabValue, "Serum level");
        let patient = NormalizedPatientRecord::new("p")
            .with_lab(LabResult::new("Serum glucose", Some(1.0)));
        assert!(find_lab_result(&c, &patient).is_none());
    }

    #[test]
    fn test_screening_aliases() {
        let c = AtomicCriterion::new("TB", CriterionType::SafetyScreeningCompleted, "Tuberculosis screening");
        let patient = NormalizedPatientRecord::new("p")
            .with_screening(Screening::new("hepatitis_b", true, Some(true)))
            .with_screening(Screening::new("TB", true, Some(true)));
        assert_eq!(find_screening(&c, &patient).unwrap().screening_type, "TB");

        let c = AtomicCriterion::new("HBV", CriterionType::SafetyScreeningNegative, "Hep B panel");
        assert_eq!(
            find_screening(&c, &patient).unwrap().screening_type,
            "hepatitis_b"
        );
    }
}
