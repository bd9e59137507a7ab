//! Unit tests for the policy and patient model

use criteria_core::{
    ComparisonOperator, CriterionType, DigitizedPolicy, LogicalOperator, NormalizedPatientRecord,
    PolicyGraph, ThresholdValue, TreatmentOutcome, Verdict,
};
use proptest::prelude::*;

const POLICY_JSON: &str = r#"{
    "policy_id": "IFX-2024",
    "policy_title": "Infliximab",
    "payer_name": "Acme Health",
    "medication_name": "infliximab",
    "atomic_criteria": {
        "AGE_ADULT": {
            "criterion_id": "AGE_ADULT",
            "criterion_type": "age",
            "name": "Age 18 or older",
            "comparison_operator": "gte",
            "threshold_value": 18
        },
        "CRP": {
            "criterion_id": "CRP",
            "criterion_type": "lab_value",
            "name": "CRP",
            "comparison_operator": "between",
            "threshold_value": "1.0",
            "threshold_value_upper": 10,
            "clinical_codes": [{"system": "LOINC", "code": "1988-5"}],
            "is_required": false
        },
        "NEW_TAG": {
            "criterion_id": "NEW_TAG",
            "criterion_type": "genomic_signature",
            "name": "Signature present"
        }
    },
    "criterion_groups": {
        "ROOT": {"group_id": "ROOT", "operator": "AND", "criteria": ["AGE_ADULT"], "subgroups": ["LABS"]},
        "LABS": {"group_id": "LABS", "operator": "or", "criteria": ["CRP", "NEW_TAG"]}
    },
    "indications": [
        {"indication_id": "CD", "indication_name": "Crohn's disease", "initial_approval_criteria": "ROOT"}
    ],
    "step_therapy_requirements": [
        {"requirement_id": "ST", "indication": "CD", "required_drug_classes": ["corticosteroid"], "minimum_trials": 1}
    ]
}"#;

#[test]
fn test_policy_document_parses() -> anyhow::Result<()> {
    let policy: DigitizedPolicy = serde_json::from_str(POLICY_JSON)?;

    assert_eq!(policy.atomic_criteria.len(), 3);
    let crp = policy.criterion("CRP").expect("CRP criterion");
    assert_eq!(crp.comparison_operator, Some(ComparisonOperator::Between));
    assert_eq!(crp.threshold_value.as_ref().and_then(ThresholdValue::as_f64), Some(1.0));
    assert!(!crp.is_required);
    assert_eq!(
        policy.criterion("NEW_TAG").map(|c| c.criterion_type.clone()),
        Some(CriterionType::Other("genomic_signature".to_string()))
    );
    assert_eq!(policy.group("LABS").map(|g| g.operator), Some(LogicalOperator::Or));
    Ok(())
}

#[test]
fn test_policy_serializes_back_to_same_document() -> anyhow::Result<()> {
    let policy: DigitizedPolicy = serde_json::from_str(POLICY_JSON)?;
    let json = serde_json::to_string(&policy)?;
    let again: DigitizedPolicy = serde_json::from_str(&json)?;
    assert_eq!(policy, again);
    Ok(())
}

#[test]
fn test_graph_over_parsed_policy() -> anyhow::Result<()> {
    let policy: DigitizedPolicy = serde_json::from_str(POLICY_JSON)?;
    let graph = PolicyGraph::build(&policy);
    assert_eq!(graph.len(), 2);
    assert!(graph.lookup("ROOT").is_some());
    assert!(graph.back_edges().is_empty());
    assert!(graph.criterion("AGE_ADULT").is_some());
    Ok(())
}

#[test]
fn test_patient_record_parses() -> anyhow::Result<()> {
    let json = r#"{
        "patient_id": "p-1",
        "age_years": 34,
        "gender": "Female",
        "diagnosis_codes": ["K50.90"],
        "prior_treatments": [
            {"medication_name": "Prednisone", "drug_class": "corticosteroid", "outcome": "Steroid Dependent", "duration_weeks": 12}
        ],
        "clinical_markers": {"rems_enrolled": true, "refractory_to": ["lenalidomide"]}
    }"#;
    let patient: NormalizedPatientRecord = serde_json::from_str(json)?;
    assert_eq!(patient.gender_lower().as_deref(), Some("female"));
    assert_eq!(
        patient.prior_treatments[0].outcome,
        Some(TreatmentOutcome::SteroidDependent)
    );
    assert_eq!(patient.marker_bool("rems_enrolled"), Some(true));
    assert_eq!(
        patient.marker("refractory_to").map(|m| m.as_str_list()),
        Some(vec!["lenalidomide".to_string()])
    );
    Ok(())
}

fn any_verdict() -> impl Strategy<Value = Verdict> {
    prop_oneof![
        Just(Verdict::Met),
        Just(Verdict::NotMet),
        Just(Verdict::InsufficientData),
        Just(Verdict::NotApplicable),
    ]
}

proptest! {
    #[test]
    fn invert_is_an_involution(v in any_verdict()) {
        prop_assert_eq!(v.invert().invert(), v);
    }

    #[test]
    fn invert_preserves_decisiveness(v in any_verdict()) {
        prop_assert_eq!(v.invert().is_decisive(), v.is_decisive());
    }

    #[test]
    fn text_thresholds_never_yield_non_finite(s in ".*") {
        if let Some(n) = ThresholdValue::Text(s).as_f64() {
            prop_assert!(n.is_finite());
        }
    }
}
