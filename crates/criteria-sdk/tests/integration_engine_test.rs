//! End-to-end tests for the coverage engine facade

mod common;

use chrono::NaiveDate;
use common::{ra_policy_v2, Fixtures, ADULT_PATIENT_JSON, RA_POLICY_V1};
use criteria_sdk::{
    load_patient, load_policy, CoverageEngineBuilder, EngineConfig, SdkError, SeverityAssessment,
    Verdict,
};

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

#[tokio::test]
async fn loads_yaml_policy_and_json_patient() -> anyhow::Result<()> {
    let fixtures = Fixtures::new();
    let policy_path = fixtures.write("ra.yaml", RA_POLICY_V1);
    let patient_path = fixtures.write("patient.json", ADULT_PATIENT_JSON);

    let policy = load_policy(&policy_path).await?;
    assert_eq!(policy.policy_id, "RA-2024");
    assert_eq!(policy.payer_name, "Example Health");

    let patient = load_patient(&patient_path).await?;
    assert_eq!(patient.age_on(as_of()), Some(34));
    Ok(())
}

#[tokio::test]
async fn evaluates_registered_policy() -> anyhow::Result<()> {
    let fixtures = Fixtures::new();
    let engine = CoverageEngineBuilder::new()
        .add_policy_file(fixtures.write("ra.yaml", RA_POLICY_V1))
        .with_as_of(as_of())
        .build()
        .await?;
    let patient = load_patient(fixtures.write("patient.json", ADULT_PATIENT_JSON)).await?;

    let result = engine.evaluate("RA-2024", &patient)?;
    assert_eq!(result.overall_verdict, Verdict::Met);
    assert_eq!(result.overall_readiness, 1.0);
    assert!(result.gaps.is_empty());
    Ok(())
}

#[tokio::test]
async fn as_of_changes_age_outcome() -> anyhow::Result<()> {
    let fixtures = Fixtures::new();
    let patient = load_patient(fixtures.write("patient.json", ADULT_PATIENT_JSON)).await?;

    // 1990-04-12 turns 18 on 2008-04-12
    let engine = CoverageEngineBuilder::new()
        .add_policy_file(fixtures.write("ra.yaml", RA_POLICY_V1))
        .with_as_of(NaiveDate::from_ymd_opt(2008, 1, 1).unwrap())
        .build()
        .await?;
    let result = engine.evaluate("RA-2024", &patient)?;
    assert_eq!(result.overall_verdict, Verdict::NotMet);
    assert_eq!(result.gaps[0].criterion_id, "AGE_ADULT");
    Ok(())
}

#[tokio::test]
async fn unknown_policy_is_an_error() -> anyhow::Result<()> {
    let engine = CoverageEngineBuilder::new().build().await?;
    let patient = criteria_sdk::NormalizedPatientRecord::new("P-1");
    let err = engine.evaluate("NOPE", &patient).unwrap_err();
    assert!(matches!(err, SdkError::PolicyNotFound(ref id) if id == "NOPE"));
    Ok(())
}

#[tokio::test]
async fn diffs_policy_versions() -> anyhow::Result<()> {
    let fixtures = Fixtures::new();
    let engine = CoverageEngineBuilder::new()
        .add_policy_file(fixtures.write("v1.yaml", RA_POLICY_V1))
        .add_policy_file(fixtures.write("v2.yml", &ra_policy_v2()))
        .build()
        .await?;

    let diff = engine.diff("RA-2024", "RA-2025")?;
    assert_eq!(diff.old_version, "1");
    assert_eq!(diff.new_version, "2");
    assert_eq!(diff.summary.modified_count, 1);
    assert_eq!(diff.summary.breaking_changes, 1);
    assert_eq!(diff.summary.severity_assessment, SeverityAssessment::HighImpact);

    let backwards = engine.diff("RA-2025", "RA-2024")?;
    assert_eq!(backwards.summary.breaking_changes, 0);
    Ok(())
}

#[tokio::test]
async fn unsupported_extension_is_rejected() {
    let fixtures = Fixtures::new();
    let path = fixtures.write("ra.toml", RA_POLICY_V1);
    let result = CoverageEngineBuilder::new().add_policy_file(path).build().await;
    assert!(matches!(result, Err(SdkError::UnsupportedFormat(_))));
}

#[tokio::test]
async fn lenient_build_keeps_invalid_policy() -> anyhow::Result<()> {
    let fixtures = Fixtures::new();
    let broken = RA_POLICY_V1.replace("criteria: [AGE_ADULT, LAB_CRP]", "criteria: [AGE_ADULT, LAB_ESR]");
    let path = fixtures.write("broken.yaml", &broken);

    let strict = CoverageEngineBuilder::new().add_policy_file(&path).build().await;
    assert!(matches!(strict, Err(SdkError::InvalidPolicy { .. })));

    let config = EngineConfig::new()
        .with_policy_file(&path)
        .with_as_of(as_of())
        .with_strict_validation(false);
    let engine = CoverageEngineBuilder::with_config(config).build().await?;
    let patient = load_patient(fixtures.write("patient.json", ADULT_PATIENT_JSON)).await?;
    let result = engine.evaluate("RA-2024", &patient)?;
    assert_eq!(result.overall_verdict, Verdict::InsufficientData);
    assert!(!engine.validate(engine.policy("RA-2024").unwrap()).valid);
    Ok(())
}
