//! Common test utilities for SDK integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Rheumatoid arthritis policy, version 1: adult patient with a CRP below 10
pub const RA_POLICY_V1: &str = r#"
policy_id: RA-2024
medication_name: Adalimumab
payer_name: Example Health
version: "1"
atomic_criteria:
  AGE_ADULT:
    criterion_id: AGE_ADULT
    criterion_type: age
    name: Adult patient
    comparison_operator: gte
    threshold_value: 18
    threshold_unit: years
  LAB_CRP:
    criterion_id: LAB_CRP
    criterion_type: lab_value
    name: CRP
    comparison_operator: lt
    threshold_value: 10
criterion_groups:
  RA_INITIAL:
    group_id: RA_INITIAL
    operator: AND
    criteria: [AGE_ADULT, LAB_CRP]
indications:
  - indication_id: RA
    indication_name: Rheumatoid arthritis
    initial_approval_criteria: RA_INITIAL
    initial_approval_duration_months: 6
"#;

/// Version 2 tightens the age threshold to 21
pub fn ra_policy_v2() -> String {
    RA_POLICY_V1
        .replace("version: \"1\"", "version: \"2\"")
        .replace("policy_id: RA-2024", "policy_id: RA-2025")
        .replace("threshold_value: 18", "threshold_value: 21")
}

pub const ADULT_PATIENT_JSON: &str = r#"{
  "patient_id": "P-100",
  "date_of_birth": "1990-04-12",
  "lab_results": [{"test_name": "crp", "value": 4.2, "unit": "mg/L"}]
}"#;

/// Temporary directory holding fixture files
pub struct Fixtures {
    dir: TempDir,
}

impl Fixtures {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    /// Write a fixture file and return its path
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
