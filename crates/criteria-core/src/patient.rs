//! Normalized patient record
//!
//! A flat, read-only snapshot of a patient's clinical facts. It is produced by an
//! adapter upstream and consumed by every criterion evaluator.

use crate::types::MarkerValue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of a prior treatment
///
/// Deserialization accepts free text and maps it through [`TreatmentOutcome::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TreatmentOutcome {
    Failed,
    InadequateResponse,
    PartialResponse,
    SteroidDependent,
    Intolerant,
    Contraindicated,
    Completed,
    Ongoing,
    /// Unrecognised outcome, lowercased
    Other(String),
}

impl TreatmentOutcome {
    /// Map a raw outcome string onto the standard vocabulary
    pub fn normalize(raw: &str) -> TreatmentOutcome {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "failed" | "failure" => TreatmentOutcome::Failed,
            "inadequate_response" | "inadequate response" | "failed_inadequate_response" => {
                TreatmentOutcome::InadequateResponse
            }
            "partial_response"
            | "partial response"
            | "sustained_partial_response"
            | "very_good_partial_response" => TreatmentOutcome::PartialResponse,
            "intolerant" | "intolerance" | "discontinued_adverse_effects" => {
                TreatmentOutcome::Intolerant
            }
            "contraindicated" | "contraindication" => TreatmentOutcome::Contraindicated,
            "steroid_dependent" | "steroid-dependent" | "steroid dependent" => {
                TreatmentOutcome::SteroidDependent
            }
            "progressive_disease"
            | "progressive_disease_on_therapy"
            | "progressed"
            | "complete_response_then_relapsed"
            | "partial_response_then_relapsed"
            | "partial_response_then_progressed"
            | "minimal_response_then_progressed"
            | "initial_improvement_then_decline" => TreatmentOutcome::Failed,
            "completed" => TreatmentOutcome::Completed,
            "ongoing" => TreatmentOutcome::Ongoing,
            _ => TreatmentOutcome::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TreatmentOutcome::Failed => "failed",
            TreatmentOutcome::InadequateResponse => "inadequate_response",
            TreatmentOutcome::PartialResponse => "partial_response",
            TreatmentOutcome::SteroidDependent => "steroid_dependent",
            TreatmentOutcome::Intolerant => "intolerant",
            TreatmentOutcome::Contraindicated => "contraindicated",
            TreatmentOutcome::Completed => "completed",
            TreatmentOutcome::Ongoing => "ongoing",
            TreatmentOutcome::Other(text) => text.as_str(),
        }
    }

    /// failed, inadequate response, partial response or steroid dependent
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TreatmentOutcome::Failed
                | TreatmentOutcome::InadequateResponse
                | TreatmentOutcome::PartialResponse
                | TreatmentOutcome::SteroidDependent
        )
    }
}

impl From<String> for TreatmentOutcome {
    fn from(raw: String) -> Self {
        TreatmentOutcome::normalize(&raw)
    }
}

impl From<TreatmentOutcome> for String {
    fn from(outcome: TreatmentOutcome) -> Self {
        outcome.as_str().to_string()
    }
}

impl fmt::Display for TreatmentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorTreatment {
    pub medication_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_weeks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TreatmentOutcome>,
    #[serde(default)]
    pub adequate_trial: bool,
}

impl PriorTreatment {
    pub fn new(medication_name: impl Into<String>) -> Self {
        Self {
            medication_name: medication_name.into(),
            drug_class: None,
            duration_weeks: None,
            outcome: None,
            adequate_trial: false,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.drug_class = Some(class.into());
        self
    }

    pub fn with_outcome(mut self, outcome: TreatmentOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_duration_weeks(mut self, weeks: f64) -> Self {
        self.duration_weeks = Some(weeks);
        self
    }

    pub fn name_lower(&self) -> String {
        self.medication_name.trim().to_lowercase()
    }

    pub fn class_lower(&self) -> String {
        self.drug_class
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }

    pub fn outcome_is(&self, expected: &TreatmentOutcome) -> bool {
        self.outcome.as_ref() == Some(expected)
    }

    pub fn has_failure_outcome(&self) -> bool {
        self.outcome.as_ref().map(|o| o.is_failure()).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabResult {
    pub test_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loinc_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// H, L or absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

impl LabResult {
    pub fn new(test_name: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            test_name: test_name.into(),
            loinc_code: None,
            value,
            unit: None,
            date: None,
            flag: None,
        }
    }

    pub fn with_loinc(mut self, code: impl Into<String>) -> Self {
        self.loinc_code = Some(code.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screening {
    /// tb, hepatitis_b, hepatitis_c, ...
    pub screening_type: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_negative: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Screening {
    pub fn new(screening_type: impl Into<String>, completed: bool, result_negative: Option<bool>) -> Self {
        Self {
            screening_type: screening_type.into(),
            completed,
            result_negative,
            date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biomarker {
    pub biomarker_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive: Option<bool>,
}

impl Biomarker {
    pub fn new(biomarker_name: impl Into<String>) -> Self {
        Self {
            biomarker_name: biomarker_name.into(),
            result: None,
            value: None,
            unit: None,
            positive: None,
        }
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_positive(mut self, positive: bool) -> Self {
        self.positive = Some(positive);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionalScore {
    /// CDAI, ECOG, HFMSE, ...
    pub score_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
}

impl FunctionalScore {
    pub fn new(score_type: impl Into<String>, score_value: Option<f64>) -> Self {
        Self {
            score_type: score_type.into(),
            score_value,
            interpretation: None,
        }
    }
}

/// Flattened clinical facts for one patient
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPatientRecord {
    pub patient_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_years: Option<u32>,

    /// When present, age is derived from this and the evaluation date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(default)]
    pub diagnosis_codes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease_severity: Option<String>,

    #[serde(default)]
    pub prior_treatments: Vec<PriorTreatment>,

    #[serde(default)]
    pub lab_results: Vec<LabResult>,

    #[serde(default)]
    pub completed_screenings: Vec<Screening>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescriber_specialty: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescriber_npi: Option<String>,

    #[serde(default)]
    pub biomarkers: Vec<Biomarker>,

    #[serde(default)]
    pub functional_scores: Vec<FunctionalScore>,

    /// Facts without a typed field
    #[serde(default)]
    pub clinical_markers: BTreeMap<String, MarkerValue>,
}

impl NormalizedPatientRecord {
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            ..Default::default()
        }
    }

    /// Age in whole years on `as_of`. Date of birth wins over a stored age.
    pub fn age_on(&self, as_of: NaiveDate) -> Option<u32> {
        match self.date_of_birth {
            Some(dob) => as_of.years_since(dob),
            None => self.age_years,
        }
    }

    /// Marker lookup; explicit nulls read as absent
    pub fn marker(&self, key: &str) -> Option<&MarkerValue> {
        self.clinical_markers.get(key).filter(|v| !v.is_null())
    }

    pub fn marker_bool(&self, key: &str) -> Option<bool> {
        self.marker(key).and_then(MarkerValue::as_bool)
    }

    pub fn marker_f64(&self, key: &str) -> Option<f64> {
        self.marker(key).and_then(MarkerValue::as_f64)
    }

    pub fn marker_str(&self, key: &str) -> Option<&str> {
        self.marker(key).and_then(MarkerValue::as_str)
    }

    pub fn gender_lower(&self) -> Option<String> {
        self.gender
            .as_deref()
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age_years = Some(age);
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_diagnosis(mut self, code: impl Into<String>) -> Self {
        self.diagnosis_codes.push(code.into());
        self
    }

    pub fn with_treatment(mut self, treatment: PriorTreatment) -> Self {
        self.prior_treatments.push(treatment);
        self
    }

    pub fn with_lab(mut self, lab: LabResult) -> Self {
        self.lab_results.push(lab);
        self
    }

    pub fn with_screening(mut self, screening: Screening) -> Self {
        self.completed_screenings.push(screening);
        self
    }

    pub fn with_biomarker(mut self, biomarker: Biomarker) -> Self {
        self.biomarkers.push(biomarker);
        self
    }

    pub fn with_functional_score(mut self, score: FunctionalScore) -> Self {
        self.functional_scores.push(score);
        self
    }

    pub fn with_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.prescriber_specialty = Some(specialty.into());
        self
    }

    pub fn with_marker(mut self, key: impl Into<String>, value: impl Into<MarkerValue>) -> Self {
        self.clinical_markers.insert(key.into(), value.into());
        self
    }
}
