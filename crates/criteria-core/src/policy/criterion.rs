//! Atomic criteria

use crate::policy::operator::ComparisonOperator;
use crate::types::ThresholdValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag selecting the evaluator for a criterion
///
/// Tags that are not recognised are kept verbatim in [`CriterionType::Other`] so a
/// policy with a new tag still loads; evaluation of such a criterion resolves to
/// insufficient data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CriterionType {
    Age,
    Gender,
    DiagnosisConfirmed,
    DiagnosisSeverity,
    DiseaseDuration,
    PriorTreatmentTried,
    PriorTreatmentFailed,
    PriorTreatmentIntolerant,
    PriorTreatmentContraindicated,
    PriorTreatmentDuration,
    LabValue,
    LabTestCompleted,
    SafetyScreeningCompleted,
    SafetyScreeningNegative,
    PrescriberSpecialty,
    PrescriberConsultation,
    ClinicalMarker,
    Documentation,
    ConcurrentTherapy,
    NoConcurrentTherapy,
    Custom,
    Other(String),
}

impl CriterionType {
    /// Every tag with a dedicated evaluator
    pub const KNOWN: [CriterionType; 21] = [
        CriterionType::Age,
        CriterionType::Gender,
        CriterionType::DiagnosisConfirmed,
        CriterionType::DiagnosisSeverity,
        CriterionType::DiseaseDuration,
        CriterionType::PriorTreatmentTried,
        CriterionType::PriorTreatmentFailed,
        CriterionType::PriorTreatmentIntolerant,
        CriterionType::PriorTreatmentContraindicated,
        CriterionType::PriorTreatmentDuration,
        CriterionType::LabValue,
        CriterionType::LabTestCompleted,
        CriterionType::SafetyScreeningCompleted,
        CriterionType::SafetyScreeningNegative,
        CriterionType::PrescriberSpecialty,
        CriterionType::PrescriberConsultation,
        CriterionType::ClinicalMarker,
        CriterionType::Documentation,
        CriterionType::ConcurrentTherapy,
        CriterionType::NoConcurrentTherapy,
        CriterionType::Custom,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            CriterionType::Age => "age",
            CriterionType::Gender => "gender",
            CriterionType::DiagnosisConfirmed => "diagnosis_confirmed",
            CriterionType::DiagnosisSeverity => "diagnosis_severity",
            CriterionType::DiseaseDuration => "disease_duration",
            CriterionType::PriorTreatmentTried => "prior_treatment_tried",
            CriterionType::PriorTreatmentFailed => "prior_treatment_failed",
            CriterionType::PriorTreatmentIntolerant => "prior_treatment_intolerant",
            CriterionType::PriorTreatmentContraindicated => "prior_treatment_contraindicated",
            CriterionType::PriorTreatmentDuration => "prior_treatment_duration",
            CriterionType::LabValue => "lab_value",
            CriterionType::LabTestCompleted => "lab_test_completed",
            CriterionType::SafetyScreeningCompleted => "safety_screening_completed",
            CriterionType::SafetyScreeningNegative => "safety_screening_negative",
            CriterionType::PrescriberSpecialty => "prescriber_specialty",
            CriterionType::PrescriberConsultation => "prescriber_consultation",
            CriterionType::ClinicalMarker => "clinical_marker_present",
            CriterionType::Documentation => "documentation_present",
            CriterionType::ConcurrentTherapy => "concurrent_therapy",
            CriterionType::NoConcurrentTherapy => "no_concurrent_therapy",
            CriterionType::Custom => "custom",
            CriterionType::Other(tag) => tag.as_str(),
        }
    }
}

impl From<String> for CriterionType {
    fn from(tag: String) -> Self {
        let normalized = tag.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "clinical_marker" => return CriterionType::ClinicalMarker,
            "documentation" => return CriterionType::Documentation,
            _ => {}
        }
        CriterionType::KNOWN
            .iter()
            .find(|known| known.as_str() == normalized)
            .cloned()
            .unwrap_or(CriterionType::Other(tag))
    }
}

impl From<&str> for CriterionType {
    fn from(tag: &str) -> Self {
        CriterionType::from(tag.to_string())
    }
}

impl From<CriterionType> for String {
    fn from(kind: CriterionType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for CriterionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coded clinical concept (ICD-10, LOINC, HCPCS, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClinicalCode {
    pub system: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl ClinicalCode {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            code: code.into(),
            display: None,
        }
    }

    /// "system:code" key used for order-insensitive comparison
    pub fn key(&self) -> String {
        format!("{}:{}", self.system, self.code)
    }

    pub fn is_system(&self, system: &str) -> bool {
        self.system.eq_ignore_ascii_case(system)
    }
}

fn default_true() -> bool {
    true
}

/// A single indivisible eligibility check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicCriterion {
    /// Unique id within the policy
    pub criterion_id: String,

    /// Evaluator selector
    pub criterion_type: CriterionType,

    /// Short human readable name
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Verbatim source text from the policy document
    #[serde(default)]
    pub policy_text: String,

    #[serde(default)]
    pub clinical_codes: Vec<ClinicalCode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_operator: Option<ComparisonOperator>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_value: Option<ThresholdValue>,

    /// Upper bound for `between`, second member for `in`/`not_in`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_value_upper: Option<ThresholdValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_unit: Option<String>,

    #[serde(default)]
    pub allowed_values: Vec<String>,

    #[serde(default)]
    pub drug_names: Vec<String>,

    #[serde(default)]
    pub drug_classes: Vec<String>,

    #[serde(default)]
    pub evidence_types: Vec<String>,

    #[serde(default = "default_true")]
    pub is_required: bool,

    #[serde(default)]
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_duration_days: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_confidence: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_section: Option<String>,
}

impl AtomicCriterion {
    pub fn new(
        criterion_id: impl Into<String>,
        criterion_type: CriterionType,
        name: impl Into<String>,
    ) -> Self {
        Self {
            criterion_id: criterion_id.into(),
            criterion_type,
            name: name.into(),
            description: String::new(),
            policy_text: String::new(),
            clinical_codes: Vec::new(),
            comparison_operator: None,
            threshold_value: None,
            threshold_value_upper: None,
            threshold_unit: None,
            allowed_values: Vec::new(),
            drug_names: Vec::new(),
            drug_classes: Vec::new(),
            evidence_types: Vec::new(),
            is_required: true,
            category: String::new(),
            minimum_duration_days: None,
            extraction_confidence: None,
            source_section: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_threshold(mut self, op: ComparisonOperator, value: impl Into<ThresholdValue>) -> Self {
        self.comparison_operator = Some(op);
        self.threshold_value = Some(value.into());
        self
    }

    pub fn with_upper(mut self, upper: impl Into<ThresholdValue>) -> Self {
        self.threshold_value_upper = Some(upper.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.threshold_unit = Some(unit.into());
        self
    }

    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_drug_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drug_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_drug_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drug_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_code(mut self, code: ClinicalCode) -> Self {
        self.clinical_codes.push(code);
        self
    }

    pub fn with_minimum_duration_days(mut self, days: u32) -> Self {
        self.minimum_duration_days = Some(days);
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_required = false;
        self
    }

    pub fn name_lower(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn description_lower(&self) -> String {
        self.description.to_lowercase()
    }

    /// Lowercased name and description joined by a space
    pub fn text_lower(&self) -> String {
        format!("{} {}", self.name, self.description).to_lowercase()
    }

    /// Lowercased allowed values
    pub fn allowed_lower(&self) -> Vec<String> {
        self.allowed_values.iter().map(|v| v.trim().to_lowercase()).collect()
    }

    pub fn codes_in_system<'a>(&'a self, system: &'a str) -> impl Iterator<Item = &'a ClinicalCode> + 'a {
        self.clinical_codes.iter().filter(move |c| c.is_system(system))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags_round_trip() {
        for kind in CriterionType::KNOWN {
            let tag = kind.as_str().to_string();
            assert_eq!(CriterionType::from(tag), kind);
        }
    }

    #[test]
    fn test_short_tag_aliases() {
        assert_eq!(CriterionType::from("clinical_marker"), CriterionType::ClinicalMarker);
        assert_eq!(CriterionType::from("Documentation"), CriterionType::Documentation);
        assert_eq!(CriterionType::Documentation.as_str(), "documentation_present");
    }

    #[test]
    fn test_unknown_tag_is_preserved() {
        let kind = CriterionType::from("genetic_panel");
        assert_eq!(kind, CriterionType::Other("genetic_panel".to_string()));
        assert_eq!(kind.as_str(), "genetic_panel");
    }

    #[test]
    fn test_criterion_defaults_from_json() {
        let json = r#"{
            "criterion_id": "AGE_18",
            "criterion_type": "age",
            "name": "Adult",
            "comparison_operator": "gte",
            "threshold_value": 18
        }"#;
        let c: AtomicCriterion = serde_json::from_str(json).unwrap();
        assert!(c.is_required);
        assert_eq!(c.criterion_type, CriterionType::Age);
        assert_eq!(c.threshold_value.as_ref().and_then(|t| t.as_f64()), Some(18.0));
        assert!(c.drug_names.is_empty());
    }

    #[test]
    fn test_builder_and_text() {
        let c = AtomicCriterion::new("TB", CriterionType::SafetyScreeningCompleted, "TB Screening")
            .with_description("Negative TB test")
            .optional();
        assert!(!c.is_required);
        assert_eq!(c.text_lower(), "tb screening negative tb test");
    }

    #[test]
    fn test_clinical_code_key() {
        let code = ClinicalCode::new("ICD-10", "K50.9");
        assert_eq!(code.key(), "ICD-10:K50.9");
        assert!(code.is_system("icd-10"));
    }
}
