//! Indications, exclusions and step therapy requirements

use serde::{Deserialize, Serialize};

/// Dosing guidance attached to an indication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DosingRequirement {
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub dose: String,
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dose: Option<String>,
}

/// A covered indication and the groups that gate approval for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicationCriteria {
    pub indication_id: String,

    pub indication_name: String,

    #[serde(default)]
    pub indication_codes: Vec<crate::policy::ClinicalCode>,

    /// Root group id for initial approval
    pub initial_approval_criteria: String,

    /// Root group id for reauthorization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_criteria: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_approval_duration_months: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_approval_duration_months: Option<u32>,

    #[serde(default)]
    pub dosing_requirements: Vec<DosingRequirement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age_years: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_years: Option<u32>,
}

impl IndicationCriteria {
    pub fn new(
        indication_id: impl Into<String>,
        indication_name: impl Into<String>,
        root_group: impl Into<String>,
    ) -> Self {
        Self {
            indication_id: indication_id.into(),
            indication_name: indication_name.into(),
            indication_codes: Vec::new(),
            initial_approval_criteria: root_group.into(),
            continuation_criteria: None,
            initial_approval_duration_months: None,
            continuation_approval_duration_months: None,
            dosing_requirements: Vec::new(),
            min_age_years: None,
            max_age_years: None,
        }
    }

    pub fn with_duration_months(mut self, months: u32) -> Self {
        self.initial_approval_duration_months = Some(months);
        self
    }

    pub fn with_continuation(mut self, group_id: impl Into<String>) -> Self {
        self.continuation_criteria = Some(group_id.into());
        self
    }
}

/// A condition under which coverage is excluded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionCriteria {
    pub exclusion_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub policy_text: String,

    /// Criterion ids whose evaluation triggers the exclusion
    #[serde(default)]
    pub trigger_criteria: Vec<String>,
}

impl ExclusionCriteria {
    pub fn new(exclusion_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            exclusion_id: exclusion_id.into(),
            name: name.into(),
            description: String::new(),
            policy_text: String::new(),
            trigger_criteria: Vec::new(),
        }
    }

    pub fn with_triggers<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger_criteria = ids.into_iter().map(Into::into).collect();
        self
    }
}

fn default_minimum_trials() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// Prior therapies a patient must try before the requested drug is covered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTherapyRequirement {
    pub requirement_id: String,

    #[serde(default)]
    pub indication: String,

    #[serde(default)]
    pub required_drugs: Vec<String>,

    #[serde(default)]
    pub required_drug_classes: Vec<String>,

    #[serde(default = "default_minimum_trials")]
    pub minimum_trials: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_duration_days: Option<u32>,

    #[serde(default = "default_true")]
    pub failure_required: bool,

    #[serde(default = "default_true")]
    pub intolerance_acceptable: bool,

    #[serde(default = "default_true")]
    pub contraindication_acceptable: bool,

    #[serde(default)]
    pub documentation_requirements: Vec<String>,
}

impl StepTherapyRequirement {
    pub fn new(requirement_id: impl Into<String>, indication: impl Into<String>) -> Self {
        Self {
            requirement_id: requirement_id.into(),
            indication: indication.into(),
            required_drugs: Vec::new(),
            required_drug_classes: Vec::new(),
            minimum_trials: 1,
            minimum_duration_days: None,
            failure_required: true,
            intolerance_acceptable: true,
            contraindication_acceptable: true,
            documentation_requirements: Vec::new(),
        }
    }

    pub fn with_drugs<I, S>(mut self, drugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_drugs = drugs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_drug_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_drug_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_minimum_trials(mut self, trials: u32) -> Self {
        self.minimum_trials = trials;
        self
    }

    /// Required drugs followed by required drug classes
    pub fn required_items(&self) -> impl Iterator<Item = &str> {
        self.required_drugs
            .iter()
            .chain(self.required_drug_classes.iter())
            .map(String::as_str)
    }

    pub fn has_requirements(&self) -> bool {
        !self.required_drugs.is_empty() || !self.required_drug_classes.is_empty()
    }
}
