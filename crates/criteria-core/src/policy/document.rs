//! Digitized policy document

use crate::policy::{
    AtomicCriterion, CriterionGroup, ExclusionCriteria, IndicationCriteria, StepTherapyRequirement,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_version() -> String {
    "1".to_string()
}

/// A payer coverage policy in structured form
///
/// Criteria and groups are keyed by id in ordered maps so that every traversal,
/// diff and report is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitizedPolicy {
    pub policy_id: String,

    #[serde(default)]
    pub policy_number: String,

    #[serde(default)]
    pub policy_title: String,

    #[serde(default)]
    pub payer_name: String,

    pub medication_name: String,

    #[serde(default)]
    pub medication_brand_names: Vec<String>,

    #[serde(default)]
    pub medication_generic_names: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub atomic_criteria: BTreeMap<String, AtomicCriterion>,

    #[serde(default)]
    pub criterion_groups: BTreeMap<String, CriterionGroup>,

    #[serde(default)]
    pub indications: Vec<IndicationCriteria>,

    #[serde(default)]
    pub exclusions: Vec<ExclusionCriteria>,

    #[serde(default)]
    pub step_therapy_requirements: Vec<StepTherapyRequirement>,
}

impl DigitizedPolicy {
    pub fn new(policy_id: impl Into<String>, medication_name: impl Into<String>) -> Self {
        Self {
            policy_id: policy_id.into(),
            policy_number: String::new(),
            policy_title: String::new(),
            payer_name: String::new(),
            medication_name: medication_name.into(),
            medication_brand_names: Vec::new(),
            medication_generic_names: Vec::new(),
            effective_date: None,
            version: default_version(),
            atomic_criteria: BTreeMap::new(),
            criterion_groups: BTreeMap::new(),
            indications: Vec::new(),
            exclusions: Vec::new(),
            step_therapy_requirements: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_criterion(mut self, criterion: AtomicCriterion) -> Self {
        self.add_criterion(criterion);
        self
    }

    pub fn with_group(mut self, group: CriterionGroup) -> Self {
        self.add_group(group);
        self
    }

    pub fn with_indication(mut self, indication: IndicationCriteria) -> Self {
        self.indications.push(indication);
        self
    }

    pub fn with_exclusion(mut self, exclusion: ExclusionCriteria) -> Self {
        self.exclusions.push(exclusion);
        self
    }

    pub fn with_step_therapy(mut self, requirement: StepTherapyRequirement) -> Self {
        self.step_therapy_requirements.push(requirement);
        self
    }

    /// Insert a criterion keyed by its own id, replacing any previous entry
    pub fn add_criterion(&mut self, criterion: AtomicCriterion) {
        self.atomic_criteria
            .insert(criterion.criterion_id.clone(), criterion);
    }

    /// Insert a group keyed by its own id, replacing any previous entry
    pub fn add_group(&mut self, group: CriterionGroup) {
        self.criterion_groups.insert(group.group_id.clone(), group);
    }

    pub fn criterion(&self, id: &str) -> Option<&AtomicCriterion> {
        self.atomic_criteria.get(id)
    }

    pub fn group(&self, id: &str) -> Option<&CriterionGroup> {
        self.criterion_groups.get(id)
    }

    pub fn indication(&self, id: &str) -> Option<&IndicationCriteria> {
        self.indications.iter().find(|i| i.indication_id == id)
    }
}
