//! Diff result model

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
    Unchanged,
}

/// Impact of a change, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Cosmetic,
    Minor,
    Material,
    Breaking,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Cosmetic => "cosmetic",
            Severity::Minor => "minor",
            Severity::Material => "material",
            Severity::Breaking => "breaking",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diff-level rollup of change severities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityAssessment {
    #[default]
    LowImpact,
    ModerateImpact,
    HighImpact,
}

impl SeverityAssessment {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityAssessment::LowImpact => "low_impact",
            SeverityAssessment::ModerateImpact => "moderate_impact",
            SeverityAssessment::HighImpact => "high_impact",
        }
    }
}

impl fmt::Display for SeverityAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Criterion,
    Group,
    Indication,
    Exclusion,
    StepTherapy,
}

/// One field that differs between the two versions of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub severity: Severity,
}

impl FieldChange {
    pub fn new(
        field_name: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            old_value,
            new_value,
            severity: Severity::Minor,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// "field: old -> new"
    pub fn describe(&self) -> String {
        format!(
            "{}: {} -> {}",
            self.field_name,
            self.old_value.as_deref().unwrap_or("None"),
            self.new_value.as_deref().unwrap_or("None")
        )
    }
}

/// Change record for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityChange {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub entity_name: String,
    pub change_type: ChangeType,
    pub severity: Severity,
    #[serde(default)]
    pub field_changes: Vec<FieldChange>,
    /// Id in the old version when reconciliation matched a renamed entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_id: Option<String>,
    #[serde(default)]
    pub human_summary: String,
}

impl EntityChange {
    pub fn new(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: impl Into<String>,
        change_type: ChangeType,
        severity: Severity,
    ) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
            entity_name: entity_name.into(),
            change_type,
            severity,
            field_changes: Vec::new(),
            previous_id: None,
            human_summary: String::new(),
        }
    }

    pub fn unchanged(entity_type: EntityType, entity_id: &str, entity_name: &str) -> Self {
        Self::new(entity_type, entity_id, entity_name, ChangeType::Unchanged, Severity::Cosmetic)
    }

    /// Modified record whose severity is the maximum of its field severities
    pub fn modified(
        entity_type: EntityType,
        entity_id: &str,
        entity_name: &str,
        field_changes: Vec<FieldChange>,
    ) -> Self {
        let severity = field_changes
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::Minor);
        let human_summary = field_changes
            .iter()
            .map(FieldChange::describe)
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            field_changes,
            human_summary,
            ..Self::new(entity_type, entity_id, entity_name, ChangeType::Modified, severity)
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.human_summary = summary.into();
        self
    }

    pub fn with_previous_id(mut self, previous_id: Option<String>) -> Self {
        self.previous_id = previous_id;
        self
    }

    pub fn is_change(&self) -> bool {
        self.change_type != ChangeType::Unchanged
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub total_criteria_old: usize,
    pub total_criteria_new: usize,
    pub added_count: usize,
    pub removed_count: usize,
    pub modified_count: usize,
    pub unchanged_count: usize,
    pub breaking_changes: usize,
    pub material_changes: usize,
    pub severity_assessment: SeverityAssessment,
}

impl DiffSummary {
    /// Count change records. Unchanged records never count as breaking or material.
    pub fn tally<'a>(changes: impl IntoIterator<Item = &'a EntityChange>) -> Self {
        let mut summary = DiffSummary::default();
        for change in changes {
            match change.change_type {
                ChangeType::Added => summary.added_count += 1,
                ChangeType::Removed => summary.removed_count += 1,
                ChangeType::Modified => summary.modified_count += 1,
                ChangeType::Unchanged => {
                    summary.unchanged_count += 1;
                    continue;
                }
            }
            match change.severity {
                Severity::Breaking => summary.breaking_changes += 1,
                Severity::Material => summary.material_changes += 1,
                Severity::Minor | Severity::Cosmetic => {}
            }
        }
        summary.severity_assessment = if summary.breaking_changes > 0 {
            SeverityAssessment::HighImpact
        } else if summary.material_changes > 0 {
            SeverityAssessment::ModerateImpact
        } else {
            SeverityAssessment::LowImpact
        };
        summary
    }
}

/// Full comparison of two policy versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDiffResult {
    pub policy_id: String,
    pub old_version: String,
    pub new_version: String,
    pub payer: String,
    pub medication: String,
    pub summary: DiffSummary,
    #[serde(default)]
    pub criterion_changes: Vec<EntityChange>,
    #[serde(default)]
    pub group_changes: Vec<EntityChange>,
    #[serde(default)]
    pub indication_changes: Vec<EntityChange>,
    #[serde(default)]
    pub exclusion_changes: Vec<EntityChange>,
    #[serde(default)]
    pub step_therapy_changes: Vec<EntityChange>,
}

impl PolicyDiffResult {
    pub fn all_changes(&self) -> impl Iterator<Item = &EntityChange> {
        self.criterion_changes
            .iter()
            .chain(&self.group_changes)
            .chain(&self.indication_changes)
            .chain(&self.exclusion_changes)
            .chain(&self.step_therapy_changes)
    }

    pub fn has_changes(&self) -> bool {
        self.all_changes().any(EntityChange::is_change)
    }

    pub fn breaking_changes(&self) -> impl Iterator<Item = &EntityChange> {
        self.all_changes()
            .filter(|c| c.is_change() && c.severity == Severity::Breaking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Breaking > Severity::Material);
        assert!(Severity::Material > Severity::Minor);
        assert!(Severity::Minor > Severity::Cosmetic);
        assert_eq!(Severity::Breaking.to_string(), "breaking");
    }

    #[test]
    fn test_modified_takes_max_field_severity() {
        let change = EntityChange::modified(
            EntityType::Criterion,
            "AGE",
            "Adult",
            vec![
                FieldChange::new("threshold_unit", Some("years".into()), None),
                FieldChange::new("drug_names", None, Some("a".into())).with_severity(Severity::Material),
            ],
        );
        assert_eq!(change.severity, Severity::Material);
        assert_eq!(change.human_summary, "threshold_unit: years -> None; drug_names: None -> a");
    }

    #[test]
    fn test_tally_ignores_unchanged_severity() {
        let changes = vec![
            EntityChange::unchanged(EntityType::Criterion, "A", "A"),
            EntityChange::new(EntityType::Exclusion, "E", "E", ChangeType::Removed, Severity::Material),
        ];
        let summary = DiffSummary::tally(&changes);
        assert_eq!(summary.unchanged_count, 1);
        assert_eq!(summary.removed_count, 1);
        assert_eq!(summary.material_changes, 1);
        assert_eq!(summary.severity_assessment, SeverityAssessment::ModerateImpact);
        assert_eq!(
            serde_json::to_value(summary.severity_assessment).unwrap(),
            "moderate_impact"
        );
    }
}
