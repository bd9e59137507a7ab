//! Policy differ
//!
//! Pairs entities of two policy versions by id and records, per entity, whether it was
//! added, removed, modified or left unchanged. Output ordering is deterministic: every
//! change list is sorted by entity id.

use crate::reconcile::IdReconciler;
use crate::severity::criterion_field_severity;
use crate::types::{
    ChangeType, DiffSummary, EntityChange, EntityType, FieldChange, PolicyDiffResult, Severity,
};
use criteria_core::{
    AtomicCriterion, CriterionGroup, DigitizedPolicy, ExclusionCriteria, IndicationCriteria,
    StepTherapyRequirement,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Side-by-side pairing of one id across two versions
enum Pairing<'a, T> {
    Added(&'a T),
    Removed(&'a T),
    Both(&'a T, &'a T),
}

fn pair_by_id<'a, T>(
    old: &BTreeMap<&'a str, &'a T>,
    new: &BTreeMap<&'a str, &'a T>,
) -> Vec<(&'a str, Pairing<'a, T>)> {
    let ids: BTreeSet<&'a str> = old.keys().chain(new.keys()).copied().collect();
    ids.into_iter()
        .filter_map(|id| {
            let pairing = match (old.get(id), new.get(id)) {
                (Some(o), Some(n)) => Pairing::Both(*o, *n),
                (None, Some(n)) => Pairing::Added(*n),
                (Some(o), None) => Pairing::Removed(*o),
                (None, None) => return None,
            };
            Some((id, pairing))
        })
        .collect()
}

fn text(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Sorted, comma joined rendering of a list so member order never registers as a change
fn sorted_list<I, S>(items: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut items: Vec<String> = items.into_iter().map(|s| s.as_ref().to_string()).collect();
    if items.is_empty() {
        return None;
    }
    items.sort();
    Some(items.join(","))
}

fn flag(value: bool) -> Option<String> {
    Some(value.to_string())
}

fn number<N: ToString>(value: Option<N>) -> Option<String> {
    value.map(|n| n.to_string())
}

/// Accumulates field changes for one entity pair
#[derive(Default)]
struct FieldDiff {
    changes: Vec<FieldChange>,
}

impl FieldDiff {
    fn compare(&mut self, field: &str, old: Option<String>, new: Option<String>, severity: Severity) {
        if old != new {
            self.changes
                .push(FieldChange::new(field, old, new).with_severity(severity));
        }
    }

    fn into_change(self, entity_type: EntityType, id: &str, name: &str) -> EntityChange {
        if self.changes.is_empty() {
            EntityChange::unchanged(entity_type, id, name)
        } else {
            EntityChange::modified(entity_type, id, name, self.changes)
        }
    }
}

/// Structural differ between two versions of one policy
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyDiffer {
    reconcile: bool,
}

impl PolicyDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable id reconciliation for criteria renumbered between versions
    pub fn with_reconciliation(mut self, enabled: bool) -> Self {
        self.reconcile = enabled;
        self
    }

    pub fn reconciliation_enabled(&self) -> bool {
        self.reconcile
    }

    /// Compare `old` against `new`
    pub fn diff(&self, old: &DigitizedPolicy, new: &DigitizedPolicy) -> PolicyDiffResult {
        let criterion_changes = self.diff_criteria(old, new);
        let group_changes = diff_groups(old, new);
        let indication_changes = diff_indications(&old.indications, &new.indications);
        let exclusion_changes = diff_exclusions(&old.exclusions, &new.exclusions);
        let step_therapy_changes =
            diff_step_therapy(&old.step_therapy_requirements, &new.step_therapy_requirements);

        let mut summary = DiffSummary::tally(
            criterion_changes
                .iter()
                .chain(&group_changes)
                .chain(&indication_changes)
                .chain(&exclusion_changes)
                .chain(&step_therapy_changes),
        );
        summary.total_criteria_old = old.atomic_criteria.len();
        summary.total_criteria_new = new.atomic_criteria.len();

        info!(
            policy_id = %new.policy_id,
            old_version = %old.version,
            new_version = %new.version,
            added = summary.added_count,
            removed = summary.removed_count,
            modified = summary.modified_count,
            breaking = summary.breaking_changes,
            assessment = %summary.severity_assessment,
            "Policy diff complete"
        );

        PolicyDiffResult {
            policy_id: new.policy_id.clone(),
            old_version: old.version.clone(),
            new_version: new.version.clone(),
            payer: new.payer_name.clone(),
            medication: new.medication_name.clone(),
            summary,
            criterion_changes,
            group_changes,
            indication_changes,
            exclusion_changes,
            step_therapy_changes,
        }
    }

    fn diff_criteria(&self, old: &DigitizedPolicy, new: &DigitizedPolicy) -> Vec<EntityChange> {
        let renamed = if self.reconcile {
            IdReconciler::new().reconcile(&old.atomic_criteria, &new.atomic_criteria)
        } else {
            BTreeMap::new()
        };
        let previous_of: BTreeMap<&str, &str> = renamed
            .iter()
            .map(|(new_id, old_id)| (old_id.as_str(), new_id.as_str()))
            .collect();

        // Old criteria are keyed under their new id when reconciled
        let old_map: BTreeMap<&str, &AtomicCriterion> = old
            .atomic_criteria
            .iter()
            .map(|(id, c)| (previous_of.get(id.as_str()).copied().unwrap_or(id.as_str()), c))
            .collect();
        let new_map: BTreeMap<&str, &AtomicCriterion> =
            new.atomic_criteria.iter().map(|(id, c)| (id.as_str(), c)).collect();

        pair_by_id(&old_map, &new_map)
            .into_iter()
            .map(|(id, pairing)| match pairing {
                Pairing::Added(c) => {
                    let (severity, kind) = if c.is_required {
                        (Severity::Breaking, "required")
                    } else {
                        (Severity::Material, "optional")
                    };
                    EntityChange::new(EntityType::Criterion, id, &c.name, ChangeType::Added, severity)
                        .with_summary(format!("New {} criterion added: {}", kind, c.name))
                }
                Pairing::Removed(c) => EntityChange::new(
                    EntityType::Criterion,
                    id,
                    &c.name,
                    ChangeType::Removed,
                    Severity::Material,
                )
                .with_summary(format!("Criterion removed: {}", c.name)),
                Pairing::Both(o, n) => {
                    let change = compare_criteria(id, o, n)
                        .with_previous_id(renamed.get(id).cloned());
                    if change.previous_id.is_some() {
                        debug!(criterion_id = %id, previous_id = ?change.previous_id, "Criterion matched across id change");
                    }
                    change
                }
            })
            .collect()
    }
}

fn compare_criteria(id: &str, old: &AtomicCriterion, new: &AtomicCriterion) -> EntityChange {
    let mut fields = FieldDiff::default();
    fields.compare("name", text(&old.name), text(&new.name), Severity::Minor);
    fields.compare("description", text(&old.description), text(&new.description), Severity::Minor);
    fields.compare("policy_text", text(&old.policy_text), text(&new.policy_text), Severity::Minor);
    fields.compare(
        "criterion_type",
        text(old.criterion_type.as_str()),
        text(new.criterion_type.as_str()),
        Severity::Minor,
    );
    fields.compare(
        "comparison_operator",
        old.comparison_operator.map(|op| op.as_str().to_string()),
        new.comparison_operator.map(|op| op.as_str().to_string()),
        Severity::Minor,
    );
    fields.compare(
        "threshold_value",
        number(old.threshold_value.as_ref()),
        number(new.threshold_value.as_ref()),
        Severity::Minor,
    );
    fields.compare(
        "threshold_value_upper",
        number(old.threshold_value_upper.as_ref()),
        number(new.threshold_value_upper.as_ref()),
        Severity::Minor,
    );
    fields.compare("threshold_unit", old.threshold_unit.clone(), new.threshold_unit.clone(), Severity::Minor);
    fields.compare("is_required", flag(old.is_required), flag(new.is_required), Severity::Minor);
    fields.compare(
        "clinical_codes",
        sorted_list(old.clinical_codes.iter().map(|c| c.key())),
        sorted_list(new.clinical_codes.iter().map(|c| c.key())),
        Severity::Minor,
    );
    fields.compare("drug_names", sorted_list(&old.drug_names), sorted_list(&new.drug_names), Severity::Minor);
    fields.compare(
        "drug_classes",
        sorted_list(&old.drug_classes),
        sorted_list(&new.drug_classes),
        Severity::Minor,
    );

    for change in &mut fields.changes {
        change.severity = criterion_field_severity(change, old, new);
    }
    fields.into_change(EntityType::Criterion, id, &new.name)
}

fn diff_groups(old: &DigitizedPolicy, new: &DigitizedPolicy) -> Vec<EntityChange> {
    let old_map: BTreeMap<&str, &CriterionGroup> =
        old.criterion_groups.iter().map(|(id, g)| (id.as_str(), g)).collect();
    let new_map: BTreeMap<&str, &CriterionGroup> =
        new.criterion_groups.iter().map(|(id, g)| (id.as_str(), g)).collect();

    pair_by_id(&old_map, &new_map)
        .into_iter()
        .map(|(id, pairing)| match pairing {
            Pairing::Added(g) => {
                EntityChange::new(EntityType::Group, id, &g.name, ChangeType::Added, Severity::Material)
                    .with_summary(format!("New {} group added: {}", g.operator, id))
            }
            Pairing::Removed(g) => {
                EntityChange::new(EntityType::Group, id, &g.name, ChangeType::Removed, Severity::Material)
                    .with_summary(format!("Group removed: {}", id))
            }
            Pairing::Both(o, n) => {
                let mut fields = FieldDiff::default();
                fields.compare("name", text(&o.name), text(&n.name), Severity::Cosmetic);
                fields.compare("description", text(&o.description), text(&n.description), Severity::Cosmetic);
                fields.compare(
                    "operator",
                    text(o.operator.as_str()),
                    text(n.operator.as_str()),
                    Severity::Material,
                );
                fields.compare("negated", flag(o.negated), flag(n.negated), Severity::Material);
                fields.compare("criteria", sorted_list(&o.criteria), sorted_list(&n.criteria), Severity::Material);
                fields.compare("subgroups", sorted_list(&o.subgroups), sorted_list(&n.subgroups), Severity::Material);
                fields.into_change(EntityType::Group, id, &n.name)
            }
        })
        .collect()
}

fn diff_indications(old: &[IndicationCriteria], new: &[IndicationCriteria]) -> Vec<EntityChange> {
    let old_map: BTreeMap<&str, &IndicationCriteria> =
        old.iter().map(|i| (i.indication_id.as_str(), i)).collect();
    let new_map: BTreeMap<&str, &IndicationCriteria> =
        new.iter().map(|i| (i.indication_id.as_str(), i)).collect();

    pair_by_id(&old_map, &new_map)
        .into_iter()
        .map(|(id, pairing)| match pairing {
            Pairing::Added(i) => EntityChange::new(
                EntityType::Indication,
                id,
                &i.indication_name,
                ChangeType::Added,
                Severity::Material,
            )
            .with_summary(format!("New indication added: {}", i.indication_name)),
            Pairing::Removed(i) => EntityChange::new(
                EntityType::Indication,
                id,
                &i.indication_name,
                ChangeType::Removed,
                Severity::Breaking,
            )
            .with_summary(format!("Indication removed: {}", i.indication_name)),
            Pairing::Both(o, n) => {
                let mut fields = FieldDiff::default();
                fields.compare(
                    "indication_name",
                    text(&o.indication_name),
                    text(&n.indication_name),
                    Severity::Cosmetic,
                );
                fields.compare(
                    "initial_approval_criteria",
                    text(&o.initial_approval_criteria),
                    text(&n.initial_approval_criteria),
                    Severity::Material,
                );
                fields.compare(
                    "initial_approval_duration_months",
                    number(o.initial_approval_duration_months),
                    number(n.initial_approval_duration_months),
                    Severity::Material,
                );
                fields.compare(
                    "continuation_criteria",
                    o.continuation_criteria.clone(),
                    n.continuation_criteria.clone(),
                    Severity::Material,
                );
                fields.compare(
                    "continuation_approval_duration_months",
                    number(o.continuation_approval_duration_months),
                    number(n.continuation_approval_duration_months),
                    Severity::Material,
                );
                fields.into_change(EntityType::Indication, id, &n.indication_name)
            }
        })
        .collect()
}

fn diff_exclusions(old: &[ExclusionCriteria], new: &[ExclusionCriteria]) -> Vec<EntityChange> {
    let old_map: BTreeMap<&str, &ExclusionCriteria> =
        old.iter().map(|e| (e.exclusion_id.as_str(), e)).collect();
    let new_map: BTreeMap<&str, &ExclusionCriteria> =
        new.iter().map(|e| (e.exclusion_id.as_str(), e)).collect();

    pair_by_id(&old_map, &new_map)
        .into_iter()
        .map(|(id, pairing)| match pairing {
            Pairing::Added(e) => {
                EntityChange::new(EntityType::Exclusion, id, &e.name, ChangeType::Added, Severity::Breaking)
                    .with_summary(format!("New exclusion added: {}", e.name))
            }
            Pairing::Removed(e) => {
                EntityChange::new(EntityType::Exclusion, id, &e.name, ChangeType::Removed, Severity::Material)
                    .with_summary(format!("Exclusion removed: {}", e.name))
            }
            Pairing::Both(o, n) => {
                let mut fields = FieldDiff::default();
                fields.compare("name", text(&o.name), text(&n.name), Severity::Material);
                fields.compare("description", text(&o.description), text(&n.description), Severity::Material);
                fields.compare("policy_text", text(&o.policy_text), text(&n.policy_text), Severity::Material);
                fields.compare(
                    "trigger_criteria",
                    sorted_list(&o.trigger_criteria),
                    sorted_list(&n.trigger_criteria),
                    Severity::Breaking,
                );
                fields.into_change(EntityType::Exclusion, id, &n.name)
            }
        })
        .collect()
}

/// Severity of a step therapy field change. Tightening is breaking, anything else is
/// material. Missing counts are read as zero.
fn step_field_severity(field: &str, old: &StepTherapyRequirement, new: &StepTherapyRequirement) -> Severity {
    let tightened = match field {
        "minimum_trials" => new.minimum_trials > old.minimum_trials,
        "minimum_duration_days" => {
            new.minimum_duration_days.unwrap_or(0) > old.minimum_duration_days.unwrap_or(0)
        }
        "failure_required" => !old.failure_required && new.failure_required,
        "intolerance_acceptable" => old.intolerance_acceptable && !new.intolerance_acceptable,
        "contraindication_acceptable" => {
            old.contraindication_acceptable && !new.contraindication_acceptable
        }
        _ => false,
    };
    if tightened {
        Severity::Breaking
    } else {
        Severity::Material
    }
}

fn diff_step_therapy(
    old: &[StepTherapyRequirement],
    new: &[StepTherapyRequirement],
) -> Vec<EntityChange> {
    let old_map: BTreeMap<&str, &StepTherapyRequirement> =
        old.iter().map(|s| (s.requirement_id.as_str(), s)).collect();
    let new_map: BTreeMap<&str, &StepTherapyRequirement> =
        new.iter().map(|s| (s.requirement_id.as_str(), s)).collect();

    pair_by_id(&old_map, &new_map)
        .into_iter()
        .map(|(id, pairing)| match pairing {
            Pairing::Added(s) => EntityChange::new(
                EntityType::StepTherapy,
                id,
                format!("Step Therapy: {}", s.indication),
                ChangeType::Added,
                Severity::Breaking,
            )
            .with_summary(format!("New step therapy requirement added for {}", s.indication)),
            Pairing::Removed(s) => EntityChange::new(
                EntityType::StepTherapy,
                id,
                format!("Step Therapy: {}", s.indication),
                ChangeType::Removed,
                Severity::Material,
            )
            .with_summary(format!("Step therapy requirement removed for {}", s.indication)),
            Pairing::Both(o, n) => {
                let mut fields = FieldDiff::default();
                fields.compare(
                    "minimum_trials",
                    number(Some(o.minimum_trials)),
                    number(Some(n.minimum_trials)),
                    Severity::Material,
                );
                fields.compare(
                    "required_drugs",
                    sorted_list(&o.required_drugs),
                    sorted_list(&n.required_drugs),
                    Severity::Material,
                );
                fields.compare(
                    "required_drug_classes",
                    sorted_list(&o.required_drug_classes),
                    sorted_list(&n.required_drug_classes),
                    Severity::Material,
                );
                fields.compare(
                    "minimum_duration_days",
                    number(o.minimum_duration_days),
                    number(n.minimum_duration_days),
                    Severity::Material,
                );
                fields.compare("failure_required", flag(o.failure_required), flag(n.failure_required), Severity::Material);
                fields.compare(
                    "intolerance_acceptable",
                    flag(o.intolerance_acceptable),
                    flag(n.intolerance_acceptable),
                    Severity::Material,
                );
                fields.compare(
                    "contraindication_acceptable",
                    flag(o.contraindication_acceptable),
                    flag(n.contraindication_acceptable),
                    Severity::Material,
                );
                fields.compare(
                    "documentation_requirements",
                    sorted_list(&o.documentation_requirements),
                    sorted_list(&n.documentation_requirements),
                    Severity::Material,
                );
                for change in &mut fields.changes {
                    change.severity = step_field_severity(&change.field_name, o, n);
                }
                fields.into_change(
                    EntityType::StepTherapy,
                    id,
                    &format!("Step Therapy: {}", n.indication),
                )
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use criteria_core::{ComparisonOperator, CriterionType, LogicalOperator};

    fn base() -> DigitizedPolicy {
        DigitizedPolicy::new("POL-1", "Drug")
            .with_criterion(
                AtomicCriterion::new("AGE", CriterionType::Age, "Adult")
                    .with_threshold(ComparisonOperator::Gte, 18.0),
            )
            .with_group(CriterionGroup::new("ROOT", LogicalOperator::And).with_criteria(["AGE"]))
            .with_indication(IndicationCriteria::new("IND", "Indication", "ROOT").with_duration_months(12))
    }

    #[test]
    fn test_identical_policies_are_unchanged() {
        let policy = base();
        let result = PolicyDiffer::new().diff(&policy, &policy);
        assert!(!result.has_changes());
        assert_eq!(result.summary.unchanged_count, 3);
    }

    #[test]
    fn test_member_order_is_not_a_change() {
        let old = base().with_group(CriterionGroup::new("G", LogicalOperator::Or).with_criteria(["A", "B"]));
        let new = base().with_group(CriterionGroup::new("G", LogicalOperator::Or).with_criteria(["B", "A"]));
        let result = PolicyDiffer::new().diff(&old, &new);
        assert!(!result.has_changes());
    }

    #[test]
    fn test_group_operator_change_is_material() {
        let old = base();
        let mut new = base();
        new.add_group(CriterionGroup::new("ROOT", LogicalOperator::Or).with_criteria(["AGE"]));
        let result = PolicyDiffer::new().diff(&old, &new);
        let change = &result.group_changes[0];
        assert_eq!(change.change_type, ChangeType::Modified);
        assert_eq!(change.severity, Severity::Material);
        assert_eq!(change.human_summary, "operator: AND -> OR");
    }

    #[test]
    fn test_description_only_is_cosmetic() {
        let old = base();
        let mut new = base();
        new.add_criterion(
            AtomicCriterion::new("AGE", CriterionType::Age, "Adult")
                .with_threshold(ComparisonOperator::Gte, 18.0)
                .with_description("Patient is an adult"),
        );
        let result = PolicyDiffer::new().diff(&old, &new);
        assert_eq!(result.criterion_changes[0].severity, Severity::Cosmetic);
        assert_eq!(result.summary.severity_assessment, crate::SeverityAssessment::LowImpact);
    }

    #[test]
    fn test_indication_removed_is_breaking() {
        let old = base();
        let mut new = base();
        new.indications.clear();
        let result = PolicyDiffer::new().diff(&old, &new);
        assert_eq!(result.indication_changes[0].change_type, ChangeType::Removed);
        assert_eq!(result.indication_changes[0].severity, Severity::Breaking);
    }

    #[test]
    fn test_step_therapy_loosening_is_material() {
        let old = base().with_step_therapy(
            StepTherapyRequirement::new("ST", "IND").with_drugs(["methotrexate"]).with_minimum_trials(2),
        );
        let new = base().with_step_therapy(
            StepTherapyRequirement::new("ST", "IND").with_drugs(["methotrexate"]).with_minimum_trials(1),
        );
        let result = PolicyDiffer::new().diff(&old, &new);
        assert_eq!(result.step_therapy_changes[0].severity, Severity::Material);

        let result = PolicyDiffer::new().diff(&new, &old);
        assert_eq!(result.step_therapy_changes[0].severity, Severity::Breaking);
        assert_eq!(result.step_therapy_changes[0].entity_name, "Step Therapy: IND");
    }

    #[test]
    fn test_exclusion_trigger_change_is_breaking() {
        let old = base().with_exclusion(ExclusionCriteria::new("EX", "Infection").with_triggers(["A"]));
        let new = base().with_exclusion(ExclusionCriteria::new("EX", "Infection").with_triggers(["A", "B"]));
        let result = PolicyDiffer::new().diff(&old, &new);
        assert_eq!(result.exclusion_changes[0].severity, Severity::Breaking);
        assert_eq!(result.summary.severity_assessment, crate::SeverityAssessment::HighImpact);
    }
}
