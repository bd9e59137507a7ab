//! Severity classification for criterion field changes

use crate::types::{FieldChange, Severity};
use criteria_core::{AtomicCriterion, ComparisonOperator};

/// Returns true when moving a threshold from `old` to `new` makes the criterion
/// harder to satisfy under `op`.
///
/// Introducing a threshold where none existed always tightens. A removed threshold
/// never does.
pub fn threshold_tightened(old: Option<f64>, new: Option<f64>, op: Option<ComparisonOperator>) -> bool {
    match (old, new) {
        (None, Some(_)) => true,
        (Some(old), Some(new)) => match op {
            Some(op) if op.is_lower_bound() => new > old,
            Some(op) if op.is_upper_bound() => new < old,
            _ => false,
        },
        _ => false,
    }
}

/// Severity of a single criterion field change.
///
/// `old` and `new` are the two versions of the criterion the field belongs to, so the
/// threshold rule can see both operators.
pub fn criterion_field_severity(
    change: &FieldChange,
    old: &AtomicCriterion,
    new: &AtomicCriterion,
) -> Severity {
    match change.field_name.as_str() {
        "threshold_value" => {
            // The new operator governs the new requirement
            let op = new.comparison_operator.or(old.comparison_operator);
            if op.is_none() {
                return Severity::Minor;
            }
            let old_value = old.threshold_value.as_ref().and_then(|v| v.as_f64());
            let new_value = new.threshold_value.as_ref().and_then(|v| v.as_f64());
            if threshold_tightened(old_value, new_value, op) {
                Severity::Breaking
            } else {
                Severity::Minor
            }
        }
        "is_required" if !old.is_required && new.is_required => Severity::Breaking,
        "name" | "description" | "policy_text" => Severity::Cosmetic,
        "clinical_codes" | "drug_names" | "drug_classes" => Severity::Material,
        _ => Severity::Minor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use criteria_core::CriterionType;

    fn age(op: ComparisonOperator, value: f64) -> AtomicCriterion {
        AtomicCriterion::new("AGE", CriterionType::Age, "Adult").with_threshold(op, value)
    }

    fn threshold_change(old: &AtomicCriterion, new: &AtomicCriterion) -> FieldChange {
        FieldChange::new(
            "threshold_value",
            old.threshold_value.as_ref().map(ToString::to_string),
            new.threshold_value.as_ref().map(ToString::to_string),
        )
    }

    #[test]
    fn test_lower_bound_raise_is_breaking() {
        let old = age(ComparisonOperator::Gte, 18.0);
        let new = age(ComparisonOperator::Gte, 21.0);
        let change = threshold_change(&old, &new);
        assert_eq!(criterion_field_severity(&change, &old, &new), Severity::Breaking);
        assert_eq!(criterion_field_severity(&change, &new, &old), Severity::Minor);
    }

    #[test]
    fn test_upper_bound_lower_is_breaking() {
        let old = age(ComparisonOperator::Lt, 10.0);
        let new = age(ComparisonOperator::Lt, 5.0);
        let change = threshold_change(&old, &new);
        assert_eq!(criterion_field_severity(&change, &old, &new), Severity::Breaking);
        assert_eq!(criterion_field_severity(&change, &new, &old), Severity::Minor);
    }

    #[test]
    fn test_new_operator_governs() {
        let old = age(ComparisonOperator::Lte, 65.0);
        let new = age(ComparisonOperator::Gte, 70.0);
        let change = threshold_change(&old, &new);
        assert_eq!(criterion_field_severity(&change, &old, &new), Severity::Breaking);
    }

    #[test]
    fn test_threshold_added() {
        assert!(threshold_tightened(None, Some(5.0), Some(ComparisonOperator::Lt)));
        assert!(threshold_tightened(None, Some(5.0), None));
        assert!(!threshold_tightened(Some(5.0), None, Some(ComparisonOperator::Lt)));
        assert!(!threshold_tightened(Some(1.0), Some(2.0), Some(ComparisonOperator::Eq)));
    }

    #[test]
    fn test_non_numeric_threshold_is_minor() {
        let old = AtomicCriterion::new("B", CriterionType::ClinicalMarker, "Marker")
            .with_threshold(ComparisonOperator::Gte, "positive");
        let new = AtomicCriterion::new("B", CriterionType::ClinicalMarker, "Marker")
            .with_threshold(ComparisonOperator::Gte, "strongly positive");
        let change = threshold_change(&old, &new);
        assert_eq!(criterion_field_severity(&change, &old, &new), Severity::Minor);
    }

    #[test]
    fn test_required_flip() {
        let optional = age(ComparisonOperator::Gte, 18.0).optional();
        let required = age(ComparisonOperator::Gte, 18.0);
        let change = FieldChange::new("is_required", Some("false".into()), Some("true".into()));
        assert_eq!(criterion_field_severity(&change, &optional, &required), Severity::Breaking);
        assert_eq!(criterion_field_severity(&change, &required, &optional), Severity::Minor);
    }

    #[test]
    fn test_text_and_list_fields() {
        let c = age(ComparisonOperator::Gte, 18.0);
        let text = FieldChange::new("description", None, Some("x".into()));
        let drugs = FieldChange::new("drug_names", None, Some("x".into()));
        assert_eq!(criterion_field_severity(&text, &c, &c), Severity::Cosmetic);
        assert_eq!(criterion_field_severity(&drugs, &c, &c), Severity::Material);
    }
}
