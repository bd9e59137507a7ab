//! Id reconciliation across policy versions
//!
//! Re-extraction of a policy frequently renumbers criteria (`AGE_1` becomes `AGE_ADULT`)
//! while the criterion itself is unchanged. Without reconciliation those show up as one
//! removal plus one addition. [`IdReconciler`] pairs ids that exist on only one side when
//! their normalized name and criterion type identify exactly one candidate on each side.

use criteria_core::{AtomicCriterion, CriterionType};
use std::collections::BTreeMap;
use tracing::debug;

/// Normalize a criterion name for matching: lowercase, runs of non-alphanumerics
/// collapsed to one space, trimmed.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

type MatchKey = (String, CriterionType);

#[derive(Debug, Clone, Copy, Default)]
pub struct IdReconciler;

impl IdReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Map of new id -> old id for criteria whose ids changed between versions.
    ///
    /// Only ids absent from the other version take part. Ambiguous keys (two unmatched
    /// criteria sharing a key on either side) are left unmatched.
    pub fn reconcile(
        &self,
        old: &BTreeMap<String, AtomicCriterion>,
        new: &BTreeMap<String, AtomicCriterion>,
    ) -> BTreeMap<String, String> {
        let old_only = Self::index_unmatched(old, new);
        let new_only = Self::index_unmatched(new, old);

        let mut mapping = BTreeMap::new();
        for (key, new_ids) in &new_only {
            let [new_id] = new_ids.as_slice() else {
                continue;
            };
            let Some([old_id]) = old_only.get(key).map(Vec::as_slice) else {
                continue;
            };
            debug!(old_id = %old_id, new_id = %new_id, "Reconciled renamed criterion");
            mapping.insert((*new_id).to_string(), (*old_id).to_string());
        }
        mapping
    }

    fn index_unmatched<'a>(
        side: &'a BTreeMap<String, AtomicCriterion>,
        other: &BTreeMap<String, AtomicCriterion>,
    ) -> BTreeMap<MatchKey, Vec<&'a str>> {
        let mut index: BTreeMap<MatchKey, Vec<&'a str>> = BTreeMap::new();
        for (id, criterion) in side {
            if other.contains_key(id) {
                continue;
            }
            let name = normalize_name(&criterion.name);
            if name.is_empty() {
                continue;
            }
            index
                .entry((name, criterion.criterion_type.clone()))
                .or_default()
                .push(id.as_str());
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(items: &[(&str, CriterionType, &str)]) -> BTreeMap<String, AtomicCriterion> {
        items
            .iter()
            .map(|(id, ty, name)| (id.to_string(), AtomicCriterion::new(*id, ty.clone(), *name)))
            .collect()
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Age >= 18 (years) "), "age 18 years");
        assert_eq!(normalize_name("TB-Screening"), "tb screening");
        assert_eq!(normalize_name("--"), "");
    }

    #[test]
    fn test_unique_rename_is_matched() {
        let old = criteria(&[("AGE_1", CriterionType::Age, "Adult patient")]);
        let new = criteria(&[("AGE_ADULT", CriterionType::Age, "Adult  Patient")]);
        let mapping = IdReconciler::new().reconcile(&old, &new);
        assert_eq!(mapping.get("AGE_ADULT").map(String::as_str), Some("AGE_1"));
    }

    #[test]
    fn test_type_must_agree() {
        let old = criteria(&[("A", CriterionType::Age, "Adult")]);
        let new = criteria(&[("B", CriterionType::Gender, "Adult")]);
        assert!(IdReconciler::new().reconcile(&old, &new).is_empty());
    }

    #[test]
    fn test_ambiguous_is_left_alone() {
        let old = criteria(&[
            ("A1", CriterionType::LabValue, "CRP"),
            ("A2", CriterionType::LabValue, "CRP"),
        ]);
        let new = criteria(&[("B", CriterionType::LabValue, "crp")]);
        assert!(IdReconciler::new().reconcile(&old, &new).is_empty());
    }

    #[test]
    fn test_shared_ids_do_not_participate() {
        let old = criteria(&[("A", CriterionType::Age, "Adult")]);
        let new = criteria(&[
            ("A", CriterionType::Age, "Adult"),
            ("B", CriterionType::Age, "Adult"),
        ]);
        assert!(IdReconciler::new().reconcile(&old, &new).is_empty());
    }
}
