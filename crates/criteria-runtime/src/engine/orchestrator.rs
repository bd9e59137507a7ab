//! Policy evaluation orchestrator
//!
//! Evaluates every indication's root group, then exclusions and step therapy, and
//! rolls the results into a [`PolicyEvaluationResult`]. Exclusions and step therapy
//! are reported and turned into gaps; they never change the overall verdict.

use super::group::evaluate_group;
use super::step_therapy::evaluate_step_therapy;
use crate::context::EvaluationContext;
use crate::evaluator::EvaluatorRegistry;
use crate::result::{
    ExclusionEvaluation, Gap, IndicationEvaluation, PolicyEvaluationResult,
};
use criteria_core::{
    DigitizedPolicy, IndicationCriteria, NormalizedPatientRecord, PolicyGraph, Verdict,
};
use std::borrow::Cow;
use tracing::{info, warn};

/// Id of the indication synthesized for policies that declare none
pub const IMPLICIT_INDICATION_ID: &str = "AUTO_INITIAL";

const ROOT_KEYWORDS: [&str; 3] = ["initial_approval", "approval_group", "root"];

/// Pick the root approval group of a policy without indications.
///
/// The first group id (in key order) containing an approval keyword wins; otherwise
/// the group with the most criteria and subgroups, earliest id on ties.
pub fn implicit_root_group(policy: &DigitizedPolicy) -> Option<&str> {
    let groups = &policy.criterion_groups;
    groups
        .keys()
        .find(|id| {
            let id = id.to_lowercase();
            ROOT_KEYWORDS.iter().any(|kw| id.contains(kw))
        })
        .or_else(|| {
            groups
                .iter()
                .rev()
                .max_by_key(|(_, g)| g.member_count())
                .map(|(id, _)| id)
        })
        .map(String::as_str)
}

fn readiness(met: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (met as f64 / total as f64 * 1000.0).round() / 1000.0
}

/// MET if any indication is met, else INSUFFICIENT_DATA if any is, else NOT_MET if any
/// produced a real verdict.
fn overall_verdict(indications: &[IndicationEvaluation]) -> Verdict {
    if indications.is_empty() {
        return Verdict::InsufficientData;
    }
    let verdicts: Vec<Verdict> = indications.iter().map(|i| i.overall_verdict).collect();
    if verdicts.contains(&Verdict::Met) {
        Verdict::Met
    } else if verdicts.contains(&Verdict::InsufficientData) {
        Verdict::InsufficientData
    } else if verdicts.contains(&Verdict::NotMet) {
        Verdict::NotMet
    } else {
        Verdict::NotApplicable
    }
}

/// Evaluates patients against policies with a fixed evaluator registry
#[derive(Debug, Clone, Default)]
pub struct PolicyEvaluator {
    registry: EvaluatorRegistry,
}

impl PolicyEvaluator {
    pub fn new(registry: EvaluatorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &EvaluatorRegistry {
        &self.registry
    }

    pub fn evaluate(
        &self,
        policy: &DigitizedPolicy,
        patient: &NormalizedPatientRecord,
        ctx: &EvaluationContext,
    ) -> PolicyEvaluationResult {
        let graph = PolicyGraph::build(policy);

        let indications: Vec<Cow<'_, IndicationCriteria>> = if policy.indications.is_empty() {
            implicit_root_group(policy)
                .map(|root| {
                    IndicationCriteria::new(
                        IMPLICIT_INDICATION_ID,
                        format!("{} - Initial Approval", policy.medication_name),
                        root,
                    )
                    .with_duration_months(12)
                })
                .map(Cow::Owned)
                .into_iter()
                .collect()
        } else {
            policy.indications.iter().map(Cow::Borrowed).collect()
        };

        let indication_evaluations: Vec<IndicationEvaluation> = indications
            .iter()
            .map(|indication| self.evaluate_indication(&graph, indication, patient, ctx))
            .collect();

        let exclusion_evaluations: Vec<ExclusionEvaluation> = policy
            .exclusions
            .iter()
            .map(|exclusion| ExclusionEvaluation {
                exclusion_id: exclusion.exclusion_id.clone(),
                name: exclusion.name.clone(),
                trigger_results: exclusion
                    .trigger_criteria
                    .iter()
                    .filter_map(|id| policy.criterion(id))
                    .map(|criterion| self.registry.evaluate(criterion, patient, ctx))
                    .collect(),
            })
            .collect();

        let step_therapy_evaluation = evaluate_step_therapy(policy, patient);

        let (met, total) = indication_evaluations.iter().fold((0, 0), |(m, t), i| {
            (m + i.criteria_met_count, t + i.criteria_total_count)
        });
        let overall_readiness = readiness(met, total);
        let overall_verdict = overall_verdict(&indication_evaluations);

        let mut gaps = Vec::new();
        for indication in &indication_evaluations {
            gaps.extend(
                indication
                    .insufficient_criteria
                    .iter()
                    .map(|c| Gap::insufficient(c, &indication.indication_name)),
            );
            gaps.extend(
                indication
                    .unmet_criteria
                    .iter()
                    .map(|c| Gap::not_met(c, &indication.indication_name)),
            );
        }
        for exclusion in &exclusion_evaluations {
            gaps.extend(
                exclusion
                    .trigger_results
                    .iter()
                    .filter(|t| t.verdict == Verdict::InsufficientData)
                    .map(|t| Gap::exclusion_review(t, &exclusion.name)),
            );
        }
        if !step_therapy_evaluation.satisfied {
            gaps.push(Gap::step_therapy(&step_therapy_evaluation.reason()));
        }

        info!(
            policy_id = %policy.policy_id,
            patient_id = %patient.patient_id,
            verdict = %overall_verdict,
            readiness = overall_readiness,
            gaps = gaps.len(),
            "policy evaluated"
        );

        PolicyEvaluationResult {
            policy_id: policy.policy_id.clone(),
            patient_id: if patient.patient_id.is_empty() {
                "unknown".to_string()
            } else {
                patient.patient_id.clone()
            },
            evaluated_on: ctx.as_of,
            overall_verdict,
            overall_readiness,
            indication_evaluations,
            exclusion_evaluations,
            step_therapy_evaluation,
            gaps,
        }
    }

    fn evaluate_indication(
        &self,
        graph: &PolicyGraph<'_>,
        indication: &IndicationCriteria,
        patient: &NormalizedPatientRecord,
        ctx: &EvaluationContext,
    ) -> IndicationEvaluation {
        let root_id = indication.initial_approval_criteria.as_str();
        let root = graph
            .lookup(root_id)
            .map(|idx| evaluate_group(graph, idx, &self.registry, patient, ctx));
        if root.is_none() {
            warn!(
                indication_id = %indication.indication_id,
                group_id = %root_id,
                "indication root group not found"
            );
        }

        let (met, total, unmet, insufficient) = match &root {
            Some(group) => {
                let leaves = group.leaves();
                (
                    leaves.iter().filter(|c| c.verdict == Verdict::Met).count(),
                    leaves.len(),
                    leaves
                        .iter()
                        .filter(|c| c.verdict == Verdict::NotMet && c.is_required)
                        .map(|c| (*c).clone())
                        .collect(),
                    leaves
                        .iter()
                        .filter(|c| c.verdict == Verdict::InsufficientData)
                        .map(|c| (*c).clone())
                        .collect(),
                )
            }
            None => (0, 0, Vec::new(), Vec::new()),
        };

        IndicationEvaluation {
            indication_id: indication.indication_id.clone(),
            indication_name: indication.indication_name.clone(),
            overall_verdict: root
                .as_ref()
                .map(|g| g.verdict)
                .unwrap_or(Verdict::InsufficientData),
            approval_criteria_result: root,
            criteria_met_count: met,
            criteria_total_count: total,
            unmet_criteria: unmet,
            insufficient_criteria: insufficient,
            approval_duration_months: indication.initial_approval_duration_months,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use criteria_core::{CriterionGroup, LogicalOperator};

    fn group(id: &str, members: usize) -> CriterionGroup {
        CriterionGroup::new(id, LogicalOperator::And)
            .with_criteria((0..members).map(|i| format!("{}_{}", id, i)))
    }

    #[test]
    fn test_implicit_root_prefers_keyword() {
        let policy = DigitizedPolicy::new("P", "Drug")
            .with_group(group("BIG", 5))
            .with_group(group("initial_approval_main", 1));
        assert_eq!(implicit_root_group(&policy), Some("initial_approval_main"));
    }

    #[test]
    fn test_implicit_root_falls_back_to_largest_earliest() {
        let policy = DigitizedPolicy::new("P", "Drug")
            .with_group(group("B", 3))
            .with_group(group("A", 3))
            .with_group(group("C", 1));
        assert_eq!(implicit_root_group(&policy), Some("A"));
        assert_eq!(implicit_root_group(&DigitizedPolicy::new("P", "Drug")), None);
    }

    #[test]
    fn test_readiness_rounding() {
        assert_eq!(readiness(0, 0), 0.0);
        assert_eq!(readiness(1, 3), 0.333);
        assert_eq!(readiness(2, 3), 0.667);
    }

    #[test]
    fn test_overall_verdict_priority() {
        let ind = |v: Verdict| IndicationEvaluation {
            indication_id: "I".to_string(),
            indication_name: "I".to_string(),
            overall_verdict: v,
            approval_criteria_result: None,
            criteria_met_count: 0,
            criteria_total_count: 0,
            unmet_criteria: Vec::new(),
            insufficient_criteria: Vec::new(),
            approval_duration_months: None,
        };
        assert_eq!(overall_verdict(&[]), Verdict::InsufficientData);
        assert_eq!(overall_verdict(&[ind(Verdict::NotMet), ind(Verdict::Met)]), Verdict::Met);
        assert_eq!(
            overall_verdict(&[ind(Verdict::NotMet), ind(Verdict::InsufficientData)]),
            Verdict::InsufficientData
        );
        assert_eq!(overall_verdict(&[ind(Verdict::NotApplicable), ind(Verdict::NotMet)]), Verdict::NotMet);
        assert_eq!(overall_verdict(&[ind(Verdict::NotApplicable)]), Verdict::NotApplicable);
    }
}
