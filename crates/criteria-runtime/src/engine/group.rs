//! Four-state group evaluation over the policy graph
//!
//! Traversal uses an explicit stack, so nesting depth is bounded by the number of
//! groups rather than the call stack. Only the groups on the current path are tracked:
//! a group reachable through two parents is evaluated on both paths, while a group that
//! reaches itself short-circuits to `InsufficientData`.

use crate::context::EvaluationContext;
use crate::evaluator::EvaluatorRegistry;
use crate::result::{CriterionEvaluation, GroupEvaluation};
use criteria_core::{
    ChildGroup, GroupIdx, GroupNode, LogicalOperator, NormalizedPatientRecord, PolicyGraph,
    Verdict,
};
use tracing::{debug, warn};

/// Combine child verdicts under a logical operator.
///
/// `NotApplicable` children are dropped first; a group with nothing left is itself
/// `NotApplicable`. `NOT` inverts its first remaining child. The `negated` flag is
/// applied last and, like `NOT`, only swaps `Met` and `NotMet`.
pub fn combine_verdicts(verdicts: &[Verdict], operator: LogicalOperator, negated: bool) -> Verdict {
    let effective: Vec<Verdict> = verdicts
        .iter()
        .copied()
        .filter(|v| *v != Verdict::NotApplicable)
        .collect();
    if effective.is_empty() {
        return Verdict::NotApplicable;
    }

    let combined = match operator {
        LogicalOperator::And => {
            if effective.iter().all(|v| *v == Verdict::Met) {
                Verdict::Met
            } else if effective.contains(&Verdict::NotMet) {
                Verdict::NotMet
            } else {
                Verdict::InsufficientData
            }
        }
        LogicalOperator::Or => {
            if effective.contains(&Verdict::Met) {
                Verdict::Met
            } else if effective.iter().all(|v| *v == Verdict::NotMet) {
                Verdict::NotMet
            } else {
                Verdict::InsufficientData
            }
        }
        LogicalOperator::Not => effective[0].invert(),
    };

    if negated {
        combined.invert()
    } else {
        combined
    }
}

/// Group being evaluated, with its children evaluated so far
struct Frame<'g, 'p> {
    idx: GroupIdx,
    node: &'g GroupNode<'p>,
    criteria_results: Vec<CriterionEvaluation>,
    subgroup_results: Vec<GroupEvaluation>,
    next_subgroup: usize,
}

impl<'g, 'p> Frame<'g, 'p> {
    fn enter(
        graph: &'g PolicyGraph<'p>,
        idx: GroupIdx,
        registry: &EvaluatorRegistry,
        patient: &NormalizedPatientRecord,
        ctx: &EvaluationContext,
    ) -> Self {
        let node = graph.node(idx);
        let criteria_results = node
            .group
            .criteria
            .iter()
            .map(|id| match graph.criterion(id) {
                Some(criterion) => registry.evaluate(criterion, patient, ctx),
                // Strict validation rejects dangling references (E001) before evaluation.
                None => {
                    warn!(group_id = %node.id, criterion_id = %id, "dangling criterion reference");
                    CriterionEvaluation::missing(id)
                }
            })
            .collect();
        Self {
            idx,
            node,
            criteria_results,
            subgroup_results: Vec::new(),
            next_subgroup: 0,
        }
    }

    fn next_child(&mut self) -> Option<&'g ChildGroup> {
        let child = self.node.subgroups.get(self.next_subgroup)?;
        self.next_subgroup += 1;
        Some(child)
    }

    fn finish(self) -> GroupEvaluation {
        let group = self.node.group;
        let verdicts: Vec<Verdict> = self
            .criteria_results
            .iter()
            .map(|c| c.verdict)
            .chain(self.subgroup_results.iter().map(|g| g.verdict))
            .collect();
        let verdict = combine_verdicts(&verdicts, group.operator, group.negated);
        debug!(group_id = %self.node.id, verdict = %verdict, "group evaluated");

        let mut eval = GroupEvaluation::new(self.node.id, group.operator, verdict);
        eval.negated = group.negated;
        eval.criteria_results = self.criteria_results;
        eval.subgroup_results = self.subgroup_results;
        eval
    }
}

fn circular(node: &GroupNode<'_>) -> GroupEvaluation {
    warn!(group_id = %node.id, "circular group reference");
    let mut eval =
        GroupEvaluation::new(node.id, node.group.operator, Verdict::InsufficientData)
            .with_reasoning("Circular group reference detected");
    eval.negated = node.group.negated;
    eval
}

/// Placeholder for a subgroup id the policy never defines. Strictly validated
/// policies cannot reach this (E002); lenient engines see InsufficientData.
fn missing(group_id: &str) -> GroupEvaluation {
    warn!(group_id = %group_id, "dangling subgroup reference");
    GroupEvaluation::new(group_id, LogicalOperator::And, Verdict::InsufficientData)
        .with_reasoning(format!("Group '{}' not found in policy", group_id))
}

/// Evaluate the group at `root` and everything reachable below it.
pub fn evaluate_group(
    graph: &PolicyGraph<'_>,
    root: GroupIdx,
    registry: &EvaluatorRegistry,
    patient: &NormalizedPatientRecord,
    ctx: &EvaluationContext,
) -> GroupEvaluation {
    let mut on_path = vec![false; graph.len()];
    on_path[root.index()] = true;
    let mut stack = vec![Frame::enter(graph, root, registry, patient, ctx)];

    // The stack is never empty inside the loop: the root frame returns as it pops.
    loop {
        let top = stack.len() - 1;
        match stack[top].next_child() {
            Some(ChildGroup::Missing(id)) => stack[top].subgroup_results.push(missing(id)),
            Some(ChildGroup::Resolved(child)) if on_path[child.index()] => {
                stack[top].subgroup_results.push(circular(graph.node(*child)));
            }
            Some(ChildGroup::Resolved(child)) => {
                on_path[child.index()] = true;
                stack.push(Frame::enter(graph, *child, registry, patient, ctx));
            }
            None => {
                let done = stack.swap_remove(top);
                on_path[done.idx.index()] = false;
                let eval = done.finish();
                match stack.last_mut() {
                    Some(parent) => parent.subgroup_results.push(eval),
                    None => return eval,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use criteria_core::{AtomicCriterion, CriterionGroup, CriterionType, DigitizedPolicy};

    use criteria_core::Verdict::{InsufficientData as Insufficient, Met, NotApplicable as Na, NotMet};

    fn ctx() -> EvaluationContext {
        EvaluationContext::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    #[test]
    fn test_and_or_tables() {
        assert_eq!(combine_verdicts(&[Met, Met], LogicalOperator::And, false), Met);
        assert_eq!(combine_verdicts(&[Met, Insufficient, NotMet], LogicalOperator::And, false), NotMet);
        assert_eq!(combine_verdicts(&[Met, Insufficient], LogicalOperator::And, false), Insufficient);
        assert_eq!(combine_verdicts(&[NotMet, Met], LogicalOperator::Or, false), Met);
        assert_eq!(combine_verdicts(&[NotMet, NotMet], LogicalOperator::Or, false), NotMet);
        assert_eq!(combine_verdicts(&[NotMet, Insufficient], LogicalOperator::Or, false), Insufficient);
    }

    #[test]
    fn test_not_applicable_is_transparent() {
        assert_eq!(combine_verdicts(&[], LogicalOperator::And, false), Na);
        assert_eq!(combine_verdicts(&[Na, Na], LogicalOperator::Or, true), Na);
        assert_eq!(combine_verdicts(&[Na, Met], LogicalOperator::And, false), Met);
        assert_eq!(combine_verdicts(&[Na, Met], LogicalOperator::Not, false), NotMet);
    }

    #[test]
    fn test_not_and_negation() {
        assert_eq!(combine_verdicts(&[Met], LogicalOperator::Not, false), NotMet);
        assert_eq!(combine_verdicts(&[NotMet], LogicalOperator::Not, false), Met);
        assert_eq!(combine_verdicts(&[Insufficient], LogicalOperator::Not, false), Insufficient);
        assert_eq!(combine_verdicts(&[Met], LogicalOperator::Not, true), Met);
        assert_eq!(combine_verdicts(&[Met, Met], LogicalOperator::And, true), NotMet);
        assert_eq!(combine_verdicts(&[Met, Insufficient], LogicalOperator::And, true), Insufficient);
    }

    #[test]
    fn test_dangling_references_are_insufficient() {
        let policy = DigitizedPolicy::new("P", "Drug")
            .with_criterion(AtomicCriterion::new("AGE", CriterionType::Age, "Adult"))
            .with_group(
                CriterionGroup::new("ROOT", LogicalOperator::Or)
                    .with_criteria(["AGE", "GHOST_CRITERION"])
                    .with_subgroups(["GHOST_GROUP"]),
            );
        let graph = PolicyGraph::build(&policy);
        let root = graph.lookup("ROOT").unwrap();
        let patient = NormalizedPatientRecord::new("p");
        let eval = evaluate_group(&graph, root, &EvaluatorRegistry::standard(), &patient, &ctx());

        assert_eq!(eval.verdict, Insufficient);
        assert_eq!(eval.criteria_results.len(), 2);
        assert_eq!(eval.criteria_results[1].verdict, Insufficient);
        assert_eq!(eval.subgroup_results[0].group_id, "GHOST_GROUP");
        assert_eq!(
            eval.subgroup_results[0].reasoning.as_deref(),
            Some("Group 'GHOST_GROUP' not found in policy")
        );
    }

    #[test]
    fn test_self_reference_terminates() {
        let policy = DigitizedPolicy::new("P", "Drug")
            .with_group(CriterionGroup::new("LOOP", LogicalOperator::And).with_subgroups(["LOOP"]));
        let graph = PolicyGraph::build(&policy);
        let root = graph.lookup("LOOP").unwrap();
        let eval = evaluate_group(
            &graph,
            root,
            &EvaluatorRegistry::standard(),
            &NormalizedPatientRecord::new("p"),
            &ctx(),
        );
        assert_eq!(eval.verdict, Insufficient);
        assert_eq!(
            eval.subgroup_results[0].reasoning.as_deref(),
            Some("Circular group reference detected")
        );
    }
}
