//! Arena view over a policy's criterion groups
//!
//! Groups reference subgroups by id. [`PolicyGraph`] resolves every reference once into
//! an integer-indexed arena so traversals can track their path in a plain bit set and
//! never chase string keys in the hot loop. The graph is built from untrusted input:
//! dangling references are kept as [`ChildGroup::Missing`] and cycles are allowed to
//! exist; callers detect them during traversal.

use crate::policy::{AtomicCriterion, CriterionGroup, DigitizedPolicy};
use std::collections::HashMap;

/// Index of a group inside a [`PolicyGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupIdx(usize);

impl GroupIdx {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A subgroup edge after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildGroup {
    Resolved(GroupIdx),
    /// Referenced id with no group in the policy
    Missing(String),
}

/// One arena slot
#[derive(Debug, Clone)]
pub struct GroupNode<'p> {
    /// Map key the group is stored under
    pub id: &'p str,
    pub group: &'p CriterionGroup,
    pub subgroups: Vec<ChildGroup>,
}

#[derive(Debug, Clone)]
pub struct PolicyGraph<'p> {
    policy: &'p DigitizedPolicy,
    nodes: Vec<GroupNode<'p>>,
    index: HashMap<&'p str, GroupIdx>,
}

impl<'p> PolicyGraph<'p> {
    /// Resolve all group references of a policy
    pub fn build(policy: &'p DigitizedPolicy) -> Self {
        let index: HashMap<&'p str, GroupIdx> = policy
            .criterion_groups
            .keys()
            .enumerate()
            .map(|(i, id)| (id.as_str(), GroupIdx(i)))
            .collect();

        let nodes = policy
            .criterion_groups
            .iter()
            .map(|(id, group)| {
                let subgroups = group
                    .subgroups
                    .iter()
                    .map(|sub| match index.get(sub.as_str()) {
                        Some(idx) => ChildGroup::Resolved(*idx),
                        None => ChildGroup::Missing(sub.clone()),
                    })
                    .collect();
                GroupNode {
                    id: id.as_str(),
                    group,
                    subgroups,
                }
            })
            .collect();

        Self {
            policy,
            nodes,
            index,
        }
    }

    pub fn policy(&self) -> &'p DigitizedPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn lookup(&self, group_id: &str) -> Option<GroupIdx> {
        self.index.get(group_id).copied()
    }

    pub fn node(&self, idx: GroupIdx) -> &GroupNode<'p> {
        &self.nodes[idx.0]
    }

    pub fn criterion(&self, criterion_id: &str) -> Option<&'p AtomicCriterion> {
        self.policy.atomic_criteria.get(criterion_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (GroupIdx, &GroupNode<'p>)> {
        self.nodes.iter().enumerate().map(|(i, n)| (GroupIdx(i), n))
    }

    /// Edges `(parent, child)` that close a cycle, found by an iterative depth-first walk.
    pub fn back_edges(&self) -> Vec<(GroupIdx, GroupIdx)> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unseen,
            OnPath,
            Done,
        }

        let mut marks = vec![Mark::Unseen; self.nodes.len()];
        let mut found = Vec::new();

        for start in 0..self.nodes.len() {
            if marks[start] != Mark::Unseen {
                continue;
            }
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            marks[start] = Mark::OnPath;

            while let Some(frame) = stack.last_mut() {
                let (node, cursor) = *frame;
                let children = &self.nodes[node].subgroups;
                if cursor >= children.len() {
                    marks[node] = Mark::Done;
                    stack.pop();
                    continue;
                }
                frame.1 += 1;
                if let ChildGroup::Resolved(child) = children[cursor] {
                    match marks[child.0] {
                        Mark::OnPath => found.push((GroupIdx(node), child)),
                        Mark::Unseen => {
                            marks[child.0] = Mark::OnPath;
                            stack.push((child.0, 0));
                        }
                        Mark::Done => {}
                    }
                }
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::LogicalOperator;

    fn policy_with(groups: Vec<CriterionGroup>) -> DigitizedPolicy {
        groups
            .into_iter()
            .fold(DigitizedPolicy::new("P", "Drug"), |p, g| p.with_group(g))
    }

    #[test]
    fn test_resolves_and_marks_missing() {
        let policy = policy_with(vec![
            CriterionGroup::new("ROOT", LogicalOperator::And).with_subgroups(["A", "GHOST"]),
            CriterionGroup::new("A", LogicalOperator::Or),
        ]);
        let graph = PolicyGraph::build(&policy);
        let root = graph.lookup("ROOT").unwrap();
        let a = graph.lookup("A").unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(
            graph.node(root).subgroups,
            vec![
                ChildGroup::Resolved(a),
                ChildGroup::Missing("GHOST".to_string())
            ]
        );
    }

    #[test]
    fn test_back_edges_detects_cycle() {
        let policy = policy_with(vec![
            CriterionGroup::new("A", LogicalOperator::And).with_subgroups(["B"]),
            CriterionGroup::new("B", LogicalOperator::And).with_subgroups(["C"]),
            CriterionGroup::new("C", LogicalOperator::And).with_subgroups(["A"]),
        ]);
        let graph = PolicyGraph::build(&policy);
        let edges = graph.back_edges();
        assert_eq!(edges.len(), 1);
        let (from, to) = edges[0];
        assert_eq!(graph.node(from).id, "C");
        assert_eq!(graph.node(to).id, "A");
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let policy = policy_with(vec![
            CriterionGroup::new("ROOT", LogicalOperator::And).with_subgroups(["L", "R"]),
            CriterionGroup::new("L", LogicalOperator::And).with_subgroups(["SHARED"]),
            CriterionGroup::new("R", LogicalOperator::And).with_subgroups(["SHARED"]),
            CriterionGroup::new("SHARED", LogicalOperator::Or),
        ]);
        let graph = PolicyGraph::build(&policy);
        assert!(graph.back_edges().is_empty());
    }

    #[test]
    fn test_self_loop() {
        let policy = policy_with(vec![
            CriterionGroup::new("SELF", LogicalOperator::And).with_subgroups(["SELF"]),
        ]);
        let graph = PolicyGraph::build(&policy);
        assert_eq!(graph.back_edges().len(), 1);
    }
}
