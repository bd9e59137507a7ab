//! Logical criterion groups

use crate::policy::operator::LogicalOperator;
use serde::{Deserialize, Serialize};

/// A DAG node combining criteria and subgroups with AND/OR/NOT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionGroup {
    pub group_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub operator: LogicalOperator,

    /// Member criterion ids, in evaluation order
    #[serde(default)]
    pub criteria: Vec<String>,

    /// Member subgroup ids, evaluated after the criteria
    #[serde(default)]
    pub subgroups: Vec<String>,

    /// Inverts the combined result (MET and NOT_MET only)
    #[serde(default)]
    pub negated: bool,
}

impl CriterionGroup {
    pub fn new(group_id: impl Into<String>, operator: LogicalOperator) -> Self {
        Self {
            group_id: group_id.into(),
            name: String::new(),
            description: String::new(),
            operator,
            criteria: Vec::new(),
            subgroups: Vec::new(),
            negated: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_criteria<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_subgroups<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subgroups = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn negated(mut self) -> Self {
        self.negated = true;
        self
    }

    /// Number of direct members (criteria plus subgroups)
    pub fn member_count(&self) -> usize {
        self.criteria.len() + self.subgroups.len()
    }
}
