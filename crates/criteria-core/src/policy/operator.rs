//! Operators used by criteria and groups

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    /// Greater than or equal (>=)
    #[serde(alias = ">=")]
    Gte,
    /// Greater than (>)
    #[serde(alias = ">")]
    Gt,
    /// Less than or equal (<=)
    #[serde(alias = "<=")]
    Lte,
    /// Less than (<)
    #[serde(alias = "<")]
    Lt,
    /// Equal within float tolerance
    #[serde(alias = "==")]
    Eq,
    /// Not equal
    #[serde(alias = "!=")]
    Ne,
    /// Inclusive range [threshold, upper]
    Between,
    /// Equal to threshold or upper
    In,
    /// Equal to neither threshold nor upper
    NotIn,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Gte => "gte",
            ComparisonOperator::Gt => "gt",
            ComparisonOperator::Lte => "lte",
            ComparisonOperator::Lt => "lt",
            ComparisonOperator::Eq => "eq",
            ComparisonOperator::Ne => "ne",
            ComparisonOperator::Between => "between",
            ComparisonOperator::In => "in",
            ComparisonOperator::NotIn => "not_in",
        }
    }

    /// Returns true for operators where a larger threshold is stricter
    pub fn is_lower_bound(&self) -> bool {
        matches!(self, ComparisonOperator::Gte | ComparisonOperator::Gt)
    }

    /// Returns true for operators where a smaller threshold is stricter
    pub fn is_upper_bound(&self) -> bool {
        matches!(self, ComparisonOperator::Lte | ComparisonOperator::Lt)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Gte => ">=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Lte => "<=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Eq => "==",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Between => "between",
            ComparisonOperator::In => "in",
            ComparisonOperator::NotIn => "not in",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonOperator {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "gte" | ">=" => ComparisonOperator::Gte,
            "gt" | ">" => ComparisonOperator::Gt,
            "lte" | "<=" => ComparisonOperator::Lte,
            "lt" | "<" => ComparisonOperator::Lt,
            "eq" | "==" => ComparisonOperator::Eq,
            "ne" | "!=" => ComparisonOperator::Ne,
            "between" => ComparisonOperator::Between,
            "in" => ComparisonOperator::In,
            "not_in" => ComparisonOperator::NotIn,
            _ => return Err(CoreError::UnknownOperator(s.to_string())),
        };
        Ok(op)
    }
}

/// Logical operators combining group members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
    #[serde(alias = "not")]
    Not,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
            LogicalOperator::Not => "NOT",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalOperator {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(LogicalOperator::And),
            "OR" => Ok(LogicalOperator::Or),
            "NOT" => Ok(LogicalOperator::Not),
            _ => Err(CoreError::UnknownOperator(s.to_string())),
        }
    }
}
