//! Four-state verdict lattice
//!
//! Every criterion, group, indication and policy evaluation resolves to exactly one
//! [`Verdict`]. Missing data never collapses into `Met` or `NotMet`; it resolves to
//! `InsufficientData`.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of evaluating a criterion or a group of criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The patient satisfies the requirement
    Met,
    /// The patient has data proving the requirement is not satisfied
    NotMet,
    /// The patient record lacks the facts needed to decide
    InsufficientData,
    /// The requirement does not apply to this patient
    NotApplicable,
}

impl Verdict {
    pub const ALL: [Verdict; 4] = [
        Verdict::Met,
        Verdict::NotMet,
        Verdict::InsufficientData,
        Verdict::NotApplicable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Met => "met",
            Verdict::NotMet => "not_met",
            Verdict::InsufficientData => "insufficient_data",
            Verdict::NotApplicable => "not_applicable",
        }
    }

    pub fn is_met(&self) -> bool {
        matches!(self, Verdict::Met)
    }

    /// True for `Met` and `NotMet`, the two states backed by actual evidence.
    pub fn is_decisive(&self) -> bool {
        matches!(self, Verdict::Met | Verdict::NotMet)
    }

    /// Swap `Met` and `NotMet`; the other two states pass through.
    pub fn invert(self) -> Verdict {
        match self {
            Verdict::Met => Verdict::NotMet,
            Verdict::NotMet => Verdict::Met,
            other => other,
        }
    }

    /// `Met` when the condition holds, `NotMet` otherwise.
    pub fn from_bool(value: bool) -> Verdict {
        if value {
            Verdict::Met
        } else {
            Verdict::NotMet
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "met" => Ok(Verdict::Met),
            "not_met" => Ok(Verdict::NotMet),
            "insufficient_data" => Ok(Verdict::InsufficientData),
            "not_applicable" => Ok(Verdict::NotApplicable),
            _ => Err(CoreError::UnknownVerdict(s.to_string())),
        }
    }
}
