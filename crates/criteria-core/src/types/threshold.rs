//! Threshold values attached to criteria
//!
//! Extracted policies carry thresholds as numbers or as free text ("18", "5.0 mg/L",
//! "positive"). Numeric interpretation is always done through [`ThresholdValue::as_f64`],
//! which refuses non-finite values so a malformed threshold can never compare as true.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdValue {
    Number(f64),
    Text(String),
}

impl ThresholdValue {
    /// Finite numeric interpretation, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ThresholdValue::Number(n) if n.is_finite() => Some(*n),
            ThresholdValue::Number(_) => None,
            ThresholdValue::Text(s) => parse_finite(s),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ThresholdValue::Text(s) => Some(s.as_str()),
            ThresholdValue::Number(_) => None,
        }
    }
}

/// Parse a string as a finite float. Booleans, NaN and infinities are rejected.
pub fn parse_finite(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if lowered.contains("nan") || lowered.contains("inf") {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl fmt::Display for ThresholdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdValue::Number(n) => write!(f, "{}", n),
            ThresholdValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ThresholdValue {
    fn from(value: f64) -> Self {
        ThresholdValue::Number(value)
    }
}

impl From<&str> for ThresholdValue {
    fn from(value: &str) -> Self {
        ThresholdValue::Text(value.to_string())
    }
}
