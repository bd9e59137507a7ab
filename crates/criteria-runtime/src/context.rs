//! Evaluation context
//!
//! Carries everything an evaluator may need besides the criterion and the patient.
//! The evaluation date is injected here so results never depend on the wall clock.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Date used for age and any other date arithmetic
    pub as_of: NaiveDate,
}

impl EvaluationContext {
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }
}
