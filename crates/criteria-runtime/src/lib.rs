//! Criteria Runtime - evaluation engine for digitized coverage policies
//!
//! This crate evaluates a [`DigitizedPolicy`](criteria_core::DigitizedPolicy) against a
//! [`NormalizedPatientRecord`](criteria_core::NormalizedPatientRecord):
//! - Criterion evaluators selected through a registry keyed by criterion type
//! - Cycle-safe group evaluation with four-state AND/OR/NOT logic
//! - Policy orchestration: readiness, gaps, exclusions and step therapy
//!
//! Evaluation is pure and total: every fault degrades to `InsufficientData`.

pub mod context;
pub mod engine;
pub mod evaluator;
pub mod result;

// Re-export main types
pub use context::EvaluationContext;
pub use engine::{
    combine_verdicts, evaluate_group, evaluate_step_therapy, implicit_root_group, PolicyEvaluator,
    IMPLICIT_INDICATION_ID,
};
pub use evaluator::{compare_numeric, EvaluatorFn, EvaluatorRegistry};
pub use result::{
    CriterionEvaluation, ExclusionEvaluation, Gap, GapType, GroupEvaluation,
    IndicationEvaluation, PolicyEvaluationResult, StepTherapyDrugDetail, StepTherapyEvaluation,
    StepTherapyRequirementResult,
};
