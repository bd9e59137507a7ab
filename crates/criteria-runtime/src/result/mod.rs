//! Evaluation result types

mod evaluation;
mod report;

pub use evaluation::{CriterionEvaluation, GroupEvaluation};
pub use report::{
    ExclusionEvaluation, Gap, GapType, IndicationEvaluation, PolicyEvaluationResult,
    StepTherapyDrugDetail, StepTherapyEvaluation, StepTherapyRequirementResult,
};
