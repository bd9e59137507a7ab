//! Criteria Core - core types for the coverage criteria engine
//!
//! This crate provides the data model shared by the evaluator, the differ and the SDK:
//! - Verdicts and threshold values
//! - Policy model (criteria, groups, indications, exclusions, step therapy)
//! - Arena-backed policy graph for cycle-safe traversal
//! - Normalized patient record
//! - Error types

pub mod error;
pub mod patient;
pub mod policy;
pub mod types;

// Re-export commonly used types
pub use error::CoreError;
pub use patient::{
    Biomarker, FunctionalScore, LabResult, NormalizedPatientRecord, PriorTreatment, Screening,
    TreatmentOutcome,
};
pub use policy::{
    AtomicCriterion, ChildGroup, ClinicalCode, ComparisonOperator, CriterionGroup, CriterionType,
    DigitizedPolicy, DosingRequirement, ExclusionCriteria, GroupIdx, GroupNode, IndicationCriteria,
    LogicalOperator, PolicyGraph, StepTherapyRequirement,
};
pub use types::{MarkerValue, ThresholdValue, Verdict};
