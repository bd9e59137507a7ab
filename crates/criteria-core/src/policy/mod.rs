//! Policy model
//!
//! A digitized policy is a set of atomic criteria combined by logical groups. Groups
//! reference each other by id and form a DAG that is not guaranteed to be acyclic;
//! [`PolicyGraph`] resolves those references into an index-addressed arena.

pub mod criterion;
pub mod document;
pub mod graph;
pub mod group;
pub mod indication;
pub mod operator;

pub use criterion::{AtomicCriterion, ClinicalCode, CriterionType};
pub use document::DigitizedPolicy;
pub use graph::{ChildGroup, GroupIdx, GroupNode, PolicyGraph};
pub use group::CriterionGroup;
pub use indication::{DosingRequirement, ExclusionCriteria, IndicationCriteria, StepTherapyRequirement};
pub use operator::{ComparisonOperator, LogicalOperator};
