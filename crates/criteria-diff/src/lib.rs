//! Criteria Diff - structural comparison of policy versions
//!
//! Compares two [`DigitizedPolicy`](criteria_core::DigitizedPolicy) versions entity by
//! entity (criteria, groups, indications, exclusions, step therapy), records field-level
//! changes and classifies each change by how it affects patients:
//! - `breaking`: some previously eligible patients may no longer qualify
//! - `material`: coverage semantics changed without a clear tightening
//! - `minor` / `cosmetic`: wording or bookkeeping only
//!
//! Diffing is pure and total; it never fails on well-formed policies.

pub mod differ;
pub mod reconcile;
pub mod severity;
pub mod types;

pub use differ::PolicyDiffer;
pub use reconcile::IdReconciler;
pub use severity::{criterion_field_severity, threshold_tightened};
pub use types::{
    ChangeType, DiffSummary, EntityChange, EntityType, FieldChange, PolicyDiffResult, Severity,
    SeverityAssessment,
};
