//! Criteria SDK
//!
//! High-level API for loading digitized coverage policies, validating them,
//! evaluating patients against them and diffing policy versions.

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod telemetry;
pub mod validator;

// Re-export main types
pub use builder::CoverageEngineBuilder;
pub use config::EngineConfig;
pub use engine::CoverageEngine;
pub use error::{Result, SdkError};
pub use loader::{load_patient, load_policy, parse_patient, parse_policy, DocumentFormat};
pub use validator::{Diagnostic, DiagnosticSeverity, PolicyValidator, ValidationResult};

// Re-export commonly used types from dependencies
pub use criteria_core::{DigitizedPolicy, NormalizedPatientRecord, Verdict};
pub use criteria_diff::{PolicyDiffResult, SeverityAssessment};
pub use criteria_runtime::{EvaluationContext, PolicyEvaluationResult};
