//! Evaluation engine module
//!
//! Group combination, policy orchestration and step therapy.

mod group;
mod orchestrator;
mod step_therapy;

pub use group::{combine_verdicts, evaluate_group};
pub use orchestrator::{implicit_root_group, PolicyEvaluator, IMPLICIT_INDICATION_ID};
pub use step_therapy::evaluate_step_therapy;
