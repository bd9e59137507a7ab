//! Criterion evaluators
//!
//! Each criterion type maps to one plain function. The [`EvaluatorRegistry`] is built
//! once, shared by reference, and never mutated during evaluation. Lookups for an
//! unregistered type, and evaluators that panic, both degrade to `InsufficientData`.

mod clinical;
mod compare;
mod demographics;
mod diagnosis;
mod labs;
mod matching;
mod prescriber;
mod screening;
mod therapy;
mod treatment;

pub use compare::compare_numeric;
pub use matching::{find_lab_result, find_screening, find_treatment};

use crate::context::EvaluationContext;
use crate::result::CriterionEvaluation;
use criteria_core::{AtomicCriterion, CriterionType, NormalizedPatientRecord};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

/// Signature shared by every criterion evaluator
pub type EvaluatorFn =
    fn(&AtomicCriterion, &NormalizedPatientRecord, &EvaluationContext) -> CriterionEvaluation;

/// Dispatch table from criterion type to evaluator
#[derive(Debug, Clone)]
pub struct EvaluatorRegistry {
    evaluators: HashMap<CriterionType, EvaluatorFn>,
}

impl EvaluatorRegistry {
    /// Registry with no evaluators
    pub fn empty() -> Self {
        Self {
            evaluators: HashMap::new(),
        }
    }

    /// Registry with an evaluator for every known criterion type
    pub fn standard() -> Self {
        Self::empty()
            .with(CriterionType::Age, demographics::evaluate_age)
            .with(CriterionType::Gender, demographics::evaluate_gender)
            .with(CriterionType::DiagnosisConfirmed, diagnosis::evaluate_diagnosis_confirmed)
            .with(CriterionType::DiagnosisSeverity, diagnosis::evaluate_diagnosis_severity)
            .with(CriterionType::DiseaseDuration, diagnosis::evaluate_disease_duration)
            .with(CriterionType::PriorTreatmentTried, treatment::evaluate_tried)
            .with(CriterionType::PriorTreatmentFailed, treatment::evaluate_failed)
            .with(CriterionType::PriorTreatmentIntolerant, treatment::evaluate_intolerant)
            .with(
                CriterionType::PriorTreatmentContraindicated,
                treatment::evaluate_contraindicated,
            )
            .with(CriterionType::PriorTreatmentDuration, treatment::evaluate_duration)
            .with(CriterionType::LabValue, labs::evaluate_lab_value)
            .with(CriterionType::LabTestCompleted, labs::evaluate_lab_test_completed)
            .with(
                CriterionType::SafetyScreeningCompleted,
                screening::evaluate_screening_completed,
            )
            .with(
                CriterionType::SafetyScreeningNegative,
                screening::evaluate_screening_negative,
            )
            .with(CriterionType::PrescriberSpecialty, prescriber::evaluate_specialty)
            .with(CriterionType::PrescriberConsultation, prescriber::evaluate_consultation)
            .with(CriterionType::ClinicalMarker, clinical::evaluate_clinical_marker)
            .with(CriterionType::Documentation, clinical::evaluate_documentation)
            .with(CriterionType::ConcurrentTherapy, therapy::evaluate_concurrent)
            .with(CriterionType::NoConcurrentTherapy, therapy::evaluate_no_concurrent)
            .with(CriterionType::Custom, therapy::evaluate_custom)
    }

    /// Register an evaluator, returning the one it replaced
    pub fn register(&mut self, kind: CriterionType, evaluator: EvaluatorFn) -> Option<EvaluatorFn> {
        self.evaluators.insert(kind, evaluator)
    }

    pub fn with(mut self, kind: CriterionType, evaluator: EvaluatorFn) -> Self {
        self.register(kind, evaluator);
        self
    }

    pub fn get(&self, kind: &CriterionType) -> Option<EvaluatorFn> {
        self.evaluators.get(kind).copied()
    }

    pub fn contains(&self, kind: &CriterionType) -> bool {
        self.evaluators.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }

    /// Evaluate one criterion. Never panics and never returns an error.
    pub fn evaluate(
        &self,
        criterion: &AtomicCriterion,
        patient: &NormalizedPatientRecord,
        ctx: &EvaluationContext,
    ) -> CriterionEvaluation {
        let Some(evaluator) = self.get(&criterion.criterion_type) else {
            debug!(
                criterion_id = %criterion.criterion_id,
                criterion_type = %criterion.criterion_type,
                "no evaluator registered"
            );
            return CriterionEvaluation::insufficient(
                criterion,
                format!(
                    "No evaluator registered for type '{}'",
                    criterion.criterion_type
                ),
            );
        };

        match catch_unwind(AssertUnwindSafe(|| evaluator(criterion, patient, ctx))) {
            Ok(eval) => {
                debug!(
                    criterion_id = %eval.criterion_id,
                    verdict = %eval.verdict,
                    "criterion evaluated"
                );
                eval
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(
                    criterion_id = %criterion.criterion_id,
                    error = %message,
                    "criterion evaluation failed"
                );
                CriterionEvaluation::insufficient(criterion, format!("Evaluation error: {}", message))
            }
        }
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use criteria_core::Verdict;

    fn ctx() -> EvaluationContext {
        EvaluationContext::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    fn panicking(
        _: &AtomicCriterion,
        _: &NormalizedPatientRecord,
        _: &EvaluationContext,
    ) -> CriterionEvaluation {
        panic!("boom")
    }

    #[test]
    fn test_standard_registry_covers_known_types() {
        let registry = EvaluatorRegistry::standard();
        for kind in CriterionType::KNOWN {
            assert!(registry.contains(&kind), "missing evaluator for {}", kind);
        }
        assert_eq!(registry.len(), CriterionType::KNOWN.len());
    }

    #[test]
    fn test_unknown_type_is_insufficient() {
        let registry = EvaluatorRegistry::standard();
        let c = AtomicCriterion::new("X", CriterionType::from("genomic_signature"), "Signature");
        let eval = registry.evaluate(&c, &NormalizedPatientRecord::new("p"), &ctx());
        assert_eq!(eval.verdict, Verdict::InsufficientData);
        assert_eq!(
            eval.reasoning,
            "No evaluator registered for type 'genomic_signature'"
        );
    }

    #[test]
    fn test_panicking_evaluator_degrades() {
        let registry = EvaluatorRegistry::empty().with(CriterionType::Custom, panicking);
        let c = AtomicCriterion::new("X", CriterionType::Custom, "Custom");
        let eval = registry.evaluate(&c, &NormalizedPatientRecord::new("p"), &ctx());
        assert_eq!(eval.verdict, Verdict::InsufficientData);
        assert!(eval.reasoning.contains("boom"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = EvaluatorRegistry::standard();
        let previous = registry.register(CriterionType::Custom, panicking);
        assert!(previous.is_some());
        assert_eq!(registry.len(), CriterionType::KNOWN.len());
    }
}
