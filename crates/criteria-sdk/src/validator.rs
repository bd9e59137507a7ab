//! Policy validation
//!
//! Structural checks run before a policy is handed to the evaluator. The evaluator
//! tolerates every problem reported here (dangling references and cycles resolve to
//! insufficient data), so validation exists to surface authoring mistakes early.
//!
//! | code | severity | meaning |
//! |------|----------|---------|
//! | E001 | error    | group references an unknown criterion |
//! | E002 | error    | group references an unknown subgroup |
//! | E003 | error    | subgroup references form a cycle |
//! | E004 | error    | indication root group missing |
//! | W001 | warning  | map key differs from the entity's own id |
//! | W002 | warning  | NOT group with more than one member |
//! | W003 | warning  | exclusion trigger references an unknown criterion |

use criteria_core::{DigitizedPolicy, LogicalOperator, PolicyGraph};
use serde::{Deserialize, Serialize};

/// Severity level for validation diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// A single diagnostic message from validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,

    /// Error/warning code (e.g., "E001", "W001")
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// Id of the group, indication or exclusion the diagnostic is about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            code: code.into(),
            message: message.into(),
            entity_id: None,
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            code: code.into(),
            message: message.into(),
            entity_id: None,
        }
    }

    pub fn with_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// Result of policy validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the policy is valid (no errors)
    pub valid: bool,

    pub errors: Vec<Diagnostic>,

    pub warnings: Vec<Diagnostic>,
}

impl ValidationResult {
    fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) = diagnostics
            .into_iter()
            .partition(|d| d.severity == DiagnosticSeverity::Error);
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Diagnostics with the given code, errors first
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.errors
            .iter()
            .chain(&self.warnings)
            .filter(move |d| d.code == code)
    }
}

/// Structural validator for digitized policies
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyValidator;

impl PolicyValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, policy: &DigitizedPolicy) -> ValidationResult {
        let mut diagnostics = Vec::new();

        for (key, criterion) in &policy.atomic_criteria {
            if *key != criterion.criterion_id {
                diagnostics.push(
                    Diagnostic::warning(
                        "W001",
                        format!("Criterion stored under '{}' declares id '{}'", key, criterion.criterion_id),
                    )
                    .with_entity(key.as_str()),
                );
            }
        }

        for (key, group) in &policy.criterion_groups {
            if *key != group.group_id {
                diagnostics.push(
                    Diagnostic::warning(
                        "W001",
                        format!("Group stored under '{}' declares id '{}'", key, group.group_id),
                    )
                    .with_entity(key.as_str()),
                );
            }
            for criterion_id in &group.criteria {
                if !policy.atomic_criteria.contains_key(criterion_id) {
                    diagnostics.push(
                        Diagnostic::error(
                            "E001",
                            format!("Group '{}' references unknown criterion '{}'", key, criterion_id),
                        )
                        .with_entity(key.as_str()),
                    );
                }
            }
            for subgroup_id in &group.subgroups {
                if !policy.criterion_groups.contains_key(subgroup_id) {
                    diagnostics.push(
                        Diagnostic::error(
                            "E002",
                            format!("Group '{}' references unknown subgroup '{}'", key, subgroup_id),
                        )
                        .with_entity(key.as_str()),
                    );
                }
            }
            if group.operator == LogicalOperator::Not && group.member_count() > 1 {
                diagnostics.push(
                    Diagnostic::warning(
                        "W002",
                        format!(
                            "NOT group '{}' has {} members; only the first applicable one is negated",
                            key,
                            group.member_count()
                        ),
                    )
                    .with_entity(key.as_str()),
                );
            }
        }

        let graph = PolicyGraph::build(policy);
        for (parent, child) in graph.back_edges() {
            let parent_id = graph.node(parent).id;
            let child_id = graph.node(child).id;
            diagnostics.push(
                Diagnostic::error(
                    "E003",
                    format!("Circular group reference: '{}' -> '{}'", parent_id, child_id),
                )
                .with_entity(parent_id),
            );
        }

        for indication in &policy.indications {
            let root = &indication.initial_approval_criteria;
            let roots = std::iter::once(root).chain(indication.continuation_criteria.as_ref());
            for group_id in roots {
                if !policy.criterion_groups.contains_key(group_id) {
                    diagnostics.push(
                        Diagnostic::error(
                            "E004",
                            format!(
                                "Indication '{}' references missing group '{}'",
                                indication.indication_id, group_id
                            ),
                        )
                        .with_entity(indication.indication_id.as_str()),
                    );
                }
            }
        }

        for exclusion in &policy.exclusions {
            for trigger in &exclusion.trigger_criteria {
                if !policy.atomic_criteria.contains_key(trigger) {
                    diagnostics.push(
                        Diagnostic::warning(
                            "W003",
                            format!(
                                "Exclusion '{}' trigger '{}' is not a known criterion",
                                exclusion.exclusion_id, trigger
                            ),
                        )
                        .with_entity(exclusion.exclusion_id.as_str()),
                    );
                }
            }
        }

        let result = ValidationResult::from_diagnostics(diagnostics);
        tracing::debug!(
            policy_id = %policy.policy_id,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Validated policy"
        );
        result
    }
}
