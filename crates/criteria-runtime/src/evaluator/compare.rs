//! Numeric comparison against criterion thresholds

use criteria_core::{ComparisonOperator, ThresholdValue};

const EQ_TOLERANCE: f64 = 1e-9;

/// Compare `value` against `threshold` with the criterion's operator.
///
/// A missing operator means `gte`. For `between`, `in` and `not_in` the upper
/// threshold is the second operand; `between` without a usable upper bound degrades
/// to `gte`.
pub fn compare_numeric(
    value: f64,
    threshold: f64,
    op: Option<ComparisonOperator>,
    upper: Option<&ThresholdValue>,
) -> bool {
    let upper = upper.and_then(ThresholdValue::as_f64);
    match op.unwrap_or(ComparisonOperator::Gte) {
        ComparisonOperator::Gte => value >= threshold,
        ComparisonOperator::Gt => value > threshold,
        ComparisonOperator::Lte => value <= threshold,
        ComparisonOperator::Lt => value < threshold,
        ComparisonOperator::Eq => approx_eq(value, threshold),
        ComparisonOperator::Ne => !approx_eq(value, threshold),
        ComparisonOperator::Between => match upper {
            Some(u) => threshold <= value && value <= u,
            None => value >= threshold,
        },
        ComparisonOperator::In => in_targets(value, threshold, upper),
        ComparisonOperator::NotIn => !in_targets(value, threshold, upper),
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EQ_TOLERANCE
}

fn in_targets(value: f64, threshold: f64, upper: Option<f64>) -> bool {
    approx_eq(value, threshold) || upper.map(|u| approx_eq(value, u)).unwrap_or(false)
}
