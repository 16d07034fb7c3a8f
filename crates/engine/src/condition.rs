//! Condition evaluator.
//!
//! A pure function from (operator, actual answer, comparand) to bool, used
//! by both transition resolution and outcome evaluation. The policy is
//! conservative throughout: anything that cannot be decided — a missing
//! answer under a value operator, a non-numeric operand under an ordering
//! operator, an unrecognized operator — evaluates to false, never to an
//! error.

use std::str::FromStr;

use checkpath_core::{AnswerValue, Operator, ScalarValue};
use rust_decimal::Decimal;

/// Evaluate one condition.
///
/// `actual` is the current valid answer for the condition's question
/// (`None` if unanswered). `comparand` is the configured expected value
/// (absent for IS_EMPTY / IS_NOT_EMPTY and for default transitions).
pub fn evaluate(
    operator: Operator,
    actual: Option<&AnswerValue>,
    comparand: Option<&AnswerValue>,
) -> bool {
    if operator == Operator::IsEmpty {
        return is_empty(actual);
    }
    if operator == Operator::IsNotEmpty {
        return !is_empty(actual);
    }

    // A missing answer never satisfies a value-comparison operator.
    let Some(actual) = actual else {
        return false;
    };

    match operator {
        Operator::Equals => comparand.map_or(false, |expected| actual == expected),
        Operator::NotEquals => comparand.map_or(true, |expected| actual != expected),
        Operator::In => is_member(actual, comparand),
        Operator::Gt => compare_numeric(actual, comparand, |a, b| a > b),
        Operator::Lt => compare_numeric(actual, comparand, |a, b| a < b),
        Operator::Gte => compare_numeric(actual, comparand, |a, b| a >= b),
        Operator::Lte => compare_numeric(actual, comparand, |a, b| a <= b),
        // Unrecognized operators never match.
        Operator::Unknown | Operator::IsEmpty | Operator::IsNotEmpty => false,
    }
}

/// Absent, or an empty-string scalar. Arrays (even empty ones) count as
/// present.
fn is_empty(actual: Option<&AnswerValue>) -> bool {
    match actual {
        None => true,
        Some(AnswerValue::Scalar(s)) => s.is_empty_text(),
        Some(AnswerValue::Many(_)) => false,
    }
}

/// IN: the comparand must be an array; a scalar actual matches iff it is a
/// member. Array actuals and scalar comparands never match.
fn is_member(actual: &AnswerValue, comparand: Option<&AnswerValue>) -> bool {
    match (actual, comparand) {
        (AnswerValue::Scalar(s), Some(AnswerValue::Many(members))) => members.contains(s),
        _ => false,
    }
}

fn compare_numeric(
    actual: &AnswerValue,
    comparand: Option<&AnswerValue>,
    cmp: impl Fn(Decimal, Decimal) -> bool,
) -> bool {
    match (to_decimal(Some(actual)), to_decimal(comparand)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// Total numeric coercion: ints and floats convert directly, text parses as
/// a decimal. Booleans and arrays do not coerce; failures yield `None`
/// (which the caller turns into false).
fn to_decimal(value: Option<&AnswerValue>) -> Option<Decimal> {
    match value? {
        AnswerValue::Scalar(ScalarValue::Int(i)) => Some(Decimal::from(*i)),
        AnswerValue::Scalar(ScalarValue::Float(f)) => Decimal::from_str(&f.to_string()).ok(),
        AnswerValue::Scalar(ScalarValue::Text(s)) => Decimal::from_str(s.trim()).ok(),
        AnswerValue::Scalar(ScalarValue::Bool(_)) => None,
        AnswerValue::Many(_) => None,
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
