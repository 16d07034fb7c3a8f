//! Outcome-rule evaluation.
//!
//! Outcomes are evaluated against the final valid answers: each outcome's
//! conditions are AND-combined, and ALL satisfied outcomes are returned
//! (no first-match cutoff — outcomes are not mutually exclusive, unlike
//! transition resolution). Output order is descending priority, with the
//! declaration order breaking ties.

use std::collections::BTreeMap;

use checkpath_core::{AnswerValue, Configuration, Outcome};

use crate::condition;

/// All outcomes whose conditions hold under the given valid answers,
/// sorted by descending priority (stable — declaration order on ties).
/// An outcome with zero conditions is vacuously applicable.
pub fn applicable_outcomes(
    config: &Configuration,
    answers: &BTreeMap<String, AnswerValue>,
) -> Vec<Outcome> {
    let mut outcomes: Vec<&Outcome> = config.outcomes.iter().collect();
    outcomes.sort_by(|a, b| b.priority.cmp(&a.priority));

    outcomes
        .into_iter()
        .filter(|outcome| {
            outcome.conditions.iter().all(|cond| {
                condition::evaluate(
                    cond.operator,
                    answers.get(&cond.question_id),
                    cond.comparand.as_ref(),
                )
            })
        })
        .cloned()
        .collect()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
