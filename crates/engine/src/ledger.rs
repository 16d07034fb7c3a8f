//! Answer ledger: the soft-invalidate answer history of one execution.
//!
//! Answer rows are appended, never edited in place (except validity
//! stamping) — superseded or path-excluded answers stay in the row set for
//! audit and undo. The ledger owns the invalidation POLICY: which rows a
//! new answer supersedes and which valid rows fall outside a recomputed
//! path. Persisting the resulting changes is the coordinator's job; this
//! type only mirrors them on its in-memory rows so later computations in
//! the same operation see consistent state.

use std::collections::{BTreeMap, BTreeSet};

use checkpath_core::AnswerValue;
use checkpath_storage::AnswerRecord;
use time::OffsetDateTime;

/// In-memory working set of one execution's answer rows.
pub struct AnswerLedger {
    rows: Vec<AnswerRecord>,
}

impl AnswerLedger {
    /// Build from rows fetched from storage (any order).
    pub fn new(rows: Vec<AnswerRecord>) -> Self {
        AnswerLedger { rows }
    }

    pub fn rows(&self) -> &[AnswerRecord] {
        &self.rows
    }

    /// The current valid answer per question. At most one valid row exists
    /// per question; if storage ever holds more, the latest answered wins.
    pub fn valid_values(&self) -> BTreeMap<String, AnswerValue> {
        let mut values: BTreeMap<String, (OffsetDateTime, AnswerValue)> = BTreeMap::new();
        for row in self.rows.iter().filter(|r| r.is_valid) {
            match values.get(&row.question_id) {
                Some((answered_at, _)) if *answered_at >= row.answered_at => {}
                _ => {
                    values.insert(
                        row.question_id.clone(),
                        (row.answered_at, row.value.clone()),
                    );
                }
            }
        }
        values.into_iter().map(|(q, (_, v))| (q, v)).collect()
    }

    /// Full copy of the current rows, for an undo snapshot payload.
    pub fn snapshot(&self) -> Vec<AnswerRecord> {
        self.rows.clone()
    }

    /// Invalidate the currently-valid row(s) for `question_id`, returning
    /// the affected row ids (empty if the question was unanswered).
    pub fn supersede(&mut self, question_id: &str, at: OffsetDateTime) -> Vec<String> {
        let mut superseded = Vec::new();
        for row in self
            .rows
            .iter_mut()
            .filter(|r| r.is_valid && r.question_id == question_id)
        {
            row.is_valid = false;
            row.invalidated_at = Some(at);
            superseded.push(row.id.clone());
        }
        superseded
    }

    /// Append a freshly-recorded row.
    pub fn record(&mut self, row: AnswerRecord) {
        self.rows.push(row);
    }

    /// Valid rows whose question is not in `path_ids`, excluding
    /// `keep_question` (the answer that triggered the recomputation is
    /// never invalidated by it). Returns (row id, question id) pairs.
    pub fn outside_path(
        &self,
        path_ids: &BTreeSet<String>,
        keep_question: &str,
    ) -> Vec<(String, String)> {
        self.rows
            .iter()
            .filter(|r| {
                r.is_valid
                    && r.question_id != keep_question
                    && !path_ids.contains(&r.question_id)
            })
            .map(|r| (r.id.clone(), r.question_id.clone()))
            .collect()
    }

    /// Stamp the given rows invalid.
    pub fn mark_invalid(&mut self, row_ids: &[String], at: OffsetDateTime) {
        for row in self.rows.iter_mut().filter(|r| row_ids.contains(&r.id)) {
            row.is_valid = false;
            row.invalidated_at = Some(at);
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
