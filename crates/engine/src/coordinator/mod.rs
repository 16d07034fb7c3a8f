//! Execution coordinator.
//!
//! Orchestrates the three externally-triggered operations on an execution:
//! apply an answer (snapshot, mutate ledger, recompute path, invalidate
//! answers outside it), undo the last mutation (restore the most recent
//! non-expired snapshot, single use), and finalize (required-answer
//! validation, outcome evaluation, transition to FINISHED).
//!
//! Concurrency: the snapshot-then-mutate sequence is not safe under
//! concurrent writers to the same execution, so every mutating operation
//! takes a per-execution async mutex for its whole read-modify-write span.
//! Operations on different executions share no state and run concurrently.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use checkpath_core::{
    AnswerValue, ChoiceOption, Configuration, Outcome, Question, QuestionKind, ValidationRules,
};
use checkpath_storage::{
    AnswerRecord, CheckpathStorage, ExecutionState, UndoSnapshotRecord,
};

use crate::error::EngineError;
use crate::ledger::AnswerLedger;
use crate::{outcome, path};

#[cfg(test)]
mod tests;

/// How long an undo snapshot stays usable, measured from creation.
pub const SNAPSHOT_TTL: Duration = Duration::seconds(30);

/// One question of the visible path, as returned to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleQuestion {
    pub question_id: String,
    pub text: String,
    pub kind: QuestionKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceOption>,
    pub validation: ValidationRules,
    pub is_initial: bool,
}

impl From<&Question> for VisibleQuestion {
    fn from(q: &Question) -> Self {
        VisibleQuestion {
            question_id: q.id.clone(),
            text: q.text.clone(),
            kind: q.kind,
            options: q.options.clone(),
            validation: q.validation.clone(),
            is_initial: q.is_initial,
        }
    }
}

/// An answer invalidated because its question left the visible path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidatedAnswer {
    pub question_id: String,
    pub text: String,
}

/// Result of applying one answer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    pub visible_path: Vec<VisibleQuestion>,
    pub next_question_ids: Vec<String>,
    pub invalidated_answers: Vec<InvalidatedAnswer>,
}

/// Result of finalizing an execution.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeOutcome {
    pub execution_id: String,
    pub outcomes: Vec<Outcome>,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

/// Registry of per-execution mutexes serializing same-execution mutations.
///
/// Entries are held weakly so the registry does not accumulate ids forever:
/// once the last in-flight operation on an execution releases its lock, the
/// entry is dead and gets swept on the next acquisition. Ids that never
/// matched a stored execution disappear the same way.
#[derive(Default)]
struct ExecutionLocks {
    map: tokio::sync::Mutex<HashMap<String, Weak<tokio::sync::Mutex<()>>>>,
}

impl ExecutionLocks {
    async fn get(&self, execution_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.map.lock().await;
        map.retain(|_, weak| weak.strong_count() > 0);
        if let Some(lock) = map.get(execution_id).and_then(Weak::upgrade) {
            return lock;
        }
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        map.insert(execution_id.to_string(), Arc::downgrade(&lock));
        lock
    }
}

/// The decision engine's top-level API over one storage backend.
pub struct ExecutionCoordinator<S: CheckpathStorage> {
    storage: Arc<S>,
    locks: ExecutionLocks,
}

impl<S: CheckpathStorage> ExecutionCoordinator<S> {
    pub fn new(storage: Arc<S>) -> Self {
        ExecutionCoordinator {
            storage,
            locks: ExecutionLocks::default(),
        }
    }

    /// The visible path of the execution under its current valid answers.
    pub async fn resolve_visible_path(
        &self,
        execution_id: &str,
    ) -> Result<Vec<VisibleQuestion>, EngineError> {
        let (_, config, ledger) = self.load(execution_id).await?;
        let visible = path::resolve_visible_path(&config, &ledger.valid_values());
        Ok(visible.iter().map(VisibleQuestion::from).collect())
    }

    /// Apply one answer and recompute the visible path.
    ///
    /// Sequence: state check, undo snapshot (30 s TTL), supersede the prior
    /// answer for the question, record the new one, recompute the path,
    /// invalidate every valid answer outside it except the one just
    /// written.
    pub async fn apply_answer(
        &self,
        execution_id: &str,
        question_id: &str,
        value: AnswerValue,
    ) -> Result<ApplyOutcome, EngineError> {
        let lock = self.locks.get(execution_id).await;
        let _guard = lock.lock().await;

        let (execution, config, mut ledger) = self.load(execution_id).await?;
        require_in_progress(&execution)?;

        let now = OffsetDateTime::now_utc();

        // Snapshot the pre-mutation answer set first; if anything after
        // this fails, the answer is not considered applied.
        self.storage
            .insert_snapshot(UndoSnapshotRecord {
                id: Uuid::new_v4().to_string(),
                execution_id: execution_id.to_string(),
                created_at: now,
                expires_at: now + SNAPSHOT_TTL,
                answers: ledger.snapshot(),
            })
            .await?;

        let superseded = ledger.supersede(question_id, now);
        if !superseded.is_empty() {
            self.storage
                .invalidate_answers(execution_id, &superseded, now)
                .await?;
        }

        let record = AnswerRecord {
            id: Uuid::new_v4().to_string(),
            execution_id: execution_id.to_string(),
            question_id: question_id.to_string(),
            value,
            is_valid: true,
            answered_at: now,
            invalidated_at: None,
        };
        self.storage.insert_answer(record.clone()).await?;
        ledger.record(record);

        let values = ledger.valid_values();
        let visible = path::resolve_visible_path(&config, &values);
        let path_ids: BTreeSet<String> = visible.iter().map(|q| q.id.clone()).collect();

        // Answers whose question left the path are invalidated, except the
        // answer just written. Rows for questions unknown to this
        // configuration version are left alone.
        let mut invalidated_ids = Vec::new();
        let mut invalidated_answers = Vec::new();
        for (row_id, row_question_id) in ledger.outside_path(&path_ids, question_id) {
            if let Some(question) = config.question(&row_question_id) {
                invalidated_ids.push(row_id);
                invalidated_answers.push(InvalidatedAnswer {
                    question_id: row_question_id,
                    text: question.text.clone(),
                });
            }
        }
        if !invalidated_ids.is_empty() {
            self.storage
                .invalidate_answers(execution_id, &invalidated_ids, now)
                .await?;
            ledger.mark_invalid(&invalidated_ids, now);
        }

        let next_question_ids = path::next_question_ids(&config, question_id, &values);

        Ok(ApplyOutcome {
            visible_path: visible.iter().map(VisibleQuestion::from).collect(),
            next_question_ids,
            invalidated_answers,
        })
    }

    /// Restore the most recent non-expired undo snapshot.
    ///
    /// Returns `Ok(false)` when no usable snapshot exists (expired, absent,
    /// or already consumed) — an expected outcome, not an error. On
    /// success the snapshot is deleted: it cannot be replayed.
    pub async fn undo_last(&self, execution_id: &str) -> Result<bool, EngineError> {
        let lock = self.locks.get(execution_id).await;
        let _guard = lock.lock().await;

        // Propagates NotFound for unknown executions.
        self.storage.get_execution(execution_id).await?;

        let now = OffsetDateTime::now_utc();
        let Some(snapshot) = self.storage.latest_snapshot(execution_id, now).await? else {
            return Ok(false);
        };

        self.storage
            .replace_answers(execution_id, snapshot.answers.clone())
            .await?;
        self.storage.delete_snapshot(&snapshot.id).await?;
        Ok(true)
    }

    /// Validate required answers along the visible path, evaluate outcomes,
    /// and move the execution to FINISHED.
    ///
    /// Fails with `ValidationFailed` listing EVERY missing required
    /// question; in that case the execution stays IN_PROGRESS (no partial
    /// finalize).
    pub async fn finalize(&self, execution_id: &str) -> Result<FinalizeOutcome, EngineError> {
        let lock = self.locks.get(execution_id).await;
        let _guard = lock.lock().await;

        let (execution, config, ledger) = self.load(execution_id).await?;
        require_in_progress(&execution)?;

        let values = ledger.valid_values();
        let visible = path::resolve_visible_path(&config, &values);

        let missing: Vec<String> = visible
            .iter()
            .filter(|q| q.validation.required && !values.contains_key(&q.id))
            .map(|q| format!("question \"{}\" is required", q.text))
            .collect();
        if !missing.is_empty() {
            return Err(EngineError::ValidationFailed { missing });
        }

        let outcomes = outcome::applicable_outcomes(&config, &values);
        let finished_at = OffsetDateTime::now_utc();
        self.storage
            .update_execution_state(execution_id, ExecutionState::Finished, Some(finished_at))
            .await?;

        Ok(FinalizeOutcome {
            execution_id: execution_id.to_string(),
            outcomes,
            finished_at,
        })
    }

    /// Fetch the execution, its configuration version, and its answer rows.
    async fn load(
        &self,
        execution_id: &str,
    ) -> Result<
        (
            checkpath_storage::ExecutionRecord,
            Configuration,
            AnswerLedger,
        ),
        EngineError,
    > {
        let execution = self.storage.get_execution(execution_id).await?;
        let version = self.storage.get_version(&execution.version_id).await?;
        let rows = self.storage.list_answers(execution_id).await?;
        Ok((execution, version.configuration, AnswerLedger::new(rows)))
    }
}

fn require_in_progress(
    execution: &checkpath_storage::ExecutionRecord,
) -> Result<(), EngineError> {
    if execution.state != ExecutionState::InProgress {
        return Err(EngineError::InvalidState {
            execution_id: execution.id.clone(),
            state: execution.state,
        });
    }
    Ok(())
}
