use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::record::{
    AnswerRecord, DraftRecord, ExecutionRecord, ExecutionState, TemplateRecord,
    TemplateVersionRecord, UndoSnapshotRecord,
};

/// The storage trait for Checkpath backends.
///
/// A `CheckpathStorage` implementation is a plain record store for
/// templates, published versions, executions, answer rows, and undo
/// snapshots. It carries no engine logic: answer invalidation policy,
/// snapshot expiry, and path recomputation all live in the engine crate,
/// which calls through these primitives.
///
/// ## Ordering
///
/// - `list_templates` returns newest first.
/// - `list_versions` returns highest version number first.
/// - `list_answers` returns rows ordered by `answered_at` ascending.
/// - `latest_snapshot` returns the most recently created snapshot whose
///   `expires_at` is strictly after the supplied `now`.
///
/// ## Thread safety
///
/// Implementations must be `Send + Sync + 'static` so they can be shared
/// behind an `Arc` across async task boundaries. The engine serializes
/// same-execution mutations itself; the store only needs to keep individual
/// calls consistent.
#[async_trait]
pub trait CheckpathStorage: Send + Sync + 'static {
    // ── Templates and versions ───────────────────────────────────────────

    async fn insert_template(&self, record: TemplateRecord) -> Result<(), StorageError>;

    /// Returns `Err(StorageError::TemplateNotFound)` if absent.
    async fn get_template(&self, template_id: &str) -> Result<TemplateRecord, StorageError>;

    async fn list_templates(&self) -> Result<Vec<TemplateRecord>, StorageError>;

    /// Create or overwrite the single draft for a template.
    async fn upsert_draft(&self, record: DraftRecord) -> Result<(), StorageError>;

    async fn get_draft(&self, template_id: &str) -> Result<Option<DraftRecord>, StorageError>;

    async fn insert_version(&self, record: TemplateVersionRecord) -> Result<(), StorageError>;

    /// Returns `Err(StorageError::VersionNotFound)` if absent.
    async fn get_version(&self, version_id: &str)
        -> Result<TemplateVersionRecord, StorageError>;

    async fn list_versions(
        &self,
        template_id: &str,
    ) -> Result<Vec<TemplateVersionRecord>, StorageError>;

    // ── Executions ───────────────────────────────────────────────────────

    async fn insert_execution(&self, record: ExecutionRecord) -> Result<(), StorageError>;

    /// Returns `Err(StorageError::ExecutionNotFound)` if absent.
    async fn get_execution(&self, execution_id: &str) -> Result<ExecutionRecord, StorageError>;

    async fn update_execution_state(
        &self,
        execution_id: &str,
        state: ExecutionState,
        finished_at: Option<OffsetDateTime>,
    ) -> Result<(), StorageError>;

    // ── Answer rows ──────────────────────────────────────────────────────

    async fn insert_answer(&self, record: AnswerRecord) -> Result<(), StorageError>;

    async fn list_answers(&self, execution_id: &str) -> Result<Vec<AnswerRecord>, StorageError>;

    /// Mark the given answer rows invalid, stamping `invalidated_at`.
    /// Ids not present are ignored.
    async fn invalidate_answers(
        &self,
        execution_id: &str,
        answer_ids: &[String],
        invalidated_at: OffsetDateTime,
    ) -> Result<(), StorageError>;

    /// Drop all answer rows for an execution and install the given set.
    /// Used by undo to restore a snapshot's answer state wholesale.
    async fn replace_answers(
        &self,
        execution_id: &str,
        records: Vec<AnswerRecord>,
    ) -> Result<(), StorageError>;

    // ── Undo snapshots ───────────────────────────────────────────────────

    async fn insert_snapshot(&self, record: UndoSnapshotRecord) -> Result<(), StorageError>;

    /// The most recent snapshot for the execution that has not expired as
    /// of `now`, if any. Expiry is evaluated here by clock comparison; no
    /// background eviction exists.
    async fn latest_snapshot(
        &self,
        execution_id: &str,
        now: OffsetDateTime,
    ) -> Result<Option<UndoSnapshotRecord>, StorageError>;

    /// Delete a consumed snapshot. Deleting an unknown id is a no-op.
    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), StorageError>;
}
