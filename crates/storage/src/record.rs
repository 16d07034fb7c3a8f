use checkpath_core::{AnswerValue, Configuration};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Lifecycle state of one checklist execution.
///
/// FINISHED and CANCELLED are terminal; FINISHED is reachable only from
/// IN_PROGRESS after required-answer validation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    InProgress,
    Finished,
    Cancelled,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionState::Finished | ExecutionState::Cancelled)
    }
}

/// A checklist template (the mutable authoring container; published
/// content lives in immutable version records).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The single work-in-progress draft of a template. Overwritten on save.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    pub template_id: String,
    pub configuration: Configuration,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// An immutable published version of a template.
///
/// `checksum` is the SHA-256 hex digest of the configuration's canonical
/// JSON; the configuration is never mutated after publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVersionRecord {
    pub id: String,
    pub template_id: String,
    pub version: u32,
    pub configuration: Configuration,
    pub checksum: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
}

/// One run of one template version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: String,
    pub template_id: String,
    pub version_id: String,
    pub state: ExecutionState,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
}

/// One answer row. Rows are soft-invalidated, never deleted (except when an
/// undo replaces the whole set), so the full history stays auditable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub id: String,
    pub execution_id: String,
    pub question_id: String,
    pub value: AnswerValue,
    pub is_valid: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub answered_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub invalidated_at: Option<OffsetDateTime>,
}

/// A time-boxed, single-use copy of an execution's full answer set (valid
/// and invalid rows alike), taken immediately before a mutation. Usable
/// until `expires_at`, until consumed by an undo, or until superseded by a
/// newer snapshot. Restoring it reinstates the rows content-equal, validity
/// flags included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoSnapshotRecord {
    pub id: String,
    pub execution_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub answers: Vec<AnswerRecord>,
}
