//! In-memory storage backend.
//!
//! Backs the HTTP server and the test suites. All records live in a single
//! `tokio::sync::RwLock`-guarded map set; individual trait calls are
//! consistent, and the engine's per-execution locks provide the
//! read-modify-write serialization on top.

use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::{
    AnswerRecord, DraftRecord, ExecutionRecord, ExecutionState, TemplateRecord,
    TemplateVersionRecord, UndoSnapshotRecord,
};
use crate::traits::CheckpathStorage;

#[derive(Default)]
struct Inner {
    templates: BTreeMap<String, TemplateRecord>,
    drafts: BTreeMap<String, DraftRecord>,
    versions: BTreeMap<String, TemplateVersionRecord>,
    executions: BTreeMap<String, ExecutionRecord>,
    answers: Vec<AnswerRecord>,
    snapshots: Vec<UndoSnapshotRecord>,
}

/// In-memory `CheckpathStorage` implementation.
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpathStorage for MemoryStorage {
    async fn insert_template(&self, record: TemplateRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        if inner.templates.contains_key(&record.id) {
            return Err(StorageError::DuplicateId {
                id: record.id.clone(),
            });
        }
        inner.templates.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get_template(&self, template_id: &str) -> Result<TemplateRecord, StorageError> {
        let inner = self.inner.read().await;
        inner
            .templates
            .get(template_id)
            .cloned()
            .ok_or_else(|| StorageError::TemplateNotFound {
                template_id: template_id.to_string(),
            })
    }

    async fn list_templates(&self) -> Result<Vec<TemplateRecord>, StorageError> {
        let inner = self.inner.read().await;
        let mut templates: Vec<TemplateRecord> = inner.templates.values().cloned().collect();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }

    async fn upsert_draft(&self, record: DraftRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        inner.drafts.insert(record.template_id.clone(), record);
        Ok(())
    }

    async fn get_draft(&self, template_id: &str) -> Result<Option<DraftRecord>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner.drafts.get(template_id).cloned())
    }

    async fn insert_version(&self, record: TemplateVersionRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        if inner.versions.contains_key(&record.id) {
            return Err(StorageError::DuplicateId {
                id: record.id.clone(),
            });
        }
        inner.versions.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get_version(
        &self,
        version_id: &str,
    ) -> Result<TemplateVersionRecord, StorageError> {
        let inner = self.inner.read().await;
        inner
            .versions
            .get(version_id)
            .cloned()
            .ok_or_else(|| StorageError::VersionNotFound {
                version_id: version_id.to_string(),
            })
    }

    async fn list_versions(
        &self,
        template_id: &str,
    ) -> Result<Vec<TemplateVersionRecord>, StorageError> {
        let inner = self.inner.read().await;
        let mut versions: Vec<TemplateVersionRecord> = inner
            .versions
            .values()
            .filter(|v| v.template_id == template_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    async fn insert_execution(&self, record: ExecutionRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        if inner.executions.contains_key(&record.id) {
            return Err(StorageError::DuplicateId {
                id: record.id.clone(),
            });
        }
        inner.executions.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get_execution(&self, execution_id: &str) -> Result<ExecutionRecord, StorageError> {
        let inner = self.inner.read().await;
        inner
            .executions
            .get(execution_id)
            .cloned()
            .ok_or_else(|| StorageError::ExecutionNotFound {
                execution_id: execution_id.to_string(),
            })
    }

    async fn update_execution_state(
        &self,
        execution_id: &str,
        state: ExecutionState,
        finished_at: Option<OffsetDateTime>,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        let record = inner.executions.get_mut(execution_id).ok_or_else(|| {
            StorageError::ExecutionNotFound {
                execution_id: execution_id.to_string(),
            }
        })?;
        record.state = state;
        record.finished_at = finished_at;
        Ok(())
    }

    async fn insert_answer(&self, record: AnswerRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        inner.answers.push(record);
        Ok(())
    }

    async fn list_answers(&self, execution_id: &str) -> Result<Vec<AnswerRecord>, StorageError> {
        let inner = self.inner.read().await;
        let mut answers: Vec<AnswerRecord> = inner
            .answers
            .iter()
            .filter(|a| a.execution_id == execution_id)
            .cloned()
            .collect();
        answers.sort_by(|a, b| a.answered_at.cmp(&b.answered_at));
        Ok(answers)
    }

    async fn invalidate_answers(
        &self,
        execution_id: &str,
        answer_ids: &[String],
        invalidated_at: OffsetDateTime,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        for answer in inner
            .answers
            .iter_mut()
            .filter(|a| a.execution_id == execution_id && answer_ids.contains(&a.id))
        {
            answer.is_valid = false;
            answer.invalidated_at = Some(invalidated_at);
        }
        Ok(())
    }

    async fn replace_answers(
        &self,
        execution_id: &str,
        records: Vec<AnswerRecord>,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        inner.answers.retain(|a| a.execution_id != execution_id);
        inner.answers.extend(records);
        Ok(())
    }

    async fn insert_snapshot(&self, record: UndoSnapshotRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        inner.snapshots.push(record);
        Ok(())
    }

    async fn latest_snapshot(
        &self,
        execution_id: &str,
        now: OffsetDateTime,
    ) -> Result<Option<UndoSnapshotRecord>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner
            .snapshots
            .iter()
            .filter(|s| s.execution_id == execution_id && s.expires_at > now)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        inner.snapshots.retain(|s| s.id != snapshot_id);
        Ok(())
    }
}
