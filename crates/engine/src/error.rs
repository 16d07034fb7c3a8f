//! Engine error taxonomy.
//!
//! NotFound and InvalidState surface directly to the caller and are never
//! retried. ValidationFailed carries the complete list of missing required
//! questions so callers can present all of them at once. "Nothing to undo"
//! is deliberately NOT an error: `undo_last` returns `Ok(false)` for it,
//! since an expired or absent snapshot is an expected, common outcome.

use std::fmt;

use checkpath_storage::{ExecutionState, StorageError};

/// Errors returned by the execution coordinator.
#[derive(Debug)]
pub enum EngineError {
    /// Referenced execution does not exist.
    ExecutionNotFound { execution_id: String },
    /// Referenced template does not exist.
    TemplateNotFound { template_id: String },
    /// Referenced template version does not exist.
    VersionNotFound { version_id: String },
    /// Operation attempted against an execution outside IN_PROGRESS.
    InvalidState {
        execution_id: String,
        state: ExecutionState,
    },
    /// Finalize blocked: required questions in the visible path are
    /// unanswered. Carries one message per missing question.
    ValidationFailed { missing: Vec<String> },
    /// The storage backend failed.
    Storage(StorageError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::ExecutionNotFound { execution_id } => {
                write!(f, "execution not found: {}", execution_id)
            }
            EngineError::TemplateNotFound { template_id } => {
                write!(f, "template not found: {}", template_id)
            }
            EngineError::VersionNotFound { version_id } => {
                write!(f, "template version not found: {}", version_id)
            }
            EngineError::InvalidState {
                execution_id,
                state,
            } => {
                write!(
                    f,
                    "execution {} is not in progress (state: {:?})",
                    execution_id, state
                )
            }
            EngineError::ValidationFailed { missing } => {
                write!(
                    f,
                    "required answers missing: {}",
                    missing.join("; ")
                )
            }
            EngineError::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StorageError> for EngineError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::ExecutionNotFound { execution_id } => {
                EngineError::ExecutionNotFound { execution_id }
            }
            StorageError::TemplateNotFound { template_id } => {
                EngineError::TemplateNotFound { template_id }
            }
            StorageError::VersionNotFound { version_id } => {
                EngineError::VersionNotFound { version_id }
            }
            other => EngineError::Storage(other),
        }
    }
}
