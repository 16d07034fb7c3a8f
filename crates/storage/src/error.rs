/// All errors that can be returned by a CheckpathStorage implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No template with the given id.
    #[error("template not found: {template_id}")]
    TemplateNotFound { template_id: String },

    /// No published version with the given id.
    #[error("template version not found: {version_id}")]
    VersionNotFound { version_id: String },

    /// No execution with the given id.
    #[error("execution not found: {execution_id}")]
    ExecutionNotFound { execution_id: String },

    /// A record with this id already exists.
    #[error("duplicate record id: {id}")]
    DuplicateId { id: String },

    /// A backend-specific storage error (connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
