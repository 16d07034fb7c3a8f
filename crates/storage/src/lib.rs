mod error;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use memory::MemoryStorage;
pub use record::{
    AnswerRecord, DraftRecord, ExecutionRecord, ExecutionState, TemplateRecord,
    TemplateVersionRecord, UndoSnapshotRecord,
};
pub use traits::CheckpathStorage;
