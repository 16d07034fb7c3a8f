//! Application state shared across request handlers.

use std::sync::Arc;

use checkpath_engine::ExecutionCoordinator;
use checkpath_storage::MemoryStorage;

/// Shared server state: the storage backend plus the coordinator that
/// drives executions against it. Both point at the same backend.
pub(crate) struct AppState {
    pub(crate) storage: Arc<MemoryStorage>,
    pub(crate) coordinator: ExecutionCoordinator<MemoryStorage>,
}
