//! Persistence port for task mutations.

use crate::board::domain::{NewTask, Task, TaskId, TaskPatch, TaskStatus};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Server-side task persistence contract.
///
/// Every method returns the server's canonical view of the task so the
/// tracker can merge fields the server normalized. Timeout and retry policy
/// belong to implementations.
#[async_trait]
pub trait TaskPersistence: Send + Sync {
    /// Appends the task to the end of `status`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the server rejects the move or
    /// cannot be reached.
    async fn move_task(&self, task_id: TaskId, status: TaskStatus) -> PersistenceResult<Task>;

    /// Places the task at `target_index` within `status`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the server rejects the reorder or
    /// cannot be reached.
    async fn reorder_task(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        target_index: usize,
    ) -> PersistenceResult<Task>;

    /// Creates a task and returns it with server-assigned fields.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the server rejects the task or
    /// cannot be reached.
    async fn create_task(&self, request: &NewTask) -> PersistenceResult<Task>;

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the server rejects the deletion or
    /// cannot be reached.
    async fn delete_task(&self, task_id: TaskId) -> PersistenceResult<()>;

    /// Applies a descriptive field patch.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the server rejects the patch or
    /// cannot be reached.
    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> PersistenceResult<Task>;
}

/// Errors returned by persistence implementations.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    /// The server does not know the task.
    #[error("task not found on server: {0}")]
    NotFound(TaskId),

    /// The server refused the change.
    #[error("rejected by server: {0}")]
    Validation(String),

    /// The server could not be reached or failed internally.
    #[error("transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl PersistenceError {
    /// Wraps a transport-level error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Creates a validation rejection.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns `true` for transport failures.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
