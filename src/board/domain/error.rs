//! Error types for board domain validation, parsing and drag sessions.

use super::TaskId;
use thiserror::Error;

/// Errors returned while constructing or changing board domain values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BoardDomainError {
    /// An intent or lookup referenced a task that is not on the board.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The assignee name is empty after trimming.
    #[error("assignee name must not be empty")]
    EmptyAssignee,

    /// Order keys must be finite real numbers.
    #[error("order key must be finite, got {0}")]
    InvalidOrderKey(f64),

    /// The ordering configuration cannot produce distinct keys.
    #[error("invalid ordering configuration: {0}")]
    InvalidOrderingConfig(String),
}

/// Error returned while parsing task statuses from external input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing task priorities from external input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task priority: {0}")]
pub struct ParseTaskPriorityError(pub String);

/// Errors returned when the drag controller is driven out of sequence.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DragError {
    /// A new drag was started while another was still in progress.
    #[error("a drag of task {0} is already in progress")]
    AlreadyDragging(TaskId),

    /// A hover or drop arrived while no drag was in progress.
    #[error("no drag is in progress")]
    NotDragging,

    /// The dragged task could not be resolved on the board.
    #[error(transparent)]
    Domain(#[from] BoardDomainError),
}
