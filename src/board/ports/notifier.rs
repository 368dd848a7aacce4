//! Port for surfacing failed mutations to the user.

use crate::board::domain::{OperationKind, TaskId};
use std::fmt;

/// Why a mutation failed, for choosing the message shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    /// The server refused the change.
    ValidationRejected,
    /// The server could not be reached.
    TransportFailure,
}

/// User-facing description of a rolled-back mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    /// Task whose change was rolled back.
    pub task_id: TaskId,
    /// Mutation that failed.
    pub operation: OperationKind,
    /// Failure category.
    pub kind: NoticeKind,
    /// Human-readable detail.
    pub message: String,
}

impl fmt::Display for ErrorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NoticeKind::ValidationRejected => {
                write!(f, "Could not {} task: {}", self.operation, self.message)
            }
            NoticeKind::TransportFailure => write!(
                f,
                "Could not reach the server to {} task: {}",
                self.operation, self.message
            ),
        }
    }
}

/// Receives notices for mutations that were rolled back.
///
/// Implementations typically show a toast. Calls happen after the board has
/// already been restored.
pub trait BoardNotifier: Send + Sync {
    /// Surfaces a failed mutation.
    fn notify(&self, notice: &ErrorNotice);
}
