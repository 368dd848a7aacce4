//! Discrete board intents.

use super::{TaskId, TaskStatus};
use serde::{Deserialize, Serialize};

/// A discrete request to change a task's lane and position.
///
/// Intents come from the drag controller or from direct actions such as a
/// status menu. Continuous pointer events never reach the reducer directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoardIntent {
    /// Append the task to the end of `target_status`.
    ///
    /// Moving a task into the lane it is already in changes nothing.
    Move {
        /// Task being moved.
        task_id: TaskId,
        /// Destination lane.
        target_status: TaskStatus,
    },
    /// Put the task at `target_index` in `target_status`.
    ///
    /// The index is the task's final position in the destination lane,
    /// counted with the task itself removed. Out-of-range values are clamped.
    Reorder {
        /// Task being reordered.
        task_id: TaskId,
        /// Destination lane, which may equal the current one.
        target_status: TaskStatus,
        /// Final position within the destination lane.
        target_index: usize,
    },
}

impl BoardIntent {
    /// Returns the task the intent refers to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        match *self {
            Self::Move { task_id, .. } | Self::Reorder { task_id, .. } => task_id,
        }
    }

    /// Returns the destination lane.
    #[must_use]
    pub const fn target_status(&self) -> TaskStatus {
        match *self {
            Self::Move { target_status, .. } | Self::Reorder { target_status, .. } => {
                target_status
            }
        }
    }

    /// Returns the requested position, or `None` for an append.
    #[must_use]
    pub const fn target_index(&self) -> Option<usize> {
        match *self {
            Self::Move { .. } => None,
            Self::Reorder { target_index, .. } => Some(target_index),
        }
    }

    /// Returns the same intent addressed to another task id.
    ///
    /// Used when a locally created task has been re-keyed by the server.
    #[must_use]
    pub const fn retarget(self, task_id: TaskId) -> Self {
        match self {
            Self::Move { target_status, .. } => Self::Move {
                task_id,
                target_status,
            },
            Self::Reorder {
                target_status,
                target_index,
                ..
            } => Self::Reorder {
                task_id,
                target_status,
                target_index,
            },
        }
    }
}
