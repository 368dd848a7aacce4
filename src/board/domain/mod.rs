//! Domain model for the task board.
//!
//! The board domain covers task entities, lane ordering, the pure board
//! reducer and the drag session state machine. Nothing in this module
//! performs I/O; persistence and notification live behind the ports.

mod config;
mod drag;
mod error;
mod ids;
mod intent;
mod order;
mod reducer;
mod snapshot;
mod status;
mod task;
mod tracked;

pub use config::OrderingConfig;
pub use drag::{DragController, DragOrigin, DragPhase, DragSession, DropTarget, Placement};
pub use error::{BoardDomainError, DragError, ParseTaskPriorityError, ParseTaskStatusError};
pub use ids::TaskId;
pub use intent::BoardIntent;
pub use order::{OrderExhaustion, OrderKey};
pub use reducer::{BoardReducer, KeyRewrite, Reduction};
pub use snapshot::{BoardSnapshot, LaneCounts};
pub use status::TaskStatus;
pub use task::{
    Assignee, NewTask, PersistedTaskData, Task, TaskPatch, TaskPriority, compare_order,
};
pub use tracked::{OperationKind, PendingOperation, Tracked, is_optimistic};
