//! Application services for the task board.

mod column;
mod store;
mod tracker;

pub use column::ColumnViewModel;
pub use store::{StoreError, StoreResult, TaskStore};
pub use tracker::{OptimisticMutationTracker, TrackerError, TrackerResult};
