//! Column view model deriving ordered lanes from the store.

use super::TaskStore;
use crate::board::domain::{BoardSnapshot, Task, TaskStatus, Tracked};
use std::collections::HashMap;
use tokio::sync::watch;

/// Ordered, lazily recomputed lanes for rendering.
///
/// A lane is rebuilt on the first read after the store publishes a new
/// revision; repeated reads at the same revision return the cached lane.
#[derive(Debug)]
pub struct ColumnViewModel {
    source: watch::Receiver<BoardSnapshot>,
    lanes: HashMap<TaskStatus, CachedLane>,
}

#[derive(Debug)]
struct CachedLane {
    revision: u64,
    tasks: Vec<Tracked<Task>>,
}

impl ColumnViewModel {
    /// Creates a view model following `store`.
    #[must_use]
    pub fn new(store: &TaskStore) -> Self {
        Self {
            source: store.subscribe(),
            lanes: HashMap::new(),
        }
    }

    /// Returns the revision of the snapshot the view model currently sees.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.source.borrow().revision()
    }

    /// Returns the tasks in `status`, ascending by order key.
    pub fn tasks_for(&mut self, status: TaskStatus) -> &[Tracked<Task>] {
        let snapshot = self.source.borrow_and_update().clone();
        let stale = self
            .lanes
            .get(&status)
            .is_none_or(|cached| cached.revision != snapshot.revision());
        if stale {
            self.lanes.insert(
                status,
                CachedLane {
                    revision: snapshot.revision(),
                    tasks: snapshot.lane(status),
                },
            );
        }
        self.lanes
            .get(&status)
            .map(|cached| cached.tasks.as_slice())
            .unwrap_or_default()
    }

    /// Waits until the store publishes a new snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`watch::error::RecvError`] once the store has been dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.source.changed().await
    }
}
