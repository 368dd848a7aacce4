//! Single owned task store with snapshot subscription.

use crate::board::domain::{BoardReducer, BoardSnapshot, Task, TaskId, Tracked};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

/// Errors returned by the task store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A writer panicked while holding the store lock.
    #[error("task store lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

type Entries = HashMap<TaskId, Tracked<Task>>;

/// The board's task collection.
///
/// Every mutation that changes the board bumps the revision and publishes a
/// fresh [`BoardSnapshot`] to subscribers. Writes are crate-private: they flow
/// through the optimistic mutation tracker, except [`TaskStore::load`] which
/// installs an authoritative server listing.
#[derive(Debug, Clone)]
pub struct TaskStore {
    state: Arc<RwLock<StoreState>>,
    publisher: Arc<watch::Sender<BoardSnapshot>>,
}

#[derive(Debug, Default)]
struct StoreState {
    revision: u64,
    entries: Arc<Entries>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (publisher, _) = watch::channel(BoardSnapshot::default());
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            publisher: Arc::new(publisher),
        }
    }

    /// Replaces the whole collection with confirmed tasks from the server.
    ///
    /// Lanes containing duplicate order keys are renormalized with
    /// `reducer` so every lane starts strictly ordered.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockPoisoned`] if the store lock is poisoned.
    pub fn load(
        &self,
        tasks: impl IntoIterator<Item = Task>,
        reducer: &BoardReducer,
    ) -> StoreResult<BoardSnapshot> {
        let mut loaded: Vec<Task> = tasks.into_iter().collect();
        let rewrites = reducer.repair(&loaded);
        for task in &mut loaded {
            if let Some(rewrite) = rewrites.iter().find(|r| r.task_id == task.id()) {
                task.set_order(rewrite.to);
            }
        }
        debug!(count = loaded.len(), repaired = rewrites.len(), "loading board");
        self.mutate(|entries| {
            entries.clear();
            entries.extend(
                loaded
                    .into_iter()
                    .map(|task| (task.id(), Tracked::confirmed(task))),
            );
        })?;
        self.snapshot()
    }

    /// Returns the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockPoisoned`] if the store lock is poisoned.
    pub fn snapshot(&self) -> StoreResult<BoardSnapshot> {
        let state = self
            .state
            .read()
            .map_err(|err| StoreError::LockPoisoned(err.to_string()))?;
        Ok(BoardSnapshot::new(state.revision, Arc::clone(&state.entries)))
    }

    /// Returns the entry for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockPoisoned`] if the store lock is poisoned.
    pub fn get(&self, id: TaskId) -> StoreResult<Option<Tracked<Task>>> {
        let state = self
            .state
            .read()
            .map_err(|err| StoreError::LockPoisoned(err.to_string()))?;
        Ok(state.entries.get(&id).cloned())
    }

    /// Returns the values currently shown, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockPoisoned`] if the store lock is poisoned.
    pub fn tasks(&self) -> StoreResult<Vec<Task>> {
        Ok(self.snapshot()?.tasks().cloned().collect())
    }

    /// Subscribes to snapshots published after each mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BoardSnapshot> {
        self.publisher.subscribe()
    }

    /// Runs `f` against the entries and publishes the result atomically.
    pub(crate) fn mutate<T>(&self, f: impl FnOnce(&mut Entries) -> T) -> StoreResult<T> {
        self.mutate_if(f, |_| true)
    }

    /// Runs `f` against the entries, publishing a new revision only when
    /// `changed` accepts its output.
    ///
    /// `f` must leave the entries untouched whenever `changed` would reject
    /// its output.
    pub(crate) fn mutate_if<T>(
        &self,
        f: impl FnOnce(&mut Entries) -> T,
        changed: impl FnOnce(&T) -> bool,
    ) -> StoreResult<T> {
        let mut state = self
            .state
            .write()
            .map_err(|err| StoreError::LockPoisoned(err.to_string()))?;
        let output = f(Arc::make_mut(&mut state.entries));
        if changed(&output) {
            state.revision += 1;
            self.publisher.send_replace(BoardSnapshot::new(
                state.revision,
                Arc::clone(&state.entries),
            ));
        }
        Ok(output)
    }
}
