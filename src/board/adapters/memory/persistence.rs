//! In-memory stand-in for the task server.

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use crate::board::{
    domain::{
        BoardIntent, BoardReducer, NewTask, OrderingConfig, Task, TaskId, TaskPatch, TaskStatus,
        compare_order,
    },
    ports::{PersistenceError, PersistenceResult, TaskPersistence},
};

/// Thread-safe server simulation.
///
/// Placement uses its own reducer with unit spacing, so confirmed keys
/// usually differ from the client's optimistic guesses. Failures queued
/// with [`InMemoryTaskPersistence::fail_next`] are returned by the next
/// calls in FIFO order.
#[derive(Clone)]
pub struct InMemoryTaskPersistence {
    state: Arc<RwLock<ServerState>>,
    reducer: BoardReducer,
    clock: Arc<dyn Clock + Send + Sync>,
}

#[derive(Debug, Default)]
struct ServerState {
    tasks: HashMap<TaskId, Task>,
    failures: VecDeque<PersistenceError>,
    calls: usize,
}

impl Default for InMemoryTaskPersistence {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTaskPersistence {
    /// Creates an empty server.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            reducer: BoardReducer::new(OrderingConfig::compact()),
            clock: Arc::new(DefaultClock),
        }
    }

    /// Seeds the server with existing tasks.
    #[must_use]
    pub fn with_tasks(self, tasks: impl IntoIterator<Item = Task>) -> Self {
        if let Ok(mut state) = self.state.write() {
            state
                .tasks
                .extend(tasks.into_iter().map(|task| (task.id(), task)));
        }
        self
    }

    /// Replaces the clock used for server timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    /// Queues an error for the next call.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Transport`] if the state lock is poisoned.
    pub fn fail_next(&self, error: PersistenceError) -> PersistenceResult<()> {
        self.write()?.failures.push_back(error);
        Ok(())
    }

    /// Returns the server's tasks ordered by lane and key.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Transport`] if the state lock is poisoned.
    pub fn tasks(&self) -> PersistenceResult<Vec<Task>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        let mut tasks: Vec<Task> = state.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| {
            a.status()
                .cmp(&b.status())
                .then_with(|| compare_order(a, b))
        });
        Ok(tasks)
    }

    /// Returns the server's copy of a task.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Transport`] if the state lock is poisoned.
    pub fn get(&self, task_id: TaskId) -> PersistenceResult<Option<Task>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        Ok(state.tasks.get(&task_id).cloned())
    }

    /// Returns how many mutation calls the server has received.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Transport`] if the state lock is poisoned.
    pub fn call_count(&self) -> PersistenceResult<usize> {
        Ok(self.state.read().map_err(|err| poisoned(&err))?.calls)
    }

    fn write(&self) -> PersistenceResult<RwLockWriteGuard<'_, ServerState>> {
        self.state.write().map_err(|err| poisoned(&err))
    }

    /// Counts the call and returns the next scripted failure, if any.
    fn admit(&self) -> PersistenceResult<RwLockWriteGuard<'_, ServerState>> {
        let mut state = self.write()?;
        state.calls += 1;
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        Ok(state)
    }

    fn place(&self, intent: &BoardIntent) -> PersistenceResult<Task> {
        let mut state = self.admit()?;
        let task_id = intent.task_id();
        if !state.tasks.contains_key(&task_id) {
            return Err(PersistenceError::NotFound(task_id));
        }
        let reduction = self
            .reducer
            .reduce(state.tasks.values(), intent)
            .map_err(|err| PersistenceError::validation(err.to_string()))?;
        for rewrite in reduction.rewrites() {
            if let Some(task) = state.tasks.get_mut(&rewrite.task_id) {
                task.set_order(rewrite.to);
            }
        }
        let mut placed = reduction.moved().clone();
        if !reduction.is_noop() {
            placed.touch(self.clock.utc());
        }
        state.tasks.insert(task_id, placed.clone());
        Ok(placed)
    }
}

fn poisoned(err: &impl fmt::Display) -> PersistenceError {
    PersistenceError::transport(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TaskPersistence for InMemoryTaskPersistence {
    async fn move_task(&self, task_id: TaskId, status: TaskStatus) -> PersistenceResult<Task> {
        self.place(&BoardIntent::Move {
            task_id,
            target_status: status,
        })
    }

    async fn reorder_task(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        target_index: usize,
    ) -> PersistenceResult<Task> {
        self.place(&BoardIntent::Reorder {
            task_id,
            target_status: status,
            target_index,
        })
    }

    async fn create_task(&self, request: &NewTask) -> PersistenceResult<Task> {
        let mut state = self.admit()?;
        let (order, rewrites) = self
            .reducer
            .append_key(state.tasks.values(), request.status())
            .map_err(|err| PersistenceError::validation(err.to_string()))?;
        let task = Task::from_new(TaskId::new(), request, order, self.clock.utc())
            .map_err(|err| PersistenceError::validation(err.to_string()))?;
        for rewrite in rewrites {
            if let Some(existing) = state.tasks.get_mut(&rewrite.task_id) {
                existing.set_order(rewrite.to);
            }
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(task)
    }

    async fn delete_task(&self, task_id: TaskId) -> PersistenceResult<()> {
        let mut state = self.admit()?;
        if state.tasks.remove(&task_id).is_none() {
            return Err(PersistenceError::NotFound(task_id));
        }
        Ok(())
    }

    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> PersistenceResult<Task> {
        let mut state = self.admit()?;
        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or(PersistenceError::NotFound(task_id))?;
        let mut patched = task.clone();
        patched
            .apply_patch(patch)
            .map_err(|err| PersistenceError::validation(err.to_string()))?;
        patched.touch(self.clock.utc());
        task.clone_from(&patched);
        Ok(patched)
    }
}
