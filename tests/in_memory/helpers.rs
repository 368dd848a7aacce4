//! Shared helpers for in-memory board integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use eyre::{Result, eyre};
use mockable::DefaultClock;
use rstest::fixture;
use taskboard::board::{
    adapters::memory::{InMemoryTaskPersistence, RecordingNotifier},
    domain::{
        Assignee, BoardReducer, NewTask, OrderKey, OrderingConfig, PersistedTaskData, Task,
        TaskId, TaskPatch, TaskPriority, TaskStatus,
    },
    ports::{PersistenceResult, TaskPersistence},
    services::{OptimisticMutationTracker, TaskStore},
};
use tokio::sync::{Semaphore, mpsc};

/// Tracker wired to the in-memory notifier and system clock.
pub type BoardTracker<P = InMemoryTaskPersistence> =
    OptimisticMutationTracker<P, RecordingNotifier, DefaultClock>;

/// Builds a confirmed task as the server would list it.
///
/// # Panics
///
/// Panics if `order` is not finite.
#[must_use]
pub fn task(status: TaskStatus, order: f64, title: &str) -> Task {
    let now = Utc::now();
    Task::from_persisted(PersistedTaskData {
        id: TaskId::new(),
        status,
        order: OrderKey::new(order).expect("finite order key"),
        title: title.to_owned(),
        description: None,
        feature: None,
        assignee: Assignee::user(),
        priority: TaskPriority::Medium,
        created_at: now,
        updated_at: now,
    })
}

/// Provides a server holding `[A, B, C]` in todo and `[D]` in doing.
#[fixture]
pub fn server() -> InMemoryTaskPersistence {
    InMemoryTaskPersistence::new().with_tasks([
        task(TaskStatus::Todo, 1.0, "A"),
        task(TaskStatus::Todo, 2.0, "B"),
        task(TaskStatus::Todo, 3.0, "C"),
        task(TaskStatus::Doing, 1.0, "D"),
    ])
}

/// Creates a tracker whose board is loaded from `listing`.
///
/// The tracker places tasks with unit spacing, like the in-memory server.
///
/// # Errors
///
/// Returns an error if the initial load fails.
pub fn tracker_for<P: TaskPersistence>(
    persistence: Arc<P>,
    notifier: &RecordingNotifier,
    listing: Vec<Task>,
) -> Result<BoardTracker<P>> {
    let tracker = OptimisticMutationTracker::new(
        TaskStore::new(),
        persistence,
        Arc::new(notifier.clone()),
        Arc::new(DefaultClock),
    )
    .with_reducer(BoardReducer::new(OrderingConfig::compact()));
    tracker.load(listing)?;
    Ok(tracker)
}

/// Titles shown in `status`, in display order.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn lane_titles<P: TaskPersistence>(
    tracker: &BoardTracker<P>,
    status: TaskStatus,
) -> Result<Vec<String>> {
    Ok(tracker
        .store()
        .snapshot()?
        .lane(status)
        .iter()
        .map(|entry| entry.value().title().to_owned())
        .collect())
}

/// Titles the server holds in `status`, in order.
///
/// # Errors
///
/// Returns an error if the server state cannot be read.
pub fn server_lane_titles(
    server: &InMemoryTaskPersistence,
    status: TaskStatus,
) -> Result<Vec<String>> {
    Ok(server
        .tasks()?
        .iter()
        .filter(|task| task.status() == status)
        .map(|task| task.title().to_owned())
        .collect())
}

/// Looks up a task on the board by title.
///
/// # Errors
///
/// Returns an error if no task has that title.
pub fn id_of<P: TaskPersistence>(tracker: &BoardTracker<P>, title: &str) -> Result<TaskId> {
    tracker
        .store()
        .tasks()?
        .iter()
        .find(|task| task.title() == title)
        .map(Task::id)
        .ok_or_else(|| eyre!("no task titled {title}"))
}

/// Server wrapper that holds each call until the test releases it.
///
/// Calls for a task wait on that task's gate; creations share one gate.
/// Every call reports the task it concerns on `entered` before waiting.
#[derive(Clone)]
pub struct GatedPersistence {
    inner: InMemoryTaskPersistence,
    gates: Arc<Mutex<HashMap<Option<TaskId>, Arc<Semaphore>>>>,
    entered: mpsc::UnboundedSender<Option<TaskId>>,
}

impl GatedPersistence {
    /// Wraps `inner`, returning the receiver of entered calls.
    #[must_use]
    pub fn new(inner: InMemoryTaskPersistence) -> (Self, mpsc::UnboundedReceiver<Option<TaskId>>) {
        let (entered, calls) = mpsc::unbounded_channel();
        let gated = Self {
            inner,
            gates: Arc::default(),
            entered,
        };
        (gated, calls)
    }

    /// Returns the wrapped server.
    #[must_use]
    pub const fn inner(&self) -> &InMemoryTaskPersistence {
        &self.inner
    }

    /// Lets one held call for `task_id` proceed; `None` releases a creation.
    pub fn release(&self, task_id: Option<TaskId>) {
        self.gate(task_id).add_permits(1);
    }

    fn gate(&self, task_id: Option<TaskId>) -> Arc<Semaphore> {
        let mut gates = self.gates.lock().expect("gate map lock");
        Arc::clone(
            gates
                .entry(task_id)
                .or_insert_with(|| Arc::new(Semaphore::new(0))),
        )
    }

    async fn hold(&self, task_id: Option<TaskId>) {
        let gate = self.gate(task_id);
        self.entered.send(task_id).expect("test receiver alive");
        gate.acquire().await.expect("gate never closes").forget();
    }
}

#[async_trait]
impl TaskPersistence for GatedPersistence {
    async fn move_task(&self, task_id: TaskId, status: TaskStatus) -> PersistenceResult<Task> {
        self.hold(Some(task_id)).await;
        self.inner.move_task(task_id, status).await
    }

    async fn reorder_task(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        target_index: usize,
    ) -> PersistenceResult<Task> {
        self.hold(Some(task_id)).await;
        self.inner.reorder_task(task_id, status, target_index).await
    }

    async fn create_task(&self, request: &NewTask) -> PersistenceResult<Task> {
        self.hold(None).await;
        self.inner.create_task(request).await
    }

    async fn delete_task(&self, task_id: TaskId) -> PersistenceResult<()> {
        self.hold(Some(task_id)).await;
        self.inner.delete_task(task_id).await
    }

    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> PersistenceResult<Task> {
        self.hold(Some(task_id)).await;
        self.inner.update_task(task_id, patch).await
    }
}
