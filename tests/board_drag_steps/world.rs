//! Shared world state for board drag BDD scenarios.

use std::sync::Arc;

use chrono::Utc;
use eyre::{Result, eyre};
use mockable::DefaultClock;
use rstest::fixture;
use taskboard::board::{
    adapters::memory::{InMemoryTaskPersistence, RecordingNotifier},
    domain::{
        Assignee, BoardReducer, OrderKey, OrderingConfig, PersistedTaskData, Task, TaskId,
        TaskPriority, TaskStatus,
    },
    services::{OptimisticMutationTracker, TaskStore, TrackerError},
};

/// Tracker type used by the BDD world.
pub type BoardTracker = OptimisticMutationTracker<InMemoryTaskPersistence, RecordingNotifier, DefaultClock>;

/// Scenario world for board drag behaviour tests.
pub struct BoardWorld {
    pub server: InMemoryTaskPersistence,
    pub notifier: RecordingNotifier,
    pub tracker: Option<BoardTracker>,
    pub last_result: Option<Result<Option<Task>, TrackerError>>,
    pub seeded: u32,
}

impl BoardWorld {
    /// Creates a world with an empty server.
    #[must_use]
    pub fn new() -> Self {
        Self {
            server: InMemoryTaskPersistence::new(),
            notifier: RecordingNotifier::new(),
            tracker: None,
            last_result: None,
            seeded: 0,
        }
    }

    /// Adds a confirmed task to the end of `status` on the server.
    pub fn seed(&mut self, status: TaskStatus, title: &str) -> Result<()> {
        self.seeded += 1;
        let now = Utc::now();
        let task = Task::from_persisted(PersistedTaskData {
            id: TaskId::new(),
            status,
            order: OrderKey::new(f64::from(self.seeded))?,
            title: title.to_owned(),
            description: None,
            feature: None,
            assignee: Assignee::user(),
            priority: TaskPriority::Medium,
            created_at: now,
            updated_at: now,
        });
        self.server = std::mem::take(&mut self.server).with_tasks([task]);
        Ok(())
    }

    /// Returns the tracker, loading the board from the server on first use.
    pub fn tracker(&mut self) -> Result<BoardTracker> {
        if let Some(tracker) = &self.tracker {
            return Ok(tracker.clone());
        }
        let tracker = OptimisticMutationTracker::new(
            TaskStore::new(),
            Arc::new(self.server.clone()),
            Arc::new(self.notifier.clone()),
            Arc::new(DefaultClock),
        )
        .with_reducer(BoardReducer::new(OrderingConfig::compact()));
        tracker.load(self.server.tasks()?)?;
        self.tracker = Some(tracker.clone());
        Ok(tracker)
    }
}

impl Default for BoardWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> BoardWorld {
    BoardWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Finds a task by title.
pub fn id_by_title(tasks: &[Task], title: &str) -> Result<TaskId> {
    tasks
        .iter()
        .find(|task| task.title() == title)
        .map(Task::id)
        .ok_or_else(|| eyre!("no task titled {title} on the board"))
}

/// Splits a comma-separated title list from a step.
pub fn titles(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_owned)
        .collect()
}
