//! Immutable views of the board published to subscribers.

use super::{Task, TaskId, TaskStatus, Tracked, compare_order};
use std::collections::HashMap;
use std::sync::Arc;

/// Point-in-time copy of every task on the board.
///
/// Cloning is cheap; snapshots share the underlying map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardSnapshot {
    revision: u64,
    entries: Arc<HashMap<TaskId, Tracked<Task>>>,
}

impl BoardSnapshot {
    /// Creates a snapshot at `revision`.
    #[must_use]
    pub const fn new(revision: u64, entries: Arc<HashMap<TaskId, Tracked<Task>>>) -> Self {
        Self { revision, entries }
    }

    /// Returns the store revision this snapshot was taken at.
    ///
    /// Increases by one with every committed mutation.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the entry for `id`, if present.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&Tracked<Task>> {
        self.entries.get(&id)
    }

    /// Returns the number of tasks on the board.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the board has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the values currently shown, in no particular order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.entries.values().map(Tracked::value)
    }

    /// Iterates over every entry, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &Tracked<Task>> {
        self.entries.values()
    }

    /// Returns the entries in `status`, sorted ascending by order key.
    #[must_use]
    pub fn lane(&self, status: TaskStatus) -> Vec<Tracked<Task>> {
        let mut lane: Vec<&Tracked<Task>> = self
            .entries
            .values()
            .filter(|entry| entry.value().status() == status)
            .collect();
        lane.sort_by(|a, b| compare_order(a.value(), b.value()));
        lane.into_iter().cloned().collect()
    }

    /// Counts tasks per lane.
    #[must_use]
    pub fn lane_counts(&self) -> LaneCounts {
        self.tasks().fold(LaneCounts::default(), |mut counts, task| {
            counts.record(task.status());
            counts
        })
    }
}

/// Number of tasks in each lane, as shown in the board summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneCounts {
    /// Tasks in `todo`.
    pub todo: usize,
    /// Tasks in `doing`.
    pub doing: usize,
    /// Tasks in `review`.
    pub review: usize,
    /// Tasks in `done`.
    pub done: usize,
}

impl LaneCounts {
    /// Returns the count for one lane.
    #[must_use]
    pub const fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Todo => self.todo,
            TaskStatus::Doing => self.doing,
            TaskStatus::Review => self.review,
            TaskStatus::Done => self.done,
        }
    }

    /// Returns the number of tasks across all lanes.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.todo + self.doing + self.review + self.done
    }

    const fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Todo => self.todo += 1,
            TaskStatus::Doing => self.doing += 1,
            TaskStatus::Review => self.review += 1,
            TaskStatus::Done => self.done += 1,
        }
    }
}
