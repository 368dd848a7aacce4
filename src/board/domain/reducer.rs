//! Pure board reducer computing lane and order changes for intents.

use super::{
    BoardDomainError, BoardIntent, OrderKey, OrderingConfig, Task, TaskId, TaskStatus,
    compare_order,
};
use std::cmp::Ordering;
use tracing::debug;

/// Order key rewritten for a task that was not itself moved.
///
/// Produced only when a lane is renormalized. Relative order within the
/// lane is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRewrite {
    /// Task whose key changed.
    pub task_id: TaskId,
    /// Key before renormalization.
    pub from: OrderKey,
    /// Key after renormalization.
    pub to: OrderKey,
}

/// Result of reducing one intent against a task collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    previous: Task,
    moved: Task,
    rewrites: Vec<KeyRewrite>,
}

impl Reduction {
    fn unchanged(task: &Task) -> Self {
        Self {
            previous: task.clone(),
            moved: task.clone(),
            rewrites: Vec::new(),
        }
    }

    /// Returns the moved task as it was before the intent.
    #[must_use]
    pub const fn previous(&self) -> &Task {
        &self.previous
    }

    /// Returns the moved task with its new lane and key.
    #[must_use]
    pub const fn moved(&self) -> &Task {
        &self.moved
    }

    /// Returns keys rewritten by lane renormalization.
    #[must_use]
    pub fn rewrites(&self) -> &[KeyRewrite] {
        &self.rewrites
    }

    /// Returns `true` when the intent leaves the board as it was.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.previous == self.moved && self.rewrites.is_empty()
    }

    /// Writes the reduction into a task collection.
    pub fn apply_to(&self, tasks: &mut [Task]) {
        for task in tasks.iter_mut() {
            if task.id() == self.moved.id() {
                task.clone_from(&self.moved);
            } else if let Some(rewrite) = self.rewrites.iter().find(|r| r.task_id == task.id()) {
                task.set_order(rewrite.to);
            }
        }
    }
}

/// Deterministic reducer shared by live drag previews and committed moves.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoardReducer {
    config: OrderingConfig,
}

impl BoardReducer {
    /// Creates a reducer with the given ordering configuration.
    #[must_use]
    pub const fn new(config: OrderingConfig) -> Self {
        Self { config }
    }

    /// Creates a reducer after checking that `config` can produce keys.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::InvalidOrderingConfig`] when the
    /// configuration is rejected by [`OrderingConfig::validate`].
    pub fn try_new(config: OrderingConfig) -> Result<Self, BoardDomainError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Returns the ordering configuration.
    #[must_use]
    pub const fn config(&self) -> &OrderingConfig {
        &self.config
    }

    /// Computes the effect of `intent` on `tasks`.
    ///
    /// Only the moved task changes lane or relative position. When the
    /// destination gap has no representable key left, the destination lane
    /// is renormalized first and the rewrites are reported alongside.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::TaskNotFound`] when the intent refers to a
    /// task that is not in `tasks`.
    pub fn reduce<'a, I>(&self, tasks: I, intent: &BoardIntent) -> Result<Reduction, BoardDomainError>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let all: Vec<&Task> = tasks.into_iter().collect();
        let source = all
            .iter()
            .copied()
            .find(|task| task.id() == intent.task_id())
            .ok_or(BoardDomainError::TaskNotFound(intent.task_id()))?;
        let status = intent.target_status();
        let others: Vec<&Task> = sorted_lane(
            all.iter().copied().filter(|task| task.id() != source.id()),
            status,
        );
        let index = intent
            .target_index()
            .map_or(others.len(), |requested| requested.min(others.len()));

        if source.status() == status {
            let current = others
                .iter()
                .filter(|other| compare_order(other, source) == Ordering::Less)
                .count();
            if intent.target_index().is_none() || current == index {
                return Ok(Reduction::unchanged(source));
            }
        }

        let (order, rewrites) = self.key_at(&others, index)?;
        let mut moved = source.clone();
        moved.place(status, order);
        Ok(Reduction {
            previous: source.clone(),
            moved,
            rewrites,
        })
    }

    /// Returns a copy of `tasks` with `intent` applied.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::TaskNotFound`] when the intent refers to a
    /// task that is not in `tasks`.
    pub fn apply(&self, tasks: &[Task], intent: &BoardIntent) -> Result<Vec<Task>, BoardDomainError> {
        let reduction = self.reduce(tasks, intent)?;
        let mut next = tasks.to_vec();
        reduction.apply_to(&mut next);
        Ok(next)
    }

    /// Returns the key a new task appended to `status` should receive.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::InvalidOrderingConfig`] when even a
    /// renormalized lane cannot produce a key.
    pub fn append_key<'a, I>(
        &self,
        tasks: I,
        status: TaskStatus,
    ) -> Result<(OrderKey, Vec<KeyRewrite>), BoardDomainError>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let lane = sorted_lane(tasks, status);
        self.key_at(&lane, lane.len())
    }

    /// Renormalizes every lane that contains duplicate keys.
    ///
    /// Lanes that are already strictly ordered are left untouched.
    #[must_use]
    pub fn repair<'a, I>(&self, tasks: I) -> Vec<KeyRewrite>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let all: Vec<&Task> = tasks.into_iter().collect();
        TaskStatus::ALL
            .into_iter()
            .flat_map(|status| {
                let lane = sorted_lane(all.iter().copied(), status);
                let has_ties = lane
                    .iter()
                    .zip(lane.iter().skip(1))
                    .any(|(left, right)| left.order() == right.order());
                if has_ties {
                    debug!(%status, lane_len = lane.len(), "repairing duplicate order keys");
                    self.renormalized(&lane).1
                } else {
                    Vec::new()
                }
            })
            .collect()
    }

    fn key_at(
        &self,
        lane: &[&Task],
        index: usize,
    ) -> Result<(OrderKey, Vec<KeyRewrite>), BoardDomainError> {
        let lower = index
            .checked_sub(1)
            .and_then(|at| lane.get(at))
            .map(|task| task.order());
        let upper = lane.get(index).map(|task| task.order());
        match OrderKey::between(lower, upper, &self.config) {
            Ok(key) => Ok((key, Vec::new())),
            Err(exhausted) => {
                debug!(%exhausted, lane_len = lane.len(), "renormalizing lane");
                let (keys, rewrites) = self.renormalized(lane);
                let new_lower = index.checked_sub(1).and_then(|at| keys.get(at)).copied();
                let new_upper = keys.get(index).copied();
                let key = OrderKey::between(new_lower, new_upper, &self.config)
                    .map_err(|err| BoardDomainError::InvalidOrderingConfig(err.to_string()))?;
                Ok((key, rewrites))
            }
        }
    }

    fn renormalized(&self, lane: &[&Task]) -> (Vec<OrderKey>, Vec<KeyRewrite>) {
        let keys = OrderKey::evenly_spaced(lane.len(), &self.config);
        let rewrites = lane
            .iter()
            .zip(&keys)
            .filter(|(task, key)| task.order() != **key)
            .map(|(task, key)| KeyRewrite {
                task_id: task.id(),
                from: task.order(),
                to: *key,
            })
            .collect();
        (keys, rewrites)
    }
}

/// Returns the tasks in `status`, sorted ascending by order key.
pub(crate) fn sorted_lane<'a, I>(tasks: I, status: TaskStatus) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut lane: Vec<&Task> = tasks
        .into_iter()
        .filter(|task| task.status() == status)
        .collect();
    lane.sort_by(|a, b| compare_order(a, b));
    lane
}
