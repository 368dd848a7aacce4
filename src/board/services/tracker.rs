//! Optimistic mutation tracker.
//!
//! Every board mutation is applied to the store immediately, stamped with a
//! [`PendingOperation`], and sent to the persistence port. The server's
//! answer is merged into whatever the board looks like when it arrives:
//! confirmations replace the optimistic value, rejections restore the last
//! confirmed value and raise an [`ErrorNotice`].
//!
//! Mutations on the same task are serialized through a FIFO gate, so a
//! second change waits until the first has been reconciled. Mutations on
//! different tasks proceed independently.

use super::{ColumnViewModel, StoreError, TaskStore};
use crate::board::{
    domain::{
        Assignee, BoardDomainError, BoardIntent, BoardReducer, BoardSnapshot, DragController,
        KeyRewrite, NewTask, OperationKind, OrderKey, PendingOperation, Reduction, Task,
        TaskId, TaskPatch, TaskPriority, TaskStatus, Tracked,
    },
    ports::{BoardNotifier, ErrorNotice, NoticeKind, PersistenceError, TaskPersistence},
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Service-level errors for board mutations.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    /// Local validation failed or the task is not on the board.
    #[error(transparent)]
    Domain(#[from] BoardDomainError),

    /// The server refused the change; it has been rolled back.
    #[error("server rejected {operation} of task {task_id}: {message}")]
    ValidationRejected {
        /// Task whose change was rolled back.
        task_id: TaskId,
        /// Mutation that failed.
        operation: OperationKind,
        /// Server explanation.
        message: String,
    },

    /// The server could not be reached; the change has been rolled back.
    #[error("transport failure during {operation} of task {task_id}")]
    TransportFailure {
        /// Task whose change was rolled back.
        task_id: TaskId,
        /// Mutation that failed.
        operation: OperationKind,
        /// Underlying persistence error.
        #[source]
        source: PersistenceError,
    },

    /// The task store could not be accessed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TrackerError {
    fn remote(task_id: TaskId, operation: OperationKind, err: PersistenceError) -> Self {
        if err.is_transport() {
            Self::TransportFailure {
                task_id,
                operation,
                source: err,
            }
        } else {
            Self::ValidationRejected {
                task_id,
                operation,
                message: err.to_string(),
            }
        }
    }

    /// Returns the notice category for errors that were shown to the user.
    #[must_use]
    pub const fn notice_kind(&self) -> Option<NoticeKind> {
        match self {
            Self::ValidationRejected { .. } => Some(NoticeKind::ValidationRejected),
            Self::TransportFailure { .. } => Some(NoticeKind::TransportFailure),
            Self::Domain(_) | Self::Store(_) => None,
        }
    }
}

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

type Gates = Arc<Mutex<HashMap<TaskId, Arc<AsyncMutex<()>>>>>;
type Aliases = Arc<RwLock<HashMap<TaskId, TaskId>>>;

/// Exclusive right to mutate one task until dropped.
///
/// Dropping the last gate for a task also forgets any temporary id alias
/// it had, since nothing can still be queued behind it.
struct TaskGate {
    task_id: TaskId,
    gates: Gates,
    aliases: Aliases,
    permit: Option<OwnedMutexGuard<()>>,
}

impl TaskGate {
    const fn task_id(&self) -> TaskId {
        self.task_id
    }
}

impl Drop for TaskGate {
    fn drop(&mut self) {
        drop(self.permit.take());
        if let Ok(mut gates) = self.gates.lock() {
            let idle = gates
                .get(&self.task_id)
                .is_some_and(|gate| Arc::strong_count(gate) == 1);
            if idle {
                gates.remove(&self.task_id);
                if let Ok(mut aliases) = self.aliases.write() {
                    aliases.remove(&self.task_id);
                }
            }
        }
    }
}

/// Applies board mutations optimistically and reconciles server answers.
pub struct OptimisticMutationTracker<P, N, C>
where
    P: TaskPersistence,
    N: BoardNotifier,
    C: Clock + Send + Sync,
{
    store: TaskStore,
    persistence: Arc<P>,
    notifier: Arc<N>,
    clock: Arc<C>,
    reducer: BoardReducer,
    gates: Gates,
    aliases: Aliases,
}

impl<P, N, C> Clone for OptimisticMutationTracker<P, N, C>
where
    P: TaskPersistence,
    N: BoardNotifier,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            persistence: Arc::clone(&self.persistence),
            notifier: Arc::clone(&self.notifier),
            clock: Arc::clone(&self.clock),
            reducer: self.reducer,
            gates: Arc::clone(&self.gates),
            aliases: Arc::clone(&self.aliases),
        }
    }
}

impl<P, N, C> OptimisticMutationTracker<P, N, C>
where
    P: TaskPersistence,
    N: BoardNotifier,
    C: Clock + Send + Sync,
{
    /// Creates a tracker writing to `store`.
    #[must_use]
    pub fn new(store: TaskStore, persistence: Arc<P>, notifier: Arc<N>, clock: Arc<C>) -> Self {
        Self {
            store,
            persistence,
            notifier,
            clock,
            reducer: BoardReducer::default(),
            gates: Arc::default(),
            aliases: Arc::default(),
        }
    }

    /// Replaces the reducer used for optimistic placement.
    #[must_use]
    pub const fn with_reducer(mut self, reducer: BoardReducer) -> Self {
        self.reducer = reducer;
        self
    }

    /// Returns the store the tracker writes to.
    #[must_use]
    pub const fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Returns the reducer used for optimistic placement.
    #[must_use]
    pub const fn reducer(&self) -> &BoardReducer {
        &self.reducer
    }

    /// Creates a column view model following this tracker's store.
    #[must_use]
    pub fn column_view(&self) -> ColumnViewModel {
        ColumnViewModel::new(&self.store)
    }

    /// Creates a drag controller previewing with this tracker's reducer.
    #[must_use]
    pub const fn drag_controller(&self) -> DragController {
        DragController::new(self.reducer)
    }

    /// Installs a server listing as the confirmed board.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Store`] if the store lock is poisoned.
    pub fn load(&self, tasks: impl IntoIterator<Item = Task>) -> TrackerResult<BoardSnapshot> {
        Ok(self.store.load(tasks, &self.reducer)?)
    }

    /// Applies a move or reorder intent.
    ///
    /// Returns the task as confirmed by the server, or unchanged when the
    /// intent leaves the board as it is.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Domain`] when the task is not on the board, or
    /// [`TrackerError::ValidationRejected`] / [`TrackerError::TransportFailure`]
    /// after the change has been rolled back.
    pub async fn apply_intent(&self, intent: BoardIntent) -> TrackerResult<Task> {
        let gate = self.lock_current(intent.task_id()).await?;
        let task_id = gate.task_id();
        let current_intent = intent.retarget(task_id);
        let operation = self.pending(OperationKind::Update);
        let reducer = self.reducer;
        let reduction = self
            .store
            .mutate_if(
                |entries| stage_intent(entries, &reducer, &current_intent, operation),
                |staged: &Result<Reduction, BoardDomainError>| {
                    staged.as_ref().is_ok_and(|reduction| !reduction.is_noop())
                },
            )?
            .inspect_err(|err| warn!(task_id = %task_id, %err, "ignoring intent"))?;
        if reduction.is_noop() {
            debug!(task_id = %task_id, "intent leaves board unchanged");
            return Ok(reduction.moved().clone());
        }

        let result = match current_intent {
            BoardIntent::Move { target_status, .. } => {
                self.persistence.move_task(task_id, target_status).await
            }
            BoardIntent::Reorder {
                target_status,
                target_index,
                ..
            } => {
                self.persistence
                    .reorder_task(task_id, target_status, target_index)
                    .await
            }
        };
        match result {
            Ok(confirmed) => self.confirm(task_id, confirmed),
            Err(err) => Err(self.roll_back(
                task_id,
                OperationKind::Update,
                reduction.rewrites(),
                err,
            )),
        }
    }

    /// Appends a task to the end of `status`.
    ///
    /// # Errors
    ///
    /// See [`OptimisticMutationTracker::apply_intent`].
    pub async fn move_task(&self, task_id: TaskId, status: TaskStatus) -> TrackerResult<Task> {
        self.apply_intent(BoardIntent::Move {
            task_id,
            target_status: status,
        })
        .await
    }

    /// Places a task at `target_index` within `status`.
    ///
    /// # Errors
    ///
    /// See [`OptimisticMutationTracker::apply_intent`].
    pub async fn reorder_task(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        target_index: usize,
    ) -> TrackerResult<Task> {
        self.apply_intent(BoardIntent::Reorder {
            task_id,
            target_status: status,
            target_index,
        })
        .await
    }

    /// Creates a task.
    ///
    /// The task appears at the end of its lane under a temporary id until
    /// the server answers; it is then re-keyed to the server id. Mutations
    /// addressed to the temporary id while the creation is in flight are
    /// redirected to the server id.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Domain`] for a blank title, or
    /// [`TrackerError::ValidationRejected`] / [`TrackerError::TransportFailure`]
    /// after the placeholder has been removed.
    pub async fn create_task(&self, request: NewTask) -> TrackerResult<Task> {
        let temp_id = TaskId::new();
        let _gate = self.lock_task(temp_id).await?;
        let operation = self.pending(OperationKind::Create);
        let reducer = self.reducer;
        let draft = self.store.mutate_if(
            |entries| -> Result<Task, BoardDomainError> {
                let (order, rewrites) =
                    reducer.append_key(entries.values().map(Tracked::value), request.status())?;
                let task = Task::from_new(temp_id, &request, order, operation.submitted_at)?;
                apply_rewrites(entries, &rewrites);
                entries.insert(temp_id, Tracked::created(task.clone(), operation));
                Ok(task)
            },
            Result::is_ok,
        )??;
        debug!(task_id = %temp_id, status = %draft.status(), "task creation submitted");

        match self.persistence.create_task(&request).await {
            Ok(created) => {
                self.alias(temp_id, created.id())?;
                self.confirm(temp_id, created)
            }
            Err(err) => Err(self.roll_back(
                temp_id,
                OperationKind::Create,
                &[],
                err,
            )),
        }
    }

    /// Deletes a task.
    ///
    /// The task stays visible, marked pending, until the server confirms;
    /// a rejected deletion restores it.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Domain`] when the task is not on the board, or
    /// [`TrackerError::ValidationRejected`] / [`TrackerError::TransportFailure`]
    /// after the task has been restored.
    pub async fn delete_task(&self, task_id: TaskId) -> TrackerResult<()> {
        let gate = self.lock_current(task_id).await?;
        let current = gate.task_id();
        let operation = self.pending(OperationKind::Delete);
        self.store
            .mutate_if(
                |entries| -> Result<(), BoardDomainError> {
                    let entry = entries
                        .get_mut(&current)
                        .ok_or(BoardDomainError::TaskNotFound(current))?;
                    let value = entry.value().clone();
                    entry.stage(value, operation);
                    Ok(())
                },
                Result::is_ok,
            )?
            .inspect_err(|err| warn!(task_id = %current, %err, "ignoring deletion"))?;

        match self.persistence.delete_task(current).await {
            Ok(()) => {
                self.store.mutate(|entries| {
                    entries.remove(&current);
                })?;
                info!(task_id = %current, "deletion confirmed");
                Ok(())
            }
            Err(err) => Err(self.roll_back(
                current,
                OperationKind::Delete,
                &[],
                err,
            )),
        }
    }

    /// Applies a descriptive field patch.
    ///
    /// An empty patch returns the task without contacting the server.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Domain`] when the task is missing or the patch
    /// is invalid, or [`TrackerError::ValidationRejected`] /
    /// [`TrackerError::TransportFailure`] after every patched field has been
    /// restored.
    pub async fn update_task(&self, task_id: TaskId, patch: TaskPatch) -> TrackerResult<Task> {
        let gate = self.lock_current(task_id).await?;
        let current = gate.task_id();
        if patch.is_empty() {
            return self
                .store
                .get(current)?
                .map(Tracked::into_value)
                .ok_or_else(|| BoardDomainError::TaskNotFound(current).into());
        }
        let operation = self.pending(OperationKind::Update);
        self.store
            .mutate_if(
                |entries| -> Result<(), BoardDomainError> {
                    let entry = entries
                        .get_mut(&current)
                        .ok_or(BoardDomainError::TaskNotFound(current))?;
                    let mut patched = entry.value().clone();
                    patched.apply_patch(&patch)?;
                    entry.stage(patched, operation);
                    Ok(())
                },
                Result::is_ok,
            )?
            .inspect_err(|err| warn!(task_id = %current, %err, "ignoring update"))?;

        match self.persistence.update_task(current, &patch).await {
            Ok(confirmed) => self.confirm(current, confirmed),
            Err(err) => Err(self.roll_back_fields(current, &patch, err)),
        }
    }

    /// Changes a task's priority.
    ///
    /// # Errors
    ///
    /// See [`OptimisticMutationTracker::update_task`].
    pub async fn change_priority(
        &self,
        task_id: TaskId,
        priority: TaskPriority,
    ) -> TrackerResult<Task> {
        self.update_task(task_id, TaskPatch::new().with_priority(priority))
            .await
    }

    /// Changes a task's assignee.
    ///
    /// # Errors
    ///
    /// See [`OptimisticMutationTracker::update_task`].
    pub async fn change_assignee(
        &self,
        task_id: TaskId,
        assignee: Assignee,
    ) -> TrackerResult<Task> {
        self.update_task(task_id, TaskPatch::new().with_assignee(assignee))
            .await
    }

    fn pending(&self, kind: OperationKind) -> PendingOperation {
        PendingOperation::new(kind, self.clock.utc())
    }

    fn confirm(&self, local_id: TaskId, confirmed: Task) -> TrackerResult<Task> {
        let reducer = self.reducer;
        let merged = confirmed.clone();
        self.store.mutate(|entries| {
            if local_id != merged.id() {
                entries.remove(&local_id);
            }
            entries.insert(merged.id(), Tracked::confirmed(merged));
            repair_keys(entries, &reducer);
        })?;
        info!(
            task_id = %confirmed.id(),
            status = %confirmed.status(),
            order = %confirmed.order(),
            "mutation confirmed"
        );
        Ok(confirmed)
    }

    fn roll_back(
        &self,
        task_id: TaskId,
        operation: OperationKind,
        rewrites: &[KeyRewrite],
        err: PersistenceError,
    ) -> TrackerError {
        let reducer = self.reducer;
        let restored = self.store.mutate(|entries| {
            if let Some(previous) = entries.remove(&task_id).and_then(|entry| entry.rolled_back()) {
                entries.insert(task_id, previous);
            }
            for rewrite in rewrites {
                if let Some(entry) = entries.get_mut(&rewrite.task_id) {
                    rekey(entry, rewrite.to, rewrite.from);
                }
            }
            repair_keys(entries, &reducer);
        });
        if let Err(store_err) = restored {
            warn!(task_id = %task_id, %store_err, "could not restore task after rejection");
        }
        self.reject(task_id, operation, err)
    }

    /// Restores only the fields `patch` touched, keeping any key rewrites
    /// made to the task while the update was in flight.
    fn roll_back_fields(
        &self,
        task_id: TaskId,
        patch: &TaskPatch,
        err: PersistenceError,
    ) -> TrackerError {
        let restored = self.store.mutate(|entries| {
            if let Some(entry) = entries.get_mut(&task_id) {
                let mut value = entry.value().clone();
                if let Some(confirmed) = entry.last_confirmed() {
                    value.restore_fields(patch, confirmed);
                }
                *entry = Tracked::confirmed(value);
            }
        });
        if let Err(store_err) = restored {
            warn!(task_id = %task_id, %store_err, "could not restore task after rejection");
        }
        self.reject(task_id, OperationKind::Update, err)
    }

    fn reject(
        &self,
        task_id: TaskId,
        operation: OperationKind,
        err: PersistenceError,
    ) -> TrackerError {
        let error = TrackerError::remote(task_id, operation, err);
        warn!(task_id = %task_id, %operation, %error, "rolled back optimistic change");
        if let Some(kind) = error.notice_kind() {
            self.notifier.notify(&ErrorNotice {
                task_id,
                operation,
                kind,
                message: error_detail(&error),
            });
        }
        error
    }

    fn resolve(&self, task_id: TaskId) -> TrackerResult<TaskId> {
        let aliases = self
            .aliases
            .read()
            .map_err(|err| StoreError::LockPoisoned(err.to_string()))?;
        Ok(aliases.get(&task_id).copied().unwrap_or(task_id))
    }

    fn alias(&self, temp_id: TaskId, server_id: TaskId) -> TrackerResult<()> {
        if temp_id != server_id {
            self.aliases
                .write()
                .map_err(|err| StoreError::LockPoisoned(err.to_string()))?
                .insert(temp_id, server_id);
        }
        Ok(())
    }

    async fn lock_task(&self, task_id: TaskId) -> TrackerResult<TaskGate> {
        let gate = {
            let mut gates = self
                .gates
                .lock()
                .map_err(|err| StoreError::LockPoisoned(err.to_string()))?;
            Arc::clone(gates.entry(task_id).or_default())
        };
        let permit = gate.lock_owned().await;
        Ok(TaskGate {
            task_id,
            gates: Arc::clone(&self.gates),
            aliases: Arc::clone(&self.aliases),
            permit: Some(permit),
        })
    }

    /// Locks the task `requested` currently refers to.
    ///
    /// A mutation queued behind a pending creation wakes up holding the
    /// temporary id; it then moves on to the server id.
    async fn lock_current(&self, requested: TaskId) -> TrackerResult<TaskGate> {
        let mut candidate = self.resolve(requested)?;
        loop {
            let gate = self.lock_task(candidate).await?;
            let current = self.resolve(candidate)?;
            if current == candidate {
                return Ok(gate);
            }
            candidate = current;
        }
    }
}

fn stage_intent(
    entries: &mut HashMap<TaskId, Tracked<Task>>,
    reducer: &BoardReducer,
    intent: &BoardIntent,
    operation: PendingOperation,
) -> Result<Reduction, BoardDomainError> {
    let reduction = reducer.reduce(entries.values().map(Tracked::value), intent)?;
    if reduction.is_noop() {
        return Ok(reduction);
    }
    apply_rewrites(entries, reduction.rewrites());
    if let Some(entry) = entries.get_mut(&intent.task_id()) {
        entry.stage(reduction.moved().clone(), operation);
    }
    Ok(reduction)
}

fn apply_rewrites(entries: &mut HashMap<TaskId, Tracked<Task>>, rewrites: &[KeyRewrite]) {
    for rewrite in rewrites {
        if let Some(entry) = entries.get_mut(&rewrite.task_id) {
            rekey(entry, rewrite.from, rewrite.to);
        }
    }
}

/// Moves an entry from key `from` to key `to`.
///
/// A pending entry's confirmed copy moves with it when it sits at the same
/// place, so a later rollback lands in the renormalized key space.
fn rekey(entry: &mut Tracked<Task>, from: OrderKey, to: OrderKey) {
    let status = entry.value().status();
    if let Some(confirmed) = entry.last_confirmed_mut()
        && confirmed.status() == status
        && confirmed.order() == from
    {
        confirmed.set_order(to);
    }
    if entry.value().order() == from {
        entry.value_mut().set_order(to);
    }
}

/// Renormalizes lanes where a merged server key collides with a local one.
fn repair_keys(entries: &mut HashMap<TaskId, Tracked<Task>>, reducer: &BoardReducer) {
    let rewrites = reducer.repair(entries.values().map(Tracked::value));
    apply_rewrites(entries, &rewrites);
}

fn error_detail(error: &TrackerError) -> String {
    match error {
        TrackerError::ValidationRejected { message, .. } => message.clone(),
        TrackerError::TransportFailure { source, .. } => source.to_string(),
        TrackerError::Domain(_) | TrackerError::Store(_) => error.to_string(),
    }
}
