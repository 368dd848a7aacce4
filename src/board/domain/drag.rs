//! Drag session state machine.
//!
//! The controller turns raw drag gestures into discrete [`BoardIntent`]s.
//! Hover events arrive on every pointer movement. Repeated events over the
//! same target are ignored, and an intent is emitted only when the computed
//! placement (lane and index) differs from the one last emitted.
//!
//! ```text
//! Idle --begin--> Dragging --drop_on(Some)--> Dropped
//!                    |
//!                    +--drop_on(None) / cancel / source removed--> Cancelled
//! ```

use super::{
    BoardDomainError, BoardIntent, BoardReducer, DragError, Task, TaskId, TaskStatus,
    reducer::sorted_lane,
};
use tracing::{debug, warn};

/// Thing the pointer is currently over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropTarget {
    /// Another card; the dragged card takes its position.
    Card(TaskId),
    /// The body of a column; the dragged card is appended to that lane.
    Column(TaskStatus),
}

/// Lane and index a drag currently points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    /// Destination lane.
    pub status: TaskStatus,
    /// Position within the destination lane.
    pub index: usize,
}

/// Where the dragged card started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DragOrigin {
    /// Dragged task.
    pub task_id: TaskId,
    /// Lane the task was in when the drag began.
    pub status: TaskStatus,
    /// Index within that lane when the drag began.
    pub index: usize,
}

impl DragOrigin {
    /// Returns the starting placement.
    #[must_use]
    pub const fn placement(&self) -> Placement {
        Placement {
            status: self.status,
            index: self.index,
        }
    }
}

/// State carried while a card is being dragged.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    origin: DragOrigin,
    board: Vec<Task>,
    shown: Vec<Task>,
    hovered: Option<DropTarget>,
    target: Placement,
    intent: Option<BoardIntent>,
}

impl DragSession {
    /// Returns where the drag started.
    #[must_use]
    pub const fn origin(&self) -> &DragOrigin {
        &self.origin
    }

    /// Returns the placement last emitted.
    #[must_use]
    pub const fn target(&self) -> Placement {
        self.target
    }

    /// Returns the intent last emitted, if any.
    #[must_use]
    pub const fn intent(&self) -> Option<BoardIntent> {
        self.intent
    }

    fn retarget(&mut self, target: DropTarget, reducer: &BoardReducer) -> Option<BoardIntent> {
        if self.hovered == Some(target) {
            return None;
        }
        self.hovered = Some(target);
        let (placement, intent) = self.resolve(target)?;
        if placement == self.target {
            return None;
        }
        let shown = reducer
            .apply(&self.board, &intent)
            .inspect_err(|err| {
                warn!(task_id = %self.origin.task_id, error = %err, "drag preview failed");
            })
            .ok()?;
        debug!(
            task_id = %self.origin.task_id,
            status = %placement.status,
            index = placement.index,
            "drag target changed"
        );
        self.shown = shown;
        self.target = placement;
        self.intent = Some(intent);
        Some(intent)
    }

    fn resolve(&self, target: DropTarget) -> Option<(Placement, BoardIntent)> {
        let task_id = self.origin.task_id;
        match target {
            DropTarget::Card(card_id) => {
                if card_id == task_id {
                    return None;
                }
                // Cards are measured where they are drawn, not where they began.
                let card = self.shown.iter().find(|task| task.id() == card_id)?;
                let index = sorted_lane(&self.shown, card.status())
                    .iter()
                    .position(|task| task.id() == card_id)?;
                let placement = Placement {
                    status: card.status(),
                    index,
                };
                let intent = BoardIntent::Reorder {
                    task_id,
                    target_status: card.status(),
                    target_index: index,
                };
                Some((placement, intent))
            }
            DropTarget::Column(status) => {
                if status == self.target.status {
                    return None;
                }
                let index = sorted_lane(
                    self.board.iter().filter(|task| task.id() != task_id),
                    status,
                )
                .len();
                let intent = BoardIntent::Move {
                    task_id,
                    target_status: status,
                };
                Some((Placement { status, index }, intent))
            }
        }
    }

    fn finish(
        &mut self,
        target: Option<DropTarget>,
        current: &[Task],
        reducer: &BoardReducer,
    ) -> Finish {
        let task_id = self.origin.task_id;
        let Some(drop_target) = target else {
            debug!(task_id = %task_id, "drag ended outside any drop target");
            return Finish::Cancelled;
        };
        if !current.iter().any(|task| task.id() == task_id) {
            warn!(task_id = %task_id, "dragged task disappeared before drop");
            return Finish::Cancelled;
        }
        self.retarget(drop_target, reducer);
        if self.target == self.origin.placement() {
            Finish::Dropped(None)
        } else {
            Finish::Dropped(self.intent)
        }
    }
}

enum Finish {
    Dropped(Option<BoardIntent>),
    Cancelled,
}

/// Phase of the drag controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragPhase {
    /// No drag in progress.
    #[default]
    Idle,
    /// A card is being dragged.
    Dragging(DragSession),
    /// The drag ended over a valid target. Holds the terminal intent, or
    /// `None` when the card was dropped where it started.
    Dropped(Option<BoardIntent>),
    /// The drag ended without effect.
    Cancelled,
}

/// Finite-state machine driving a single drag gesture at a time.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    reducer: BoardReducer,
    phase: DragPhase,
}

impl DragController {
    /// Creates an idle controller previewing with `reducer`.
    ///
    /// Use the same reducer the tracker commits with so the preview and the
    /// committed board agree.
    #[must_use]
    pub const fn new(reducer: BoardReducer) -> Self {
        Self {
            reducer,
            phase: DragPhase::Idle,
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> &DragPhase {
        &self.phase
    }

    /// Returns `true` while a card is being dragged.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging(_))
    }

    /// Starts dragging `task_id`.
    ///
    /// `tasks` is the board as rendered when the gesture began. Every intent
    /// is applied to it, and a hovered card's index is read from the board
    /// as currently previewed.
    ///
    /// # Errors
    ///
    /// Returns [`DragError::AlreadyDragging`] while another drag is active
    /// and [`DragError::Domain`] when `task_id` is not on the board.
    pub fn begin(&mut self, task_id: TaskId, tasks: &[Task]) -> Result<DragOrigin, DragError> {
        if let DragPhase::Dragging(session) = &self.phase {
            return Err(DragError::AlreadyDragging(session.origin.task_id));
        }
        let source = tasks
            .iter()
            .find(|task| task.id() == task_id)
            .ok_or(BoardDomainError::TaskNotFound(task_id))?;
        let index = sorted_lane(tasks, source.status())
            .iter()
            .position(|task| task.id() == task_id)
            .unwrap_or_default();
        let origin = DragOrigin {
            task_id,
            status: source.status(),
            index,
        };
        debug!(task_id = %task_id, status = %origin.status, index, "drag started");
        self.phase = DragPhase::Dragging(DragSession {
            origin,
            board: tasks.to_vec(),
            shown: tasks.to_vec(),
            hovered: None,
            target: origin.placement(),
            intent: None,
        });
        Ok(origin)
    }

    /// Processes a hover event.
    ///
    /// Returns an intent only when the hover changes the computed placement.
    ///
    /// # Errors
    ///
    /// Returns [`DragError::NotDragging`] outside a drag.
    pub fn hover(&mut self, target: DropTarget) -> Result<Option<BoardIntent>, DragError> {
        match &mut self.phase {
            DragPhase::Dragging(session) => Ok(session.retarget(target, &self.reducer)),
            _ => Err(DragError::NotDragging),
        }
    }

    /// Ends the drag.
    ///
    /// `target` is `None` when the pointer was released outside every drop
    /// target. `current` is the board at release time; if the dragged task
    /// is no longer on it the drag is cancelled.
    ///
    /// Returns the terminal intent, or `None` when nothing should change.
    ///
    /// # Errors
    ///
    /// Returns [`DragError::NotDragging`] outside a drag.
    pub fn drop_on(
        &mut self,
        target: Option<DropTarget>,
        current: &[Task],
    ) -> Result<Option<BoardIntent>, DragError> {
        let finish = match &mut self.phase {
            DragPhase::Dragging(session) => session.finish(target, current, &self.reducer),
            _ => return Err(DragError::NotDragging),
        };
        match finish {
            Finish::Dropped(intent) => {
                self.phase = DragPhase::Dropped(intent);
                Ok(intent)
            }
            Finish::Cancelled => {
                self.phase = DragPhase::Cancelled;
                Ok(None)
            }
        }
    }

    /// Cancels the active drag, discarding every intermediate placement.
    ///
    /// Returns `false` when no drag was in progress.
    pub fn cancel(&mut self) -> bool {
        if self.is_dragging() {
            self.phase = DragPhase::Cancelled;
            return true;
        }
        false
    }

    /// Cancels the drag if `task_id` is the card being dragged.
    ///
    /// Call when a task disappears from the board mid-drag, for example
    /// after a concurrent delete.
    pub fn source_removed(&mut self, task_id: TaskId) -> bool {
        let is_source = matches!(
            &self.phase,
            DragPhase::Dragging(session) if session.origin.task_id == task_id
        );
        if is_source {
            warn!(task_id = %task_id, "dragged task removed, cancelling drag");
            self.phase = DragPhase::Cancelled;
        }
        is_source
    }

    /// Returns the controller to `Idle`.
    pub fn reset(&mut self) {
        self.phase = DragPhase::Idle;
    }

    /// Returns `tasks` as they should be drawn during the drag.
    ///
    /// Applies the last emitted intent with the same reducer used for
    /// commit; outside a drag the tasks are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::TaskNotFound`] when the dragged task is not
    /// in `tasks`.
    pub fn preview(&self, tasks: &[Task]) -> Result<Vec<Task>, BoardDomainError> {
        match &self.phase {
            DragPhase::Dragging(DragSession {
                intent: Some(intent),
                ..
            }) => self.reducer.apply(tasks, intent),
            _ => Ok(tasks.to_vec()),
        }
    }
}
