//! Task entity and related descriptive types.

use super::{BoardDomainError, OrderKey, ParseTaskPriorityError, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Task priority shown on the card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Can wait.
    Low,
    /// Normal priority.
    #[default]
    Medium,
    /// Should be picked up soon.
    High,
    /// Blocks other work.
    Critical,
}

impl TaskPriority {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl TryFrom<&str> for TaskPriority {
    type Error = ParseTaskPriorityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(ParseTaskPriorityError(value.to_owned())),
        }
    }
}

/// Name of whoever the task is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignee(String);

impl Assignee {
    /// Creates a validated assignee name.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::EmptyAssignee`] when the name is blank.
    pub fn new(name: impl Into<String>) -> Result<Self, BoardDomainError> {
        let raw = name.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BoardDomainError::EmptyAssignee);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// The human user of the board.
    #[must_use]
    pub fn user() -> Self {
        Self("User".to_owned())
    }

    /// The coding agent working through the board.
    #[must_use]
    pub fn coding_agent() -> Self {
        Self("Coding Agent".to_owned())
    }

    /// The project assistant.
    #[must_use]
    pub fn archon() -> Self {
        Self("Archon".to_owned())
    }

    /// Returns the name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Assignee {
    fn default() -> Self {
        Self::user()
    }
}

impl fmt::Display for Assignee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A card on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    status: TaskStatus,
    order: OrderKey,
    title: String,
    description: Option<String>,
    feature: Option<String>,
    assignee: Assignee,
    priority: TaskPriority,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a task supplied by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedTaskData {
    /// Server-side identifier.
    pub id: TaskId,
    /// Lane the task is in.
    pub status: TaskStatus,
    /// Position within the lane.
    pub order: OrderKey,
    /// Card title.
    pub title: String,
    /// Optional long-form description.
    pub description: Option<String>,
    /// Optional feature tag.
    pub feature: Option<String>,
    /// Current assignee.
    pub assignee: Assignee,
    /// Current priority.
    pub priority: TaskPriority,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a task from a creation request.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::EmptyTitle`] when the request title is
    /// blank.
    pub fn from_new(
        id: TaskId,
        request: &NewTask,
        order: OrderKey,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, BoardDomainError> {
        Ok(Self {
            id,
            status: request.status,
            order,
            title: validated_title(&request.title)?,
            description: request.description.clone(),
            feature: request.feature.clone(),
            assignee: request.assignee.clone(),
            priority: request.priority,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task returned by the server.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            status: data.status,
            order: data.order,
            title: data.title,
            description: data.description,
            feature: data.feature,
            assignee: data.assignee,
            priority: data.priority,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the lane the task is in.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the task's position key within its lane.
    #[must_use]
    pub const fn order(&self) -> OrderKey {
        self.order
    }

    /// Returns the card title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the feature tag, if any.
    #[must_use]
    pub fn feature(&self) -> Option<&str> {
        self.feature.as_deref()
    }

    /// Returns the assignee.
    #[must_use]
    pub const fn assignee(&self) -> &Assignee {
        &self.assignee
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Puts the task at `order` in the `status` lane.
    pub(crate) const fn place(&mut self, status: TaskStatus, order: OrderKey) {
        self.status = status;
        self.order = order;
    }

    /// Rewrites the order key without changing lanes.
    pub(crate) const fn set_order(&mut self, order: OrderKey) {
        self.order = order;
    }

    /// Records a server-side modification.
    pub(crate) const fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    /// Applies descriptive field changes.
    ///
    /// The task is left untouched when validation fails.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::EmptyTitle`] when the patch sets a blank
    /// title.
    pub fn apply_patch(&mut self, patch: &TaskPatch) -> Result<(), BoardDomainError> {
        let title = patch.title.as_deref().map(validated_title).transpose()?;
        if let Some(new_title) = title {
            self.title = new_title;
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(feature) = &patch.feature {
            self.feature.clone_from(feature);
        }
        if let Some(assignee) = &patch.assignee {
            self.assignee = assignee.clone();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        Ok(())
    }

    /// Copies every field named by `patch` back from `source`.
    ///
    /// Fields the patch leaves alone keep their current values.
    pub(crate) fn restore_fields(&mut self, patch: &TaskPatch, source: &Self) {
        if patch.title.is_some() {
            self.title.clone_from(&source.title);
        }
        if patch.description.is_some() {
            self.description.clone_from(&source.description);
        }
        if patch.feature.is_some() {
            self.feature.clone_from(&source.feature);
        }
        if patch.assignee.is_some() {
            self.assignee = source.assignee.clone();
        }
        if patch.priority.is_some() {
            self.priority = source.priority;
        }
    }
}

fn validated_title(title: &str) -> Result<String, BoardDomainError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(BoardDomainError::EmptyTitle);
    }
    Ok(trimmed.to_owned())
}

/// Total order used to sort a lane.
///
/// Compares order keys first; ids break ties so the result stays
/// deterministic even for data that violates the distinct-key invariant.
#[must_use]
pub fn compare_order(a: &Task, b: &Task) -> Ordering {
    a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id))
}

/// Request payload for the new-task form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    status: TaskStatus,
    title: String,
    description: Option<String>,
    feature: Option<String>,
    assignee: Assignee,
    priority: TaskPriority,
}

impl NewTask {
    /// Creates a request for a task in the given lane.
    #[must_use]
    pub fn new(status: TaskStatus, title: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            description: None,
            feature: None,
            assignee: Assignee::default(),
            priority: TaskPriority::default(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the feature tag.
    #[must_use]
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    /// Sets the assignee.
    #[must_use]
    pub fn with_assignee(mut self, assignee: Assignee) -> Self {
        self.assignee = assignee;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Returns the requested lane.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the requested title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

/// Partial update of a task's descriptive fields.
///
/// `description` and `feature` use a nested option so a patch can clear the
/// field (`Some(None)`) as well as leave it alone (`None`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    title: Option<String>,
    description: Option<Option<String>>,
    feature: Option<Option<String>>,
    assignee: Option<Assignee>,
    priority: Option<TaskPriority>,
}

impl TaskPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replaces or clears the description.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// Replaces or clears the feature tag.
    #[must_use]
    pub fn with_feature(mut self, feature: Option<String>) -> Self {
        self.feature = Some(feature);
        self
    }

    /// Replaces the assignee.
    #[must_use]
    pub fn with_assignee(mut self, assignee: Assignee) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// Replaces the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Returns `true` when the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.feature.is_none()
            && self.assignee.is_none()
            && self.priority.is_none()
    }
}
