//! Confirmed and pending entity wrappers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of mutation awaiting server confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// The entity was created locally and not yet accepted.
    Create,
    /// The entity was changed locally (status, order or fields).
    Update,
    /// The entity was deleted locally and not yet accepted.
    Delete,
}

impl OperationKind {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker stamped on an entity while a mutation is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// What kind of mutation is pending.
    pub kind: OperationKind,
    /// When the mutation was submitted.
    pub submitted_at: DateTime<Utc>,
}

impl PendingOperation {
    /// Creates a pending marker.
    #[must_use]
    pub const fn new(kind: OperationKind, submitted_at: DateTime<Utc>) -> Self {
        Self { kind, submitted_at }
    }
}

/// An entity as the board currently shows it.
///
/// `Pending` keeps the last server-confirmed value next to the optimistic
/// one so a rejected mutation can be rolled back exactly. Entities created
/// locally have no confirmed value yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Tracked<T> {
    /// Matches what the server last acknowledged.
    Confirmed {
        /// Confirmed value.
        value: T,
    },
    /// Shows a local change the server has not acknowledged yet.
    Pending {
        /// Optimistic value shown on the board.
        value: T,
        /// The in-flight mutation.
        operation: PendingOperation,
        /// Last confirmed value, absent for local creations.
        confirmed: Option<T>,
    },
}

impl<T: Clone> Tracked<T> {
    /// Wraps a confirmed value.
    #[must_use]
    pub const fn confirmed(value: T) -> Self {
        Self::Confirmed { value }
    }

    /// Wraps a locally created value that has never been confirmed.
    #[must_use]
    pub const fn created(value: T, operation: PendingOperation) -> Self {
        Self::Pending {
            value,
            operation,
            confirmed: None,
        }
    }

    /// Returns the value currently shown.
    #[must_use]
    pub const fn value(&self) -> &T {
        match self {
            Self::Confirmed { value } | Self::Pending { value, .. } => value,
        }
    }

    /// Returns a mutable reference to the value currently shown.
    pub const fn value_mut(&mut self) -> &mut T {
        match self {
            Self::Confirmed { value } | Self::Pending { value, .. } => value,
        }
    }

    /// Returns the in-flight mutation, if any.
    #[must_use]
    pub const fn pending_operation(&self) -> Option<&PendingOperation> {
        match self {
            Self::Confirmed { .. } => None,
            Self::Pending { operation, .. } => Some(operation),
        }
    }

    /// Returns the last value acknowledged by the server.
    #[must_use]
    pub const fn last_confirmed(&self) -> Option<&T> {
        match self {
            Self::Confirmed { value } => Some(value),
            Self::Pending { confirmed, .. } => confirmed.as_ref(),
        }
    }

    /// Returns a mutable reference to the last value acknowledged by the
    /// server.
    pub(crate) const fn last_confirmed_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Confirmed { value } => Some(value),
            Self::Pending { confirmed, .. } => confirmed.as_mut(),
        }
    }

    /// Returns `true` while a mutation is awaiting confirmation.
    #[must_use]
    pub const fn is_optimistic(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Replaces the shown value with an optimistic one.
    ///
    /// The last confirmed value is carried over so rollback restores the
    /// server's view rather than an intermediate optimistic state.
    pub fn stage(&mut self, value: T, operation: PendingOperation) {
        let confirmed = self.last_confirmed().cloned();
        *self = Self::Pending {
            value,
            operation,
            confirmed,
        };
    }

    /// Discards the optimistic value and restores the last confirmed one.
    ///
    /// Returns `None` for local creations, which have nothing to restore.
    #[must_use]
    pub fn rolled_back(&self) -> Option<Self> {
        self.last_confirmed().cloned().map(Self::confirmed)
    }

    /// Consumes the wrapper, returning the value currently shown.
    #[must_use]
    pub fn into_value(self) -> T {
        match self {
            Self::Confirmed { value } | Self::Pending { value, .. } => value,
        }
    }
}

/// Returns `true` when the entity carries a pending mutation marker.
///
/// The view layer uses this to render the card attenuated.
#[must_use]
pub const fn is_optimistic<T: Clone>(entry: &Tracked<T>) -> bool {
    entry.is_optimistic()
}
