//! Port contracts for the task board.
//!
//! Ports define infrastructure-agnostic interfaces used by board services.

pub mod notifier;
pub mod persistence;

pub use notifier::{BoardNotifier, ErrorNotice, NoticeKind};
pub use persistence::{PersistenceError, PersistenceResult, TaskPersistence};
