//! In-memory adapters for tests and demos.

mod notifier;
mod persistence;

pub use notifier::RecordingNotifier;
pub use persistence::InMemoryTaskPersistence;
