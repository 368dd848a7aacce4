//! Adapters for the board ports.
//!
//! # Available Adapters
//!
//! - [`memory::InMemoryTaskPersistence`]: server stand-in keeping tasks in
//!   memory, with scripted failures for rollback tests
//! - [`memory::RecordingNotifier`]: keeps every notice for later inspection
//! - [`LogNotifier`]: reports notices through `tracing`

mod log;
pub mod memory;

pub use log::LogNotifier;
