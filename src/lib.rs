//! Taskboard: a Kanban task-board engine.
//!
//! This crate keeps the client-side state of a four-lane task board and
//! applies user edits optimistically, rolling them back when the server
//! disagrees.
//!
//! # Architecture
//!
//! Taskboard follows hexagonal architecture principles:
//!
//! - **Domain**: tasks, order keys, the board reducer and the drag state
//!   machine, with no infrastructure dependencies
//! - **Ports**: trait interfaces for the task server and user notices
//! - **Adapters**: in-memory and logging implementations of the ports
//! - **Services**: the shared task store, column view models and the
//!   optimistic mutation tracker
//!
//! # Modules
//!
//! - [`board`]: board state, drag sessions and optimistic mutations

pub mod board;
