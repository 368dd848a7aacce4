//! Unit tests for the board module.
//!
//! Tests are organised by concern: domain values, the reducer, the drag
//! state machine, the store and column view, and the mutation tracker.
