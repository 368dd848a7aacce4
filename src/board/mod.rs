//! Kanban board state with optimistic, drag-driven mutations.
//!
//! Tasks live in four status lanes, ordered within each lane by fractional
//! order keys. A drag gesture produces intents; the reducer turns intents
//! into lane and key changes; the tracker applies those changes at once and
//! reconciles them with the server afterwards. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
