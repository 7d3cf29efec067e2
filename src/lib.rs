//! Scrim Room - match-lifecycle matchmaking service for community 5v5 scrims
//!
//! This crate manages a join/leave queue with a ready-check round, forms
//! rating-balanced teams, runs a turn-based map veto, collects the captains'
//! result vote (with admin-review escalation) and applies Elo-style rating
//! updates with a reversible audit trail.

pub mod admin;
pub mod amqp;
pub mod boards;
pub mod config;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod metrics;
pub mod queue;
pub mod rating;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{Result, ScrimError};
pub use types::*;

// Re-export key components
pub use lifecycle::{MatchLifecycle, VetoCoordinator};
pub use queue::{QueueManager, ReadyCheckCoordinator};
pub use store::{InMemoryMatchStore, MatchStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
