//! Configuration management for the scrim-room service
//!
//! This module handles all configuration loading from environment variables,
//! validation, and default values for the service. Queue and veto tunables are
//! additionally persisted in the store so admin commands can change them live.

pub mod app;
pub mod queue;
pub mod rating;
pub mod veto;

// Re-export commonly used types
pub use app::{validate_config, AmqpSettings, AppConfig, ServiceSettings};
pub use queue::QueueSettings;
pub use rating::RatingConfig;
pub use veto::VetoSettings;
