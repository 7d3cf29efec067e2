//! Metrics and monitoring for the scrim-room service

pub mod collector;
pub mod health;

pub use collector::MetricsCollector;
pub use health::{HealthServer, HealthServerConfig};
