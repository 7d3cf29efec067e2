//! Domain event publishing

use crate::error::Result;
use crate::types::ScrimEvent;
use async_trait::async_trait;

/// Trait for publishing lifecycle events to external consumers
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: ScrimEvent) -> Result<()>;
}

/// Publisher that drops every event, for tools that only need the core
#[derive(Debug, Default)]
pub struct NullEventPublisher;

#[async_trait]
impl EventPublisher for NullEventPublisher {
    async fn publish(&self, _event: ScrimEvent) -> Result<()> {
        Ok(())
    }
}
