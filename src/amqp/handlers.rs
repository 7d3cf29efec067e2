//! AMQP command consumer
//!
//! Decodes inbound payloads into the closed [`Command`] enum and forwards
//! them to the service's command handler.

use crate::amqp::messages::{decode_command, Command};
use crate::error::Result;
use amqprs::{
    channel::{BasicAckArguments, BasicCancelArguments, BasicConsumeArguments, Channel},
    consumer::AsyncConsumer,
    BasicProperties, Deliver,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Trait defining the interface for handling decoded commands
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle one command; rejections are surfaced to the actor inside, so an
    /// `Err` here means an actual service failure.
    async fn handle_command(&self, command: Command) -> Result<()>;
}

/// Consumer that wires the command queue to a [`CommandHandler`]
pub struct CommandConsumer {
    handler: Arc<dyn CommandHandler>,
    channel: Channel,
    consumer_tag: String,
}

impl CommandConsumer {
    pub fn new(handler: Arc<dyn CommandHandler>, channel: Channel) -> Self {
        let consumer_tag = format!("scrim-command-consumer-{}", uuid::Uuid::new_v4());

        Self {
            handler,
            channel,
            consumer_tag,
        }
    }

    /// Start consuming commands from the queue
    pub async fn start_consuming(&self, queue_name: &str) -> Result<()> {
        let args = BasicConsumeArguments::new(queue_name, &self.consumer_tag);

        self.channel
            .basic_consume(InnerConsumer::new(self.handler.clone()), args)
            .await
            .map_err(|e| crate::error::ScrimError::AmqpConnectionFailed {
                message: format!("Failed to start consuming: {}", e),
            })?;

        info!("Started consuming commands from queue: {}", queue_name);
        Ok(())
    }

    /// Stop consuming commands
    pub async fn stop_consuming(&self) -> Result<()> {
        let args = BasicCancelArguments::new(&self.consumer_tag);

        self.channel.basic_cancel(args).await.map_err(|e| {
            crate::error::ScrimError::AmqpConnectionFailed {
                message: format!("Failed to stop consuming: {}", e),
            }
        })?;

        info!("Stopped consuming commands");
        Ok(())
    }
}

/// Internal consumer implementation
struct InnerConsumer {
    handler: Arc<dyn CommandHandler>,
}

impl InnerConsumer {
    fn new(handler: Arc<dyn CommandHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl AsyncConsumer for InnerConsumer {
    async fn consume(
        &mut self,
        channel: &Channel,
        deliver: Deliver,
        _basic_properties: BasicProperties,
        content: Vec<u8>,
    ) {
        let delivery_tag = deliver.delivery_tag();

        let command = match decode_command(&content) {
            Ok(command) => command,
            Err(e) => {
                // Malformed payloads are dropped; there is no actor to notify
                warn!(
                    "Dropping undecodable command (delivery_tag {}): {}",
                    delivery_tag, e
                );
                let _ = channel
                    .basic_ack(BasicAckArguments::new(delivery_tag, false))
                    .await;
                return;
            }
        };

        let name = command.name();
        let actor = command.actor().id.clone();
        let start_time = std::time::Instant::now();

        match self.handler.handle_command(command).await {
            Ok(()) => {
                info!(
                    "Command '{}' from {} processed in {:.2}ms",
                    name,
                    actor,
                    start_time.elapsed().as_secs_f64() * 1000.0
                );
            }
            Err(e) => {
                error!("Command '{}' from {} failed: {}", name, actor, e);
            }
        }

        let _ = channel
            .basic_ack(BasicAckArguments::new(delivery_tag, false))
            .await;
    }
}
