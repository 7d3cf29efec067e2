//! AMQP transport: inbound commands, outbound events and display payloads

pub mod connection;
pub mod handlers;
pub mod messages;
pub mod publisher;

pub use connection::{AmqpConfig, AmqpConnection};
pub use handlers::{CommandConsumer, CommandHandler};
pub use messages::{Command, DisplayMessage, MessageEnvelope};
pub use publisher::AmqpGatewayPublisher;
