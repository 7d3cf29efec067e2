//! Collaborator interfaces
//!
//! The chat platform, its channels and its permission model live outside this
//! service; the core only ever talks to them through the traits in this
//! module. Display failures are the collaborator's problem to recover from
//! (recreate-and-remember); the core treats every call here as best-effort
//! once its own store write has landed.

pub mod auth;
pub mod events;
pub mod logging;
pub mod notifier;
pub mod presenter;
pub mod spaces;

pub use auth::{Authorizer, StoreRoleAuthorizer};
pub use events::{EventPublisher, NullEventPublisher};
pub use logging::LoggingGateway;
pub use notifier::Notifier;
pub use presenter::Presenter;
pub use spaces::{CoordinationSpaces, VoiceRoomProvider};
