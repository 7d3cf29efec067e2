//! Error types for the scrim service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

use crate::types::{MatchId, Team};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific scrim scenarios
#[derive(Debug, thiserror::Error)]
pub enum ScrimError {
    #[error("You are already in the queue")]
    AlreadyQueued,

    #[error("You are not in the queue")]
    NotQueued,

    #[error("You are already in active match #{match_id}")]
    AlreadyInActiveMatch { match_id: MatchId },

    #[error("You are banned from the queue")]
    Banned,

    #[error("Ready check {rc_id} is no longer pending")]
    CheckNotPending { rc_id: String },

    #[error("You are not part of ready check {rc_id}")]
    NotInThisCheck { rc_id: String },

    #[error("You already confirmed this ready check")]
    AlreadyConfirmed,

    #[error("Match #{match_id} not found")]
    MatchNotFound { match_id: MatchId },

    #[error("It is not your turn to ban (team {current} is picking)")]
    NotYourTurn { current: Team },

    #[error("Map '{map}' is no longer available")]
    MapUnavailable { map: String },

    #[error("Only a team captain may do that")]
    NotACaptain,

    #[error("The veto for match #{match_id} is already finished")]
    VetoFinished { match_id: MatchId },

    #[error("Match #{match_id} cannot be touched while the veto is in progress")]
    VetoInProgress { match_id: MatchId },

    #[error("Rating history for match #{match_id} was already reverted")]
    AlreadyReversed { match_id: MatchId },

    #[error("Match #{match_id} is in state '{status}', which does not allow this action")]
    InvalidState { match_id: MatchId, status: String },

    #[error("Permission denied for action '{action}'")]
    PermissionDenied { action: String },

    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: String },

    #[error("AMQP connection failed: {message}")]
    AmqpConnectionFailed { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl ScrimError {
    /// Whether the error is a user-input rejection that should be surfaced to
    /// the actor as an ephemeral notice rather than logged as a service failure.
    pub fn is_user_rejection(&self) -> bool {
        !matches!(
            self,
            ScrimError::AmqpConnectionFailed { .. }
                | ScrimError::ConfigurationError { .. }
                | ScrimError::InternalError { .. }
        )
    }
}
