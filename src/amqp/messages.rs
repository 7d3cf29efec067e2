//! AMQP message definitions and serialization
//!
//! Inbound interactions arrive as one closed [`Command`] enum, decoded once
//! at the boundary and dispatched by exhaustive match. No string prefix
//! parsing happens anywhere past this point.

use crate::boards::views::{
    CancellationBoardView, LeaderboardView, MatchHistoryView, MatchRecapView, MatchResultView,
    QueueView, ReadyCheckView, ReviewView, VetoView, VotePromptView,
};
use crate::error::{Result, ScrimError};
use crate::types::{Actor, CaptainMode, MatchId, ParticipantId, Team};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Routing key prefixes for outbound messages
pub const EVENT_ROUTING_PREFIX: &str = "scrim.event";
pub const DISPLAY_ROUTING_PREFIX: &str = "scrim.display";

/// Every inbound interaction the core accepts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Join {
        actor: Actor,
    },
    Leave {
        actor: Actor,
    },
    ConfirmReady {
        actor: Actor,
        rc_id: String,
    },
    BanMap {
        actor: Actor,
        match_id: MatchId,
        map: String,
    },
    CastVote {
        actor: Actor,
        match_id: MatchId,
        team: Team,
    },
    AdminForceWin {
        actor: Actor,
        match_id: MatchId,
        team: Team,
    },
    AdminReverse {
        actor: Actor,
        match_id: MatchId,
    },
    AdminCancel {
        actor: Actor,
        match_id: MatchId,
    },
    AdminSetWinner {
        actor: Actor,
        match_id: MatchId,
        team: Team,
    },
    AdminResolveReview {
        actor: Actor,
        match_id: MatchId,
        team: Team,
    },
    AdminSetCaptain {
        actor: Actor,
        match_id: MatchId,
        team: Team,
        participant_id: ParticipantId,
    },
    ConfigureVeto {
        actor: Actor,
        captain_mode: Option<CaptainMode>,
        maps: Option<Vec<String>>,
        turn_seconds: Option<u64>,
    },
    ConfigureQueue {
        actor: Actor,
        ready_enabled: Option<bool>,
        ready_seconds: Option<u64>,
    },
    Fill {
        actor: Actor,
        count: usize,
        #[serde(default)]
        auto_confirm_synthetics: bool,
    },
    ClearQueue {
        actor: Actor,
    },
}

impl Command {
    /// The actor issuing the command
    pub fn actor(&self) -> &Actor {
        match self {
            Command::Join { actor }
            | Command::Leave { actor }
            | Command::ConfirmReady { actor, .. }
            | Command::BanMap { actor, .. }
            | Command::CastVote { actor, .. }
            | Command::AdminForceWin { actor, .. }
            | Command::AdminReverse { actor, .. }
            | Command::AdminCancel { actor, .. }
            | Command::AdminSetWinner { actor, .. }
            | Command::AdminResolveReview { actor, .. }
            | Command::AdminSetCaptain { actor, .. }
            | Command::ConfigureVeto { actor, .. }
            | Command::ConfigureQueue { actor, .. }
            | Command::Fill { actor, .. }
            | Command::ClearQueue { actor } => actor,
        }
    }

    /// Short name for logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Command::Join { .. } => "join",
            Command::Leave { .. } => "leave",
            Command::ConfirmReady { .. } => "confirm_ready",
            Command::BanMap { .. } => "ban_map",
            Command::CastVote { .. } => "cast_vote",
            Command::AdminForceWin { .. } => "admin_force_win",
            Command::AdminReverse { .. } => "admin_reverse",
            Command::AdminCancel { .. } => "admin_cancel",
            Command::AdminSetWinner { .. } => "admin_set_winner",
            Command::AdminResolveReview { .. } => "admin_resolve_review",
            Command::AdminSetCaptain { .. } => "admin_set_captain",
            Command::ConfigureVeto { .. } => "configure_veto",
            Command::ConfigureQueue { .. } => "configure_queue",
            Command::Fill { .. } => "fill",
            Command::ClearQueue { .. } => "clear_queue",
        }
    }
}

/// Outbound display directives consumed by the platform gateway. The gateway
/// owns the mapping from these to real messages/channels and must recreate
/// anything it lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "display", rename_all = "snake_case")]
pub enum DisplayMessage {
    QueuePanel(QueueView),
    ReadyCheck(ReadyCheckView),
    ReadyCheckRemoved {
        rc_id: String,
    },
    MatchRecap(MatchRecapView),
    VetoBoard(VetoView),
    VotePrompt(VotePromptView),
    ReviewPrompt(ReviewView),
    MatchResult(MatchResultView),
    ComponentsDisabled {
        match_id: MatchId,
    },
    Leaderboard(LeaderboardView),
    MatchHistory(MatchHistoryView),
    CancellationBoard(CancellationBoardView),
    /// Short-lived private notice to one participant
    Notice {
        participant_id: ParticipantId,
        text: String,
    },
    /// Out-of-band ready prompt with an action button
    ReadyPrompt {
        participant_id: ParticipantId,
        rc_id: String,
        deadline: DateTime<Utc>,
    },
    CreateSpace {
        match_id: MatchId,
        space_id: String,
        participant_ids: Vec<ParticipantId>,
    },
    ArchiveSpace {
        space_id: String,
    },
    CreateVoiceRooms {
        match_id: MatchId,
        room_a: String,
        room_b: String,
        team_a: Vec<ParticipantId>,
        team_b: Vec<ParticipantId>,
    },
    DestroyVoiceRooms {
        match_id: MatchId,
        room_a: String,
        room_b: String,
    },
}

impl DisplayMessage {
    /// Routing key suffix under [`DISPLAY_ROUTING_PREFIX`]
    pub fn routing_suffix(&self) -> &'static str {
        match self {
            DisplayMessage::QueuePanel(_) => "queue_panel",
            DisplayMessage::ReadyCheck(_) => "ready_check",
            DisplayMessage::ReadyCheckRemoved { .. } => "ready_check_removed",
            DisplayMessage::MatchRecap(_) => "match_recap",
            DisplayMessage::VetoBoard(_) => "veto_board",
            DisplayMessage::VotePrompt(_) => "vote_prompt",
            DisplayMessage::ReviewPrompt(_) => "review_prompt",
            DisplayMessage::MatchResult(_) => "match_result",
            DisplayMessage::ComponentsDisabled { .. } => "components_disabled",
            DisplayMessage::Leaderboard(_) => "leaderboard",
            DisplayMessage::MatchHistory(_) => "match_history",
            DisplayMessage::CancellationBoard(_) => "cancellation_board",
            DisplayMessage::Notice { .. } => "notice",
            DisplayMessage::ReadyPrompt { .. } => "ready_prompt",
            DisplayMessage::CreateSpace { .. } => "create_space",
            DisplayMessage::ArchiveSpace { .. } => "archive_space",
            DisplayMessage::CreateVoiceRooms { .. } => "create_voice_rooms",
            DisplayMessage::DestroyVoiceRooms { .. } => "destroy_voice_rooms",
        }
    }
}

/// Message envelope with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<T> {
    pub payload: T,
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
    pub routing_key: String,
}

impl<T> MessageEnvelope<T>
where
    T: Serialize + serde::de::DeserializeOwned,
{
    /// Create a new message envelope
    pub fn new(payload: T, routing_key: String) -> Self {
        Self {
            payload,
            correlation_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            routing_key,
        }
    }

    /// Serialize the envelope to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            ScrimError::InternalError {
                message: format!("Failed to serialize message: {}", e),
            }
            .into()
        })
    }

    /// Deserialize envelope from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            ScrimError::InternalError {
                message: format!("Failed to deserialize message: {}", e),
            }
            .into()
        })
    }
}

/// Decode an inbound command, rejecting malformed or empty payloads
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let command: Command = serde_json::from_slice(bytes).map_err(|e| {
        ScrimError::InternalError {
            message: format!("Failed to decode command: {}", e),
        }
    })?;
    if command.actor().id.is_empty() {
        return Err(ScrimError::InternalError {
            message: "Command actor id cannot be empty".to_string(),
        }
        .into());
    }
    Ok(command)
}
