//! Common types used throughout the scrim service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for participants (platform user ids, or `s_<n>` for
/// synthetic fill participants)
pub type ParticipantId = String;

/// Monotonic match identifier, allocated from the atomic counter
pub type MatchId = i64;

/// Unique identifier for ready checks
pub type ReadyCheckId = String;

/// Opaque reference to a coordination space owned by the platform collaborator
pub type SpaceId = String;

/// One of the two match teams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

impl Team {
    /// The opposing team
    pub fn other(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::A => write!(f, "A"),
            Team::B => write!(f, "B"),
        }
    }
}

/// A registered participant with a persistent rating
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub rating: i64,
    pub games_played: i64,
    pub banned: bool,
    /// Synthetic participants are created by the admin fill tool; they are
    /// skipped for out-of-band notification but otherwise behave like players.
    pub synthetic: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A waiting-line entry; `joined_at` is the ordering key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub participant_id: ParticipantId,
    pub joined_at: DateTime<Utc>,
}

/// Lifecycle of a ready check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadyCheckStatus {
    Pending,
    Complete,
    Expired,
}

/// A time-boxed confirmation round for a provisional set of ten participants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyCheck {
    pub rc_id: ReadyCheckId,
    pub status: ReadyCheckStatus,
    /// Snapshot of the first ten queue entries at start time, in queue order
    pub participant_ids: Vec<ParticipantId>,
    pub confirmed_ids: Vec<ParticipantId>,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

impl ReadyCheck {
    /// True once every snapshot member has confirmed
    pub fn fully_confirmed(&self) -> bool {
        !self.participant_ids.is_empty()
            && self
                .participant_ids
                .iter()
                .all(|id| self.confirmed_ids.contains(id))
    }
}

/// Primary state-machine field of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Covers the recap, veto and captain-vote sub-phases
    Voting,
    /// Captains disagreed; waiting for an admin decision
    Review,
    Closed,
    Abandoned,
    Reversed,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MatchStatus::Closed | MatchStatus::Abandoned | MatchStatus::Reversed
        )
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MatchStatus::Voting => "voting",
            MatchStatus::Review => "review",
            MatchStatus::Closed => "closed",
            MatchStatus::Abandoned => "abandoned",
            MatchStatus::Reversed => "reversed",
        };
        write!(f, "{}", label)
    }
}

/// Captain result votes, embedded on the match document
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CaptainVotes {
    pub team_a: Option<Team>,
    pub team_b: Option<Team>,
}

impl CaptainVotes {
    pub fn both_cast(&self) -> bool {
        self.team_a.is_some() && self.team_b.is_some()
    }
}

/// References to the voice rooms created for a match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceRooms {
    pub team_a: String,
    pub team_b: String,
}

/// A persisted match document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: MatchId,
    pub status: MatchStatus,
    pub winner: Option<Team>,
    pub picked_map: Option<String>,
    pub space_id: Option<SpaceId>,
    pub voice_rooms: Option<VoiceRooms>,
    pub captain_votes: CaptainVotes,
    /// Winner before an admin reversal, kept for the audit trail
    pub previous_winner: Option<Team>,
    /// Admin who overrode the result via set-winner, if any
    pub winner_set_by: Option<ParticipantId>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub reversed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

/// Immutable team assignment of one participant in one match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchParticipant {
    pub match_id: MatchId,
    pub participant_id: ParticipantId,
    pub team: Team,
}

/// Turn-based map-ban protocol state, one per match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VetoState {
    pub match_id: MatchId,
    pub team_a: Vec<ParticipantId>,
    pub team_b: Vec<ParticipantId>,
    pub captain_a: ParticipantId,
    pub captain_b: ParticipantId,
    pub all_maps: Vec<String>,
    pub remaining: Vec<String>,
    /// `None` once the veto has terminated
    pub current_team: Option<Team>,
    pub turn_ends_at: Option<DateTime<Utc>>,
    pub picked: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VetoState {
    pub fn captain_of(&self, team: Team) -> &ParticipantId {
        match team {
            Team::A => &self.captain_a,
            Team::B => &self.captain_b,
        }
    }

    pub fn team_of(&self, participant_id: &str) -> Option<Team> {
        if self.team_a.iter().any(|id| id == participant_id) {
            Some(Team::A)
        } else if self.team_b.iter().any(|id| id == participant_id) {
            Some(Team::B)
        } else {
            None
        }
    }
}

/// Append-only rating ledger row; reversal flips `reverted` instead of deleting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingHistoryEntry {
    pub participant_id: ParticipantId,
    pub match_id: MatchId,
    pub old_rating: i64,
    pub new_rating: i64,
    pub delta: i64,
    pub reverted: bool,
    pub created_at: DateTime<Utc>,
}

/// One missed-ready-check (or manual adjustment) event for the cancellation board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationEvent {
    pub participant_id: ParticipantId,
    pub rc_id: Option<ReadyCheckId>,
    pub reason: String,
    pub weight: i64,
    pub created_at: DateTime<Utc>,
}

/// The identity attached to an inbound command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: ParticipantId,
    /// Role ids granted to the actor by the platform
    #[serde(default)]
    pub roles: Vec<String>,
    /// Platform-level administrator flag
    #[serde(default)]
    pub is_admin: bool,
}

impl Actor {
    pub fn participant(id: impl Into<ParticipantId>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
            is_admin: false,
        }
    }

    pub fn admin(id: impl Into<ParticipantId>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
            is_admin: true,
        }
    }
}

/// Captain selection policy for new matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptainMode {
    /// Uniform pick within the team
    Random,
    /// Top-rated member; ties broken by sorted order
    Highest,
}

impl Default for CaptainMode {
    fn default() -> Self {
        CaptainMode::Random
    }
}

/// Domain events emitted by the lifecycle for boards and external consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScrimEvent {
    QueueChanged {
        depth: usize,
    },
    ReadyCheckStarted {
        rc_id: ReadyCheckId,
        participant_ids: Vec<ParticipantId>,
        deadline: DateTime<Utc>,
    },
    ReadyCheckCompleted {
        rc_id: ReadyCheckId,
    },
    ReadyCheckExpired {
        rc_id: ReadyCheckId,
        evicted: Vec<ParticipantId>,
    },
    MatchStarted {
        match_id: MatchId,
        team_a: Vec<ParticipantId>,
        team_b: Vec<ParticipantId>,
    },
    MapPicked {
        match_id: MatchId,
        map: String,
    },
    ReviewRequested {
        match_id: MatchId,
    },
    MatchFinalized {
        match_id: MatchId,
        winner: Team,
        delta_a: i64,
        delta_b: i64,
    },
    MatchReversed {
        match_id: MatchId,
    },
    MatchCancelled {
        match_id: MatchId,
    },
}
