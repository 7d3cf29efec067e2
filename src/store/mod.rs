//! Persistent store adapter
//!
//! [`MatchStore`] is the contract the rest of the service programs against:
//! typed operations over the document collections of §3 plus the atomic
//! match-id counter. Anything that would otherwise be a read-then-write on a
//! shared document (ban application, confirmation adds, status transitions)
//! is a single store operation so concurrent handlers cannot lose updates.

pub mod memory;

use crate::config::{QueueSettings, VetoSettings};
use crate::error::Result;
use crate::types::{
    CancellationEvent, MatchId, MatchParticipant, MatchRecord, Participant, ParticipantId,
    QueueEntry, RatingHistoryEntry, ReadyCheck, ReadyCheckStatus, Team, VetoState, VoiceRooms,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::InMemoryMatchStore;

/// Outcome of a close attempt; `AlreadyClosed` lets finalization treat a
/// duplicate request as a benign no-op.
#[derive(Debug, Clone)]
pub enum CloseOutcome {
    Closed(MatchRecord),
    AlreadyClosed,
}

/// Per-participant win/loss aggregate over closed matches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WinStats {
    pub games: i64,
    pub wins: i64,
}

/// Contract over the shared document store
#[async_trait]
pub trait MatchStore: Send + Sync {
    // --- participants ---

    async fn participant(&self, id: &str) -> Result<Option<Participant>>;

    /// Upsert with set-on-insert semantics: an existing participant keeps its
    /// rating and flags, a new one is created at the baseline.
    async fn ensure_participant(
        &self,
        id: &str,
        baseline_rating: i64,
        synthetic: bool,
    ) -> Result<Participant>;

    /// Atomic increment of rating and games-played
    async fn apply_rating_change(&self, id: &str, delta: i64, games_delta: i64) -> Result<()>;

    async fn set_banned(&self, id: &str, banned: bool) -> Result<bool>;

    async fn all_participants(&self) -> Result<Vec<Participant>>;

    // --- queue ---

    /// All waiting entries ordered by join time
    async fn queue_entries(&self) -> Result<Vec<QueueEntry>>;

    async fn queue_len(&self) -> Result<usize>;

    async fn is_queued(&self, id: &str) -> Result<bool>;

    /// Returns false when the participant was already queued
    async fn try_insert_queue_entry(&self, id: &str, joined_at: DateTime<Utc>) -> Result<bool>;

    /// Returns true when an entry was removed
    async fn remove_queue_entry(&self, id: &str) -> Result<bool>;

    async fn remove_queue_entries(&self, ids: &[ParticipantId]) -> Result<usize>;

    async fn clear_queue(&self) -> Result<usize>;

    /// Rewrite `joined_at` for the given ids to a dense ascending sequence
    /// strictly before every other entry, upserting any missing id. Other
    /// entries keep their relative order.
    async fn promote_to_front(&self, ids: &[ParticipantId]) -> Result<()>;

    // --- ready checks ---

    async fn pending_ready_check(&self) -> Result<Option<ReadyCheck>>;

    async fn ready_check(&self, rc_id: &str) -> Result<Option<ReadyCheck>>;

    /// Atomic singleton guard: inserts only when no check is pending, else
    /// returns false untouched.
    async fn insert_ready_check_if_none_pending(&self, check: ReadyCheck) -> Result<bool>;

    /// Set-semantics confirmation add, guarded on pending status. Errors:
    /// `CheckNotPending`, `NotInThisCheck`, `AlreadyConfirmed`.
    async fn confirm_ready(&self, rc_id: &str, participant_id: &str) -> Result<ReadyCheck>;

    /// Compare-and-set on the check status; true when the transition applied
    async fn set_ready_check_status(
        &self,
        rc_id: &str,
        from: ReadyCheckStatus,
        to: ReadyCheckStatus,
    ) -> Result<bool>;

    // --- matches ---

    /// Atomic increment-and-read of the match-id counter
    async fn next_match_id(&self) -> Result<MatchId>;

    async fn insert_match(&self, record: MatchRecord) -> Result<()>;

    async fn match_record(&self, match_id: MatchId) -> Result<Option<MatchRecord>>;

    async fn all_matches(&self) -> Result<Vec<MatchRecord>>;

    /// Id of a non-terminal match the participant belongs to, if any
    async fn active_match_for(&self, participant_id: &str) -> Result<Option<MatchId>>;

    async fn insert_match_participants(&self, rows: Vec<MatchParticipant>) -> Result<()>;

    async fn match_participants(&self, match_id: MatchId) -> Result<Vec<MatchParticipant>>;

    async fn set_match_space(
        &self,
        match_id: MatchId,
        space_id: Option<String>,
        voice_rooms: Option<VoiceRooms>,
    ) -> Result<()>;

    async fn set_picked_map(&self, match_id: MatchId, map: &str) -> Result<()>;

    /// Record one captain's result vote, guarded on `voting` status
    async fn record_captain_vote(
        &self,
        match_id: MatchId,
        captain_team: Team,
        choice: Team,
    ) -> Result<MatchRecord>;

    /// Conditional transition to `closed`. Applies only from voting, review
    /// or reversed; an already-closed match yields `AlreadyClosed`.
    async fn close_match(&self, match_id: MatchId, winner: Team) -> Result<CloseOutcome>;

    /// Conditional transition `closed → reversed`; clears the winner and
    /// remembers it as `previous_winner`.
    async fn mark_reversed(&self, match_id: MatchId) -> Result<MatchRecord>;

    /// Conditional transition to `abandoned` from any non-closed,
    /// non-abandoned status.
    async fn mark_abandoned(&self, match_id: MatchId) -> Result<MatchRecord>;

    /// Conditional transition `voting → review` (captain disagreement)
    async fn mark_review(&self, match_id: MatchId) -> Result<MatchRecord>;

    async fn set_winner_set_by(&self, match_id: MatchId, admin_id: &str) -> Result<()>;

    // --- veto ---

    async fn upsert_veto(&self, state: VetoState) -> Result<()>;

    async fn veto_state(&self, match_id: MatchId) -> Result<Option<VetoState>>;

    async fn set_turn_deadline(
        &self,
        match_id: MatchId,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Replace a team's captain; the new captain must belong to that team
    async fn set_veto_captain(
        &self,
        match_id: MatchId,
        team: Team,
        participant_id: &str,
    ) -> Result<VetoState>;

    /// Apply one ban atomically. `actor = None` is the system auto-ban, which
    /// skips the captain check. Errors: `VetoFinished`, `NotYourTurn`,
    /// `MapUnavailable`. Terminates the veto when one map remains.
    async fn apply_ban(
        &self,
        match_id: MatchId,
        actor: Option<&str>,
        map: &str,
    ) -> Result<VetoState>;

    // --- rating history ---

    async fn append_rating_history(&self, entries: Vec<RatingHistoryEntry>) -> Result<()>;

    /// Non-reverted ledger rows for a match
    async fn active_history_for_match(&self, match_id: MatchId)
        -> Result<Vec<RatingHistoryEntry>>;

    async fn mark_history_reverted(&self, match_id: MatchId) -> Result<usize>;

    // --- cancellation ledger ---

    async fn append_cancellation(&self, event: CancellationEvent) -> Result<()>;

    /// Summed weights per participant, descending, zero/negative totals dropped
    async fn cancellation_totals(&self) -> Result<Vec<(ParticipantId, i64)>>;

    // --- aggregates ---

    /// Games/wins per participant over closed matches
    async fn win_stats(&self) -> Result<std::collections::HashMap<ParticipantId, WinStats>>;

    // --- persisted settings ---

    async fn queue_settings(&self) -> Result<QueueSettings>;

    async fn set_queue_settings(&self, settings: QueueSettings) -> Result<()>;

    async fn veto_settings(&self) -> Result<VetoSettings>;

    async fn set_veto_settings(&self, settings: VetoSettings) -> Result<()>;

    /// Role allow-list for an admin action; empty means administrator-only
    async fn roles_for_action(&self, action: &str) -> Result<Vec<String>>;

    async fn set_roles_for_action(&self, action: &str, roles: Vec<String>) -> Result<()>;
}
