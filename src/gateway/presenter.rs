//! Outbound presentation interface
//!
//! One method per shared display. The collaborator owns message-id
//! bookkeeping; when a prior message is gone it must recreate it and remember
//! the new reference. The core never fails a state transition on a display
//! error.

use crate::boards::views::{
    CancellationBoardView, LeaderboardView, MatchHistoryView, MatchRecapView, MatchResultView,
    QueueView, ReadyCheckView, ReviewView, VetoView, VotePromptView,
};
use crate::error::Result;
use crate::types::MatchId;
use async_trait::async_trait;

/// Trait for upserting the shared persistent displays
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn upsert_queue_panel(&self, view: QueueView) -> Result<()>;

    async fn upsert_ready_check(&self, view: ReadyCheckView) -> Result<()>;

    /// Remove the ready-check status display once the check is resolved
    async fn remove_ready_check(&self, rc_id: &str) -> Result<()>;

    /// Upsert the teams-and-captains recap in the match space (re-sent when a
    /// captain changes)
    async fn upsert_match_recap(&self, view: MatchRecapView) -> Result<()>;

    async fn upsert_veto_board(&self, view: VetoView) -> Result<()>;

    /// Post the captain-vote prompt once the map is picked
    async fn post_vote_prompt(&self, view: VotePromptView) -> Result<()>;

    /// Post the dispute to the admin-review surface
    async fn post_review_prompt(&self, view: ReviewView) -> Result<()>;

    /// Announce the final result into the match space
    async fn announce_result(&self, view: MatchResultView) -> Result<()>;

    /// Disable the interactive components of an abandoned match
    async fn disable_match_components(&self, match_id: MatchId) -> Result<()>;

    async fn upsert_leaderboard(&self, view: LeaderboardView) -> Result<()>;

    async fn upsert_match_history(&self, view: MatchHistoryView) -> Result<()>;

    async fn upsert_cancellation_board(&self, view: CancellationBoardView) -> Result<()>;

    /// Short-lived private notice to one participant (rejection feedback)
    async fn send_notice(&self, participant_id: &str, text: &str) -> Result<()>;
}
