//! Boards: leaderboard, match history, queue panel and cancellation board
//!
//! [`Boards`] reads current entity state from the store, builds the pure view
//! payloads and hands them to the presentation collaborator. Display failures
//! are logged and swallowed; the persisted state transition that triggered a
//! refresh has already happened.

pub mod views;

use crate::error::Result;
use crate::gateway::Presenter;
use crate::store::MatchStore;
use crate::types::MatchId;
use crate::utils::current_timestamp;
use std::sync::Arc;
use tracing::warn;

pub use views::{
    leaderboard_view, match_history_view, queue_view, ready_check_view, status_label, veto_view,
    CancellationBoardView, LeaderboardRow, LeaderboardView, MatchHistoryView, MatchRecapView,
    MatchResultView, QueueView, ReadyCheckView, ReviewView, VetoView, VotePromptView,
};

/// Board refresh service
pub struct Boards {
    store: Arc<dyn MatchStore>,
    presenter: Arc<dyn Presenter>,
}

impl Boards {
    pub fn new(store: Arc<dyn MatchStore>, presenter: Arc<dyn Presenter>) -> Self {
        Self { store, presenter }
    }

    /// Rebuild and upsert the queue panel
    pub async fn refresh_queue_panel(&self) -> Result<()> {
        let entries = self.store.queue_entries().await?;
        let settings = self.store.queue_settings().await?;
        let view = queue_view(&entries, &settings);
        if let Err(e) = self.presenter.upsert_queue_panel(view).await {
            warn!("Queue panel refresh failed: {}", e);
        }
        Ok(())
    }

    /// Rebuild and upsert the ready-check status display
    pub async fn refresh_ready_check(&self, rc_id: &str) -> Result<()> {
        let check = match self.store.ready_check(rc_id).await? {
            Some(check) => check,
            None => return Ok(()),
        };
        let view = ready_check_view(&check, current_timestamp());
        if let Err(e) = self.presenter.upsert_ready_check(view).await {
            warn!("Ready-check display refresh failed: {}", e);
        }
        Ok(())
    }

    /// Rebuild and upsert the veto board for a match
    pub async fn refresh_veto_board(&self, match_id: MatchId) -> Result<()> {
        let state = match self.store.veto_state(match_id).await? {
            Some(state) => state,
            None => return Ok(()),
        };
        let view = veto_view(&state, current_timestamp());
        if let Err(e) = self.presenter.upsert_veto_board(view).await {
            warn!("Veto board refresh failed for match {}: {}", match_id, e);
        }
        Ok(())
    }

    /// Rebuild and upsert the leaderboard
    pub async fn refresh_leaderboard(&self) -> Result<()> {
        let participants = self.store.all_participants().await?;
        let stats = self.store.win_stats().await?;
        let view = leaderboard_view(&participants, &stats);
        if let Err(e) = self.presenter.upsert_leaderboard(view).await {
            warn!("Leaderboard refresh failed: {}", e);
        }
        Ok(())
    }

    /// Rebuild and upsert one match-history entry
    pub async fn refresh_match_history(&self, match_id: MatchId) -> Result<()> {
        let record = match self.store.match_record(match_id).await? {
            Some(record) => record,
            None => return Ok(()),
        };
        let players = self.store.match_participants(match_id).await?;
        let veto = self.store.veto_state(match_id).await?;
        let view = match_history_view(&record, &players, veto.as_ref());
        if let Err(e) = self.presenter.upsert_match_history(view).await {
            warn!("Match history refresh failed for match {}: {}", match_id, e);
        }
        Ok(())
    }

    /// Rebuild and upsert the missed-ready-check board
    pub async fn refresh_cancellation_board(&self) -> Result<()> {
        let rows = self.store.cancellation_totals().await?;
        let view = CancellationBoardView { rows };
        if let Err(e) = self.presenter.upsert_cancellation_board(view).await {
            warn!("Cancellation board refresh failed: {}", e);
        }
        Ok(())
    }
}
