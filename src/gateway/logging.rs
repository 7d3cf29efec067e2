//! Logging gateway implementation
//!
//! Stands in for the platform collaborators when the service runs without a
//! gateway process (the `match-sim` binary, local experiments). Every call is
//! logged and succeeds.

use crate::boards::views::{
    CancellationBoardView, LeaderboardView, MatchHistoryView, MatchRecapView, MatchResultView,
    QueueView, ReadyCheckView, ReviewView, VetoView, VotePromptView,
};
use crate::error::Result;
use crate::gateway::{CoordinationSpaces, Notifier, Presenter, VoiceRoomProvider};
use crate::types::{MatchId, ParticipantId, ReadyCheckId, SpaceId, VoiceRooms};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

/// Gateway that renders everything to the log
#[derive(Debug, Default)]
pub struct LoggingGateway;

#[async_trait]
impl Presenter for LoggingGateway {
    async fn upsert_queue_panel(&self, view: QueueView) -> Result<()> {
        info!("[queue panel] {}/{} waiting", view.count, view.needed);
        Ok(())
    }

    async fn upsert_ready_check(&self, view: ReadyCheckView) -> Result<()> {
        info!(
            "[ready check {}] {}/{} confirmed, {}s left",
            view.rc_id, view.confirmed, view.total, view.seconds_left
        );
        Ok(())
    }

    async fn remove_ready_check(&self, rc_id: &str) -> Result<()> {
        info!("[ready check {}] display removed", rc_id);
        Ok(())
    }

    async fn upsert_match_recap(&self, view: MatchRecapView) -> Result<()> {
        info!(
            "[match {}] A: {:?} (cap {}) vs B: {:?} (cap {})",
            view.match_id, view.team_a, view.captain_a, view.team_b, view.captain_b
        );
        Ok(())
    }

    async fn upsert_veto_board(&self, view: VetoView) -> Result<()> {
        let available: Vec<&str> = view
            .maps
            .iter()
            .filter(|(_, up)| *up)
            .map(|(m, _)| m.as_str())
            .collect();
        info!(
            "[veto {}] turn {:?}, {}s left, available: {:?}",
            view.match_id, view.current_team, view.seconds_left, available
        );
        Ok(())
    }

    async fn post_vote_prompt(&self, view: VotePromptView) -> Result<()> {
        info!(
            "[match {}] map '{}' picked, captains vote now",
            view.match_id, view.picked_map
        );
        Ok(())
    }

    async fn post_review_prompt(&self, view: ReviewView) -> Result<()> {
        info!(
            "[match {}] captains disagree ({} vs {}), admin review",
            view.match_id, view.vote_a, view.vote_b
        );
        Ok(())
    }

    async fn announce_result(&self, view: MatchResultView) -> Result<()> {
        info!(
            "[match {}] team {} wins ({:+}/{:+})",
            view.match_id, view.winner, view.delta_a, view.delta_b
        );
        Ok(())
    }

    async fn disable_match_components(&self, match_id: MatchId) -> Result<()> {
        info!("[match {}] components disabled", match_id);
        Ok(())
    }

    async fn upsert_leaderboard(&self, view: LeaderboardView) -> Result<()> {
        info!("[leaderboard] {} rows", view.rows.len());
        Ok(())
    }

    async fn upsert_match_history(&self, view: MatchHistoryView) -> Result<()> {
        info!("[history {}] {}", view.match_id, view.status_label);
        Ok(())
    }

    async fn upsert_cancellation_board(&self, view: CancellationBoardView) -> Result<()> {
        info!("[cancellation board] {} rows", view.rows.len());
        Ok(())
    }

    async fn send_notice(&self, participant_id: &str, text: &str) -> Result<()> {
        info!("[notice to {}] {}", participant_id, text);
        Ok(())
    }
}

#[async_trait]
impl Notifier for LoggingGateway {
    async fn send_ready_prompt(
        &self,
        participant_id: &ParticipantId,
        rc_id: &ReadyCheckId,
        _deadline: DateTime<Utc>,
    ) -> Result<()> {
        info!("[ready prompt] {} for check {}", participant_id, rc_id);
        Ok(())
    }
}

#[async_trait]
impl CoordinationSpaces for LoggingGateway {
    async fn create_match_space(
        &self,
        match_id: MatchId,
        participant_ids: &[ParticipantId],
    ) -> Result<SpaceId> {
        info!(
            "[space] created for match {} ({} members)",
            match_id,
            participant_ids.len()
        );
        Ok(format!("match-space-{}", match_id))
    }

    async fn archive_space(&self, space_id: &SpaceId) -> Result<()> {
        info!("[space] {} archived", space_id);
        Ok(())
    }
}

#[async_trait]
impl VoiceRoomProvider for LoggingGateway {
    async fn create_team_rooms(
        &self,
        match_id: MatchId,
        _team_a: &[ParticipantId],
        _team_b: &[ParticipantId],
    ) -> Result<VoiceRooms> {
        info!("[voice] rooms created for match {}", match_id);
        Ok(VoiceRooms {
            team_a: format!("match-{}-voice-a", match_id),
            team_b: format!("match-{}-voice-b", match_id),
        })
    }

    async fn destroy_rooms(&self, match_id: MatchId, _rooms: &VoiceRooms) -> Result<()> {
        info!("[voice] rooms destroyed for match {}", match_id);
        Ok(())
    }
}
