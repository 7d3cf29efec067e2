//! Admin override surface
//!
//! Every entry point authorizes the actor before any mutating side effect,
//! then reduces to calls into the match lifecycle, the ready-check
//! coordinator or the persisted settings.

use crate::boards::Boards;
use crate::config::{QueueSettings, RatingConfig, VetoSettings};
use crate::error::{Result, ScrimError};
use crate::gateway::Authorizer;
use crate::lifecycle::MatchLifecycle;
use crate::queue::{QueueManager, ReadyCheckCoordinator};
use crate::store::MatchStore;
use crate::types::{Actor, CaptainMode, MatchId, Team};
use crate::utils::current_timestamp;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use tracing::info;

/// Prefix of synthetic fill participants
const SYNTHETIC_PREFIX: &str = "s_";

/// The admin override surface
pub struct AdminSurface {
    store: Arc<dyn MatchStore>,
    authorizer: Arc<dyn Authorizer>,
    boards: Arc<Boards>,
    lifecycle: Arc<MatchLifecycle>,
    ready: Arc<ReadyCheckCoordinator>,
    queue: Arc<QueueManager>,
    rating_config: RatingConfig,
}

impl AdminSurface {
    pub fn new(
        store: Arc<dyn MatchStore>,
        authorizer: Arc<dyn Authorizer>,
        boards: Arc<Boards>,
        lifecycle: Arc<MatchLifecycle>,
        ready: Arc<ReadyCheckCoordinator>,
        queue: Arc<QueueManager>,
        rating_config: RatingConfig,
    ) -> Self {
        Self {
            store,
            authorizer,
            boards,
            lifecycle,
            ready,
            queue,
            rating_config,
        }
    }

    /// Force a winner on a running match
    pub async fn force_win(&self, actor: &Actor, match_id: MatchId, team: Team) -> Result<()> {
        self.authorizer.authorize(actor, "forcewin").await?;
        info!("{} forcing match {} winner to team {}", actor.id, match_id, team);
        self.lifecycle.force_win(match_id, team).await
    }

    /// Undo a finalized match's rating effects
    pub async fn reverse(&self, actor: &Actor, match_id: MatchId) -> Result<()> {
        self.authorizer.authorize(actor, "match_reverse").await?;
        info!("{} reversing match {}", actor.id, match_id);
        self.lifecycle.reverse(match_id).await
    }

    /// Abandon a match with no rating effect
    pub async fn cancel(&self, actor: &Actor, match_id: MatchId) -> Result<()> {
        self.authorizer.authorize(actor, "match_cancel").await?;
        info!("{} cancelling match {}", actor.id, match_id);
        self.lifecycle.cancel(match_id).await
    }

    /// Correct a closed match's winner (reverse + fresh finalize)
    pub async fn set_winner(&self, actor: &Actor, match_id: MatchId, team: Team) -> Result<()> {
        self.authorizer.authorize(actor, "match_set_winner").await?;
        info!("{} setting match {} winner to team {}", actor.id, match_id, team);
        self.lifecycle.set_winner(match_id, team, &actor.id).await
    }

    /// Decide an escalated captain-vote dispute
    pub async fn resolve_review(&self, actor: &Actor, match_id: MatchId, team: Team) -> Result<()> {
        self.authorizer.authorize(actor, "match_review").await?;
        info!("{} resolving match {} review for team {}", actor.id, match_id, team);
        self.lifecycle.resolve_review(match_id, team).await
    }

    /// Swap one team's captain mid-match
    pub async fn set_captain(
        &self,
        actor: &Actor,
        match_id: MatchId,
        team: Team,
        participant_id: &str,
    ) -> Result<()> {
        self.authorizer.authorize(actor, "veto_set_captain").await?;
        self.lifecycle
            .veto()
            .set_captain(match_id, team, participant_id)
            .await
    }

    /// Partial update of the veto settings; returns the effective settings
    pub async fn configure_veto(
        &self,
        actor: &Actor,
        captain_mode: Option<CaptainMode>,
        maps: Option<Vec<String>>,
        turn_seconds: Option<u64>,
    ) -> Result<VetoSettings> {
        self.authorizer.authorize(actor, "veto_config").await?;
        if captain_mode.is_none() && maps.is_none() && turn_seconds.is_none() {
            return Err(ScrimError::ConfigurationError {
                message: "No parameters provided, nothing changed".to_string(),
            }
            .into());
        }

        let mut settings = self.store.veto_settings().await?;
        settings.apply(captain_mode, maps, turn_seconds)?;
        self.store.set_veto_settings(settings.clone()).await?;
        info!(
            "Veto settings updated by {}: mode {:?}, {} maps, {}s turns",
            actor.id,
            settings.captain_mode,
            settings.maps.len(),
            settings.turn_seconds
        );
        Ok(settings)
    }

    /// Current veto settings, for display
    pub async fn show_veto_config(&self, actor: &Actor) -> Result<VetoSettings> {
        self.authorizer.authorize(actor, "veto_show_config").await?;
        self.store.veto_settings().await
    }

    /// Partial update of the queue settings. Disabling the ready check stops
    /// a pending one in place; the queue is re-evaluated under the new rules.
    pub async fn configure_queue(
        &self,
        actor: &Actor,
        ready_enabled: Option<bool>,
        ready_seconds: Option<u64>,
    ) -> Result<QueueSettings> {
        self.authorizer.authorize(actor, "queue_settings").await?;
        if ready_enabled.is_none() && ready_seconds.is_none() {
            return Err(ScrimError::ConfigurationError {
                message: "No parameters provided, nothing changed".to_string(),
            }
            .into());
        }

        let mut settings = self.store.queue_settings().await?;
        settings.apply(ready_enabled, ready_seconds)?;
        self.store.set_queue_settings(settings.clone()).await?;
        info!(
            "Queue settings updated by {}: ready {} ({}s)",
            actor.id,
            if settings.ready_enabled { "on" } else { "off" },
            settings.ready_seconds
        );

        if ready_enabled == Some(false) {
            self.ready.abort_pending_check().await?;
        }
        self.boards.refresh_queue_panel().await?;
        self.queue.trigger().await?;
        Ok(settings)
    }

    /// Top up the queue with synthetic participants, optionally
    /// auto-confirming them in the ready check they trigger. Returns the
    /// number of entries added.
    pub async fn fill(
        &self,
        actor: &Actor,
        count: usize,
        auto_confirm_synthetics: bool,
    ) -> Result<usize> {
        self.authorizer.authorize(actor, "fill").await?;

        // Continue the s_<n> sequence past any existing synthetic
        let mut max_index = 0u64;
        for participant in self.store.all_participants().await? {
            if !participant.synthetic {
                continue;
            }
            if let Some(n) = participant
                .id
                .strip_prefix(SYNTHETIC_PREFIX)
                .and_then(|s| s.parse::<u64>().ok())
            {
                max_index = max_index.max(n);
            }
        }

        let now = current_timestamp();
        let mut added = 0;
        for i in 1..=count {
            let id = format!("{}{}", SYNTHETIC_PREFIX, max_index + i as u64);
            self.store
                .ensure_participant(&id, self.rating_config.baseline_rating, true)
                .await?;
            // Staggered join times keep a deterministic queue order
            let joined_at = now + ChronoDuration::milliseconds(added as i64);
            if self.store.try_insert_queue_entry(&id, joined_at).await? {
                added += 1;
            }
        }

        info!("{} filled the queue with {} synthetic participants", actor.id, added);
        self.boards.refresh_queue_panel().await?;
        self.queue.trigger().await?;

        if auto_confirm_synthetics {
            self.ready.auto_confirm_synthetics().await?;
        }
        Ok(added)
    }

    /// Drop every queue entry and stop a pending ready check
    pub async fn clear_queue(&self, actor: &Actor) -> Result<usize> {
        self.authorizer.authorize(actor, "clearqueue").await?;
        let removed = self.store.clear_queue().await?;
        self.ready.abort_pending_check().await?;
        info!("{} cleared the queue ({} entries)", actor.id, removed);
        self.boards.refresh_queue_panel().await?;
        Ok(removed)
    }
}
