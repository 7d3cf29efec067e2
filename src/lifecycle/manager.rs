//! Match lifecycle manager
//!
//! Owns match creation and the terminal transitions. The store write is the
//! source of truth on every path; platform side effects (spaces, voice rooms,
//! displays) are best-effort and never abort a transition that has already
//! been persisted.

use crate::boards::views::{MatchRecapView, MatchResultView};
use crate::boards::Boards;
use crate::config::queue::MATCH_SIZE;
use crate::config::RatingConfig;
use crate::error::{Result, ScrimError};
use crate::gateway::{CoordinationSpaces, EventPublisher, Presenter, VoiceRoomProvider};
use crate::lifecycle::veto::VetoCoordinator;
use crate::metrics::MetricsCollector;
use crate::rating::{balance_teams, compute_deltas, SeedPlayer};
use crate::store::{CloseOutcome, MatchStore};
use crate::types::{
    CaptainMode, CaptainVotes, MatchId, MatchParticipant, MatchRecord, MatchStatus, ParticipantId,
    RatingHistoryEntry, ScrimEvent, Team,
};
use crate::utils::{average_rating, current_timestamp};
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{info, warn};

/// The match lifecycle manager
pub struct MatchLifecycle {
    store: Arc<dyn MatchStore>,
    boards: Arc<Boards>,
    presenter: Arc<dyn Presenter>,
    spaces: Arc<dyn CoordinationSpaces>,
    voice: Arc<dyn VoiceRoomProvider>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<MetricsCollector>,
    veto: Arc<VetoCoordinator>,
    rating_config: RatingConfig,
}

impl MatchLifecycle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn MatchStore>,
        boards: Arc<Boards>,
        presenter: Arc<dyn Presenter>,
        spaces: Arc<dyn CoordinationSpaces>,
        voice: Arc<dyn VoiceRoomProvider>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<MetricsCollector>,
        veto: Arc<VetoCoordinator>,
        rating_config: RatingConfig,
    ) -> Self {
        Self {
            store,
            boards,
            presenter,
            spaces,
            voice,
            publisher,
            metrics,
            veto,
            rating_config,
        }
    }

    pub fn veto(&self) -> &Arc<VetoCoordinator> {
        &self.veto
    }

    pub(crate) fn store(&self) -> &Arc<dyn MatchStore> {
        &self.store
    }

    pub(crate) fn presenter(&self) -> &Arc<dyn Presenter> {
        &self.presenter
    }

    pub(crate) fn publisher(&self) -> &Arc<dyn EventPublisher> {
        &self.publisher
    }

    pub(crate) fn boards(&self) -> &Arc<Boards> {
        &self.boards
    }

    /// Start a match from the first ten queue entries, if present.
    /// Returns the new match id, or `None` when fewer than ten are waiting.
    pub async fn try_start_match(&self) -> Result<Option<MatchId>> {
        let entries = self.store.queue_entries().await?;
        if entries.len() < MATCH_SIZE {
            return Ok(None);
        }

        let mut seeds = Vec::with_capacity(MATCH_SIZE);
        for entry in entries.iter().take(MATCH_SIZE) {
            let participant = self
                .store
                .ensure_participant(
                    &entry.participant_id,
                    self.rating_config.baseline_rating,
                    false,
                )
                .await?;
            seeds.push(SeedPlayer {
                id: participant.id,
                rating: participant.rating,
            });
        }

        let balanced = balance_teams(&seeds);
        let team_a_ids = balanced.ids(Team::A);
        let team_b_ids = balanced.ids(Team::B);
        let all_ids: Vec<ParticipantId> = team_a_ids
            .iter()
            .chain(team_b_ids.iter())
            .cloned()
            .collect();

        let match_id = self.store.next_match_id().await?;
        info!(
            "Starting match {} (sum A {} vs sum B {}, diff {})",
            match_id, balanced.sum_a, balanced.sum_b, balanced.diff()
        );

        // Coordination space and voice rooms are best-effort; the match runs
        // without them if the platform refuses
        let space_id = match self.spaces.create_match_space(match_id, &all_ids).await {
            Ok(space_id) => Some(space_id),
            Err(e) => {
                warn!("Match space creation failed for match {}: {}", match_id, e);
                None
            }
        };
        let voice_rooms = match self
            .voice
            .create_team_rooms(match_id, &team_a_ids, &team_b_ids)
            .await
        {
            Ok(rooms) => Some(rooms),
            Err(e) => {
                warn!("Voice room creation failed for match {}: {}", match_id, e);
                None
            }
        };

        let now = current_timestamp();
        self.store
            .insert_match(MatchRecord {
                match_id,
                status: MatchStatus::Voting,
                winner: None,
                picked_map: None,
                space_id,
                voice_rooms,
                captain_votes: CaptainVotes::default(),
                previous_winner: None,
                winner_set_by: None,
                created_at: now,
                closed_at: None,
                reversed_at: None,
                canceled_at: None,
            })
            .await?;

        let rows: Vec<MatchParticipant> = team_a_ids
            .iter()
            .map(|id| MatchParticipant {
                match_id,
                participant_id: id.clone(),
                team: Team::A,
            })
            .chain(team_b_ids.iter().map(|id| MatchParticipant {
                match_id,
                participant_id: id.clone(),
                team: Team::B,
            }))
            .collect();
        self.store.insert_match_participants(rows).await?;
        self.store.remove_queue_entries(&all_ids).await?;

        let settings = self.store.veto_settings().await?;
        let captain_a = self
            .pick_captain(&balanced.team_a, settings.captain_mode)
            .clone();
        let captain_b = self
            .pick_captain(&balanced.team_b, settings.captain_mode)
            .clone();

        if let Err(e) = self
            .presenter
            .upsert_match_recap(MatchRecapView {
                match_id,
                team_a: team_a_ids.clone(),
                team_b: team_b_ids.clone(),
                captain_a: captain_a.clone(),
                captain_b: captain_b.clone(),
            })
            .await
        {
            warn!("Recap post for match {} failed: {}", match_id, e);
        }

        self.veto
            .clone()
            .start(match_id, team_a_ids.clone(), team_b_ids.clone(), captain_a, captain_b)
            .await?;

        self.metrics.record_match_event("started");
        self.publisher
            .publish(ScrimEvent::MatchStarted {
                match_id,
                team_a: team_a_ids,
                team_b: team_b_ids,
            })
            .await
            .ok();

        self.boards.refresh_match_history(match_id).await?;
        self.boards.refresh_queue_panel().await?;

        Ok(Some(match_id))
    }

    /// Captain per policy, computed independently per team
    fn pick_captain<'a>(&self, team: &'a [SeedPlayer], mode: CaptainMode) -> &'a ParticipantId {
        match mode {
            CaptainMode::Random => {
                let mut rng = rand::thread_rng();
                &team.choose(&mut rng).expect("team is non-empty").id
            }
            CaptainMode::Highest => {
                // Teams come out of the balancer sorted descending, so the
                // first strict maximum keeps the stable tie-break
                let mut best = &team[0];
                for player in &team[1..] {
                    if player.rating > best.rating {
                        best = player;
                    }
                }
                &best.id
            }
        }
    }

    /// Durably record the outcome and apply rating consequences exactly once.
    /// Returns false when the match was already closed (benign no-op).
    pub async fn finalize(&self, match_id: MatchId, winner: Team) -> Result<bool> {
        let record = self
            .store
            .match_record(match_id)
            .await?
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        if record.status == MatchStatus::Closed {
            return Ok(false);
        }

        let players = self.store.match_participants(match_id).await?;
        if players.is_empty() {
            return Err(ScrimError::InternalError {
                message: format!("Match {} has no participants", match_id),
            }
            .into());
        }

        // Averages from current ratings, participants created at baseline if
        // they vanished since match start
        let mut ratings_a = Vec::new();
        let mut ratings_b = Vec::new();
        for row in &players {
            let participant = self
                .store
                .ensure_participant(
                    &row.participant_id,
                    self.rating_config.baseline_rating,
                    false,
                )
                .await?;
            match row.team {
                Team::A => ratings_a.push(participant.rating),
                Team::B => ratings_b.push(participant.rating),
            }
        }
        let avg_a = average_rating(&ratings_a);
        let avg_b = average_rating(&ratings_b);
        let deltas = compute_deltas(avg_a, avg_b, Some(winner), self.rating_config.k_factor);

        // The conditional close is the idempotency gate: rating application
        // only runs on the handler that wins it
        match self.store.close_match(match_id, winner).await? {
            CloseOutcome::AlreadyClosed => return Ok(false),
            CloseOutcome::Closed(_) => {}
        }

        let now = current_timestamp();
        let mut history = Vec::with_capacity(players.len());
        for row in &players {
            let delta = deltas.for_team(row.team);
            let old_rating = self
                .store
                .participant(&row.participant_id)
                .await?
                .map(|p| p.rating)
                .unwrap_or(self.rating_config.baseline_rating);
            self.store
                .apply_rating_change(&row.participant_id, delta, 1)
                .await?;
            history.push(RatingHistoryEntry {
                participant_id: row.participant_id.clone(),
                match_id,
                old_rating,
                new_rating: old_rating + delta,
                delta,
                reverted: false,
                created_at: now,
            });
        }
        self.store.append_rating_history(history).await?;

        info!(
            "Match {} finalized: team {} wins (avg {} vs {}, deltas {:+}/{:+})",
            match_id, winner, avg_a, avg_b, deltas.delta_a, deltas.delta_b
        );
        self.metrics.record_match_event("finalized");

        self.veto.cancel_for_match(match_id);
        self.release_resources(&record).await;

        let side = |team: Team| -> Vec<ParticipantId> {
            players
                .iter()
                .filter(|p| p.team == team)
                .map(|p| p.participant_id.clone())
                .collect()
        };
        if let Err(e) = self
            .presenter
            .announce_result(MatchResultView {
                match_id,
                winner,
                team_a: side(Team::A),
                team_b: side(Team::B),
                delta_a: deltas.delta_a,
                delta_b: deltas.delta_b,
            })
            .await
        {
            warn!("Result announcement for match {} failed: {}", match_id, e);
        }

        self.publisher
            .publish(ScrimEvent::MatchFinalized {
                match_id,
                winner,
                delta_a: deltas.delta_a,
                delta_b: deltas.delta_b,
            })
            .await
            .ok();

        self.boards.refresh_leaderboard().await?;
        self.boards.refresh_match_history(match_id).await?;

        Ok(true)
    }

    /// Compensating transaction: undo a closed match's rating effects while
    /// keeping the ledger. A second reversal fails with `AlreadyReversed`.
    pub async fn reverse(&self, match_id: MatchId) -> Result<()> {
        let record = self
            .store
            .match_record(match_id)
            .await?
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        if record.status == MatchStatus::Reversed {
            return Err(ScrimError::AlreadyReversed { match_id }.into());
        }
        if record.status != MatchStatus::Closed {
            return Err(ScrimError::InvalidState {
                match_id,
                status: record.status.to_string(),
            }
            .into());
        }
        if self
            .store
            .active_history_for_match(match_id)
            .await?
            .is_empty()
        {
            return Err(ScrimError::AlreadyReversed { match_id }.into());
        }

        // The conditional transition guards against a concurrent reversal;
        // ratings are only touched by the handler that wins it
        self.store.mark_reversed(match_id).await?;

        let history = self.store.active_history_for_match(match_id).await?;
        for row in &history {
            self.store
                .apply_rating_change(&row.participant_id, -row.delta, -1)
                .await?;
        }
        self.store.mark_history_reverted(match_id).await?;

        info!(
            "Match {} reversed: {} rating entries restored",
            match_id,
            history.len()
        );
        self.metrics.record_match_event("reversed");
        self.publisher
            .publish(ScrimEvent::MatchReversed { match_id })
            .await
            .ok();

        self.boards.refresh_leaderboard().await?;
        self.boards.refresh_match_history(match_id).await?;
        Ok(())
    }

    /// Correct a closed match's winner: reverse, then finalize with the new
    /// winner, recording the acting admin.
    pub async fn set_winner(
        &self,
        match_id: MatchId,
        winner: Team,
        admin_id: &str,
    ) -> Result<()> {
        let record = self
            .store
            .match_record(match_id)
            .await?
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        if record.status != MatchStatus::Closed {
            return Err(ScrimError::InvalidState {
                match_id,
                status: record.status.to_string(),
            }
            .into());
        }

        self.reverse(match_id).await?;
        self.finalize(match_id, winner).await?;
        self.store.set_winner_set_by(match_id, admin_id).await?;
        info!(
            "Match {} winner set to team {} by {}",
            match_id, winner, admin_id
        );
        Ok(())
    }

    /// Abandon a match with no rating effect. Rejected when the match is
    /// closed/abandoned or while the veto still has more than one map.
    pub async fn cancel(&self, match_id: MatchId) -> Result<()> {
        let record = self
            .store
            .match_record(match_id)
            .await?
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        if matches!(record.status, MatchStatus::Closed | MatchStatus::Abandoned) {
            return Err(ScrimError::InvalidState {
                match_id,
                status: record.status.to_string(),
            }
            .into());
        }
        if self.veto.blocks_cancel(match_id).await? {
            return Err(ScrimError::VetoInProgress { match_id }.into());
        }

        let record = self.store.mark_abandoned(match_id).await?;
        self.veto.cancel_for_match(match_id);

        if let Err(e) = self.presenter.disable_match_components(match_id).await {
            warn!("Component disable for match {} failed: {}", match_id, e);
        }
        self.release_resources(&record).await;

        info!("Match {} abandoned", match_id);
        self.metrics.record_match_event("cancelled");
        self.publisher
            .publish(ScrimEvent::MatchCancelled { match_id })
            .await
            .ok();
        self.boards.refresh_match_history(match_id).await?;
        Ok(())
    }

    /// Admin shortcut: close a running match with a forced winner. Rejected
    /// when already closed or while the veto is in progress.
    pub async fn force_win(&self, match_id: MatchId, winner: Team) -> Result<()> {
        let record = self
            .store
            .match_record(match_id)
            .await?
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        if record.status == MatchStatus::Closed {
            return Err(ScrimError::InvalidState {
                match_id,
                status: record.status.to_string(),
            }
            .into());
        }
        if self.veto.blocks_cancel(match_id).await? {
            return Err(ScrimError::VetoInProgress { match_id }.into());
        }

        self.finalize(match_id, winner).await?;
        Ok(())
    }

    /// Archive the coordination space and tear down the voice rooms
    async fn release_resources(&self, record: &MatchRecord) {
        if let Some(space_id) = &record.space_id {
            if let Err(e) = self.spaces.archive_space(space_id).await {
                warn!(
                    "Space archive failed for match {}: {}",
                    record.match_id, e
                );
            }
        }
        if let Some(rooms) = &record.voice_rooms {
            if let Err(e) = self.voice.destroy_rooms(record.match_id, rooms).await {
                warn!(
                    "Voice room teardown failed for match {}: {}",
                    record.match_id, e
                );
            }
        }
    }
}
