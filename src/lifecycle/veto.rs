//! Turn-based map-veto protocol
//!
//! Team A's captain bans first; turns alternate with a per-turn deadline that
//! auto-bans a uniformly random remaining map when it fires. One map left
//! terminates the veto with that map picked and opens the captain vote.
//!
//! Each active turn owns one deadline task and one 1s display-refresh task,
//! tracked per match id. A deadline task carries the deadline it was armed
//! with and bails when the persisted state no longer matches, which
//! neutralizes a stale fire racing a manual ban.

use crate::boards::views::{MatchRecapView, VotePromptView};
use crate::boards::Boards;
use crate::error::Result;
use crate::gateway::{EventPublisher, Presenter};
use crate::metrics::MetricsCollector;
use crate::store::MatchStore;
use crate::types::{MatchId, ParticipantId, ScrimEvent, Team, VetoState};
use crate::utils::current_timestamp;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, info, warn};

struct TurnTimers {
    deadline: JoinHandle<()>,
    refresh: JoinHandle<()>,
}

/// Coordinator for the map-ban protocol
pub struct VetoCoordinator {
    store: Arc<dyn MatchStore>,
    boards: Arc<Boards>,
    presenter: Arc<dyn Presenter>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<MetricsCollector>,
    timers: Mutex<HashMap<MatchId, TurnTimers>>,
}

impl VetoCoordinator {
    pub fn new(
        store: Arc<dyn MatchStore>,
        boards: Arc<Boards>,
        presenter: Arc<dyn Presenter>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store,
            boards,
            presenter,
            publisher,
            metrics,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Persist a fresh veto for a new match and arm the first turn
    pub async fn start(
        self: Arc<Self>,
        match_id: MatchId,
        team_a: Vec<ParticipantId>,
        team_b: Vec<ParticipantId>,
        captain_a: ParticipantId,
        captain_b: ParticipantId,
    ) -> Result<()> {
        let settings = self.store.veto_settings().await?;
        let now = current_timestamp();
        let state = VetoState {
            match_id,
            team_a,
            team_b,
            captain_a,
            captain_b,
            all_maps: settings.maps.clone(),
            remaining: settings.maps.clone(),
            current_team: Some(Team::A),
            turn_ends_at: None,
            picked: None,
            created_at: now,
            updated_at: now,
        };
        self.store.upsert_veto(state).await?;
        info!(
            "Veto started for match {} over {} maps ({}s per turn)",
            match_id,
            settings.maps.len(),
            settings.turn_seconds
        );
        self.schedule_turn(match_id, settings.turn_seconds).await?;
        Ok(())
    }

    /// A captain bans one map. Rejections: `VetoFinished`, `NotYourTurn`,
    /// `MapUnavailable`.
    pub async fn ban(self: Arc<Self>, match_id: MatchId, actor_id: &str, map: &str) -> Result<()> {
        let state = self.store.apply_ban(match_id, Some(actor_id), map).await?;

        // The old turn's timers are stale either way
        if let Some(timers) = self.remove_timers(match_id) {
            timers.deadline.abort();
            timers.refresh.abort();
        }

        debug!(
            "Match {}: {} banned '{}' ({} remaining)",
            match_id,
            actor_id,
            map,
            state.remaining.len()
        );
        self.metrics.record_ban(false);
        self.after_ban(state).await
    }

    /// Shared continuation after any accepted ban
    async fn after_ban(self: Arc<Self>, state: VetoState) -> Result<()> {
        if let Some(picked) = state.picked.clone() {
            self.finish(state, picked).await
        } else {
            let settings = self.store.veto_settings().await?;
            self.schedule_turn(state.match_id, settings.turn_seconds)
                .await
        }
    }

    /// Terminal handling: record the pick and open the captain vote
    async fn finish(&self, state: VetoState, picked: String) -> Result<()> {
        let match_id = state.match_id;
        self.store.set_picked_map(match_id, &picked).await?;

        info!("Veto finished for match {}: '{}' picked", match_id, picked);
        let elapsed = (current_timestamp() - state.created_at).num_seconds().max(0);
        self.metrics.veto_duration_seconds.observe(elapsed as f64);
        self.publisher
            .publish(ScrimEvent::MapPicked {
                match_id,
                map: picked.clone(),
            })
            .await
            .ok();

        self.boards.refresh_veto_board(match_id).await?;
        if let Err(e) = self
            .presenter
            .post_vote_prompt(VotePromptView {
                match_id,
                picked_map: picked,
                captain_a: state.captain_a.clone(),
                captain_b: state.captain_b.clone(),
            })
            .await
        {
            warn!("Vote prompt for match {} failed: {}", match_id, e);
        }
        self.boards.refresh_match_history(match_id).await?;
        Ok(())
    }

    /// Arm the next turn: persist the deadline, spawn the auto-ban task and
    /// the 1s countdown refresh.
    // Returns a concrete boxed `Send` future rather than an `async fn` opaque
    // type: the `schedule_turn -> (spawn) handle_turn_timeout -> after_ban ->
    // schedule_turn` async recursion otherwise forms an opaque-type cycle the
    // auto-`Send` solver cannot resolve across the `tokio::spawn` boundary.
    fn schedule_turn(
        self: Arc<Self>,
        match_id: MatchId,
        turn_seconds: u64,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send>> {
        Box::pin(async move {
        let deadline = current_timestamp() + ChronoDuration::seconds(turn_seconds as i64);
        self.store
            .set_turn_deadline(match_id, Some(deadline))
            .await?;

        let deadline_task = {
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                sleep(Duration::from_secs(turn_seconds)).await;
                if let Err(e) = this.handle_turn_timeout(match_id, deadline).await {
                    warn!("Auto-ban for match {} failed: {}", match_id, e);
                }
            })
        };

        let refresh_task = {
            let store = Arc::clone(&self.store);
            let boards = Arc::clone(&self.boards);
            tokio::spawn(async move {
                let mut tick = interval(Duration::from_secs(1));
                tick.tick().await;
                loop {
                    tick.tick().await;
                    match store.veto_state(match_id).await {
                        Ok(Some(state)) if state.current_team.is_some() => {
                            boards.refresh_veto_board(match_id).await.ok();
                        }
                        _ => break,
                    }
                }
            })
        };

        {
            let mut timers = self.timers.lock().expect("veto timer lock");
            if let Some(old) = timers.insert(
                match_id,
                TurnTimers {
                    deadline: deadline_task,
                    refresh: refresh_task,
                },
            ) {
                old.deadline.abort();
                old.refresh.abort();
            }
        }

        self.boards.refresh_veto_board(match_id).await?;
        Ok(())
        })
    }

    /// Deadline expiry: exactly one uniformly random ban, never a pass.
    /// `armed_deadline` must still match the persisted state, otherwise the
    /// fire is stale (a manual ban landed first) and is dropped.
    async fn handle_turn_timeout(
        self: Arc<Self>,
        match_id: MatchId,
        armed_deadline: DateTime<Utc>,
    ) -> Result<()> {
        // Running inside the deadline task; only the refresh task gets aborted
        if let Some(timers) = self.remove_timers(match_id) {
            timers.refresh.abort();
        }

        let state = match self.store.veto_state(match_id).await? {
            Some(state) => state,
            None => return Ok(()),
        };
        if state.current_team.is_none() || state.remaining.len() <= 1 {
            return Ok(());
        }
        if state.turn_ends_at != Some(armed_deadline) {
            debug!("Stale veto deadline for match {}, ignoring", match_id);
            return Ok(());
        }

        let map = {
            let mut rng = rand::thread_rng();
            state
                .remaining
                .choose(&mut rng)
                .cloned()
                .expect("remaining is non-empty")
        };
        info!("Match {}: turn expired, auto-banning '{}'", match_id, map);

        let state = self.store.apply_ban(match_id, None, &map).await?;
        self.metrics.record_ban(true);
        self.after_ban(state).await
    }

    /// Replace a team's captain (admin override); the recap display follows
    pub async fn set_captain(
        &self,
        match_id: MatchId,
        team: Team,
        participant_id: &str,
    ) -> Result<()> {
        let state = self
            .store
            .set_veto_captain(match_id, team, participant_id)
            .await?;
        info!(
            "Match {}: team {} captain changed to {}",
            match_id, team, participant_id
        );
        if let Err(e) = self
            .presenter
            .upsert_match_recap(MatchRecapView {
                match_id,
                team_a: state.team_a.clone(),
                team_b: state.team_b.clone(),
                captain_a: state.captain_a.clone(),
                captain_b: state.captain_b.clone(),
            })
            .await
        {
            warn!("Recap update for match {} failed: {}", match_id, e);
        }
        self.boards.refresh_veto_board(match_id).await?;
        Ok(())
    }

    /// Whether an in-progress veto blocks cancellation (more than one map
    /// left with an active turn)
    pub async fn blocks_cancel(&self, match_id: MatchId) -> Result<bool> {
        Ok(match self.store.veto_state(match_id).await? {
            Some(state) => state.current_team.is_some() && state.remaining.len() > 1,
            None => false,
        })
    }

    /// Abort the timers of one match (finalize/cancel paths)
    pub fn cancel_for_match(&self, match_id: MatchId) {
        if let Some(timers) = self.remove_timers(match_id) {
            timers.deadline.abort();
            timers.refresh.abort();
        }
    }

    fn remove_timers(&self, match_id: MatchId) -> Option<TurnTimers> {
        self.timers
            .lock()
            .expect("veto timer lock")
            .remove(&match_id)
    }

    /// Abort every tracked timer (shutdown path)
    pub fn shutdown(&self) {
        let mut timers = self.timers.lock().expect("veto timer lock");
        for (_, t) in timers.drain() {
            t.deadline.abort();
            t.refresh.abort();
        }
    }
}

impl Drop for VetoCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
