//! Test fixtures and mock implementations for integration testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scrim_room::admin::AdminSurface;
use scrim_room::boards::views::{
    CancellationBoardView, LeaderboardView, MatchHistoryView, MatchRecapView, MatchResultView,
    QueueView, ReadyCheckView, ReviewView, VetoView, VotePromptView,
};
use scrim_room::boards::Boards;
use scrim_room::config::{QueueSettings, RatingConfig, VetoSettings};
use scrim_room::error::Result;
use scrim_room::gateway::{
    Authorizer, CoordinationSpaces, EventPublisher, Notifier, Presenter, StoreRoleAuthorizer,
    VoiceRoomProvider,
};
use scrim_room::lifecycle::{MatchLifecycle, VetoCoordinator};
use scrim_room::metrics::MetricsCollector;
use scrim_room::queue::{QueueManager, ReadyCheckCoordinator};
use scrim_room::store::{InMemoryMatchStore, MatchStore};
use scrim_room::types::{
    MatchId, ParticipantId, ReadyCheckId, ScrimEvent, SpaceId, VoiceRooms,
};
use std::sync::{Arc, Mutex};

/// Gateway mock that records every display call for assertions
#[derive(Debug, Default)]
pub struct CapturingGateway {
    calls: Mutex<Vec<String>>,
    notices: Mutex<Vec<(ParticipantId, String)>>,
    ready_prompts: Mutex<Vec<(ParticipantId, ReadyCheckId)>>,
}

impl CapturingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, label: impl Into<String>) {
        self.calls.lock().unwrap().push(label.into());
    }

    /// Number of recorded calls with the given label
    pub fn count(&self, label: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == label)
            .count()
    }

    pub fn notices(&self) -> Vec<(ParticipantId, String)> {
        self.notices.lock().unwrap().clone()
    }

    pub fn ready_prompts(&self) -> Vec<(ParticipantId, ReadyCheckId)> {
        self.ready_prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Presenter for CapturingGateway {
    async fn upsert_queue_panel(&self, _view: QueueView) -> Result<()> {
        self.record("queue_panel");
        Ok(())
    }

    async fn upsert_ready_check(&self, _view: ReadyCheckView) -> Result<()> {
        self.record("ready_check");
        Ok(())
    }

    async fn remove_ready_check(&self, _rc_id: &str) -> Result<()> {
        self.record("ready_check_removed");
        Ok(())
    }

    async fn upsert_match_recap(&self, _view: MatchRecapView) -> Result<()> {
        self.record("match_recap");
        Ok(())
    }

    async fn upsert_veto_board(&self, _view: VetoView) -> Result<()> {
        self.record("veto_board");
        Ok(())
    }

    async fn post_vote_prompt(&self, _view: VotePromptView) -> Result<()> {
        self.record("vote_prompt");
        Ok(())
    }

    async fn post_review_prompt(&self, _view: ReviewView) -> Result<()> {
        self.record("review_prompt");
        Ok(())
    }

    async fn announce_result(&self, _view: MatchResultView) -> Result<()> {
        self.record("match_result");
        Ok(())
    }

    async fn disable_match_components(&self, _match_id: MatchId) -> Result<()> {
        self.record("components_disabled");
        Ok(())
    }

    async fn upsert_leaderboard(&self, _view: LeaderboardView) -> Result<()> {
        self.record("leaderboard");
        Ok(())
    }

    async fn upsert_match_history(&self, _view: MatchHistoryView) -> Result<()> {
        self.record("match_history");
        Ok(())
    }

    async fn upsert_cancellation_board(&self, _view: CancellationBoardView) -> Result<()> {
        self.record("cancellation_board");
        Ok(())
    }

    async fn send_notice(&self, participant_id: &str, text: &str) -> Result<()> {
        self.record("notice");
        self.notices
            .lock()
            .unwrap()
            .push((participant_id.to_string(), text.to_string()));
        Ok(())
    }
}

#[async_trait]
impl Notifier for CapturingGateway {
    async fn send_ready_prompt(
        &self,
        participant_id: &ParticipantId,
        rc_id: &ReadyCheckId,
        _deadline: DateTime<Utc>,
    ) -> Result<()> {
        self.record("ready_prompt");
        self.ready_prompts
            .lock()
            .unwrap()
            .push((participant_id.clone(), rc_id.clone()));
        Ok(())
    }
}

#[async_trait]
impl CoordinationSpaces for CapturingGateway {
    async fn create_match_space(
        &self,
        match_id: MatchId,
        _participant_ids: &[ParticipantId],
    ) -> Result<SpaceId> {
        self.record("create_space");
        Ok(format!("test-space-{}", match_id))
    }

    async fn archive_space(&self, _space_id: &SpaceId) -> Result<()> {
        self.record("archive_space");
        Ok(())
    }
}

#[async_trait]
impl VoiceRoomProvider for CapturingGateway {
    async fn create_team_rooms(
        &self,
        match_id: MatchId,
        _team_a: &[ParticipantId],
        _team_b: &[ParticipantId],
    ) -> Result<VoiceRooms> {
        self.record("create_voice");
        Ok(VoiceRooms {
            team_a: format!("test-voice-{}-a", match_id),
            team_b: format!("test-voice-{}-b", match_id),
        })
    }

    async fn destroy_rooms(&self, _match_id: MatchId, _rooms: &VoiceRooms) -> Result<()> {
        self.record("destroy_voice");
        Ok(())
    }
}

/// Event publisher that captures published events for assertions
#[derive(Debug, Default)]
pub struct CapturingPublisher {
    events: Mutex<Vec<ScrimEvent>>,
}

impl CapturingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScrimEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count_events(&self, name: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event_name(event) == name)
            .count()
    }
}

fn event_name(event: &ScrimEvent) -> &'static str {
    match event {
        ScrimEvent::QueueChanged { .. } => "queue_changed",
        ScrimEvent::ReadyCheckStarted { .. } => "ready_check_started",
        ScrimEvent::ReadyCheckCompleted { .. } => "ready_check_completed",
        ScrimEvent::ReadyCheckExpired { .. } => "ready_check_expired",
        ScrimEvent::MatchStarted { .. } => "match_started",
        ScrimEvent::MapPicked { .. } => "map_picked",
        ScrimEvent::ReviewRequested { .. } => "review_requested",
        ScrimEvent::MatchFinalized { .. } => "match_finalized",
        ScrimEvent::MatchReversed { .. } => "match_reversed",
        ScrimEvent::MatchCancelled { .. } => "match_cancelled",
    }
}

#[async_trait]
impl EventPublisher for CapturingPublisher {
    async fn publish(&self, event: ScrimEvent) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Fully wired in-memory system for integration tests
pub struct TestSystem {
    pub store: Arc<dyn MatchStore>,
    pub gateway: Arc<CapturingGateway>,
    pub publisher: Arc<CapturingPublisher>,
    pub boards: Arc<Boards>,
    pub lifecycle: Arc<MatchLifecycle>,
    pub ready: Arc<ReadyCheckCoordinator>,
    pub queue: Arc<QueueManager>,
    pub admin: Arc<AdminSurface>,
}

/// Build a complete system against the in-memory store. Ready and veto
/// windows are long enough that no timer fires during a test; transitions
/// are driven explicitly.
pub async fn create_test_system() -> TestSystem {
    let store: Arc<dyn MatchStore> = Arc::new(InMemoryMatchStore::new());
    let gateway = Arc::new(CapturingGateway::new());
    let publisher = Arc::new(CapturingPublisher::new());
    let metrics = Arc::new(MetricsCollector::new().expect("metrics"));
    let rating_config = RatingConfig::default();

    store
        .set_queue_settings(QueueSettings {
            ready_enabled: true,
            ready_seconds: 300,
        })
        .await
        .unwrap();
    store
        .set_veto_settings(VetoSettings {
            turn_seconds: 300,
            ..VetoSettings::default()
        })
        .await
        .unwrap();

    let boards = Arc::new(Boards::new(store.clone(), gateway.clone()));
    let veto = Arc::new(VetoCoordinator::new(
        store.clone(),
        boards.clone(),
        gateway.clone(),
        publisher.clone(),
        metrics.clone(),
    ));
    let lifecycle = Arc::new(MatchLifecycle::new(
        store.clone(),
        boards.clone(),
        gateway.clone(),
        gateway.clone(),
        gateway.clone(),
        publisher.clone(),
        metrics.clone(),
        veto,
        rating_config,
    ));
    let ready = Arc::new(ReadyCheckCoordinator::new(
        store.clone(),
        boards.clone(),
        gateway.clone(),
        gateway.clone(),
        publisher.clone(),
        metrics.clone(),
        lifecycle.clone(),
    ));
    let queue = Arc::new(QueueManager::new(
        store.clone(),
        boards.clone(),
        publisher.clone(),
        metrics.clone(),
        ready.clone(),
        rating_config,
    ));
    let authorizer: Arc<dyn Authorizer> = Arc::new(StoreRoleAuthorizer::new(store.clone()));
    let admin = Arc::new(AdminSurface::new(
        store.clone(),
        authorizer,
        boards.clone(),
        lifecycle.clone(),
        ready.clone(),
        queue.clone(),
        rating_config,
    ));

    TestSystem {
        store,
        gateway,
        publisher,
        boards,
        lifecycle,
        ready,
        queue,
        admin,
    }
}

impl TestSystem {
    /// Queue ten participants p1..p10; a ready check starts on the tenth join
    pub async fn queue_ten(&self) -> Vec<String> {
        let ids: Vec<String> = (1..=10).map(|i| format!("p{}", i)).collect();
        for id in &ids {
            self.queue.join(id).await.unwrap();
        }
        ids
    }

    /// Confirm every member of the pending ready check, which starts a match
    pub async fn confirm_all(&self) -> scrim_room::types::MatchId {
        let check = self
            .store
            .pending_ready_check()
            .await
            .unwrap()
            .expect("pending ready check");
        for id in &check.participant_ids {
            self.ready.confirm(&check.rc_id, id).await.unwrap();
        }
        self.store
            .all_matches()
            .await
            .unwrap()
            .last()
            .expect("match started")
            .match_id
    }

    /// Play the veto to completion: the current captain always bans the
    /// first remaining map
    pub async fn run_veto(&self, match_id: scrim_room::types::MatchId) {
        loop {
            let state = self
                .store
                .veto_state(match_id)
                .await
                .unwrap()
                .expect("veto state");
            let captain = match state.current_team {
                Some(team) => state.captain_of(team).clone(),
                None => break,
            };
            let map = state.remaining[0].clone();
            self.lifecycle
                .veto()
                .clone()
                .ban(match_id, &captain, &map)
                .await
                .unwrap();
        }
    }

    /// Both captains vote for the same team, closing the match
    pub async fn captains_agree(
        &self,
        match_id: scrim_room::types::MatchId,
        winner: scrim_room::types::Team,
    ) {
        let state = self
            .store
            .veto_state(match_id)
            .await
            .unwrap()
            .expect("veto state");
        self.lifecycle
            .cast_captain_vote(match_id, &state.captain_a.clone(), winner)
            .await
            .unwrap();
        self.lifecycle
            .cast_captain_vote(match_id, &state.captain_b.clone(), winner)
            .await
            .unwrap();
    }

    /// Tear down timers so the runtime can wind down cleanly
    pub fn shutdown(&self) {
        self.ready.shutdown();
        self.lifecycle.veto().shutdown();
    }
}
