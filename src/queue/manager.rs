//! Queue manager
//!
//! Tracks the waiting line, validates joins and leaves, and triggers the
//! ready-check coordinator's queue evaluation after every change.

use crate::boards::Boards;
use crate::config::RatingConfig;
use crate::error::{Result, ScrimError};
use crate::gateway::EventPublisher;
use crate::metrics::MetricsCollector;
use crate::queue::ready::ReadyCheckCoordinator;
use crate::store::MatchStore;
use crate::types::ScrimEvent;
use crate::utils::current_timestamp;
use std::sync::Arc;
use tracing::info;

/// The queue manager
pub struct QueueManager {
    store: Arc<dyn MatchStore>,
    boards: Arc<Boards>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<MetricsCollector>,
    ready: Arc<ReadyCheckCoordinator>,
    rating_config: RatingConfig,
}

impl QueueManager {
    pub fn new(
        store: Arc<dyn MatchStore>,
        boards: Arc<Boards>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<MetricsCollector>,
        ready: Arc<ReadyCheckCoordinator>,
        rating_config: RatingConfig,
    ) -> Self {
        Self {
            store,
            boards,
            publisher,
            metrics,
            ready,
            rating_config,
        }
    }

    /// Add a participant to the waiting line.
    ///
    /// Rejections: `AlreadyInActiveMatch`, `Banned`, `AlreadyQueued`.
    pub async fn join(&self, participant_id: &str) -> Result<()> {
        if let Some(match_id) = self.store.active_match_for(participant_id).await? {
            return Err(ScrimError::AlreadyInActiveMatch { match_id }.into());
        }

        if let Some(participant) = self.store.participant(participant_id).await? {
            if participant.banned {
                return Err(ScrimError::Banned.into());
            }
        }

        if self.store.is_queued(participant_id).await? {
            return Err(ScrimError::AlreadyQueued.into());
        }

        self.store
            .ensure_participant(participant_id, self.rating_config.baseline_rating, false)
            .await?;

        let inserted = self
            .store
            .try_insert_queue_entry(participant_id, current_timestamp())
            .await?;
        if !inserted {
            // Lost a race with another join from the same participant
            return Err(ScrimError::AlreadyQueued.into());
        }

        let depth = self.store.queue_len().await?;
        info!("{} joined the queue ({} waiting)", participant_id, depth);
        self.metrics.queue_joins_total.inc();
        self.metrics.queue_depth.set(depth as i64);
        self.publisher
            .publish(ScrimEvent::QueueChanged { depth })
            .await
            .ok();

        self.boards.refresh_queue_panel().await?;
        self.trigger().await
    }

    /// Remove a participant from the waiting line.
    ///
    /// Rejection: `NotQueued`.
    pub async fn leave(&self, participant_id: &str) -> Result<()> {
        if !self.store.remove_queue_entry(participant_id).await? {
            return Err(ScrimError::NotQueued.into());
        }

        let depth = self.store.queue_len().await?;
        info!("{} left the queue ({} waiting)", participant_id, depth);
        self.metrics.queue_leaves_total.inc();
        self.metrics.queue_depth.set(depth as i64);
        self.publisher
            .publish(ScrimEvent::QueueChanged { depth })
            .await
            .ok();

        self.boards.refresh_queue_panel().await?;
        self.trigger().await
    }

    /// Idempotent start check, also run once at service startup
    pub async fn trigger(&self) -> Result<()> {
        self.ready.clone().evaluate_queue().await
    }
}
