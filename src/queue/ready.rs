//! Ready-check coordinator
//!
//! Owns the single pending ready check and its two process-local timers: one
//! deadline task and one periodic display-refresh task, both keyed by check id
//! and cancelled when the check resolves. Every timer callback re-reads the
//! check and bails unless it is still pending, so a late fire after
//! completion is a no-op.

use crate::boards::Boards;
use crate::config::queue::MATCH_SIZE;
use crate::error::Result;
use crate::gateway::{EventPublisher, Notifier, Presenter};
use crate::lifecycle::MatchLifecycle;
use crate::metrics::MetricsCollector;
use crate::store::MatchStore;
use crate::types::{
    CancellationEvent, ParticipantId, ReadyCheck, ReadyCheckId, ReadyCheckStatus, ScrimEvent,
};
use crate::utils::{current_timestamp, generate_ready_check_id};
use chrono::Duration as ChronoDuration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, info, warn};

/// Reason recorded on the cancellation ledger for evicted participants
const EVICTION_REASON: &str = "ready-check-expired";

struct ReadyTimers {
    deadline: JoinHandle<()>,
    refresh: JoinHandle<()>,
}

/// Coordinator for the time-boxed confirmation round
pub struct ReadyCheckCoordinator {
    store: Arc<dyn MatchStore>,
    boards: Arc<Boards>,
    presenter: Arc<dyn Presenter>,
    notifier: Arc<dyn Notifier>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<MetricsCollector>,
    lifecycle: Arc<MatchLifecycle>,
    timers: Mutex<HashMap<ReadyCheckId, ReadyTimers>>,
}

impl ReadyCheckCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn MatchStore>,
        boards: Arc<Boards>,
        presenter: Arc<dyn Presenter>,
        notifier: Arc<dyn Notifier>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<MetricsCollector>,
        lifecycle: Arc<MatchLifecycle>,
    ) -> Self {
        Self {
            store,
            boards,
            presenter,
            notifier,
            publisher,
            metrics,
            lifecycle,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Idempotent queue evaluation: once ten participants are waiting, start
    /// a ready check (or the match directly when ready checks are disabled).
    /// Invoked after every join/leave, after admin queue ops, and at startup.
    pub async fn evaluate_queue(self: Arc<Self>) -> Result<()> {
        let settings = self.store.queue_settings().await?;

        if settings.ready_enabled {
            if self.store.pending_ready_check().await?.is_some() {
                return Ok(());
            }
        }

        if self.store.queue_len().await? < MATCH_SIZE {
            return Ok(());
        }

        if settings.ready_enabled {
            self.start_ready_check().await?;
        } else {
            self.lifecycle.try_start_match().await?;
        }
        Ok(())
    }

    /// Start a ready check over the first ten waiting participants. A second
    /// call while one is pending is a successful no-op.
    pub async fn start_ready_check(self: Arc<Self>) -> Result<bool> {
        let entries = self.store.queue_entries().await?;
        if entries.len() < MATCH_SIZE {
            return Ok(false);
        }
        let participant_ids: Vec<ParticipantId> = entries
            .iter()
            .take(MATCH_SIZE)
            .map(|e| e.participant_id.clone())
            .collect();

        let settings = self.store.queue_settings().await?;
        let now = current_timestamp();
        let check = ReadyCheck {
            rc_id: generate_ready_check_id(),
            status: ReadyCheckStatus::Pending,
            participant_ids: participant_ids.clone(),
            confirmed_ids: Vec::new(),
            created_at: now,
            deadline: now + ChronoDuration::seconds(settings.ready_seconds as i64),
        };
        let rc_id = check.rc_id.clone();
        let deadline = check.deadline;

        if !self
            .store
            .insert_ready_check_if_none_pending(check)
            .await?
        {
            debug!("Ready check already pending, not starting another");
            return Ok(true);
        }

        info!(
            "Ready check {} started for {} participants ({}s window)",
            rc_id,
            participant_ids.len(),
            settings.ready_seconds
        );
        self.metrics.record_ready_check("started");
        self.publisher
            .publish(ScrimEvent::ReadyCheckStarted {
                rc_id: rc_id.clone(),
                participant_ids: participant_ids.clone(),
                deadline,
            })
            .await
            .ok();

        self.boards.refresh_ready_check(&rc_id).await?;
        self.notify_participants(&rc_id, &participant_ids, deadline)
            .await;
        Self::schedule_timers(&self, &rc_id, settings.ready_seconds);

        Ok(true)
    }

    /// Out-of-band prompts; synthetic participants are skipped
    async fn notify_participants(
        &self,
        rc_id: &ReadyCheckId,
        participant_ids: &[ParticipantId],
        deadline: chrono::DateTime<chrono::Utc>,
    ) {
        for id in participant_ids {
            let synthetic = match self.store.participant(id).await {
                Ok(Some(p)) => p.synthetic,
                _ => false,
            };
            if synthetic {
                continue;
            }
            if let Err(e) = self.notifier.send_ready_prompt(id, rc_id, deadline).await {
                // Closed inboxes are not our problem; the shared display remains
                warn!("Ready prompt to {} failed: {}", id, e);
            }
        }
    }

    fn schedule_timers(this: &Arc<Self>, rc_id: &ReadyCheckId, ready_seconds: u64) {
        let deadline_task = {
            let this = Arc::clone(this);
            let rc_id = rc_id.clone();
            tokio::spawn(async move {
                sleep(Duration::from_secs(ready_seconds)).await;
                if let Err(e) = this.handle_timeout(rc_id.clone()).await {
                    warn!("Ready check {} timeout handling failed: {}", rc_id, e);
                }
            })
        };

        let refresh_task = {
            let store = Arc::clone(&this.store);
            let boards = Arc::clone(&this.boards);
            let rc_id = rc_id.clone();
            tokio::spawn(async move {
                let mut tick = interval(Duration::from_secs(1));
                tick.tick().await; // first tick is immediate
                loop {
                    tick.tick().await;
                    match store.ready_check(&rc_id).await {
                        Ok(Some(check)) if check.status == ReadyCheckStatus::Pending => {
                            boards.refresh_ready_check(&rc_id).await.ok();
                        }
                        _ => break,
                    }
                }
            })
        };

        let mut timers = this.timers.lock().expect("ready timer lock");
        if let Some(old) = timers.insert(
            rc_id.clone(),
            ReadyTimers {
                deadline: deadline_task,
                refresh: refresh_task,
            },
        ) {
            old.deadline.abort();
            old.refresh.abort();
        }
    }

    fn remove_timers(&self, rc_id: &str) -> Option<ReadyTimers> {
        self.timers.lock().expect("ready timer lock").remove(rc_id)
    }

    /// Record one participant's confirmation; completes the check when the
    /// last member confirms.
    pub async fn confirm(&self, rc_id: &str, participant_id: &str) -> Result<()> {
        let updated = self.store.confirm_ready(rc_id, participant_id).await?;
        debug!(
            "Ready check {}: {}/{} confirmed",
            rc_id,
            updated.confirmed_ids.len(),
            updated.participant_ids.len()
        );
        self.boards.refresh_ready_check(rc_id).await?;

        if updated.fully_confirmed() {
            self.complete(rc_id).await?;
        }
        Ok(())
    }

    /// Confirm every synthetic member of the pending check (admin fill tool)
    pub async fn auto_confirm_synthetics(&self) -> Result<()> {
        let check = match self.store.pending_ready_check().await? {
            Some(check) => check,
            None => return Ok(()),
        };
        for id in &check.participant_ids {
            let synthetic = matches!(
                self.store.participant(id).await?,
                Some(p) if p.synthetic
            );
            if !synthetic || check.confirmed_ids.contains(id) {
                continue;
            }
            // AlreadyConfirmed from a racing confirm is fine
            if let Err(e) = self.store.confirm_ready(&check.rc_id, id).await {
                debug!("Auto-confirm of {} skipped: {}", id, e);
            }
        }

        self.boards.refresh_ready_check(&check.rc_id).await?;
        if let Some(fresh) = self.store.ready_check(&check.rc_id).await? {
            if fresh.status == ReadyCheckStatus::Pending && fresh.fully_confirmed() {
                self.complete(&check.rc_id).await?;
            }
        }
        Ok(())
    }

    /// Transition a fully-confirmed check to complete: reprioritize its ten
    /// to the queue front and hand off to the match lifecycle.
    async fn complete(&self, rc_id: &str) -> Result<()> {
        let transitioned = self
            .store
            .set_ready_check_status(rc_id, ReadyCheckStatus::Pending, ReadyCheckStatus::Complete)
            .await?;
        if !transitioned {
            // A concurrent expiry beat us; nothing to do
            return Ok(());
        }
        if let Some(timers) = self.remove_timers(rc_id) {
            timers.deadline.abort();
            timers.refresh.abort();
        }

        let check = match self.store.ready_check(rc_id).await? {
            Some(check) => check,
            None => return Ok(()),
        };
        self.store.promote_to_front(&check.participant_ids).await?;

        info!("Ready check {} complete, starting match", rc_id);
        self.metrics.record_ready_check("completed");
        self.publisher
            .publish(ScrimEvent::ReadyCheckCompleted {
                rc_id: rc_id.to_string(),
            })
            .await
            .ok();
        if let Err(e) = self.presenter.remove_ready_check(rc_id).await {
            warn!("Ready check display removal failed: {}", e);
        }
        self.boards.refresh_queue_panel().await?;

        self.lifecycle.try_start_match().await?;
        Ok(())
    }

    /// Deadline expiry: evict unconfirmed members and re-evaluate the queue.
    /// Guarded so a stale fire after completion does nothing.
    pub async fn handle_timeout(self: Arc<Self>, rc_id: ReadyCheckId) -> Result<()> {
        // We are running inside the deadline task; only the refresh task is
        // aborted here
        if let Some(timers) = self.remove_timers(&rc_id) {
            timers.refresh.abort();
        }

        let transitioned = self
            .store
            .set_ready_check_status(&rc_id, ReadyCheckStatus::Pending, ReadyCheckStatus::Expired)
            .await?;
        if !transitioned {
            return Ok(());
        }
        let check = match self.store.ready_check(&rc_id).await? {
            Some(check) => check,
            None => return Ok(()),
        };

        let unconfirmed: Vec<ParticipantId> = check
            .participant_ids
            .iter()
            .filter(|id| !check.confirmed_ids.contains(*id))
            .cloned()
            .collect();

        if !unconfirmed.is_empty() {
            info!(
                "Ready check {} expired, evicting {} unconfirmed participants",
                rc_id,
                unconfirmed.len()
            );
            self.store.remove_queue_entries(&unconfirmed).await?;
            let now = current_timestamp();
            for id in &unconfirmed {
                self.store
                    .append_cancellation(CancellationEvent {
                        participant_id: id.clone(),
                        rc_id: Some(rc_id.clone()),
                        reason: EVICTION_REASON.to_string(),
                        weight: 1,
                        created_at: now,
                    })
                    .await?;
                self.metrics.ready_evictions_total.inc();
            }
        }

        self.metrics.record_ready_check("expired");
        self.publisher
            .publish(ScrimEvent::ReadyCheckExpired {
                rc_id: rc_id.clone(),
                evicted: unconfirmed,
            })
            .await
            .ok();
        if let Err(e) = self.presenter.remove_ready_check(&rc_id).await {
            warn!("Ready check display removal failed: {}", e);
        }
        self.boards.refresh_queue_panel().await?;
        self.boards.refresh_cancellation_board().await?;

        // Enough confirmed participants may still be waiting
        self.clone().evaluate_queue().await?;
        Ok(())
    }

    /// Expire the pending check in place without evicting anyone (used when
    /// an admin disables ready checks or clears the queue).
    pub async fn abort_pending_check(&self) -> Result<()> {
        let check = match self.store.pending_ready_check().await? {
            Some(check) => check,
            None => return Ok(()),
        };
        if let Some(timers) = self.remove_timers(&check.rc_id) {
            timers.deadline.abort();
            timers.refresh.abort();
        }
        self.store
            .set_ready_check_status(
                &check.rc_id,
                ReadyCheckStatus::Pending,
                ReadyCheckStatus::Expired,
            )
            .await?;
        if let Err(e) = self.presenter.remove_ready_check(&check.rc_id).await {
            warn!("Ready check display removal failed: {}", e);
        }
        info!("Pending ready check {} aborted", check.rc_id);
        Ok(())
    }

    /// Abort every tracked timer (shutdown path)
    pub fn shutdown(&self) {
        let mut timers = self.timers.lock().expect("ready timer lock");
        for (_, t) in timers.drain() {
            t.deadline.abort();
            t.refresh.abort();
        }
    }
}

impl Drop for ReadyCheckCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
