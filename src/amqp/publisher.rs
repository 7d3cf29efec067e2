//! AMQP publisher for events and display payloads
//!
//! [`AmqpGatewayPublisher`] is the production implementation of every
//! collaborator trait: domain events go to the event exchange, display
//! upserts and platform directives (spaces, voice rooms, prompts) go to the
//! display exchange as fire-and-forget messages keyed by entity. The gateway
//! process on the other side owns message-id bookkeeping and recreates
//! anything it lost.

use crate::amqp::messages::{
    DisplayMessage, MessageEnvelope, DISPLAY_ROUTING_PREFIX, EVENT_ROUTING_PREFIX,
};
use crate::boards::views::{
    CancellationBoardView, LeaderboardView, MatchHistoryView, MatchRecapView, MatchResultView,
    QueueView, ReadyCheckView, ReviewView, VetoView, VotePromptView,
};
use crate::error::{Result, ScrimError};
use crate::gateway::{
    CoordinationSpaces, EventPublisher, Notifier, Presenter, VoiceRoomProvider,
};
use crate::types::{MatchId, ParticipantId, ReadyCheckId, ScrimEvent, SpaceId, VoiceRooms};
use amqprs::{
    channel::{BasicPublishArguments, Channel, ExchangeDeclareArguments},
    BasicProperties,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Configuration for publishing behavior
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub event_exchange: String,
    pub display_exchange: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            event_exchange: "scrim.events".to_string(),
            display_exchange: "scrim.displays".to_string(),
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

/// AMQP-backed implementation of the gateway collaborator traits
pub struct AmqpGatewayPublisher {
    channel: Channel,
    config: PublisherConfig,
}

impl AmqpGatewayPublisher {
    /// Create a publisher and declare its exchanges
    pub async fn new(channel: Channel, config: PublisherConfig) -> Result<Self> {
        let publisher = Self { channel, config };
        publisher.setup_exchanges().await?;
        Ok(publisher)
    }

    async fn setup_exchanges(&self) -> Result<()> {
        for exchange in [&self.config.event_exchange, &self.config.display_exchange] {
            let args = ExchangeDeclareArguments::new(exchange, "topic");
            self.channel.exchange_declare(args).await.map_err(|e| {
                ScrimError::AmqpConnectionFailed {
                    message: format!("Failed to declare exchange {}: {}", exchange, e),
                }
            })?;
        }
        Ok(())
    }

    async fn publish_with_retry(
        &self,
        exchange: &str,
        routing_key: &str,
        body: Vec<u8>,
    ) -> Result<()> {
        let mut attempt = 0;
        loop {
            let args = BasicPublishArguments::new(exchange, routing_key);
            match self
                .channel
                .basic_publish(BasicProperties::default(), body.clone(), args)
                .await
            {
                Ok(()) => {
                    debug!("Published to {} ({})", exchange, routing_key);
                    return Ok(());
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.config.max_retries {
                        return Err(ScrimError::AmqpConnectionFailed {
                            message: format!(
                                "Publish to {} failed after {} retries: {}",
                                exchange, attempt, e
                            ),
                        }
                        .into());
                    }
                    warn!(
                        "Publish to {} failed (attempt {}): {}, retrying",
                        exchange, attempt, e
                    );
                    sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
            }
        }
    }

    async fn publish_display(&self, message: DisplayMessage) -> Result<()> {
        let routing_key = format!("{}.{}", DISPLAY_ROUTING_PREFIX, message.routing_suffix());
        let envelope = MessageEnvelope::new(message, routing_key.clone());
        let exchange = self.config.display_exchange.clone();
        self.publish_with_retry(&exchange, &routing_key, envelope.to_bytes()?)
            .await
    }
}

#[async_trait]
impl EventPublisher for AmqpGatewayPublisher {
    async fn publish(&self, event: ScrimEvent) -> Result<()> {
        let routing_key = format!("{}.{}", EVENT_ROUTING_PREFIX, event_suffix(&event));
        let envelope = MessageEnvelope::new(event, routing_key.clone());
        let exchange = self.config.event_exchange.clone();
        self.publish_with_retry(&exchange, &routing_key, envelope.to_bytes()?)
            .await
    }
}

fn event_suffix(event: &ScrimEvent) -> &'static str {
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
impl Presenter for AmqpGatewayPublisher {
    async fn upsert_queue_panel(&self, view: QueueView) -> Result<()> {
        self.publish_display(DisplayMessage::QueuePanel(view)).await
    }

    async fn upsert_ready_check(&self, view: ReadyCheckView) -> Result<()> {
        self.publish_display(DisplayMessage::ReadyCheck(view)).await
    }

    async fn remove_ready_check(&self, rc_id: &str) -> Result<()> {
        self.publish_display(DisplayMessage::ReadyCheckRemoved {
            rc_id: rc_id.to_string(),
        })
        .await
    }

    async fn upsert_match_recap(&self, view: MatchRecapView) -> Result<()> {
        self.publish_display(DisplayMessage::MatchRecap(view)).await
    }

    async fn upsert_veto_board(&self, view: VetoView) -> Result<()> {
        self.publish_display(DisplayMessage::VetoBoard(view)).await
    }

    async fn post_vote_prompt(&self, view: VotePromptView) -> Result<()> {
        self.publish_display(DisplayMessage::VotePrompt(view)).await
    }

    async fn post_review_prompt(&self, view: ReviewView) -> Result<()> {
        self.publish_display(DisplayMessage::ReviewPrompt(view))
            .await
    }

    async fn announce_result(&self, view: MatchResultView) -> Result<()> {
        self.publish_display(DisplayMessage::MatchResult(view))
            .await
    }

    async fn disable_match_components(&self, match_id: MatchId) -> Result<()> {
        self.publish_display(DisplayMessage::ComponentsDisabled { match_id })
            .await
    }

    async fn upsert_leaderboard(&self, view: LeaderboardView) -> Result<()> {
        self.publish_display(DisplayMessage::Leaderboard(view))
            .await
    }

    async fn upsert_match_history(&self, view: MatchHistoryView) -> Result<()> {
        self.publish_display(DisplayMessage::MatchHistory(view))
            .await
    }

    async fn upsert_cancellation_board(&self, view: CancellationBoardView) -> Result<()> {
        self.publish_display(DisplayMessage::CancellationBoard(view))
            .await
    }

    async fn send_notice(&self, participant_id: &str, text: &str) -> Result<()> {
        self.publish_display(DisplayMessage::Notice {
            participant_id: participant_id.to_string(),
            text: text.to_string(),
        })
        .await
    }
}

#[async_trait]
impl Notifier for AmqpGatewayPublisher {
    async fn send_ready_prompt(
        &self,
        participant_id: &ParticipantId,
        rc_id: &ReadyCheckId,
        deadline: DateTime<Utc>,
    ) -> Result<()> {
        self.publish_display(DisplayMessage::ReadyPrompt {
            participant_id: participant_id.clone(),
            rc_id: rc_id.clone(),
            deadline,
        })
        .await
    }
}

#[async_trait]
impl CoordinationSpaces for AmqpGatewayPublisher {
    async fn create_match_space(
        &self,
        match_id: MatchId,
        participant_ids: &[ParticipantId],
    ) -> Result<SpaceId> {
        // The space key is deterministic; the gateway maps it to a real
        // thread and keeps that mapping on its side
        let space_id = format!("match-space-{}", match_id);
        self.publish_display(DisplayMessage::CreateSpace {
            match_id,
            space_id: space_id.clone(),
            participant_ids: participant_ids.to_vec(),
        })
        .await?;
        Ok(space_id)
    }

    async fn archive_space(&self, space_id: &SpaceId) -> Result<()> {
        self.publish_display(DisplayMessage::ArchiveSpace {
            space_id: space_id.clone(),
        })
        .await
    }
}

#[async_trait]
impl VoiceRoomProvider for AmqpGatewayPublisher {
    async fn create_team_rooms(
        &self,
        match_id: MatchId,
        team_a: &[ParticipantId],
        team_b: &[ParticipantId],
    ) -> Result<VoiceRooms> {
        let rooms = VoiceRooms {
            team_a: format!("match-{}-voice-a", match_id),
            team_b: format!("match-{}-voice-b", match_id),
        };
        self.publish_display(DisplayMessage::CreateVoiceRooms {
            match_id,
            room_a: rooms.team_a.clone(),
            room_b: rooms.team_b.clone(),
            team_a: team_a.to_vec(),
            team_b: team_b.to_vec(),
        })
        .await?;
        Ok(rooms)
    }

    async fn destroy_rooms(&self, match_id: MatchId, rooms: &VoiceRooms) -> Result<()> {
        self.publish_display(DisplayMessage::DestroyVoiceRooms {
            match_id,
            room_a: rooms.team_a.clone(),
            room_b: rooms.team_b.clone(),
        })
        .await
    }
}
