//! Main application state and service coordination
//!
//! [`AppState`] wires the store, the coordinators and the AMQP transport
//! together, runs the background consumer and health server, and owns the
//! graceful shutdown path. Failing to reach the broker at startup is fatal.

use crate::admin::AdminSurface;
use crate::amqp::connection::{AmqpConfig, AmqpConnection};
use crate::amqp::handlers::{CommandConsumer, CommandHandler};
use crate::amqp::messages::Command;
use crate::amqp::publisher::{AmqpGatewayPublisher, PublisherConfig};
use crate::boards::Boards;
use crate::config::{AppConfig, RatingConfig};
use crate::error::{Result, ScrimError};
use crate::gateway::{Authorizer, Presenter, StoreRoleAuthorizer};
use crate::lifecycle::{MatchLifecycle, VetoCoordinator};
use crate::metrics::{HealthServer, HealthServerConfig, MetricsCollector};
use crate::queue::{QueueManager, ReadyCheckCoordinator};
use crate::store::{InMemoryMatchStore, MatchStore};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Command handler that dispatches to the core components and surfaces
/// user-input rejections as private notices
pub struct ProductionCommandHandler {
    queue: Arc<QueueManager>,
    ready: Arc<ReadyCheckCoordinator>,
    lifecycle: Arc<MatchLifecycle>,
    admin: Arc<AdminSurface>,
    presenter: Arc<dyn Presenter>,
    metrics: Arc<MetricsCollector>,
}

impl ProductionCommandHandler {
    async fn dispatch(&self, command: Command) -> Result<()> {
        match command {
            Command::Join { actor } => self.queue.join(&actor.id).await,
            Command::Leave { actor } => self.queue.leave(&actor.id).await,
            Command::ConfirmReady { actor, rc_id } => {
                self.ready.confirm(&rc_id, &actor.id).await
            }
            Command::BanMap {
                actor,
                match_id,
                map,
            } => {
                self.lifecycle
                    .veto()
                    .clone()
                    .ban(match_id, &actor.id, &map)
                    .await
            }
            Command::CastVote {
                actor,
                match_id,
                team,
            } => {
                self.lifecycle
                    .cast_captain_vote(match_id, &actor.id, team)
                    .await
            }
            Command::AdminForceWin {
                actor,
                match_id,
                team,
            } => self.admin.force_win(&actor, match_id, team).await,
            Command::AdminReverse { actor, match_id } => {
                self.admin.reverse(&actor, match_id).await
            }
            Command::AdminCancel { actor, match_id } => {
                self.admin.cancel(&actor, match_id).await
            }
            Command::AdminSetWinner {
                actor,
                match_id,
                team,
            } => self.admin.set_winner(&actor, match_id, team).await,
            Command::AdminResolveReview {
                actor,
                match_id,
                team,
            } => self.admin.resolve_review(&actor, match_id, team).await,
            Command::AdminSetCaptain {
                actor,
                match_id,
                team,
                participant_id,
            } => {
                self.admin
                    .set_captain(&actor, match_id, team, &participant_id)
                    .await
            }
            Command::ConfigureVeto {
                actor,
                captain_mode,
                maps,
                turn_seconds,
            } => {
                let settings = self
                    .admin
                    .configure_veto(&actor, captain_mode, maps, turn_seconds)
                    .await?;
                self.presenter
                    .send_notice(
                        &actor.id,
                        &format!(
                            "Veto settings updated: captains {:?}, {} maps, {}s per turn",
                            settings.captain_mode,
                            settings.maps.len(),
                            settings.turn_seconds
                        ),
                    )
                    .await
                    .ok();
                Ok(())
            }
            Command::ConfigureQueue {
                actor,
                ready_enabled,
                ready_seconds,
            } => {
                let settings = self
                    .admin
                    .configure_queue(&actor, ready_enabled, ready_seconds)
                    .await?;
                self.presenter
                    .send_notice(
                        &actor.id,
                        &format!(
                            "Queue settings updated: ready check {} ({}s)",
                            if settings.ready_enabled {
                                "enabled"
                            } else {
                                "disabled"
                            },
                            settings.ready_seconds
                        ),
                    )
                    .await
                    .ok();
                Ok(())
            }
            Command::Fill {
                actor,
                count,
                auto_confirm_synthetics,
            } => {
                let added = self
                    .admin
                    .fill(&actor, count, auto_confirm_synthetics)
                    .await?;
                self.presenter
                    .send_notice(&actor.id, &format!("Queue filled (+{})", added))
                    .await
                    .ok();
                Ok(())
            }
            Command::ClearQueue { actor } => {
                let removed = self.admin.clear_queue(&actor).await?;
                self.presenter
                    .send_notice(&actor.id, &format!("Queue cleared ({} removed)", removed))
                    .await
                    .ok();
                Ok(())
            }
        }
    }
}

#[async_trait]
impl CommandHandler for ProductionCommandHandler {
    async fn handle_command(&self, command: Command) -> Result<()> {
        let actor_id = command.actor().id.clone();
        match self.dispatch(command).await {
            Ok(()) => {
                self.metrics.record_command("ok");
                Ok(())
            }
            Err(e) => {
                // User rejections go back to the actor as an ephemeral
                // notice and are not service failures
                if let Some(rejection) = e.downcast_ref::<ScrimError>() {
                    if rejection.is_user_rejection() {
                        self.metrics.record_command("rejected");
                        self.presenter
                            .send_notice(&actor_id, &rejection.to_string())
                            .await
                            .ok();
                        return Ok(());
                    }
                }
                self.metrics.record_command("failed");
                Err(e)
            }
        }
    }
}

/// Production application state
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn MatchStore>,
    metrics: Arc<MetricsCollector>,
    queue: Arc<QueueManager>,
    ready: Arc<ReadyCheckCoordinator>,
    lifecycle: Arc<MatchLifecycle>,
    admin: Arc<AdminSurface>,
    handler: Arc<ProductionCommandHandler>,
    amqp: Option<AmqpConnection>,
    consumer: Option<CommandConsumer>,
    health_server: Arc<HealthServer>,
    health_task: Option<JoinHandle<()>>,
}

impl AppState {
    /// Connect to the broker and wire every component. The store here is the
    /// in-process implementation of the document-store contract; a durable
    /// backend plugs in behind the same trait.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let amqp_config = AmqpConfig::from_url(
            &config.amqp.url,
            config.amqp.max_retry_attempts,
            config.amqp.retry_delay_ms,
        )?;
        let amqp = AmqpConnection::new(amqp_config).await?;
        let channel = amqp
            .connection()
            .open_channel(None)
            .await
            .map_err(|e| ScrimError::AmqpConnectionFailed {
                message: format!("Failed to open channel: {}", e),
            })?;

        let publisher_config = PublisherConfig {
            event_exchange: config.amqp.event_exchange_name.clone(),
            display_exchange: config.amqp.display_exchange_name.clone(),
            max_retries: config.amqp.max_retry_attempts,
            retry_delay_ms: config.amqp.retry_delay_ms,
        };
        let gateway = Arc::new(AmqpGatewayPublisher::new(channel.clone(), publisher_config).await?);

        let store: Arc<dyn MatchStore> = Arc::new(InMemoryMatchStore::new());
        let metrics = Arc::new(MetricsCollector::new().unwrap_or_else(|e| {
            warn!("Failed to create metrics collector, using default: {}", e);
            MetricsCollector::default()
        }));
        let rating_config = RatingConfig::default();
        rating_config.validate()?;

        let boards = Arc::new(Boards::new(store.clone(), gateway.clone()));
        let veto = Arc::new(VetoCoordinator::new(
            store.clone(),
            boards.clone(),
            gateway.clone(),
            gateway.clone(),
            metrics.clone(),
        ));
        let lifecycle = Arc::new(MatchLifecycle::new(
            store.clone(),
            boards.clone(),
            gateway.clone(),
            gateway.clone(),
            gateway.clone(),
            gateway.clone(),
            metrics.clone(),
            veto,
            rating_config,
        ));
        let ready = Arc::new(ReadyCheckCoordinator::new(
            store.clone(),
            boards.clone(),
            gateway.clone(),
            gateway.clone(),
            gateway.clone(),
            metrics.clone(),
            lifecycle.clone(),
        ));
        let queue = Arc::new(QueueManager::new(
            store.clone(),
            boards.clone(),
            gateway.clone(),
            metrics.clone(),
            ready.clone(),
            rating_config,
        ));
        let authorizer: Arc<dyn Authorizer> = Arc::new(StoreRoleAuthorizer::new(store.clone()));
        let admin = Arc::new(AdminSurface::new(
            store.clone(),
            authorizer,
            boards,
            lifecycle.clone(),
            ready.clone(),
            queue.clone(),
            rating_config,
        ));

        let handler = Arc::new(ProductionCommandHandler {
            queue: queue.clone(),
            ready: ready.clone(),
            lifecycle: lifecycle.clone(),
            admin: admin.clone(),
            presenter: gateway.clone(),
            metrics: metrics.clone(),
        });
        let consumer = CommandConsumer::new(handler.clone(), channel);

        let health_server = Arc::new(HealthServer::new(
            HealthServerConfig {
                port: config.service.health_port,
                host: "0.0.0.0".to_string(),
            },
            metrics.clone(),
            config.service.name.clone(),
        ));

        Ok(Self {
            config,
            store,
            metrics,
            queue,
            ready,
            lifecycle,
            admin,
            handler,
            amqp: Some(amqp),
            consumer: Some(consumer),
            health_server,
            health_task: None,
        })
    }

    /// Start the consumer, the health server, and re-evaluate the queue (ten
    /// participants may already be waiting from before a restart)
    pub async fn start(&mut self) -> Result<()> {
        if let Some(consumer) = &self.consumer {
            consumer
                .start_consuming(&self.config.amqp.command_queue_name)
                .await?;
        }

        let health_server = self.health_server.clone();
        self.health_task = Some(tokio::spawn(async move {
            if let Err(e) = health_server.start().await {
                error!("Health server stopped: {}", e);
            }
        }));

        if let Err(e) = self.queue.trigger().await {
            warn!("Startup queue evaluation failed: {}", e);
        }

        info!("Service started");
        Ok(())
    }

    /// Stop background work and cancel every in-process timer
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(consumer) = self.consumer.take() {
            if let Err(e) = consumer.stop_consuming().await {
                warn!("Consumer stop failed: {}", e);
            }
        }

        self.ready.shutdown();
        self.lifecycle.veto().shutdown();

        if let Some(amqp) = self.amqp.take() {
            if let Err(e) = amqp.close().await {
                warn!("AMQP close failed: {}", e);
            }
        }

        self.health_server.shutdown();
        if let Some(task) = self.health_task.take() {
            task.abort();
        }

        info!("Service stopped");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn MatchStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn queue(&self) -> &Arc<QueueManager> {
        &self.queue
    }

    pub fn lifecycle(&self) -> &Arc<MatchLifecycle> {
        &self.lifecycle
    }

    pub fn admin(&self) -> &Arc<AdminSurface> {
        &self.admin
    }

    pub fn handler(&self) -> &Arc<ProductionCommandHandler> {
        &self.handler
    }
}
