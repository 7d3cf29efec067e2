//! In-process match lifecycle simulator
//!
//! Drives a complete synthetic match against the in-memory store and the
//! logging gateway: fill the queue, auto-confirm the ready check, play the
//! veto out by captain bans, cast the captain votes and print the resulting
//! leaderboard. Useful for eyeballing the whole state machine without a
//! broker or platform gateway.

use anyhow::Result;
use clap::Parser;
use scrim_room::admin::AdminSurface;
use scrim_room::boards::Boards;
use scrim_room::config::{QueueSettings, RatingConfig, VetoSettings};
use scrim_room::gateway::{
    Authorizer, LoggingGateway, NullEventPublisher, StoreRoleAuthorizer,
};
use scrim_room::lifecycle::{MatchLifecycle, VetoCoordinator};
use scrim_room::metrics::MetricsCollector;
use scrim_room::queue::{QueueManager, ReadyCheckCoordinator};
use scrim_room::store::{InMemoryMatchStore, MatchStore};
use scrim_room::types::{Actor, MatchStatus, Team};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::info;

/// Scrim Room match simulator
#[derive(Parser)]
#[command(name = "match-sim", version, about = "Simulate one full match lifecycle")]
struct Args {
    /// Let every veto turn time out instead of banning as the captain
    #[arg(long, help = "Exercise the auto-ban path instead of manual bans")]
    auto_ban: bool,

    /// Team the captains agree on
    #[arg(long, default_value = "a", help = "Winning team (a or b)")]
    winner: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let winner = if args.winner.eq_ignore_ascii_case("b") {
        Team::B
    } else {
        Team::A
    };

    let store: Arc<dyn MatchStore> = Arc::new(InMemoryMatchStore::new());
    let gateway = Arc::new(LoggingGateway);
    let publisher = Arc::new(NullEventPublisher);
    let metrics = Arc::new(MetricsCollector::new()?);
    let rating_config = RatingConfig::default();

    // Short windows so the simulation is quick even on the auto-ban path
    store
        .set_queue_settings(QueueSettings {
            ready_enabled: true,
            ready_seconds: 10,
        })
        .await?;
    store
        .set_veto_settings(VetoSettings {
            turn_seconds: if args.auto_ban { 1 } else { 30 },
            ..VetoSettings::default()
        })
        .await?;

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

    let operator = Actor::admin("sim-operator");

    info!("Filling the queue with ten synthetic participants...");
    admin.fill(&operator, 10, true).await?;

    // The auto-confirmed ready check starts the match synchronously
    let record = store
        .all_matches()
        .await?
        .into_iter()
        .next()
        .expect("fill should have started a match");
    let match_id = record.match_id;
    info!("Match {} started", match_id);

    if args.auto_ban {
        info!("Waiting for the veto to play itself out...");
        loop {
            sleep(Duration::from_millis(200)).await;
            let state = store.veto_state(match_id).await?.expect("veto state");
            if state.picked.is_some() {
                break;
            }
        }
    } else {
        loop {
            let state = store.veto_state(match_id).await?.expect("veto state");
            let (current, captain) = match state.current_team {
                Some(team) => (team, state.captain_of(team).clone()),
                None => break,
            };
            let map = state.remaining[0].clone();
            info!("Captain of team {} bans '{}'", current, map);
            lifecycle
                .veto()
                .clone()
                .ban(match_id, &captain, &map)
                .await?;
        }
    }

    let state = store.veto_state(match_id).await?.expect("veto state");
    info!("Map picked: {}", state.picked.as_deref().unwrap_or("?"));

    info!("Captains vote for team {}...", winner);
    let captain_a = state.captain_a.clone();
    let captain_b = state.captain_b.clone();
    lifecycle
        .cast_captain_vote(match_id, &captain_a, winner)
        .await?;
    lifecycle
        .cast_captain_vote(match_id, &captain_b, winner)
        .await?;

    let record = store.match_record(match_id).await?.expect("match record");
    assert_eq!(record.status, MatchStatus::Closed);
    info!(
        "Match {} closed, winner: team {}",
        match_id,
        record.winner.expect("winner set")
    );

    let mut participants = store.all_participants().await?;
    participants.sort_by(|a, b| b.rating.cmp(&a.rating).then_with(|| a.id.cmp(&b.id)));
    info!("Final ratings:");
    for p in participants {
        info!("  {:>6}  {} ({} games)", p.rating, p.id, p.games_played);
    }

    ready.shutdown();
    lifecycle.veto().shutdown();
    Ok(())
}
