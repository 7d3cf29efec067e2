//! Lifecycle edge cases: cancellation guards, reversal semantics, timers

use crate::fixtures::create_test_system;
use scrim_room::config::VetoSettings;
use scrim_room::error::ScrimError;
use scrim_room::store::MatchStore;
use scrim_room::types::{Actor, MatchStatus, Team};
use tokio::time::{sleep, Duration};

#[tokio::test]
async fn test_cancel_rejected_during_veto() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    system.queue_ten().await;
    let match_id = system.confirm_all().await;

    // Veto just started with ten maps left
    let err = system.admin.cancel(&admin, match_id).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScrimError>(),
        Some(ScrimError::VetoInProgress { .. })
    ));

    // Force-win is blocked by the same guard
    let err = system
        .admin
        .force_win(&admin, match_id, Team::A)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScrimError>(),
        Some(ScrimError::VetoInProgress { .. })
    ));

    // After the veto finishes (one map left), cancel succeeds
    system.run_veto(match_id).await;
    system.admin.cancel(&admin, match_id).await.unwrap();

    let record = system.store.match_record(match_id).await.unwrap().unwrap();
    assert_eq!(record.status, MatchStatus::Abandoned);
    assert!(record.canceled_at.is_some());
    assert_eq!(system.gateway.count("components_disabled"), 1);
    assert_eq!(system.gateway.count("archive_space"), 1);
    assert_eq!(system.gateway.count("destroy_voice"), 1);

    // No rating effect on an abandoned match
    let p1 = system.store.participant("p1").await.unwrap().unwrap();
    assert_eq!(p1.rating, 1000);
    assert_eq!(p1.games_played, 0);

    // A second cancel is rejected
    let err = system.admin.cancel(&admin, match_id).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScrimError>(),
        Some(ScrimError::InvalidState { .. })
    ));

    system.shutdown();
}

#[tokio::test]
async fn test_finalize_is_idempotent() {
    let system = create_test_system().await;

    system.queue_ten().await;
    let match_id = system.confirm_all().await;
    system.run_veto(match_id).await;
    system.captains_agree(match_id, Team::A).await;

    // A duplicate finalization is a benign no-op
    assert!(!system.lifecycle.finalize(match_id, Team::B).await.unwrap());

    let record = system.store.match_record(match_id).await.unwrap().unwrap();
    assert_eq!(record.winner, Some(Team::A));
    let p1 = system.store.participant("p1").await.unwrap().unwrap();
    assert_eq!(p1.games_played, 1);

    system.shutdown();
}

#[tokio::test]
async fn test_reverse_restores_ratings_once() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    system.queue_ten().await;
    let match_id = system.confirm_all().await;
    system.run_veto(match_id).await;
    system.captains_agree(match_id, Team::A).await;

    system.admin.reverse(&admin, match_id).await.unwrap();

    let record = system.store.match_record(match_id).await.unwrap().unwrap();
    assert_eq!(record.status, MatchStatus::Reversed);
    assert_eq!(record.winner, None);
    assert_eq!(record.previous_winner, Some(Team::A));

    // Everyone is back at baseline with the game un-counted
    for row in system.store.match_participants(match_id).await.unwrap() {
        let p = system
            .store
            .participant(&row.participant_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(p.rating, 1000);
        assert_eq!(p.games_played, 0);
    }

    // The ledger is marked, not deleted
    assert!(system
        .store
        .active_history_for_match(match_id)
        .await
        .unwrap()
        .is_empty());

    // Reversing twice only debits once
    let err = system.admin.reverse(&admin, match_id).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScrimError>(),
        Some(ScrimError::AlreadyReversed { .. })
    ));
    let p1 = system.store.participant("p1").await.unwrap().unwrap();
    assert_eq!(p1.rating, 1000);

    system.shutdown();
}

#[tokio::test]
async fn test_reverse_requires_closed_match() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    system.queue_ten().await;
    let match_id = system.confirm_all().await;

    let err = system.admin.reverse(&admin, match_id).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScrimError>(),
        Some(ScrimError::InvalidState { .. })
    ));

    system.shutdown();
}

#[tokio::test]
async fn test_set_winner_swaps_deltas() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    system.queue_ten().await;
    let match_id = system.confirm_all().await;
    system.run_veto(match_id).await;
    system.captains_agree(match_id, Team::A).await;

    system
        .admin
        .set_winner(&admin, match_id, Team::B)
        .await
        .unwrap();

    let record = system.store.match_record(match_id).await.unwrap().unwrap();
    assert_eq!(record.status, MatchStatus::Closed);
    assert_eq!(record.winner, Some(Team::B));
    assert_eq!(record.winner_set_by.as_deref(), Some("mod"));

    // Deltas now favor team B, computed from baseline averages again
    for row in system.store.match_participants(match_id).await.unwrap() {
        let p = system
            .store
            .participant(&row.participant_id)
            .await
            .unwrap()
            .unwrap();
        let expected = match row.team {
            Team::A => 988,
            Team::B => 1012,
        };
        assert_eq!(p.rating, expected);
        assert_eq!(p.games_played, 1);
    }

    system.shutdown();
}

#[tokio::test]
async fn test_reverse_then_finalize_same_winner_round_trips() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    system.queue_ten().await;
    let match_id = system.confirm_all().await;
    system.run_veto(match_id).await;
    system.captains_agree(match_id, Team::A).await;

    // set_winner with the same winner = reverse + finalize; ratings match
    // the never-reversed outcome
    system
        .admin
        .set_winner(&admin, match_id, Team::A)
        .await
        .unwrap();

    for row in system.store.match_participants(match_id).await.unwrap() {
        let p = system
            .store
            .participant(&row.participant_id)
            .await
            .unwrap()
            .unwrap();
        let expected = match row.team {
            Team::A => 1012,
            Team::B => 988,
        };
        assert_eq!(p.rating, expected);
        assert_eq!(p.games_played, 1);
    }

    system.shutdown();
}

#[tokio::test]
async fn test_freed_participants_can_requeue_after_close() {
    let system = create_test_system().await;

    system.queue_ten().await;
    let match_id = system.confirm_all().await;
    system.run_veto(match_id).await;
    system.captains_agree(match_id, Team::A).await;

    // Terminal match no longer blocks the queue
    system.queue.join("p1").await.unwrap();
    assert!(system.store.is_queued("p1").await.unwrap());

    system.shutdown();
}

#[tokio::test]
async fn test_expired_turns_auto_ban_until_one_map_remains() {
    let system = create_test_system().await;

    // One-second turns over a three-map pool: the whole veto should play
    // itself out through auto-bans
    system
        .store
        .set_veto_settings(VetoSettings {
            maps: vec!["Alpha".to_string(), "Beta".to_string(), "Gamma".to_string()],
            turn_seconds: 1,
            ..VetoSettings::default()
        })
        .await
        .unwrap();

    system.queue_ten().await;
    let match_id = system.confirm_all().await;

    let mut picked = None;
    for _ in 0..100 {
        sleep(Duration::from_millis(200)).await;
        let state = system.store.veto_state(match_id).await.unwrap().unwrap();
        if state.picked.is_some() {
            picked = state.picked.clone();
            break;
        }
    }

    let state = system.store.veto_state(match_id).await.unwrap().unwrap();
    assert!(picked.is_some(), "auto-bans should finish the veto");
    assert_eq!(state.remaining.len(), 1);
    assert_eq!(state.current_team, None);
    // Exactly one ban per expired turn, never a pass
    assert_eq!(state.all_maps.len() - state.remaining.len(), 2);
    // The veto end opened the captain vote
    assert!(system.gateway.count("vote_prompt") >= 1);

    system.shutdown();
}

#[tokio::test]
async fn test_stale_ready_timer_is_noop_after_completion() {
    let system = create_test_system().await;

    system.queue_ten().await;
    let check = system.store.pending_ready_check().await.unwrap().unwrap();
    let match_id = system.confirm_all().await;

    // A late deadline fire must not evict anyone or disturb the match
    system
        .ready
        .clone()
        .handle_timeout(check.rc_id.clone())
        .await
        .unwrap();

    assert_eq!(
        system.store.match_participants(match_id).await.unwrap().len(),
        10
    );
    assert!(system.store.cancellation_totals().await.unwrap().is_empty());

    system.shutdown();
}
