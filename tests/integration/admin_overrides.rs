//! Admin surface: permissions, settings, fill and clear

use crate::fixtures::create_test_system;
use scrim_room::error::ScrimError;
use scrim_room::store::MatchStore;
use scrim_room::types::{Actor, CaptainMode, MatchStatus, Team};

#[tokio::test]
async fn test_admin_actions_require_permission() {
    let system = create_test_system().await;
    let nobody = Actor::participant("user");

    let err = system.admin.cancel(&nobody, 1).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScrimError>(),
        Some(ScrimError::PermissionDenied { .. })
    ));

    // Permission is checked before the match lookup, so no state is touched
    assert!(system.store.match_record(1).await.unwrap().is_none());

    // A configured allow-list grants the action by role
    system
        .store
        .set_roles_for_action("match_cancel", vec!["referee".to_string()])
        .await
        .unwrap();
    let mut referee = Actor::participant("ref1");
    referee.roles.push("referee".to_string());
    let err = system.admin.cancel(&referee, 1).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScrimError>(),
        Some(ScrimError::MatchNotFound { .. })
    ));

    system.shutdown();
}

#[tokio::test]
async fn test_force_win_closes_running_match() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    system.queue_ten().await;
    let match_id = system.confirm_all().await;
    system.run_veto(match_id).await;

    // Still in the vote phase; force-win closes it
    system
        .admin
        .force_win(&admin, match_id, Team::B)
        .await
        .unwrap();

    let record = system.store.match_record(match_id).await.unwrap().unwrap();
    assert_eq!(record.status, MatchStatus::Closed);
    assert_eq!(record.winner, Some(Team::B));

    // Forcing again on a closed match is rejected
    let err = system
        .admin
        .force_win(&admin, match_id, Team::A)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScrimError>(),
        Some(ScrimError::InvalidState { .. })
    ));

    system.shutdown();
}

#[tokio::test]
async fn test_set_captain_validates_membership() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    system.queue_ten().await;
    let match_id = system.confirm_all().await;
    let state = system.store.veto_state(match_id).await.unwrap().unwrap();

    // A team B member cannot captain team A
    let err = system
        .admin
        .set_captain(&admin, match_id, Team::A, &state.team_b[0])
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScrimError>(),
        Some(ScrimError::PlayerNotFound { .. })
    ));

    // Swapping to a proper member updates the veto state and the recap
    let replacement = state
        .team_a
        .iter()
        .find(|id| **id != state.captain_a)
        .unwrap()
        .clone();
    system
        .admin
        .set_captain(&admin, match_id, Team::A, &replacement)
        .await
        .unwrap();
    let updated = system.store.veto_state(match_id).await.unwrap().unwrap();
    assert_eq!(updated.captain_a, replacement);
    assert!(system.gateway.count("match_recap") >= 2);

    // The new captain bans; the old one no longer may
    let err = system
        .lifecycle
        .veto()
        .clone()
        .ban(match_id, &state.captain_a, &updated.remaining[0])
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScrimError>(),
        Some(ScrimError::NotYourTurn { .. })
    ));
    system
        .lifecycle
        .veto()
        .clone()
        .ban(match_id, &replacement, &updated.remaining[0])
        .await
        .unwrap();

    system.shutdown();
}

#[tokio::test]
async fn test_configure_veto_partial_updates() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    // No parameters is rejected
    assert!(system
        .admin
        .configure_veto(&admin, None, None, None)
        .await
        .is_err());

    let settings = system
        .admin
        .configure_veto(
            &admin,
            Some(CaptainMode::Highest),
            Some(vec!["Alpha".to_string(), "Beta".to_string(), "Gamma".to_string()]),
            None,
        )
        .await
        .unwrap();
    assert_eq!(settings.captain_mode, CaptainMode::Highest);
    assert_eq!(settings.maps.len(), 3);

    // An explicitly empty pool restores the defaults, other fields stay
    let settings = system
        .admin
        .configure_veto(&admin, None, Some(vec![]), None)
        .await
        .unwrap();
    assert_eq!(settings.captain_mode, CaptainMode::Highest);
    assert_eq!(settings.maps.len(), 10);

    system.shutdown();
}

#[tokio::test]
async fn test_small_map_pool_runs_shorter_veto() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    system
        .admin
        .configure_veto(
            &admin,
            None,
            Some(vec![
                "Alpha".to_string(),
                "Beta".to_string(),
                "Gamma".to_string(),
            ]),
            None,
        )
        .await
        .unwrap();

    system.queue_ten().await;
    let match_id = system.confirm_all().await;
    system.run_veto(match_id).await;

    let state = system.store.veto_state(match_id).await.unwrap().unwrap();
    // N-1 bans for a pool of N
    assert_eq!(state.all_maps.len(), 3);
    assert_eq!(state.remaining.len(), 1);
    assert!(state.picked.is_some());

    system.shutdown();
}

#[tokio::test]
async fn test_highest_captain_mode_picks_top_rating() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    system
        .admin
        .configure_veto(&admin, Some(CaptainMode::Highest), None, None)
        .await
        .unwrap();

    // Give one player a distinctly high rating before the match forms
    for i in 1..=10 {
        system.queue.join(&format!("p{}", i)).await.unwrap();
    }
    let match_id = {
        // Boost p1 between check start and confirmation; captains are
        // computed at match start from current ratings
        system.store.apply_rating_change("p1", 500, 0).await.unwrap();
        system.confirm_all().await
    };

    let state = system.store.veto_state(match_id).await.unwrap().unwrap();
    let p1_team = state.team_of("p1").expect("p1 plays");
    assert_eq!(state.captain_of(p1_team), "p1");

    system.shutdown();
}

#[tokio::test]
async fn test_disabling_ready_check_aborts_pending() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    system.queue_ten().await;
    assert!(system.store.pending_ready_check().await.unwrap().is_some());

    // Disabling stops the pending check and starts the match directly from
    // the full queue
    system
        .admin
        .configure_queue(&admin, Some(false), None)
        .await
        .unwrap();

    assert!(system.store.pending_ready_check().await.unwrap().is_none());
    assert_eq!(system.store.all_matches().await.unwrap().len(), 1);
    // Nobody was evicted by the admin abort
    assert!(system.store.cancellation_totals().await.unwrap().is_empty());

    system.shutdown();
}

#[tokio::test]
async fn test_configure_queue_validates_window() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    assert!(system
        .admin
        .configure_queue(&admin, None, Some(5))
        .await
        .is_err());
    assert!(system
        .admin
        .configure_queue(&admin, None, Some(1000))
        .await
        .is_err());

    let settings = system
        .admin
        .configure_queue(&admin, None, Some(120))
        .await
        .unwrap();
    assert_eq!(settings.ready_seconds, 120);
    assert!(settings.ready_enabled);

    system.shutdown();
}

#[tokio::test]
async fn test_fill_with_auto_confirm_starts_match() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    let added = system.admin.fill(&admin, 10, true).await.unwrap();
    assert_eq!(added, 10);

    // Synthetics were not prompted out-of-band
    assert!(system.gateway.ready_prompts().is_empty());

    // The check auto-completed and a match started
    let matches = system.store.all_matches().await.unwrap();
    assert_eq!(matches.len(), 1);
    let players = system
        .store
        .match_participants(matches[0].match_id)
        .await
        .unwrap();
    assert_eq!(players.len(), 10);
    assert!(players.iter().all(|p| p.participant_id.starts_with("s_")));

    system.shutdown();
}

#[tokio::test]
async fn test_fill_mixed_with_humans_waits_for_them() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    system.queue.join("human1").await.unwrap();
    system.queue.join("human2").await.unwrap();
    system.admin.fill(&admin, 8, true).await.unwrap();

    // Synthetics confirmed, humans still pending
    let check = system
        .store
        .pending_ready_check()
        .await
        .unwrap()
        .expect("check still pending on humans");
    assert_eq!(check.confirmed_ids.len(), 8);

    // Humans confirm and the match starts
    system.ready.confirm(&check.rc_id, "human1").await.unwrap();
    system.ready.confirm(&check.rc_id, "human2").await.unwrap();
    assert_eq!(system.store.all_matches().await.unwrap().len(), 1);

    system.shutdown();
}

#[tokio::test]
async fn test_fill_continues_synthetic_sequence() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    system.admin.fill(&admin, 3, false).await.unwrap();
    system.admin.fill(&admin, 2, false).await.unwrap();

    let mut synthetic_ids: Vec<String> = system
        .store
        .queue_entries()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.participant_id)
        .collect();
    synthetic_ids.sort();
    assert_eq!(synthetic_ids, vec!["s_1", "s_2", "s_3", "s_4", "s_5"]);

    system.shutdown();
}

#[tokio::test]
async fn test_clear_queue_drops_entries_and_check() {
    let system = create_test_system().await;
    let admin = Actor::admin("mod");

    system.queue_ten().await;
    assert!(system.store.pending_ready_check().await.unwrap().is_some());

    let removed = system.admin.clear_queue(&admin).await.unwrap();
    assert_eq!(removed, 10);
    assert_eq!(system.store.queue_len().await.unwrap(), 0);
    assert!(system.store.pending_ready_check().await.unwrap().is_none());

    system.shutdown();
}
