//! Display payloads
//!
//! Pure functions from entity state to the payloads the presentation
//! collaborator renders. Nothing in here touches the store or the platform.

use crate::config::queue::MATCH_SIZE;
use crate::config::QueueSettings;
use crate::types::{
    MatchId, MatchParticipant, MatchRecord, MatchStatus, Participant, ParticipantId, QueueEntry,
    ReadyCheck, Team, VetoState,
};
use crate::store::WinStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Queue panel payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueView {
    pub count: usize,
    pub needed: usize,
    pub ready_check_enabled: bool,
    /// First ten waiting participants in join order
    pub preview: Vec<ParticipantId>,
}

pub fn queue_view(entries: &[QueueEntry], settings: &QueueSettings) -> QueueView {
    QueueView {
        count: entries.len(),
        needed: MATCH_SIZE,
        ready_check_enabled: settings.ready_enabled,
        preview: entries
            .iter()
            .take(MATCH_SIZE)
            .map(|e| e.participant_id.clone())
            .collect(),
    }
}

/// Ready-check status payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyCheckView {
    pub rc_id: String,
    pub confirmed: usize,
    pub total: usize,
    pub seconds_left: i64,
    /// (participant, has confirmed) in snapshot order
    pub members: Vec<(ParticipantId, bool)>,
}

pub fn ready_check_view(check: &ReadyCheck, now: DateTime<Utc>) -> ReadyCheckView {
    let seconds_left = (check.deadline - now).num_seconds().max(0);
    ReadyCheckView {
        rc_id: check.rc_id.clone(),
        confirmed: check.confirmed_ids.len(),
        total: check.participant_ids.len(),
        seconds_left,
        members: check
            .participant_ids
            .iter()
            .map(|id| (id.clone(), check.confirmed_ids.contains(id)))
            .collect(),
    }
}

/// Veto board payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VetoView {
    pub match_id: MatchId,
    pub captain_a: ParticipantId,
    pub captain_b: ParticipantId,
    pub current_team: Option<Team>,
    pub current_captain: Option<ParticipantId>,
    pub seconds_left: i64,
    /// (map, still available) in pool order
    pub maps: Vec<(String, bool)>,
    pub picked: Option<String>,
}

pub fn veto_view(state: &VetoState, now: DateTime<Utc>) -> VetoView {
    let seconds_left = state
        .turn_ends_at
        .map(|ends| (ends - now).num_seconds().max(0))
        .unwrap_or(0);
    VetoView {
        match_id: state.match_id,
        captain_a: state.captain_a.clone(),
        captain_b: state.captain_b.clone(),
        current_team: state.current_team,
        current_captain: state
            .current_team
            .map(|team| state.captain_of(team).clone()),
        seconds_left,
        maps: state
            .all_maps
            .iter()
            .map(|m| (m.clone(), state.remaining.contains(m)))
            .collect(),
        picked: state.picked.clone(),
    }
}

/// Teams-and-captains recap payload, posted once at match start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecapView {
    pub match_id: MatchId,
    pub team_a: Vec<ParticipantId>,
    pub team_b: Vec<ParticipantId>,
    pub captain_a: ParticipantId,
    pub captain_b: ParticipantId,
}

/// Captain-vote prompt payload, posted once the map is picked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotePromptView {
    pub match_id: MatchId,
    pub picked_map: String,
    pub captain_a: ParticipantId,
    pub captain_b: ParticipantId,
}

/// Admin-review prompt payload, posted on captain disagreement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewView {
    pub match_id: MatchId,
    pub vote_a: Team,
    pub vote_b: Team,
}

/// Result announcement payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResultView {
    pub match_id: MatchId,
    pub winner: Team,
    pub team_a: Vec<ParticipantId>,
    pub team_b: Vec<ParticipantId>,
    pub delta_a: i64,
    pub delta_b: i64,
}

/// One leaderboard line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub participant_id: ParticipantId,
    pub rating: i64,
    pub games: i64,
    pub wins: i64,
    /// Win rate in whole percent
    pub win_rate: i64,
}

/// Leaderboard payload, ordered by rating then win rate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardView {
    pub rows: Vec<LeaderboardRow>,
}

pub fn leaderboard_view(
    participants: &[Participant],
    stats: &HashMap<ParticipantId, WinStats>,
) -> LeaderboardView {
    let mut rows: Vec<LeaderboardRow> = participants
        .iter()
        .map(|p| {
            let s = stats.get(&p.id).copied().unwrap_or_default();
            let win_rate = if s.games > 0 {
                ((s.wins as f64 / s.games as f64) * 100.0).round() as i64
            } else {
                0
            };
            LeaderboardRow {
                participant_id: p.id.clone(),
                rating: p.rating,
                games: s.games,
                wins: s.wins,
                win_rate,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.rating
            .cmp(&a.rating)
            .then_with(|| b.win_rate.cmp(&a.win_rate))
            .then_with(|| a.participant_id.cmp(&b.participant_id))
    });
    LeaderboardView { rows }
}

/// Match-history entry payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchHistoryView {
    pub match_id: MatchId,
    pub status_label: String,
    pub winner: Option<Team>,
    pub picked_map: Option<String>,
    pub captain_a: Option<ParticipantId>,
    pub captain_b: Option<ParticipantId>,
    pub team_a: Vec<ParticipantId>,
    pub team_b: Vec<ParticipantId>,
    pub created_at: DateTime<Utc>,
}

pub fn status_label(status: MatchStatus) -> &'static str {
    match status {
        MatchStatus::Voting => "In progress",
        MatchStatus::Review => "Admin review",
        MatchStatus::Closed => "Finished",
        MatchStatus::Abandoned => "Abandoned",
        MatchStatus::Reversed => "Reversed",
    }
}

pub fn match_history_view(
    record: &MatchRecord,
    players: &[MatchParticipant],
    veto: Option<&VetoState>,
) -> MatchHistoryView {
    let side = |team: Team| -> Vec<ParticipantId> {
        players
            .iter()
            .filter(|p| p.team == team)
            .map(|p| p.participant_id.clone())
            .collect()
    };
    MatchHistoryView {
        match_id: record.match_id,
        status_label: status_label(record.status).to_string(),
        winner: record.winner,
        picked_map: veto
            .and_then(|v| v.picked.clone())
            .or_else(|| record.picked_map.clone()),
        captain_a: veto.map(|v| v.captain_a.clone()),
        captain_b: veto.map(|v| v.captain_b.clone()),
        team_a: side(Team::A),
        team_b: side(Team::B),
        created_at: record.created_at,
    }
}

/// Missed-ready-check board payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationBoardView {
    /// (participant, missed count), descending
    pub rows: Vec<(ParticipantId, i64)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::current_timestamp;

    fn participant(id: &str, rating: i64) -> Participant {
        let now = current_timestamp();
        Participant {
            id: id.to_string(),
            rating,
            games_played: 0,
            banned: false,
            synthetic: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_leaderboard_orders_by_rating_then_win_rate() {
        let participants = vec![
            participant("low", 900),
            participant("high", 1100),
            participant("mid_wins", 1000),
            participant("mid_losses", 1000),
        ];
        let mut stats = HashMap::new();
        stats.insert("mid_wins".to_string(), WinStats { games: 4, wins: 4 });
        stats.insert("mid_losses".to_string(), WinStats { games: 4, wins: 0 });

        let view = leaderboard_view(&participants, &stats);
        let order: Vec<&str> = view
            .rows
            .iter()
            .map(|r| r.participant_id.as_str())
            .collect();
        assert_eq!(order, vec!["high", "mid_wins", "mid_losses", "low"]);
        assert_eq!(view.rows[1].win_rate, 100);
    }

    #[test]
    fn test_ready_check_view_counts_and_countdown() {
        let now = current_timestamp();
        let check = ReadyCheck {
            rc_id: "rc".into(),
            status: crate::types::ReadyCheckStatus::Pending,
            participant_ids: vec!["p1".into(), "p2".into()],
            confirmed_ids: vec!["p2".into()],
            created_at: now,
            deadline: now + chrono::Duration::seconds(45),
        };
        let view = ready_check_view(&check, now);
        assert_eq!(view.confirmed, 1);
        assert_eq!(view.total, 2);
        assert_eq!(view.seconds_left, 45);
        assert_eq!(view.members[0], ("p1".to_string(), false));
        assert_eq!(view.members[1], ("p2".to_string(), true));
    }

    #[test]
    fn test_veto_view_marks_banned_maps() {
        let now = current_timestamp();
        let state = VetoState {
            match_id: 7,
            team_a: vec!["a".into()],
            team_b: vec!["b".into()],
            captain_a: "a".into(),
            captain_b: "b".into(),
            all_maps: vec!["m1".into(), "m2".into(), "m3".into()],
            remaining: vec!["m2".into()],
            current_team: None,
            turn_ends_at: None,
            picked: Some("m2".into()),
            created_at: now,
            updated_at: now,
        };
        let view = veto_view(&state, now);
        assert_eq!(view.maps[0], ("m1".to_string(), false));
        assert_eq!(view.maps[1], ("m2".to_string(), true));
        assert_eq!(view.picked.as_deref(), Some("m2"));
        assert_eq!(view.current_captain, None);
    }
}
