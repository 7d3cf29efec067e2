//! Pure rating functions: team balancing and Elo delta computation
//!
//! The expectation uses the classic logistic Elo curve from the skillratings
//! crate; deltas are computed per team from the team-average ratings and
//! applied identically to every member of that team.

use crate::config::queue::TEAM_SIZE;
use crate::types::{ParticipantId, Team};
use skillratings::elo::{expected_score as elo_expected_score, EloRating};

/// Minimal participant view the balancer needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPlayer {
    pub id: ParticipantId,
    pub rating: i64,
}

/// Result of a balancing pass
#[derive(Debug, Clone)]
pub struct BalancedTeams {
    pub team_a: Vec<SeedPlayer>,
    pub team_b: Vec<SeedPlayer>,
    pub sum_a: i64,
    pub sum_b: i64,
}

impl BalancedTeams {
    pub fn diff(&self) -> i64 {
        (self.sum_a - self.sum_b).abs()
    }

    pub fn ids(&self, team: Team) -> Vec<ParticipantId> {
        let side = match team {
            Team::A => &self.team_a,
            Team::B => &self.team_b,
        };
        side.iter().map(|p| p.id.clone()).collect()
    }
}

/// Per-team rating adjustments for one match outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamDeltas {
    pub delta_a: i64,
    pub delta_b: i64,
}

impl TeamDeltas {
    pub fn for_team(&self, team: Team) -> i64 {
        match team {
            Team::A => self.delta_a,
            Team::B => self.delta_b,
        }
    }
}

/// Greedily split players into two rating-balanced teams of up to
/// [`TEAM_SIZE`] each.
///
/// Players are sorted descending by rating (stable, so equal ratings keep
/// their input order) and each is assigned to whichever team currently has
/// the lower cumulative rating; once a team is full the rest go to the other.
/// A heuristic rather than a global optimum, but deterministic for identical
/// input order.
pub fn balance_teams(players: &[SeedPlayer]) -> BalancedTeams {
    let mut sorted = players.to_vec();
    sorted.sort_by(|a, b| b.rating.cmp(&a.rating));

    let mut team_a = Vec::with_capacity(TEAM_SIZE);
    let mut team_b = Vec::with_capacity(TEAM_SIZE);
    let mut sum_a = 0i64;
    let mut sum_b = 0i64;

    for player in sorted {
        if team_a.len() < TEAM_SIZE && (sum_a <= sum_b || team_b.len() >= TEAM_SIZE) {
            sum_a += player.rating;
            team_a.push(player);
        } else {
            sum_b += player.rating;
            team_b.push(player);
        }
    }

    BalancedTeams {
        team_a,
        team_b,
        sum_a,
        sum_b,
    }
}

/// Expected score of team A against team B given average ratings,
/// `1 / (1 + 10^((avg_b - avg_a) / 400))`
pub fn expected_score(avg_a: i64, avg_b: i64) -> f64 {
    let (expected_a, _expected_b) = elo_expected_score(
        &EloRating {
            rating: avg_a as f64,
        },
        &EloRating {
            rating: avg_b as f64,
        },
    );
    expected_a
}

/// Compute the per-team rating deltas for an outcome.
///
/// `winner = None` models a draw (0.5 each); the modeled protocols never
/// produce one, but the formula supports it.
pub fn compute_deltas(avg_a: i64, avg_b: i64, winner: Option<Team>, k: f64) -> TeamDeltas {
    let expected_a = expected_score(avg_a, avg_b);
    let expected_b = 1.0 - expected_a;

    let (score_a, score_b) = match winner {
        Some(Team::A) => (1.0, 0.0),
        Some(Team::B) => (0.0, 1.0),
        None => (0.5, 0.5),
    };

    TeamDeltas {
        delta_a: (k * (score_a - expected_a)).round() as i64,
        delta_b: (k * (score_b - expected_b)).round() as i64,
    }
}
