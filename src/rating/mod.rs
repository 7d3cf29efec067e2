//! Rating system for the scrim service
//!
//! Team balancing, Elo expectation and per-team delta computation. Everything
//! in here is pure and deterministic; callers validate inputs (non-empty
//! teams) before calling in.

pub mod engine;

pub use engine::{balance_teams, compute_deltas, expected_score, BalancedTeams, SeedPlayer, TeamDeltas};
