//! Performance benchmarks for rating calculations

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scrim_room::rating::{balance_teams, compute_deltas, expected_score, SeedPlayer};
use scrim_room::types::Team;

fn make_players(count: usize) -> Vec<SeedPlayer> {
    (0..count)
        .map(|i| SeedPlayer {
            id: format!("player{}", i),
            // Deterministic spread of ratings around the baseline
            rating: 1000 + ((i as i64 * 137) % 800) - 400,
        })
        .collect()
}

fn bench_balance_teams(c: &mut Criterion) {
    let ten = make_players(10);

    c.bench_function("balance_teams_10", |b| {
        b.iter(|| balance_teams(black_box(&ten)))
    });
}

fn bench_expected_score(c: &mut Criterion) {
    c.bench_function("expected_score", |b| {
        b.iter(|| expected_score(black_box(1123), black_box(987)))
    });
}

fn bench_compute_deltas(c: &mut Criterion) {
    c.bench_function("compute_deltas", |b| {
        b.iter(|| compute_deltas(black_box(1123), black_box(987), Some(Team::A), 24.0))
    });
}

fn bench_full_match_rating_pass(c: &mut Criterion) {
    let ten = make_players(10);

    c.bench_function("balance_and_deltas", |b| {
        b.iter(|| {
            let teams = balance_teams(black_box(&ten));
            let avg_a = teams.sum_a / teams.team_a.len() as i64;
            let avg_b = teams.sum_b / teams.team_b.len() as i64;
            compute_deltas(avg_a, avg_b, Some(Team::A), 24.0)
        })
    });
}

criterion_group!(
    benches,
    bench_balance_teams,
    bench_expected_score,
    bench_compute_deltas,
    bench_full_match_rating_pass
);
criterion_main!(benches);
