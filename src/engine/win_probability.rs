//! In-play win probability for baseball.
//!
//! Key dynamics:
//!   - 9 innings, avg ~4.5 runs/game → every run has high marginal impact
//!   - late-inning leads are far more durable (fewer at-bats remain)
//!   - the base/out state carries real information: a tied game with the
//!     bases loaded and nobody out is not a coin flip
//!
//! Model: logistic on the effective run differential scaled by
//! √(innings remaining). The side at bat is credited with the expected
//! rest-of-inning runs for its base/out state, so "tied, bases loaded,
//! bottom 9" prices like a lead. A small home-field prior applies early
//! and fades as the game shortens. Output is clamped to [0.03, 0.97];
//! nothing is certain while the game is live.

use crate::engine::state::{BasesState, GameSnapshot};

/// Logistic coefficient. Calibrated so a 1-run lead in the 8th prices
/// around 80% and a 3-run lead in the 7th around 93%.
const MLB_K: f64 = 1.20;

/// Regulation innings.
const MLB_INNINGS: f64 = 9.0;

/// Home-field advantage in win-probability points at first pitch. MLB home
/// teams win ~54% of games; the edge decays as innings run out.
const HOME_ADVANTAGE: f64 = 0.03;

/// Expected runs scored in the remainder of a half-inning, league average.
/// Rows: base occupancy indexed by occupancy bits (first = bit 0).
/// Columns: outs 0 / 1 / 2.
const BASE_OUT_RUN_EXPECTANCY: [[f64; 3]; 8] = [
    // bases empty
    [0.48, 0.25, 0.10],
    // runner on first
    [0.86, 0.51, 0.22],
    // runner on second
    [1.10, 0.66, 0.32],
    // first and second
    [1.44, 0.88, 0.43],
    // runner on third
    [1.35, 0.95, 0.35],
    // first and third
    [1.78, 1.13, 0.48],
    // second and third
    [1.96, 1.38, 0.58],
    // bases loaded
    [2.29, 1.54, 0.75],
];

/// Expected additional runs for the batting team in the rest of this
/// half-inning, from the league-average run-expectancy matrix.
pub fn run_expectancy(bases: BasesState, outs: u8) -> f64 {
    let outs = outs.min(2) as usize;
    BASE_OUT_RUN_EXPECTANCY[base_out_index(bases)][outs]
}

fn base_out_index(bases: BasesState) -> usize {
    bases.first as usize | (bases.second as usize) << 1 | (bases.third as usize) << 2
}

/// P(home team wins) for the current snapshot. Missing context fields
/// default to a mid-game baseline (5th inning, scores 0, top of inning).
pub fn home_win_probability(snap: &GameSnapshot) -> f64 {
    home_win_probability_with_bonus(snap, 0.0)
}

/// P(batting team wins), with `bonus_runs` credited to the batting side on
/// top of its base/out expectancy. The trade planner prices an anticipated
/// play quality by passing the band's expected run value here.
pub fn batting_team_win_probability(snap: &GameSnapshot, bonus_runs: f64) -> f64 {
    let p_home = home_win_probability_with_bonus(snap, bonus_runs);
    if snap.is_top_of_inning.unwrap_or(true) {
        1.0 - p_home
    } else {
        p_home
    }
}

fn home_win_probability_with_bonus(snap: &GameSnapshot, bonus_runs: f64) -> f64 {
    let inning = (snap.inning.unwrap_or(5) as f64).clamp(1.0, 12.0);
    let innings_remaining = (MLB_INNINGS - inning).max(0.3);
    let is_top = snap.is_top_of_inning.unwrap_or(true);
    let home = snap.home_score.unwrap_or(0) as f64;
    let away = snap.away_score.unwrap_or(0) as f64;

    // Credit the side at bat with its expected rest-of-inning runs.
    let pending = run_expectancy(snap.bases, snap.outs) + bonus_runs;
    let diff = if is_top {
        home - (away + pending)
    } else {
        (home + pending) - away
    };

    let z = MLB_K * diff / innings_remaining.sqrt();
    let advantage = HOME_ADVANTAGE * (innings_remaining / MLB_INNINGS);
    (sigmoid(z) + advantage).clamp(0.03, 0.97)
}

/// Standard logistic sigmoid.
fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

// ── Tests ────────────────────────────────────────────────────────────────────
