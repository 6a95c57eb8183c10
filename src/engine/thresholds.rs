//! Quality-band threshold derivation.
//!
//! Five ordered bands (very-bad … very-good) classify how favorable a play
//! outcome is for the batting team. The band boundaries are **state
//! dependent**: a groundout with the bases empty is routine, but the same
//! groundout with the bases loaded and one out is a rally killer. So the
//! boundaries are derived fresh from the outcome subset of each
//! (bases, outs) state, never from a global scale.
//!
//! Boundary anchors, in band order:
//! - very-bad tops out at the best out-making, non-scoring outcome
//! - bad starts just above the best double play (outs are bad, twice the
//!   outs are worse)
//! - neutral spans the single-out range up to the best clean no-out play
//! - good spans run-scoring and base-gaining plays, excluding the
//!   extra-base fireworks
//! - very-good is reserved for no-out scoring plays and clean triples
//!
//! With two outs the very-bad/bad distinction collapses: any out ends the
//! inning, so "one out" and "rally-killing outs" are the same event.

use serde::Serialize;

use crate::engine::outcomes::{OutcomeTable, PlayOutcome};
use crate::engine::state::BasesState;

/// Offset added above the best double-play value so the bad band starts
/// strictly above every double play.
const DOUBLE_PLAY_MARGIN: f64 = 0.001;

/// goodMin default when the state has no zero-out outcome at all.
const GOOD_MIN_DEFAULT: f64 = -0.5;

/// Derived band boundaries for one (bases, outs) state.
///
/// The percentile markers are diagnostics for dataset inspection; banding
/// never reads them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdSet {
    pub max_out_no_run: f64,
    pub bad_min: f64,
    pub max_one_out_no_run: f64,
    pub min_one_out_no_run: f64,
    pub max_no_outs_no_runs: f64,
    pub good_min: f64,
    pub good_max: f64,
    pub very_good_min: f64,
    pub very_good_max: f64,
    pub p25: f64,
    pub p40: f64,
    pub p75: f64,
    pub p90: f64,
}

/// Threshold set plus the formatted band ranges the frontend displays.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityRanges {
    pub very_bad: String,
    pub bad: String,
    pub neutral: String,
    pub good: String,
    pub very_good: String,
    pub thresholds: ThresholdSet,
}

// ── Threshold derivation ─────────────────────────────────────────────────────

/// Derive the band boundaries for a (bases, outs) state.
///
/// Returns `None` when the table has no outcomes for the state. That is a
/// normal condition (sparse historical data), not an error.
pub fn compute_thresholds(
    table: &OutcomeTable,
    bases: BasesState,
    outs: u8,
) -> Option<ThresholdSet> {
    let all = table.outcomes_for(bases, outs);
    if all.is_empty() {
        return None;
    }

    let max_out_no_run =
        max_norm(all, |o| o.outs_gained > 0 && o.runs_scored == 0).unwrap_or(-1.0);

    let one_out_no_run = |o: &PlayOutcome| o.outs_gained == 1 && o.runs_scored == 0;
    let mut max_one_out_no_run = max_norm(all, one_out_no_run).unwrap_or(-1.0);
    let min_one_out_no_run = min_norm(all, one_out_no_run).unwrap_or(-1.0);

    // Absence of double plays must stay distinct from a double play that
    // happens to rate -1, hence the Option.
    let max_double_play = max_norm(all, |o| o.outs_gained >= 2 && o.runs_scored == 0);

    let mut bad_min = match max_double_play {
        Some(dp) => dp + DOUBLE_PLAY_MARGIN,
        None => min_one_out_no_run,
    };

    // Two outs: every out ends the inning, so bad collapses onto the out
    // boundary and merges with very-bad.
    if outs == 2 {
        bad_min = max_out_no_run;
        max_one_out_no_run = max_out_no_run;
    }

    let max_no_outs_no_runs = match max_norm(all, |o| o.outs_gained == 0 && o.runs_scored == 0) {
        Some(v) => v,
        None => neutral_fallback(all),
    };

    let good_min = min_norm(all, good_candidate)
        .or_else(|| min_norm(all, |o| o.outs_gained == 0))
        .unwrap_or(GOOD_MIN_DEFAULT);

    let good_max = max_norm(all, |o| {
        !is_home_run_like(o, bases) && !is_triple_like(o, bases)
    })
    .unwrap_or(-1.0);

    let very_good_min = min_norm(all, |o| {
        o.outs_gained == 0 && (o.runs_scored >= 1 || is_clean_triple(o, bases))
    })
    .unwrap_or(1.0);

    let mut sorted: Vec<f64> = all.iter().map(|o| o.norm_value).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    Some(ThresholdSet {
        max_out_no_run,
        bad_min,
        max_one_out_no_run,
        min_one_out_no_run,
        max_no_outs_no_runs,
        good_min,
        good_max,
        very_good_min,
        very_good_max: 1.0,
        p25: percentile(&sorted, 25.0),
        p40: percentile(&sorted, 40.0),
        p75: percentile(&sorted, 75.0),
        p90: percentile(&sorted, 90.0),
    })
}

/// Thresholds plus the formatted band ranges. `None` mirrors
/// [`compute_thresholds`].
pub fn quality_ranges(table: &OutcomeTable, bases: BasesState, outs: u8) -> Option<QualityRanges> {
    let t = compute_thresholds(table, bases, outs)?;
    Some(QualityRanges {
        very_bad: range_string(-1.0, t.max_out_no_run),
        bad: range_string(t.bad_min, t.max_one_out_no_run),
        neutral: range_string(t.min_one_out_no_run, t.max_no_outs_no_runs),
        good: range_string(t.good_min, t.good_max),
        very_good: range_string(t.very_good_min, 1.0),
        thresholds: t,
    })
}

fn range_string(min: f64, max: f64) -> String {
    format!("{:.2} to {:.2}", min, max)
}

// ── Band anchor rules ────────────────────────────────────────────────────────

/// Good-band candidate: scores without killing the rally, or reaches first
/// without an out, or keeps the inning alive clean.
fn good_candidate(o: &PlayOutcome) -> bool {
    (o.runs_scored >= 1 && o.outs_gained <= 1)
        || (o.outs_gained == 0 && o.final_bases.first)
        || (o.outs_gained == 0 && o.runs_scored == 0)
}

/// Cleared bases with more runs than there were runners: the batter scored
/// too, so this was a home run.
fn is_home_run_like(o: &PlayOutcome, initial: BasesState) -> bool {
    o.final_bases.is_empty() && o.runs_scored > initial.runner_count()
}

/// Third base newly occupied without the trail evidence of runners merely
/// advancing a station: treated as the batter legging out a triple.
fn is_triple_like(o: &PlayOutcome, initial: BasesState) -> bool {
    let newly_third = o.final_bases.third && !initial.third;
    newly_third && (!initial.second || !o.final_bases.first)
}

/// Batter alone on third having driven in every runner that was aboard
/// (or none were). Qualifies for the very-good band even when no run scored.
fn is_clean_triple(o: &PlayOutcome, initial: BasesState) -> bool {
    o.final_bases == BasesState::new(false, false, true)
        && !initial.third
        && (initial.runner_count() == 0 || o.runs_scored == initial.runner_count())
}

// ── Reductions ───────────────────────────────────────────────────────────────

fn max_norm(outcomes: &[PlayOutcome], pred: impl Fn(&PlayOutcome) -> bool) -> Option<f64> {
    outcomes
        .iter()
        .filter(|o| pred(o))
        .map(|o| o.norm_value)
        .reduce(f64::max)
}

fn min_norm(outcomes: &[PlayOutcome], pred: impl Fn(&PlayOutcome) -> bool) -> Option<f64> {
    outcomes
        .iter()
        .filter(|o| pred(o))
        .map(|o| o.norm_value)
        .reduce(f64::min)
}

/// Neutral anchor when the state has no clean no-out play on record: the
/// middle of the routine outcomes (at most one out, at most one run), taken
/// at index `len / 2` of the ascending sort. 0.0 when even that set is empty.
fn neutral_fallback(outcomes: &[PlayOutcome]) -> f64 {
    let mut vals: Vec<f64> = outcomes
        .iter()
        .filter(|o| o.outs_gained <= 1 && o.runs_scored <= 1)
        .map(|o| o.norm_value)
        .collect();
    if vals.is_empty() {
        return 0.0;
    }
    vals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    vals[vals.len() / 2]
}

/// Percentile marker over ascending values: element at index ⌊p/100 · n⌋,
/// clamped to the last element.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let idx = ((p / 100.0) * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

// ── Tests ────────────────────────────────────────────────────────────────────
