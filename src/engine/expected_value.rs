//! Probability-weighted expected run value for a quality band.
//!
//! The band selection gives candidate outcomes; real-world occurrence
//! probabilities come from a separate dataset keyed by the initial base
//! occupancy, falling back to the outcome's own recorded frequency and
//! finally to a flat default. Weights are normalized over the selected
//! subset, and the expectation is taken over the **raw** run value, not the
//! normalized banding value.
//!
//! Every no-data condition (unknown state, empty band, zero probability
//! mass) produces a structured error report. Nothing in here panics on a
//! request path.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::engine::outcomes::{OutcomeTable, PlayOutcome, TableError};
use crate::engine::quality::{select_by_quality, Quality};
use crate::engine::state::BasesState;

/// Weight for an outcome the probability dataset doesn't know and whose own
/// record carries no frequency.
const DEFAULT_OUTCOME_PROBABILITY: f64 = 0.1;

/// How many contributions the report breaks out.
const DETAIL_LIMIT: usize = 5;

/// Composite key for an outcome within its initial-bases bucket: final
/// occupancy bits, runs scored, outs gained. "011-r1-o0" is "runners left
/// on second and third, one run in, no outs made".
pub fn outcome_key(final_bases: BasesState, runs_scored: u32, outs_gained: u32) -> String {
    format!("{}-r{}-o{}", final_bases.key(), runs_scored, outs_gained)
}

/// Real-world outcome probabilities: initial-bases key → outcome key →
/// probability. Loaded once at startup, read-only afterwards.
#[derive(Debug, Default)]
pub struct RealProbabilityTable {
    states: HashMap<String, HashMap<String, f64>>,
}

impl RealProbabilityTable {
    pub fn new() -> Self {
        RealProbabilityTable::default()
    }

    /// Insert one probability entry. Used by the loader and by tests.
    pub fn insert(&mut self, bases_key: &str, outcome_key: &str, probability: f64) {
        self.states
            .entry(bases_key.to_string())
            .or_default()
            .insert(outcome_key.to_string(), probability);
    }

    /// Probability of `outcome` occurring from `initial`, if the dataset
    /// recorded this exact transition.
    pub fn lookup(&self, initial: BasesState, outcome: &PlayOutcome) -> Option<f64> {
        let key = outcome_key(outcome.final_bases, outcome.runs_scored, outcome.outs_gained);
        self.states
            .get(&initial.key())
            .and_then(|bucket| bucket.get(&key))
            .copied()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn entry_count(&self) -> usize {
        self.states.values().map(HashMap::len).sum()
    }

    /// Load the dataset from a JSON file, validating keys and ranges.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path_str = path.as_ref().display().to_string();
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|source| TableError::Io {
            path: path_str.clone(),
            source,
        })?;
        Self::from_json_str(&raw, &path_str)
    }

    pub fn from_json_str(raw: &str, origin: &str) -> Result<Self, TableError> {
        let states: HashMap<String, HashMap<String, f64>> =
            serde_json::from_str(raw).map_err(|source| TableError::Parse {
                path: origin.to_string(),
                source,
            })?;

        let bad = |reason: String| TableError::BadRecord {
            path: origin.to_string(),
            reason,
        };
        let mut table = RealProbabilityTable::new();
        for (bases_key, bucket) in states {
            if !valid_bases_key(&bases_key) {
                return Err(bad(format!("bad initial-bases key '{}'", bases_key)));
            }
            for (key, p) in bucket {
                if !valid_outcome_key(&key) {
                    return Err(bad(format!("bad outcome key '{}' under '{}'", key, bases_key)));
                }
                if !(0.0..=1.0).contains(&p) {
                    return Err(bad(format!(
                        "probability {} for '{}' under '{}' outside [0, 1]",
                        p, key, bases_key
                    )));
                }
                table.insert(&bases_key, &key, p);
            }
        }
        Ok(table)
    }
}

fn valid_bases_key(key: &str) -> bool {
    key.len() == 3 && key.chars().all(|c| c == '0' || c == '1')
}

fn valid_outcome_key(key: &str) -> bool {
    let parts: Vec<&str> = key.split('-').collect();
    if parts.len() != 3 {
        return false;
    }
    let runs_ok = parts[1]
        .strip_prefix('r')
        .map_or(false, |v| v.parse::<u32>().map_or(false, |n| n <= 4));
    let outs_ok = parts[2]
        .strip_prefix('o')
        .map_or(false, |v| v.parse::<u32>().map_or(false, |n| n <= 3));
    valid_bases_key(parts[0]) && runs_ok && outs_ok
}

// ── Report ───────────────────────────────────────────────────────────────────

/// One outcome's share of the expectation, for the report detail list.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeContribution {
    pub description: String,
    pub weight: f64,
    pub run_value: f64,
    pub norm_value: f64,
    pub weighted_contribution: f64,
    pub runs_scored: u32,
    pub outs_gained: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpectedValueSummary {
    pub avg_runs_scored: f64,
    pub avg_outs_gained: f64,
}

/// EV report for one (band, state) query. `error` is set on the no-data
/// paths, with every numeric field zeroed.
#[derive(Debug, Clone, Serialize)]
pub struct ExpectedValueReport {
    pub expected_value: f64,
    pub total_outcomes: usize,
    pub total_probability: f64,
    pub summary: ExpectedValueSummary,
    pub outcome_details: Vec<OutcomeContribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExpectedValueReport {
    /// Report carrying only an error string, for the no-data conditions.
    pub fn no_data(error: impl Into<String>) -> Self {
        ExpectedValueReport {
            expected_value: 0.0,
            total_outcomes: 0,
            total_probability: 0.0,
            summary: ExpectedValueSummary::default(),
            outcome_details: Vec::new(),
            error: Some(error.into()),
        }
    }
}

// ── Estimation ───────────────────────────────────────────────────────────────

/// Expected run value of the band's outcomes from this state.
///
/// Weight ladder per outcome: dataset probability for the exact transition,
/// else the outcome's own recorded frequency, else
/// [`DEFAULT_OUTCOME_PROBABILITY`]. Weights are normalized to sum to 1
/// across the selected outcomes.
pub fn expected_value(
    table: &OutcomeTable,
    probabilities: &RealProbabilityTable,
    band: Quality,
    bases: BasesState,
    outs: u8,
) -> ExpectedValueReport {
    let outcomes = select_by_quality(table, band, bases, outs);
    if outcomes.is_empty() {
        return ExpectedValueReport::no_data(format!(
            "no {} outcomes for this game state",
            band
        ));
    }

    let raw: Vec<f64> = outcomes
        .iter()
        .map(|o| {
            probabilities
                .lookup(bases, o)
                .or(o.probability)
                .unwrap_or(DEFAULT_OUTCOME_PROBABILITY)
        })
        .collect();

    let total_probability: f64 = raw.iter().sum();
    if total_probability <= 0.0 {
        return ExpectedValueReport::no_data("no real probability data available");
    }

    let mut expected = 0.0;
    let mut avg_runs_scored = 0.0;
    let mut avg_outs_gained = 0.0;
    let mut details: Vec<OutcomeContribution> = Vec::with_capacity(outcomes.len());

    for (o, p) in outcomes.iter().zip(&raw) {
        let weight = p / total_probability;
        let weighted_contribution = weight * o.value;
        expected += weighted_contribution;
        avg_runs_scored += weight * o.runs_scored as f64;
        avg_outs_gained += weight * o.outs_gained as f64;
        details.push(OutcomeContribution {
            description: o.description.clone(),
            weight,
            run_value: o.value,
            norm_value: o.norm_value,
            weighted_contribution,
            runs_scored: o.runs_scored,
            outs_gained: o.outs_gained,
        });
    }

    details.sort_by(|a, b| {
        b.weighted_contribution
            .abs()
            .partial_cmp(&a.weighted_contribution.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    details.truncate(DETAIL_LIMIT);

    ExpectedValueReport {
        expected_value: expected,
        total_outcomes: outcomes.len(),
        total_probability,
        summary: ExpectedValueSummary {
            avg_runs_scored,
            avg_outs_gained,
        },
        outcome_details: details,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn outcome(
        description: &str,
        runs_scored: u32,
        outs_gained: u32,
        norm_value: f64,
        value: f64,
        final_bases: (bool, bool, bool),
        probability: Option<f64>,
    ) -> PlayOutcome {
        PlayOutcome {
            description: description.to_string(),
            runs_scored,
            outs_gained,
            norm_value,
            value,
            final_bases: BasesState::new(final_bases.0, final_bases.1, final_bases.2),
            probability,
        }
    }

    /// Empty-bases, no-out state whose good band holds a walk and a single.
    fn fixture() -> (OutcomeTable, RealProbabilityTable) {
        let mut table = OutcomeTable::new();
        table.insert_state(
            BasesState::empty(),
            0,
            vec![
                outcome("Strikeout", 0, 1, -0.3, -0.27, (false, false, false), Some(0.22)),
                outcome("Walk", 0, 0, 0.2, 0.32, (true, false, false), Some(0.08)),
                outcome("Single", 0, 0, 0.35, 0.44, (true, false, false), Some(0.15)),
                outcome("Home run", 1, 0, 1.0, 1.0, (false, false, false), Some(0.03)),
            ],
        );

        let mut probs = RealProbabilityTable::new();
        // Exact transitions for the walk and the single; the strikeout and
        // home run fall back to their stored frequencies.
        probs.insert("000", "100-r0-o0", 0.25);
        (table, probs)
    }

    #[test]
    fn outcome_key_encodes_transition() {
        assert_eq!(
            outcome_key(BasesState::new(false, true, true), 1, 0),
            "011-r1-o0"
        );
        assert_eq!(outcome_key(BasesState::empty(), 4, 0), "000-r4-o0");
        assert_eq!(outcome_key(BasesState::new(true, false, false), 0, 2), "100-r0-o2");
    }

    #[test]
    fn lookup_requires_exact_transition() {
        let (_, probs) = fixture();
        let hit = outcome("Walk", 0, 0, 0.2, 0.32, (true, false, false), None);
        assert_eq!(probs.lookup(BasesState::empty(), &hit), Some(0.25));

        // Same final bases, different outs gained: a different transition.
        let miss = outcome("Fielder's choice", 0, 1, -0.1, -0.1, (true, false, false), None);
        assert_eq!(probs.lookup(BasesState::empty(), &miss), None);

        // Same transition from a different initial state.
        assert_eq!(probs.lookup(BasesState::new(false, true, false), &hit), None);
    }

    #[test]
    fn weights_normalize_to_one() {
        let (table, probs) = fixture();
        let report = expected_value(&table, &probs, Quality::Good, BasesState::empty(), 0);
        assert!(report.error.is_none(), "{:?}", report.error);
        let weight_sum: f64 = report.outcome_details.iter().map(|d| d.weight).sum();
        assert_relative_eq!(weight_sum, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn expectation_uses_raw_value_not_norm_value() {
        // Good band for the fixture holds the walk and the single, both with
        // the dataset probability 0.25 → equal weights.
        let (table, probs) = fixture();
        let report = expected_value(&table, &probs, Quality::Good, BasesState::empty(), 0);
        assert_eq!(report.total_outcomes, 2);
        assert_relative_eq!(report.total_probability, 0.5, epsilon = 1e-12);
        // (0.44 + 0.32) / 2 over values; over normValues it would be 0.275.
        assert_relative_eq!(report.expected_value, 0.38, epsilon = 1e-12);
        assert_relative_eq!(report.summary.avg_runs_scored, 0.0, epsilon = 1e-12);
        assert_relative_eq!(report.summary.avg_outs_gained, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn falls_back_to_stored_probability_then_default() {
        let (table, probs) = fixture();
        // Very-bad band: only the strikeout, whose transition the dataset
        // doesn't record → stored frequency 0.22.
        let report = expected_value(&table, &probs, Quality::VeryBad, BasesState::empty(), 0);
        assert_relative_eq!(report.total_probability, 0.22, epsilon = 1e-12);
        assert_relative_eq!(report.expected_value, -0.27, epsilon = 1e-12);

        // Strip the stored frequency and the flat default takes over.
        let mut bare = OutcomeTable::new();
        bare.insert_state(
            BasesState::empty(),
            0,
            vec![
                outcome("Strikeout", 0, 1, -0.3, -0.27, (false, false, false), None),
                outcome("Walk", 0, 0, 0.2, 0.32, (true, false, false), None),
            ],
        );
        let report = expected_value(
            &bare,
            &RealProbabilityTable::new(),
            Quality::VeryBad,
            BasesState::empty(),
            0,
        );
        assert_relative_eq!(
            report.total_probability,
            DEFAULT_OUTCOME_PROBABILITY,
            epsilon = 1e-12
        );
    }

    #[test]
    fn zero_probability_mass_is_an_error_report() {
        let mut table = OutcomeTable::new();
        table.insert_state(
            BasesState::empty(),
            1,
            vec![
                outcome("Strikeout", 0, 1, -0.3, -0.27, (false, false, false), Some(0.0)),
                outcome("Groundout", 0, 1, -0.2, -0.2, (false, false, false), Some(0.0)),
            ],
        );
        let report = expected_value(
            &table,
            &RealProbabilityTable::new(),
            Quality::VeryBad,
            BasesState::empty(),
            1,
        );
        assert!(report.error.is_some());
        assert_eq!(
            report.error.as_deref(),
            Some("no real probability data available")
        );
        assert_relative_eq!(report.expected_value, 0.0);
        assert_eq!(report.total_outcomes, 0);
    }

    #[test]
    fn empty_band_is_an_error_report() {
        let (table, probs) = fixture();
        // Unknown state.
        let report = expected_value(&table, &probs, Quality::Good, BasesState::empty(), 2);
        assert!(report.error.is_some());

        // Known state, unreachable band: nothing sits exactly at the
        // very-good floor of 1.0 here.
        let mut no_hr = OutcomeTable::new();
        no_hr.insert_state(
            BasesState::empty(),
            0,
            vec![
                outcome("Strikeout", 0, 1, -0.3, -0.27, (false, false, false), Some(0.2)),
                outcome("Walk", 0, 0, 0.2, 0.32, (true, false, false), Some(0.1)),
            ],
        );
        let report = expected_value(&no_hr, &probs, Quality::VeryGood, BasesState::empty(), 0);
        assert!(report.error.is_some());
        assert!(report.error.as_deref().unwrap().contains("very-good"));
    }

    #[test]
    fn details_ranked_by_absolute_contribution() {
        let mut table = OutcomeTable::new();
        let state = BasesState::new(true, true, false);
        table.insert_state(
            state,
            1,
            vec![
                outcome("Strikeout", 0, 1, -0.4, -0.3, (true, true, false), Some(0.30)),
                outcome("Groundout, runners hold", 0, 1, -0.3, -0.25, (true, true, false), Some(0.20)),
                outcome("Pop out", 0, 1, -0.25, -0.2, (true, true, false), Some(0.10)),
                outcome("Lineout", 0, 1, -0.2, -0.18, (true, true, false), Some(0.05)),
                outcome("Foul out", 0, 1, -0.18, -0.15, (true, true, false), Some(0.04)),
                outcome("Strikeout looking", 0, 1, -0.35, -0.28, (true, true, false), Some(0.25)),
            ],
        );
        let report = expected_value(
            &table,
            &RealProbabilityTable::new(),
            Quality::VeryBad,
            state,
            1,
        );
        assert!(report.error.is_none());
        assert_eq!(report.total_outcomes, 6);
        assert_eq!(report.outcome_details.len(), 5);
        for pair in report.outcome_details.windows(2) {
            assert!(
                pair[0].weighted_contribution.abs() >= pair[1].weighted_contribution.abs(),
                "details not ranked by |contribution|"
            );
        }
        // Largest raw probability with the biggest |value| leads.
        assert_eq!(report.outcome_details[0].description, "Strikeout");
    }

    #[test]
    fn weighted_averages_follow_the_weights() {
        let state = BasesState::new(false, false, true);
        let mut table = OutcomeTable::new();
        table.insert_state(
            state,
            1,
            vec![
                outcome("Sacrifice fly", 1, 1, 0.1, 0.15, (false, false, false), Some(0.3)),
                outcome("RBI single", 1, 0, 0.45, 0.6, (true, false, false), Some(0.1)),
            ],
        );
        let report = expected_value(
            &table,
            &RealProbabilityTable::new(),
            Quality::Good,
            state,
            1,
        );
        assert!(report.error.is_none());
        // Weights 0.75 / 0.25.
        assert_relative_eq!(report.summary.avg_runs_scored, 1.0, epsilon = 1e-12);
        assert_relative_eq!(report.summary.avg_outs_gained, 0.75, epsilon = 1e-12);
        assert_relative_eq!(
            report.expected_value,
            0.75 * 0.15 + 0.25 * 0.6,
            epsilon = 1e-12
        );
    }

    #[test]
    fn loader_validates_keys_and_ranges() {
        let good = r#"{"100": {"110-r0-o0": 0.4, "000-r0-o2": 0.1}}"#;
        let table = RealProbabilityTable::from_json_str(good, "test").unwrap();
        assert_eq!(table.state_count(), 1);
        assert_eq!(table.entry_count(), 2);

        let bad_bases = r#"{"10": {"110-r0-o0": 0.4}}"#;
        assert!(RealProbabilityTable::from_json_str(bad_bases, "test").is_err());

        let bad_key = r#"{"100": {"110-x0-o0": 0.4}}"#;
        assert!(RealProbabilityTable::from_json_str(bad_key, "test").is_err());

        let bad_prob = r#"{"100": {"110-r0-o0": 1.4}}"#;
        assert!(RealProbabilityTable::from_json_str(bad_prob, "test").is_err());
    }
}
