//! Quality-band selection.
//!
//! A band is an inclusive normValue range taken from the state's threshold
//! set. Band ranges are not mutually exclusive: a strikeout can sit in both
//! the very-bad and bad ranges at once. The overlap is part of the banding
//! contract and is preserved as computed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::outcomes::{OutcomeTable, PlayOutcome};
use crate::engine::state::BasesState;
use crate::engine::thresholds::{compute_thresholds, ThresholdSet};

/// Most outcomes a band selection returns.
const BAND_LIMIT: usize = 10;

/// The five ordered bands, worst first. Wire names are the kebab-case
/// strings the frontend sends ("very-bad" … "very-good").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "very-bad")]
    VeryBad,
    #[serde(rename = "bad")]
    Bad,
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "good")]
    Good,
    #[serde(rename = "very-good")]
    VeryGood,
}

impl Quality {
    pub const ALL: [Quality; 5] = [
        Quality::VeryBad,
        Quality::Bad,
        Quality::Neutral,
        Quality::Good,
        Quality::VeryGood,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::VeryBad => "very-bad",
            Quality::Bad => "bad",
            Quality::Neutral => "neutral",
            Quality::Good => "good",
            Quality::VeryGood => "very-good",
        }
    }

    /// Inclusive [min, max] normValue range of this band.
    pub fn range(self, t: &ThresholdSet) -> (f64, f64) {
        match self {
            Quality::VeryBad => (-1.0, t.max_out_no_run),
            Quality::Bad => (t.bad_min, t.max_one_out_no_run),
            Quality::Neutral => (t.min_one_out_no_run, t.max_no_outs_no_runs),
            Quality::Good => (t.good_min, t.good_max),
            Quality::VeryGood => (t.very_good_min, t.very_good_max),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quality::ALL
            .into_iter()
            .find(|band| band.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown quality band '{}' (expected very-bad, bad, neutral, good or very-good)",
                    s
                )
            })
    }
}

/// Outcomes of a state that fall in the band's range, best first, at most
/// ten. Empty when the state has no data.
pub fn select_by_quality(
    table: &OutcomeTable,
    band: Quality,
    bases: BasesState,
    outs: u8,
) -> Vec<PlayOutcome> {
    let thresholds = match compute_thresholds(table, bases, outs) {
        Some(t) => t,
        None => return Vec::new(),
    };
    let (min, max) = band.range(&thresholds);

    let mut matches: Vec<PlayOutcome> = table
        .outcomes_for(bases, outs)
        .iter()
        .filter(|o| o.norm_value >= min && o.norm_value <= max)
        .cloned()
        .collect();

    matches.sort_by(|a, b| {
        b.norm_value
            .partial_cmp(&a.norm_value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(BAND_LIMIT);
    matches
}
