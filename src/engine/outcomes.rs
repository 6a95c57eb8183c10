//! Historical play-outcome table.
//!
//! The table is loaded once at startup from a JSON dataset and is read-only
//! afterwards. It maps a game state (base occupancy + outs) to the list of
//! play outcomes observed from that state, each carrying a normalized value
//! in [-1, 1] and a raw run-expectancy value used by the EV estimator.
//!
//! Unknown states read as the empty list; callers treat that as "no data",
//! never as an error.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::state::BasesState;

/// One historical play outcome from a given game state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayOutcome {
    /// e.g. "Single, runner to third", "Double play", "Sacrifice fly"
    pub description: String,
    pub runs_scored: u32,
    /// Outs recorded on the play (0–3).
    pub outs_gained: u32,
    /// Normalized outcome value in [-1, 1].
    pub norm_value: f64,
    /// Raw run-expectancy delta (runs). This is what EV is computed over.
    pub value: f64,
    /// Base occupancy after the play.
    pub final_bases: BasesState,
    /// Observed frequency of this outcome, when the dataset records one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

/// Dataset errors are fatal at startup: a table that fails validation is a
/// broken deployment, not a runtime condition.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("bad record in {path}: {reason}")]
    BadRecord { path: String, reason: String },
}

/// One dataset block: a game state and every outcome observed from it.
#[derive(Debug, Deserialize)]
struct StateBlock {
    bases: BasesState,
    outs: u8,
    outcomes: Vec<PlayOutcome>,
}

/// Read-only map of (bases, outs) → observed play outcomes.
#[derive(Debug, Default)]
pub struct OutcomeTable {
    states: HashMap<(BasesState, u8), Vec<PlayOutcome>>,
}

impl OutcomeTable {
    pub fn new() -> Self {
        OutcomeTable::default()
    }

    /// Add (or extend) the outcome list for a state. Used by the loader and
    /// by tests that build synthetic tables.
    pub fn insert_state(&mut self, bases: BasesState, outs: u8, outcomes: Vec<PlayOutcome>) {
        self.states.entry((bases, outs)).or_default().extend(outcomes);
    }

    /// Outcomes observed from this state. Unknown states yield an empty slice.
    pub fn outcomes_for(&self, bases: BasesState, outs: u8) -> &[PlayOutcome] {
        self.states
            .get(&(bases, outs))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn outcome_count(&self) -> usize {
        self.states.values().map(Vec::len).sum()
    }

    /// Load the table from a JSON dataset file, validating every record.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path_str = path.as_ref().display().to_string();
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|source| TableError::Io {
            path: path_str.clone(),
            source,
        })?;
        Self::from_json_str(&raw, &path_str)
    }

    /// Parse and validate a dataset from a JSON string. `origin` names the
    /// source in error messages.
    pub fn from_json_str(raw: &str, origin: &str) -> Result<Self, TableError> {
        let blocks: Vec<StateBlock> =
            serde_json::from_str(raw).map_err(|source| TableError::Parse {
                path: origin.to_string(),
                source,
            })?;

        let mut table = OutcomeTable::new();
        for block in blocks {
            validate_block(&block, origin)?;
            table.insert_state(block.bases, block.outs, block.outcomes);
        }
        Ok(table)
    }
}

fn validate_block(block: &StateBlock, origin: &str) -> Result<(), TableError> {
    let bad = |reason: String| TableError::BadRecord {
        path: origin.to_string(),
        reason,
    };

    if block.outs > 2 {
        return Err(bad(format!(
            "state ({}, outs={}) has outs outside 0..=2",
            block.bases.key(),
            block.outs
        )));
    }
    for outcome in &block.outcomes {
        if !(-1.0..=1.0).contains(&outcome.norm_value) {
            return Err(bad(format!(
                "'{}' from ({}, outs={}) has normValue {} outside [-1, 1]",
                outcome.description,
                block.bases.key(),
                block.outs,
                outcome.norm_value
            )));
        }
        if outcome.outs_gained > 3 {
            return Err(bad(format!(
                "'{}' from ({}, outs={}) has outsGained {} outside 0..=3",
                outcome.description,
                block.bases.key(),
                block.outs,
                outcome.outs_gained
            )));
        }
        if outcome.runs_scored > 4 {
            return Err(bad(format!(
                "'{}' from ({}, outs={}) scores {} runs; one play scores at most 4",
                outcome.description,
                block.bases.key(),
                block.outs,
                outcome.runs_scored
            )));
        }
        if let Some(p) = outcome.probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(bad(format!(
                    "'{}' from ({}, outs={}) has probability {} outside [0, 1]",
                    outcome.description,
                    block.bases.key(),
                    block.outs,
                    p
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "bases": {"first": false, "second": false, "third": false},
            "outs": 0,
            "outcomes": [
                {
                    "description": "Strikeout",
                    "runsScored": 0,
                    "outsGained": 1,
                    "normValue": -0.23,
                    "value": -0.23,
                    "finalBases": {"first": false, "second": false, "third": false},
                    "probability": 0.22
                },
                {
                    "description": "Home run",
                    "runsScored": 1,
                    "outsGained": 0,
                    "normValue": 1.0,
                    "value": 1.0,
                    "finalBases": {"first": false, "second": false, "third": false}
                }
            ]
        }
    ]"#;

    #[test]
    fn parses_and_indexes_states() {
        let table = OutcomeTable::from_json_str(SAMPLE, "test").unwrap();
        assert_eq!(table.state_count(), 1);
        assert_eq!(table.outcome_count(), 2);

        let outcomes = table.outcomes_for(BasesState::empty(), 0);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].description, "Strikeout");
        assert_eq!(outcomes[0].probability, Some(0.22));
        // probability is optional in the dataset
        assert_eq!(outcomes[1].probability, None);
    }

    #[test]
    fn unknown_state_reads_as_empty() {
        let table = OutcomeTable::from_json_str(SAMPLE, "test").unwrap();
        assert!(table
            .outcomes_for(BasesState::new(true, true, true), 2)
            .is_empty());
        // Same bases, different outs is still a miss.
        assert!(table.outcomes_for(BasesState::empty(), 1).is_empty());
    }

    #[test]
    fn rejects_norm_value_out_of_range() {
        let raw = SAMPLE.replace("\"normValue\": -0.23", "\"normValue\": -1.5");
        let err = OutcomeTable::from_json_str(&raw, "test").unwrap_err();
        assert!(matches!(err, TableError::BadRecord { .. }), "{err}");
        assert!(err.to_string().contains("normValue"));
    }

    #[test]
    fn rejects_impossible_outs() {
        let raw = SAMPLE.replace("\"outs\": 0", "\"outs\": 3");
        let err = OutcomeTable::from_json_str(&raw, "test").unwrap_err();
        assert!(err.to_string().contains("outs outside 0..=2"));

        let raw = SAMPLE.replace("\"outsGained\": 1", "\"outsGained\": 4");
        let err = OutcomeTable::from_json_str(&raw, "test").unwrap_err();
        assert!(err.to_string().contains("outsGained"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = OutcomeTable::from_json_str("{not json", "test").unwrap_err();
        assert!(matches!(err, TableError::Parse { .. }));
    }

    #[test]
    fn duplicate_state_blocks_merge() {
        let raw = format!(
            "[{one}, {one}]",
            one = r#"{
                "bases": {"first": true, "second": false, "third": false},
                "outs": 1,
                "outcomes": [
                    {
                        "description": "Groundout",
                        "runsScored": 0,
                        "outsGained": 1,
                        "normValue": -0.2,
                        "value": -0.2,
                        "finalBases": {"first": true, "second": false, "third": false}
                    }
                ]
            }"#
        );
        let table = OutcomeTable::from_json_str(&raw, "test").unwrap();
        assert_eq!(table.state_count(), 1);
        assert_eq!(
            table
                .outcomes_for(BasesState::new(true, false, false), 1)
                .len(),
            2
        );
    }
}
