use serde::{Deserialize, Serialize};

/// Base occupancy: which of first/second/third hold a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BasesState {
    #[serde(default)]
    pub first: bool,
    #[serde(default)]
    pub second: bool,
    #[serde(default)]
    pub third: bool,
}

impl BasesState {
    pub fn new(first: bool, second: bool, third: bool) -> Self {
        BasesState {
            first,
            second,
            third,
        }
    }

    pub fn empty() -> Self {
        BasesState::default()
    }

    /// Number of occupied bases (0–3).
    pub fn runner_count(&self) -> u32 {
        self.first as u32 + self.second as u32 + self.third as u32
    }

    pub fn is_empty(&self) -> bool {
        *self == BasesState::empty()
    }

    /// Occupancy key used by the probability table: '1'/'0' per base,
    /// first base leftmost. "101" = runners on first and third.
    pub fn key(&self) -> String {
        format!(
            "{}{}{}",
            self.first as u8, self.second as u8, self.third as u8
        )
    }

    /// Human-readable occupancy for log lines ("runners on first and third").
    pub fn describe(&self) -> String {
        let mut names = Vec::new();
        if self.first {
            names.push("first");
        }
        if self.second {
            names.push("second");
        }
        if self.third {
            names.push("third");
        }
        match names.len() {
            0 => "bases empty".to_string(),
            1 => format!("runner on {}", names[0]),
            2 => format!("runners on {} and {}", names[0], names[1]),
            _ => "bases loaded".to_string(),
        }
    }
}

/// Game state as the frontend sends it. Only `bases` and `outs` drive the
/// quality engine; the rest is context for win probability and trade logs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    #[serde(default)]
    pub bases: BasesState,
    #[serde(default)]
    pub outs: u8,
    #[serde(default)]
    pub inning: Option<u32>,
    #[serde(default)]
    pub is_top_of_inning: Option<bool>,
    #[serde(default)]
    pub home_score: Option<i32>,
    #[serde(default)]
    pub away_score: Option<i32>,
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
}
