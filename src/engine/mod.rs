pub mod expected_value;
pub mod outcomes;
pub mod quality;
pub mod state;
pub mod thresholds;
pub mod win_probability;

pub use expected_value::{expected_value, ExpectedValueReport, RealProbabilityTable};
pub use outcomes::{OutcomeTable, PlayOutcome};
pub use quality::{select_by_quality, Quality};
pub use state::{BasesState, GameSnapshot};
pub use thresholds::{compute_thresholds, quality_ranges, QualityRanges, ThresholdSet};
