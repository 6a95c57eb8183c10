//! Turns a band's expected value into a trade decision.
//!
//! Pipeline: EV runs → win-probability shift for the batting team → edge
//! against the quoted YES price → fractional-Kelly stake → whole contracts.
//! Any stage can bail out with a Skip carrying the reason; the handler layer
//! reports skips to the frontend as data, not errors.

use serde::Serialize;

use crate::engine::expected_value::ExpectedValueReport;
use crate::engine::state::GameSnapshot;
use crate::engine::win_probability::batting_team_win_probability;

use super::sizing::{contracts_for_stake, edge, kelly_stake};

/// Sizing knobs, taken from configuration plus the game's current balance.
#[derive(Debug, Clone, Copy)]
pub struct TradeParams {
    pub kelly_fraction: f64,
    pub min_edge: f64,
    pub max_contracts: u32,
    pub balance: f64,
}

/// Outcome of planning. Serialized straight into the API response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum TradeDecision {
    Skip {
        reason: String,
    },
    Buy {
        model_prob: f64,
        edge: f64,
        stake_usd: f64,
        contracts: u32,
        expected_runs: f64,
    },
}

impl TradeDecision {
    fn skip(reason: String) -> Self {
        TradeDecision::Skip { reason }
    }
}

/// Decide whether (and how big) to buy the batting team's YES token given a
/// band EV report. Pure function; execution against the ledger and the CLOB
/// happens in the handler.
pub fn plan_trade(
    report: &ExpectedValueReport,
    snapshot: &GameSnapshot,
    yes_price: f64,
    params: &TradeParams,
) -> TradeDecision {
    if let Some(error) = &report.error {
        return TradeDecision::skip(format!("no expected value: {}", error));
    }
    if report.expected_value <= 0.0 {
        return TradeDecision::skip(format!(
            "expected value {:.3} runs is not positive",
            report.expected_value
        ));
    }
    if yes_price <= 0.0 || yes_price >= 1.0 {
        return TradeDecision::skip(format!(
            "market price {:.3} outside the open interval (0, 1)",
            yes_price
        ));
    }

    // Price the anticipated play: credit the EV runs to the batting team.
    let model_prob = batting_team_win_probability(snapshot, report.expected_value);
    let trade_edge = edge(model_prob, yes_price);
    if trade_edge < params.min_edge {
        return TradeDecision::skip(format!(
            "edge {:.3} below minimum {:.3} (model {:.3} vs price {:.3})",
            trade_edge, params.min_edge, model_prob, yes_price
        ));
    }

    let stake_fraction = kelly_stake(model_prob, yes_price, params.kelly_fraction);
    let stake_usd = params.balance * stake_fraction;
    let affordable = (params.balance / yes_price).floor() as u32;
    let contracts = contracts_for_stake(stake_usd, yes_price, params.max_contracts).min(affordable);
    if contracts == 0 {
        return TradeDecision::skip(format!(
            "balance ${:.2} cannot cover a single contract at {:.3}",
            params.balance, yes_price
        ));
    }

    TradeDecision::Buy {
        model_prob,
        edge: trade_edge,
        stake_usd,
        contracts,
        expected_runs: report.expected_value,
    }
}
