//! Stake sizing for outcome-token trades.
//!
//! Sizing is fractional Kelly: the full Kelly fraction maximises long-run
//! log-wealth but swings hard, so a multiplier (typically 0.25) trades a
//! little growth for a lot less variance.
//!
//!   f* = (b·p − q) / b
//! with
//!   b = net odds per dollar staked, (1/price) − 1
//!   p = model probability the token pays out
//!   q = 1 − p
//!
//! Stakes are then converted into whole contracts; Polymarket outcome tokens
//! settle at $1, so `price` doubles as the market's implied probability.

/// Model edge over the market: model_prob / market_price − 1.
/// Positive when the market is underpricing the outcome.
pub fn edge(model_prob: f64, market_price: f64) -> f64 {
    if market_price <= 0.0 {
        return 0.0;
    }
    model_prob / market_price - 1.0
}

/// Fraction of bankroll to stake (0.0 to 1.0). Zero when there is no edge or
/// the price is degenerate.
pub fn kelly_stake(model_prob: f64, market_price: f64, kelly_fraction: f64) -> f64 {
    debug_assert!((0.0..=1.0).contains(&model_prob), "model_prob out of range");
    debug_assert!(
        (0.0..=1.0).contains(&kelly_fraction),
        "kelly_fraction out of range"
    );

    if market_price <= 0.0 || market_price >= 1.0 {
        return 0.0;
    }

    let b = (1.0 / market_price) - 1.0;
    let p = model_prob;
    let q = 1.0 - p;

    let f = (b * p - q) / b;
    if f <= 0.0 {
        return 0.0;
    }
    (f * kelly_fraction).clamp(0.0, 1.0)
}

/// Whole contracts purchasable with `stake_usd` at `price`, floored, at least
/// one, capped at `max_contracts`. Zero only when the stake or price is
/// degenerate.
pub fn contracts_for_stake(stake_usd: f64, price: f64, max_contracts: u32) -> u32 {
    if stake_usd <= 0.0 || price <= 0.0 {
        return 0;
    }
    let contracts = (stake_usd / price).floor() as u32;
    contracts.max(1).min(max_contracts)
}
