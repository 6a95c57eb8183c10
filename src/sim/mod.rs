pub mod ledger;
pub mod sizing;
pub mod trade;

pub use ledger::LedgerBook;
pub use trade::{plan_trade, TradeDecision, TradeParams};
