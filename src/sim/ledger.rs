//! Per-game simulated trading books.
//!
//! Every game id the frontend plays against gets its own paper book: a cash
//! balance, contract holdings per token, and a full trade history. Books live
//! only in memory; restarting the service resets every game. Refused trades
//! (overdraft, short sell) are ordinary structured results the API reports
//! back, not errors.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Holdings below this quantity are treated as fully closed.
const DUST_QUANTITY: f64 = 1e-9;

/// Thread-safe registry of per-game paper books.
#[derive(Clone)]
pub struct LedgerBook {
    starting_balance: f64,
    inner: Arc<RwLock<HashMap<String, GameLedger>>>,
}

struct GameLedger {
    balance: f64,
    holdings: HashMap<String, Holding>,
    history: Vec<LedgerEntry>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Contracts held for one outcome token.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Holding {
    pub quantity: f64,
    pub average_price: f64,
}

/// One executed ledger action.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub token_id: String,
    pub quantity: f64,
    pub price: f64,
    pub cost: f64,
    pub balance_after: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<f64>,
}

/// Point-in-time copy of a game's book, as returned to the frontend.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSnapshot {
    pub game_id: String,
    pub balance: f64,
    pub holdings: HashMap<String, Holding>,
    pub history: Vec<LedgerEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Why a trade was refused. Carried back to the caller as data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "refusal")]
pub enum Refusal {
    InsufficientBalance { cost: f64, balance: f64 },
    InsufficientHoldings { requested: f64, held: f64 },
    InvalidOrder { reason: String },
}

impl std::fmt::Display for Refusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Refusal::InsufficientBalance { cost, balance } => {
                write!(f, "cost ${:.2} exceeds balance ${:.2}", cost, balance)
            }
            Refusal::InsufficientHoldings { requested, held } => {
                write!(f, "cannot sell {:.2} contracts, only {:.2} held", requested, held)
            }
            Refusal::InvalidOrder { reason } => write!(f, "invalid order: {}", reason),
        }
    }
}

impl GameLedger {
    fn new(balance: f64) -> Self {
        let now = Utc::now();
        GameLedger {
            balance,
            holdings: HashMap::new(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn snapshot(&self, game_id: &str) -> LedgerSnapshot {
        LedgerSnapshot {
            game_id: game_id.to_string(),
            balance: self.balance,
            holdings: self.holdings.clone(),
            history: self.history.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl LedgerBook {
    pub fn new(starting_balance: f64) -> Self {
        LedgerBook {
            starting_balance,
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Current book for a game. Unknown game ids get a fresh book at the
    /// configured starting balance.
    pub async fn snapshot(&self, game_id: &str) -> LedgerSnapshot {
        let mut books = self.inner.write().await;
        books
            .entry(game_id.to_string())
            .or_insert_with(|| GameLedger::new(self.starting_balance))
            .snapshot(game_id)
    }

    /// Buy `quantity` contracts of `token_id` at `price`, tagging the history
    /// entry with the quality band and EV that motivated the trade.
    pub async fn buy(
        &self,
        game_id: &str,
        token_id: &str,
        quantity: f64,
        price: f64,
        quality: Option<&str>,
        expected_value: Option<f64>,
    ) -> Result<LedgerSnapshot, Refusal> {
        validate_order(quantity, price)?;
        let cost = quantity * price;

        let mut books = self.inner.write().await;
        let book = books
            .entry(game_id.to_string())
            .or_insert_with(|| GameLedger::new(self.starting_balance));

        if cost > book.balance {
            return Err(Refusal::InsufficientBalance {
                cost,
                balance: book.balance,
            });
        }

        book.balance -= cost;
        let holding = book
            .holdings
            .entry(token_id.to_string())
            .or_insert(Holding {
                quantity: 0.0,
                average_price: 0.0,
            });
        let total = holding.quantity + quantity;
        holding.average_price =
            (holding.quantity * holding.average_price + quantity * price) / total;
        holding.quantity = total;

        book.updated_at = Utc::now();
        book.history.push(LedgerEntry {
            timestamp: book.updated_at,
            action: "buy".to_string(),
            token_id: token_id.to_string(),
            quantity,
            price,
            cost,
            balance_after: book.balance,
            quality: quality.map(str::to_string),
            expected_value,
        });

        debug!(
            "Ledger [{}] buy {:.2} x {} @ {:.3}, balance ${:.2}",
            game_id, quantity, token_id, price, book.balance
        );
        Ok(book.snapshot(game_id))
    }

    /// Sell `quantity` contracts of `token_id` at `price`, crediting the
    /// proceeds back to cash.
    pub async fn sell(
        &self,
        game_id: &str,
        token_id: &str,
        quantity: f64,
        price: f64,
    ) -> Result<LedgerSnapshot, Refusal> {
        validate_order(quantity, price)?;
        let proceeds = quantity * price;

        let mut books = self.inner.write().await;
        let book = books
            .entry(game_id.to_string())
            .or_insert_with(|| GameLedger::new(self.starting_balance));

        let held = book.holdings.get(token_id).map(|h| h.quantity).unwrap_or(0.0);
        if quantity > held + DUST_QUANTITY {
            return Err(Refusal::InsufficientHoldings {
                requested: quantity,
                held,
            });
        }

        if let Some(holding) = book.holdings.get_mut(token_id) {
            holding.quantity -= quantity;
            if holding.quantity <= DUST_QUANTITY {
                book.holdings.remove(token_id);
            }
        }
        book.balance += proceeds;

        book.updated_at = Utc::now();
        book.history.push(LedgerEntry {
            timestamp: book.updated_at,
            action: "sell".to_string(),
            token_id: token_id.to_string(),
            quantity,
            price,
            cost: proceeds,
            balance_after: book.balance,
            quality: None,
            expected_value: None,
        });

        debug!(
            "Ledger [{}] sell {:.2} x {} @ {:.3}, balance ${:.2}",
            game_id, quantity, token_id, price, book.balance
        );
        Ok(book.snapshot(game_id))
    }

    /// Wipe a game's book back to a starting balance. The reset itself is
    /// recorded as the first history entry of the new book.
    pub async fn reset(&self, game_id: &str, starting_balance: Option<f64>) -> LedgerSnapshot {
        let balance = starting_balance.unwrap_or(self.starting_balance);
        let mut books = self.inner.write().await;
        let mut book = GameLedger::new(balance);
        book.history.push(LedgerEntry {
            timestamp: book.created_at,
            action: "reset".to_string(),
            token_id: String::new(),
            quantity: 0.0,
            price: 0.0,
            cost: 0.0,
            balance_after: balance,
            quality: None,
            expected_value: None,
        });
        let snapshot = book.snapshot(game_id);
        books.insert(game_id.to_string(), book);
        info!("Ledger [{}] reset to ${:.2}", game_id, balance);
        snapshot
    }

    /// Number of games with an open book.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

fn validate_order(quantity: f64, price: f64) -> Result<(), Refusal> {
    if quantity <= 0.0 || !quantity.is_finite() {
        return Err(Refusal::InvalidOrder {
            reason: format!("quantity must be positive, got {}", quantity),
        });
    }
    if price <= 0.0 || !price.is_finite() {
        return Err(Refusal::InvalidOrder {
            reason: format!("price must be positive, got {}", price),
        });
    }
    Ok(())
}
