//! HTTP surface for the frontend.
//!
//! Flat JSON routes, permissive CORS (the frontend is served elsewhere).
//! Engine no-data conditions come back as structured 200 bodies with an
//! `error` field; only transport failures (bad payloads, CLOB errors) map
//! to HTTP error codes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::state::GameSnapshot;
use crate::engine::win_probability::home_win_probability;
use crate::engine::{
    expected_value, quality_ranges, select_by_quality, OutcomeTable, Quality,
    RealProbabilityTable,
};
use crate::polymarket::ClobClient;
use crate::sim::{plan_trade, LedgerBook, TradeDecision, TradeParams};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub outcomes: Arc<OutcomeTable>,
    pub probabilities: Arc<RealProbabilityTable>,
    pub clob: ClobClient,
    pub ledgers: LedgerBook,
}

/// Build the Axum router for the API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/balance", post(balance_handler))
        .route("/update_allowance", post(update_allowance_handler))
        .route("/create_order", post(create_order_handler))
        .route("/price/:token_id", get(price_handler))
        .route("/quality_thresholds", post(quality_thresholds_handler))
        .route("/play_options", post(play_options_handler))
        .route("/expected_value", post(expected_value_handler))
        .route("/win_probability", post(win_probability_handler))
        .route("/simulate_trade", post(simulate_trade_handler))
        .route("/sell_position", post(sell_position_handler))
        .route("/game_ledger/:game_id", get(game_ledger_handler))
        .route("/reset_ledger", post(reset_ledger_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

// ── Request bodies ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenRequest {
    token_id: String,
}

/// The frontend sends `tokenID` here (and `token_id` everywhere else).
#[derive(Debug, Deserialize)]
struct OrderRequest {
    #[serde(default, alias = "tokenID")]
    token_id: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    size: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct StateRequest {
    game_state: GameSnapshot,
}

#[derive(Debug, Deserialize)]
struct BandRequest {
    quality: Quality,
    game_state: GameSnapshot,
}

#[derive(Debug, Deserialize)]
struct SimulateTradeRequest {
    game_id: String,
    quality: Quality,
    game_state: GameSnapshot,
    #[serde(default, alias = "tokenID")]
    token_id: Option<String>,
    #[serde(default)]
    price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SellPositionRequest {
    game_id: String,
    #[serde(default, alias = "tokenID")]
    token_id: Option<String>,
    quantity: f64,
    #[serde(default)]
    price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ResetLedgerRequest {
    game_id: String,
    #[serde(default)]
    starting_balance: Option<f64>,
}

// ── Service handlers ─────────────────────────────────────────────────────────

/// GET /
async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mode = if state.config.dry_run {
        "simulated"
    } else {
        "live"
    };
    Json(json!({
        "message": "Baseball Polymarket API",
        "version": env!("CARGO_PKG_VERSION"),
        "mode": mode,
        "open_games": state.ledgers.len().await,
        "status": "running",
    }))
}

/// GET /health
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let clob_connected = state.clob.is_reachable().await;
    let status = if clob_connected { "healthy" } else { "degraded" };
    Json(json!({
        "status": status,
        "clob_connected": clob_connected,
    }))
}

// ── CLOB proxy handlers ──────────────────────────────────────────────────────

/// POST /balance
async fn balance_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    info!("Checking balance for token {}", req.token_id);
    let balance = state
        .clob
        .get_balance_allowance(&req.token_id)
        .await
        .map_err(clob_error)?;
    Ok(Json(json!({
        "success": true,
        "token_id": req.token_id,
        "balance": balance,
    })))
}

/// POST /update_allowance
async fn update_allowance_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .clob
        .update_balance_allowance(&req.token_id)
        .await
        .map_err(clob_error)?;
    // Re-read so the caller sees the post-update state.
    let balance = state
        .clob
        .get_balance_allowance(&req.token_id)
        .await
        .map_err(clob_error)?;
    Ok(Json(json!({
        "success": true,
        "token_id": req.token_id,
        "message": "Allowances updated successfully",
        "balance": balance,
    })))
}

/// POST /create_order
async fn create_order_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OrderRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let token_id = req
        .token_id
        .unwrap_or_else(|| state.config.default_token_id.clone());
    let price = req.price.unwrap_or(0.5);
    let size = req.size.unwrap_or(1.0);

    // Refresh allowances first; an allowance failure is not fatal to the
    // order attempt.
    if let Err(e) = state.clob.update_balance_allowance(&token_id).await {
        warn!("Allowance update failed (continuing anyway): {}", e);
    }

    let order = state
        .clob
        .post_order(&token_id, price, size)
        .await
        .map_err(clob_error)?;
    Ok(Json(json!({
        "success": true,
        "order": order,
        "token_id": token_id,
        "price": price,
        "size": size,
    })))
}

/// GET /price/:token_id
async fn price_handler(
    State(state): State<Arc<AppState>>,
    Path(token_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let midpoint = state
        .clob
        .get_midpoint(&token_id)
        .await
        .map_err(clob_error)?;
    Ok(Json(json!({
        "token_id": token_id,
        "midpoint": midpoint,
    })))
}

// ── Play-quality handlers ────────────────────────────────────────────────────

/// POST /quality_thresholds
async fn quality_thresholds_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StateRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let snap = req.game_state;
    match quality_ranges(&state.outcomes, snap.bases, snap.outs) {
        Some(ranges) => Ok(Json(to_json(&ranges)?)),
        None => Ok(Json(json!({ "error": no_data_message(&snap) }))),
    }
}

/// POST /play_options
async fn play_options_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BandRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let snap = req.game_state;
    if state.outcomes.outcomes_for(snap.bases, snap.outs).is_empty() {
        return Ok(Json(json!({ "error": no_data_message(&snap) })));
    }
    let options = select_by_quality(&state.outcomes, req.quality, snap.bases, snap.outs);
    Ok(Json(to_json(&options)?))
}

/// POST /expected_value
async fn expected_value_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BandRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let snap = req.game_state;
    let report = expected_value(
        &state.outcomes,
        &state.probabilities,
        req.quality,
        snap.bases,
        snap.outs,
    );
    Ok(Json(to_json(&report)?))
}

/// POST /win_probability
async fn win_probability_handler(Json(req): Json<StateRequest>) -> impl IntoResponse {
    let snap = req.game_state;
    let p_home = home_win_probability(&snap);
    let batting_team = if snap.is_top_of_inning.unwrap_or(true) {
        "away"
    } else {
        "home"
    };
    Json(json!({
        "home_win_probability": p_home,
        "away_win_probability": 1.0 - p_home,
        "batting_team": batting_team,
    }))
}

// ── Trading handlers ─────────────────────────────────────────────────────────

/// POST /simulate_trade
async fn simulate_trade_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SimulateTradeRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let snap = req.game_state;
    let token_id = req
        .token_id
        .unwrap_or_else(|| state.config.default_token_id.clone());

    let report = expected_value(
        &state.outcomes,
        &state.probabilities,
        req.quality,
        snap.bases,
        snap.outs,
    );

    let yes_price = match req.price {
        Some(p) => p,
        None => state
            .clob
            .get_midpoint(&token_id)
            .await
            .map_err(clob_error)?,
    };

    let balance = state.ledgers.snapshot(&req.game_id).await.balance;
    let params = TradeParams {
        kelly_fraction: state.config.kelly_fraction,
        min_edge: state.config.min_edge,
        max_contracts: state.config.max_contracts,
        balance,
    };
    let decision = plan_trade(&report, &snap, yes_price, &params);
    let decision_json = to_json(&decision)?;

    let body = match &decision {
        TradeDecision::Skip { reason } => {
            info!("Trade skipped for game {}: {}", req.game_id, reason);
            let ledger = state.ledgers.snapshot(&req.game_id).await;
            json!({
                "success": true,
                "decision": decision_json,
                "ledger": to_json(&ledger)?,
            })
        }
        TradeDecision::Buy {
            contracts,
            expected_runs,
            ..
        } => {
            let buy = state
                .ledgers
                .buy(
                    &req.game_id,
                    &token_id,
                    *contracts as f64,
                    yes_price,
                    Some(req.quality.as_str()),
                    Some(*expected_runs),
                )
                .await;
            match buy {
                Ok(ledger) => {
                    info!(
                        "Simulated buy for game {}: {} x {} @ {:.3}",
                        req.game_id, contracts, token_id, yes_price
                    );
                    let live_order = if state.config.dry_run {
                        serde_json::Value::Null
                    } else {
                        // Mirror to the CLOB; the paper trade stands even if
                        // the live order is rejected.
                        match state
                            .clob
                            .post_order(&token_id, yes_price, *contracts as f64)
                            .await
                        {
                            Ok(order) => order,
                            Err(e) => {
                                warn!("Live order mirror failed: {}", e);
                                json!({ "error": e.to_string() })
                            }
                        }
                    };
                    json!({
                        "success": true,
                        "decision": decision_json,
                        "ledger": to_json(&ledger)?,
                        "live_order": live_order,
                    })
                }
                Err(refusal) => {
                    warn!(
                        "Ledger refused trade for game {}: {}",
                        req.game_id, refusal
                    );
                    let ledger = state.ledgers.snapshot(&req.game_id).await;
                    json!({
                        "success": false,
                        "decision": decision_json,
                        "refused": to_json(&refusal)?,
                        "reason": refusal.to_string(),
                        "ledger": to_json(&ledger)?,
                    })
                }
            }
        }
    };
    Ok(Json(body))
}

/// POST /sell_position
async fn sell_position_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SellPositionRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let token_id = req
        .token_id
        .unwrap_or_else(|| state.config.default_token_id.clone());
    let price = match req.price {
        Some(p) => p,
        None => state
            .clob
            .get_midpoint(&token_id)
            .await
            .map_err(clob_error)?,
    };

    match state
        .ledgers
        .sell(&req.game_id, &token_id, req.quantity, price)
        .await
    {
        Ok(ledger) => {
            info!(
                "Simulated sell for game {}: {} x {} @ {:.3}",
                req.game_id, req.quantity, token_id, price
            );
            Ok(Json(json!({
                "success": true,
                "ledger": to_json(&ledger)?,
            })))
        }
        Err(refusal) => {
            warn!("Ledger refused sell for game {}: {}", req.game_id, refusal);
            let ledger = state.ledgers.snapshot(&req.game_id).await;
            Ok(Json(json!({
                "success": false,
                "refused": to_json(&refusal)?,
                "reason": refusal.to_string(),
                "ledger": to_json(&ledger)?,
            })))
        }
    }
}

/// GET /game_ledger/:game_id
async fn game_ledger_handler(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let ledger = state.ledgers.snapshot(&game_id).await;
    Ok(Json(to_json(&ledger)?))
}

/// POST /reset_ledger
async fn reset_ledger_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetLedgerRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let ledger = state
        .ledgers
        .reset(&req.game_id, req.starting_balance)
        .await;
    Ok(Json(json!({
        "success": true,
        "ledger": to_json(&ledger)?,
    })))
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn clob_error(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::BAD_GATEWAY, e.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, (StatusCode, String)> {
    serde_json::to_value(value).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

fn no_data_message(snap: &GameSnapshot) -> String {
    format!(
        "no outcome data for {} with {} out{}",
        snap.bases.describe(),
        snap.outs,
        if snap.outs == 1 { "" } else { "s" }
    )
}
