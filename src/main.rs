use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod api;
mod config;
mod engine;
mod polymarket;
mod sim;

use api::AppState;
use config::Config;
use engine::{OutcomeTable, RealProbabilityTable};
use polymarket::ClobClient;
use sim::LedgerBook;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    if config.dry_run {
        info!(
            "🟡 DRY RUN mode – trades go to the simulated ledger (starting balance: ${:.2})",
            config.initial_balance
        );
    } else {
        info!("🔴 LIVE mode – orders WILL be mirrored to the Polymarket CLOB");
    }

    // Load the play outcome catalog
    let outcomes = OutcomeTable::load(&config.transition_data_path).with_context(|| {
        format!(
            "loading play transitions from {}",
            config.transition_data_path
        )
    })?;
    info!(
        "Loaded {} base/out states ({} play outcomes) from {}",
        outcomes.state_count(),
        outcomes.outcome_count(),
        config.transition_data_path
    );

    let probabilities =
        RealProbabilityTable::load(&config.probability_data_path).with_context(|| {
            format!(
                "loading outcome probabilities from {}",
                config.probability_data_path
            )
        })?;
    info!(
        "Loaded {} outcome probability entries across {} base states from {}",
        probabilities.entry_count(),
        probabilities.state_count(),
        config.probability_data_path
    );

    // Build the CLOB client
    let clob = ClobClient::new(
        &config.polymarket_clob_url,
        config.chain_id,
        config.polymarket_api_key.clone(),
        config.polymarket_private_key.clone(),
    )?;
    if clob.has_credentials() {
        info!("CLOB credentials configured");
    } else {
        info!("No CLOB credentials; authenticated endpoints will be rejected upstream");
    }

    let ledgers = LedgerBook::new(config.initial_balance);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address {}", config.listen_addr))?;
    let state = AppState {
        config,
        outcomes: Arc::new(outcomes),
        probabilities: Arc::new(probabilities),
        clob,
        ledgers,
    };
    let app = api::router(state);

    info!("API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
