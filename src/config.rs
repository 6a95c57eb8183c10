use clap::Parser;

/// Baseball play-quality engine and Polymarket trading proxy
#[derive(Parser, Debug, Clone)]
#[command(name = "dugout-bot", version, about)]
pub struct Config {
    /// Simulate trades only (no real CLOB orders placed)
    #[arg(long, env = "DRY_RUN", default_value = "true")]
    pub dry_run: bool,

    /// HTTP listen address for the API
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen_addr: String,

    /// Polymarket CLOB (Central Limit Order Book) URL
    #[arg(
        long,
        env = "POLYMARKET_CLOB_URL",
        default_value = "https://clob.polymarket.com"
    )]
    pub polymarket_clob_url: String,

    /// Chain ID for CLOB orders (137 = Polygon mainnet)
    #[arg(long, env = "POLYMARKET_CHAIN_ID", default_value = "137")]
    pub chain_id: u64,

    /// Polymarket API key (required for live trading)
    #[arg(long, env = "POLYMARKET_API_KEY")]
    pub polymarket_api_key: Option<String>,

    /// Polymarket private key for the downstream order signer
    #[arg(long, env = "POLYMARKET_PRIVATE_KEY")]
    pub polymarket_private_key: Option<String>,

    /// Outcome token the frontend trades when no token is specified
    #[arg(
        long,
        env = "DEFAULT_TOKEN_ID",
        default_value = "114183019933082513843876282428124080806413441694571280704200740076696508405866"
    )]
    pub default_token_id: String,

    /// Play-transition dataset (JSON, keyed by bases/outs)
    #[arg(
        long,
        env = "TRANSITION_DATA_PATH",
        default_value = "data/play_transitions.json"
    )]
    pub transition_data_path: String,

    /// Real-probability dataset (JSON, initial-bases key to outcome key)
    #[arg(
        long,
        env = "PROBABILITY_DATA_PATH",
        default_value = "data/outcome_probabilities.json"
    )]
    pub probability_data_path: String,

    /// Starting cash for each game's simulated ledger (USD)
    #[arg(long, env = "INITIAL_BALANCE", default_value = "1000.0")]
    pub initial_balance: f64,

    /// Maximum fraction of bankroll to bet (Kelly multiplier, 0.0–1.0)
    #[arg(long, env = "KELLY_FRACTION", default_value = "0.25")]
    pub kelly_fraction: f64,

    /// Minimum edge required to place a trade (e.g. 0.03 = 3%)
    #[arg(long, env = "MIN_EDGE", default_value = "0.03")]
    pub min_edge: f64,

    /// Maximum contracts per simulated trade
    #[arg(long, env = "MAX_CONTRACTS", default_value = "100")]
    pub max_contracts: u32,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.dry_run {
            if self.polymarket_api_key.is_none() {
                anyhow::bail!(
                    "POLYMARKET_API_KEY is required in live trading mode. Use --dry-run for simulation."
                );
            }
            if self.polymarket_private_key.is_none() {
                anyhow::bail!(
                    "POLYMARKET_PRIVATE_KEY is required in live trading mode. Use --dry-run for simulation."
                );
            }
        }
        if !(0.0..=1.0).contains(&self.kelly_fraction) {
            anyhow::bail!("kelly_fraction must be between 0.0 and 1.0");
        }
        if !(0.0..=1.0).contains(&self.min_edge) {
            anyhow::bail!("min_edge must be between 0.0 and 1.0");
        }
        if self.initial_balance <= 0.0 {
            anyhow::bail!("initial_balance must be positive");
        }
        if self.max_contracts == 0 {
            anyhow::bail!("max_contracts must be at least 1");
        }
        if self.default_token_id.trim().is_empty() {
            anyhow::bail!("default_token_id must not be empty");
        }
        Ok(())
    }
}
