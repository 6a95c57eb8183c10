use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, info};

/// Client for the Polymarket CLOB (central limit order book) REST API.
///
/// Order signing is the trading client's concern; this client forwards
/// unsigned order fields with the account credentials attached as the
/// `owner` field and bearer header. Key material is never logged.
#[derive(Clone)]
pub struct ClobClient {
    http: Client,
    clob_url: String,
    chain_id: u64,
    api_key: Option<String>,
    private_key: Option<String>,
}

impl ClobClient {
    pub fn new(
        clob_url: &str,
        chain_id: u64,
        api_key: Option<String>,
        private_key: Option<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ClobClient {
            http,
            clob_url: clob_url.trim_end_matches('/').to_string(),
            chain_id,
            api_key,
            private_key,
        })
    }

    /// Both the API key and the signer key are configured.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.private_key.is_some()
    }

    /// Liveness probe against the CLOB's `/ok` endpoint.
    pub async fn is_reachable(&self) -> bool {
        let url = format!("{}/ok", self.clob_url);
        match self.http.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("CLOB liveness probe failed: {}", e);
                false
            }
        }
    }

    /// Balance and allowance of a conditional outcome token, as the raw JSON
    /// document the CLOB returns.
    pub async fn get_balance_allowance(&self, token_id: &str) -> Result<serde_json::Value> {
        let url = format!("{}/balance-allowance", self.clob_url);
        debug!("Fetching balance-allowance for token {}", token_id);

        let resp = self
            .authorized(self.http.get(&url))
            .query(&[("asset_type", "CONDITIONAL"), ("token_id", token_id)])
            .send()
            .await
            .context("CLOB balance-allowance request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("CLOB balance-allowance error {}: {}", status, body);
        }

        resp.json()
            .await
            .context("Failed to parse balance-allowance response")
    }

    /// Refresh the exchange allowance for a conditional token. Success or
    /// failure only; callers re-read the balance afterwards.
    pub async fn update_balance_allowance(&self, token_id: &str) -> Result<()> {
        let url = format!("{}/balance-allowance/update", self.clob_url);
        info!("Updating allowance for token {}", token_id);

        let resp = self
            .authorized(self.http.get(&url))
            .query(&[("asset_type", "CONDITIONAL"), ("token_id", token_id)])
            .send()
            .await
            .context("CLOB allowance update request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("CLOB allowance update error {}: {}", status, body);
        }
        Ok(())
    }

    /// Place a Fill-or-Kill BUY order for `size` contracts at `price`.
    /// Returns the CLOB's raw order response.
    pub async fn post_order(
        &self,
        token_id: &str,
        price: f64,
        size: f64,
    ) -> Result<serde_json::Value> {
        info!(
            "Posting FOK BUY: token={}, price={:.3}, size={}",
            token_id, price, size
        );

        let body = order_body(token_id, price, size, self.chain_id, self.api_key.as_deref());
        let url = format!("{}/order", self.clob_url);
        let resp = self
            .authorized(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .context("CLOB order request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Order placement failed {}: {}", status, body);
        }

        let result: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse order response")?;
        info!(
            "Order accepted, id={}",
            result["orderID"].as_str().unwrap_or("unknown")
        );
        Ok(result)
    }

    /// Midpoint price of a token's order book, in (0, 1).
    pub async fn get_midpoint(&self, token_id: &str) -> Result<f64> {
        let url = format!("{}/midpoint", self.clob_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("token_id", token_id)])
            .send()
            .await
            .context("CLOB midpoint request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("CLOB midpoint error {}: {}", status, body);
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse midpoint response")?;
        parse_mid(&raw)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key.as_deref() {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }
}

// ── Parsing helpers ──────────────────────────────────────────────────────────

/// Unsigned FOK BUY order body. `signatureType` 1 marks an EOA signer; the
/// downstream signing client fills in the signature.
fn order_body(
    token_id: &str,
    price: f64,
    size: f64,
    chain_id: u64,
    owner: Option<&str>,
) -> serde_json::Value {
    serde_json::json!({
        "tokenID": token_id,
        "price": price,
        "size": size,
        "side": "BUY",
        "orderType": "FOK",
        "chainId": chain_id,
        "signatureType": 1,
        "owner": owner.unwrap_or_default(),
    })
}

/// The midpoint endpoint returns `{"mid": "0.55"}`, with `mid` sometimes a
/// number instead of a string.
fn parse_mid(raw: &serde_json::Value) -> Result<f64> {
    let mid = raw["mid"]
        .as_f64()
        .or_else(|| raw["mid"].as_str().and_then(|s| s.parse().ok()))
        .context("midpoint response missing 'mid' field")?;
    if mid <= 0.0 || mid >= 1.0 {
        anyhow::bail!("midpoint {} outside the open interval (0, 1)", mid);
    }
    Ok(mid)
}
