// =============================================================================
// Liquidation Zones — best-effort preview from the Coinglass chart endpoint
// =============================================================================
//
// Presentation-only data: the signal engine never reads it.  Failures are
// folded into `LiquidationPreview::Unavailable` instead of being raised, but
// the reason is kept so callers can tell a quiet market from a broken feed.
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Zones kept in a preview.
const MAX_ZONES: usize = 5;

/// One liquidation cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationZone {
    /// Side being liquidated, as reported by the feed (e.g. "long").
    pub dir: String,
    pub price: f64,
    /// Liquidated notional in millions of USD.
    pub sum: f64,
}

/// Outcome of a liquidation fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LiquidationPreview {
    Available { zones: Vec<LiquidationZone> },
    Unavailable { reason: String },
}

impl LiquidationPreview {
    /// Plain-text rendering for the dashboard.
    pub fn render(&self) -> String {
        match self {
            Self::Available { zones } if zones.is_empty() => "No liquidation data.".to_string(),
            Self::Available { zones } => zones
                .iter()
                .map(|z| format!("{} @ {} -> {:.2}M", z.dir, z.price, z.sum))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Unavailable { .. } => "Error fetching liquidation".to_string(),
        }
    }
}

/// Reduce a trading pair to the base asset the feed expects:
/// `"1000BONK/USDT"` -> `"BONK"`, `"BTCUSDT"` -> `"BTC"`.
pub fn base_asset(symbol: &str) -> String {
    symbol
        .replace("USDT", "")
        .replace('/', "")
        .replace("1000", "")
        .to_uppercase()
}

/// Fetches liquidation clusters for a symbol.
pub struct LiquidationFeed {
    base_url: String,
    client: reqwest::Client,
}

impl LiquidationFeed {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(8))
            .user_agent("Mozilla/5.0")
            .build()
            .context("failed to build reqwest client for LiquidationFeed")?;
        Ok(Self::with_client(base_url, client))
    }

    /// Create a feed that re-uses an existing HTTP client.
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Fetch up to five zones for `symbol`.  Never fails.
    pub async fn fetch(&self, symbol: &str) -> LiquidationPreview {
        match self.try_fetch(symbol).await {
            Ok(zones) => LiquidationPreview::Available { zones },
            Err(e) => {
                warn!(symbol, error = %e, "liquidation feed unavailable");
                LiquidationPreview::Unavailable {
                    reason: format!("{e:#}"),
                }
            }
        }
    }

    async fn try_fetch(&self, symbol: &str) -> Result<Vec<LiquidationZone>> {
        let base = base_asset(symbol);
        let url = format!("{}/api/futures/liquidation_chart", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", base.as_str()), ("type", "binance")])
            .header("accept", "application/json")
            .header("origin", "https://www.coinglass.com")
            .header("referer", "https://www.coinglass.com/")
            .send()
            .await
            .with_context(|| format!("GET liquidation chart for {base}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("liquidation API returned {}: {}", status, body);
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse liquidation response body")?;

        let zones = match body["data"]["binance"].as_array() {
            Some(entries) => entries
                .iter()
                .take(MAX_ZONES)
                .map(|z| serde_json::from_value::<LiquidationZone>(z.clone()))
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("malformed liquidation zone")?,
            None => Vec::new(),
        };

        debug!(symbol = %base, count = zones.len(), "liquidation zones fetched");
        Ok(zones)
    }
}
