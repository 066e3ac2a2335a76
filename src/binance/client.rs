// =============================================================================
// Binance REST API Client — public klines only
// =============================================================================
//
// Constructed once in main.rs and shared by reference (`Arc<BinanceClient>`)
// with the refresh loop and the API handlers.  No credentials are needed: the
// klines endpoint is public.  Every response's used-weight header feeds the
// `RateLimitTracker`, and requests are refused locally once the weight budget
// for the current minute is spent.
// =============================================================================

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::binance::rate_limit::RateLimitTracker;
use crate::market_data::{normalize_order, Candle};

/// Request weight Binance charges for a klines call with `limit <= 100`.
const KLINES_WEIGHT_SMALL: u32 = 1;
/// Request weight for `limit` in 101..=500.
const KLINES_WEIGHT_MEDIUM: u32 = 2;
/// Request weight for larger limits.
const KLINES_WEIGHT_LARGE: u32 = 5;

/// Binance spot REST client.
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
    rate_limit: RateLimitTracker,
}

impl BinanceClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client against `base_url` (e.g. `https://api.binance.com`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self::with_client(base_url, client))
    }

    /// Create a client that re-uses an existing HTTP client.
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "BinanceClient initialised");
        Self {
            base_url,
            client,
            rate_limit: RateLimitTracker::new(),
        }
    }

    pub fn rate_limit(&self) -> &RateLimitTracker {
        &self.rate_limit
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /api/v3/klines — the most recent `limit` bars of `symbol`,
    /// oldest-first.
    ///
    /// Array indices of each entry:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume, ...
    ///
    /// An entry that is too short or violates the OHLC invariant fails the
    /// whole window: skipping it would shift the lagged price onto a
    /// different bar.  The result is sorted by open time with duplicate
    /// timestamps removed.
    #[instrument(skip(self), name = "binance::fetch_series")]
    pub async fn fetch_series(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        let weight = klines_weight(limit);
        if !self.rate_limit.can_send_request(weight) {
            anyhow::bail!("request weight budget exhausted, refusing klines request for {symbol}");
        }

        let url = format!("{}/api/v3/klines", self.base_url);
        let limit_param = limit.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("interval", interval), ("limit", limit_param.as_str())])
            .send()
            .await
            .context("GET /api/v3/klines request failed")?;

        self.rate_limit.update_from_headers(resp.headers());

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Binance GET /api/v3/klines returned {}: {}", status, body);
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse klines response")?;

        let mut candles = parse_klines(&body)?;
        normalize_order(&mut candles);

        debug!(symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Internal helpers
// -----------------------------------------------------------------------------

fn klines_weight(limit: u32) -> u32 {
    match limit {
        0..=100 => KLINES_WEIGHT_SMALL,
        101..=500 => KLINES_WEIGHT_MEDIUM,
        _ => KLINES_WEIGHT_LARGE,
    }
}

/// Parse Binance's array-of-arrays klines payload.
fn parse_klines(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());
    for entry in raw {
        let arr = entry.as_array().context("kline entry is not an array")?;

        if arr.len() < 6 {
            anyhow::bail!("malformed kline entry with {} elements", arr.len());
        }

        let open_time = arr[0].as_i64().context("kline open time is not an integer")?;
        let candle = Candle::new(
            open_time,
            parse_str_f64(&arr[1])?,
            parse_str_f64(&arr[2])?,
            parse_str_f64(&arr[3])?,
            parse_str_f64(&arr[4])?,
            parse_str_f64(&arr[5])?,
        );

        if !candle.is_well_formed() {
            warn!(open_time, "kline violates the OHLC invariant");
            anyhow::bail!("kline at {open_time} violates the OHLC invariant");
        }
        candles.push(candle);
    }

    Ok(candles)
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or number, got: {val}")
    }
}
