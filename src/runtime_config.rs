// =============================================================================
// Runtime Configuration — engine constants and service settings
// =============================================================================
//
// Every tunable lives here: the symbols to watch, how the klines window is
// fetched, the signal-engine scoring constants, and per-symbol threshold
// overrides.  All fields carry `#[serde(default)]` so that a partial JSON
// file (or `{}`) still loads.
// =============================================================================

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "BTCUSDT".to_string(),
        "ETHUSDT".to_string(),
        "SOLUSDT".to_string(),
        "XRPUSDT".to_string(),
        "1000BONKUSDT".to_string(),
    ]
}

fn default_interval() -> String {
    "5m".to_string()
}

fn default_candle_limit() -> u32 {
    200
}

fn default_refresh_secs() -> u64 {
    60
}

fn default_batch_concurrency() -> usize {
    4
}

fn default_display_min_confidence() -> u32 {
    50
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_exchange_base_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_liquidation_base_url() -> String {
    "https://fapi.coinglass.com".to_string()
}

fn default_rsi_period() -> usize {
    14
}

fn default_trend_fast_period() -> usize {
    5
}

fn default_trend_slow_period() -> usize {
    20
}

fn default_sr_lookback() -> usize {
    20
}

fn default_atr_period() -> usize {
    14
}

fn default_lag_bars() -> usize {
    3
}

fn default_move_trigger_ratio() -> f64 {
    0.6
}

fn default_stop_ratio() -> f64 {
    0.5
}

fn default_rsi_long_below() -> f64 {
    45.0
}

fn default_rsi_short_above() -> f64 {
    55.0
}

fn default_base_confidence() -> u32 {
    40
}

fn default_trend_bonus() -> u32 {
    30
}

fn default_breakout_bonus() -> u32 {
    20
}

fn default_min_confidence() -> u32 {
    35
}

// =============================================================================
// EngineParams
// =============================================================================

/// Look-back periods and scoring constants of the signal engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineParams {
    /// RSI averaging period.
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    /// Fast SMA period for trend classification.
    #[serde(default = "default_trend_fast_period")]
    pub trend_fast_period: usize,

    /// Slow SMA period for trend classification.
    #[serde(default = "default_trend_slow_period")]
    pub trend_slow_period: usize,

    /// Support / resistance look-back window.
    #[serde(default = "default_sr_lookback")]
    pub sr_lookback: usize,

    /// ATR-proxy averaging period.
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    /// How many bars before the latest bar the reference price is taken.
    #[serde(default = "default_lag_bars")]
    pub lag_bars: usize,

    /// A move smaller than `move_trigger_ratio * target` is ignored.
    #[serde(default = "default_move_trigger_ratio")]
    pub move_trigger_ratio: f64,

    /// Stop distance as a fraction of the target distance.
    #[serde(default = "default_stop_ratio")]
    pub stop_ratio: f64,

    /// RSI strictly below this opens a LONG candidate.
    #[serde(default = "default_rsi_long_below")]
    pub rsi_long_below: f64,

    /// RSI strictly above this opens a SHORT candidate.
    #[serde(default = "default_rsi_short_above")]
    pub rsi_short_above: f64,

    /// Confidence awarded to any candidate.
    #[serde(default = "default_base_confidence")]
    pub base_confidence: u32,

    /// Bonus when the trend agrees with the candidate direction.
    #[serde(default = "default_trend_bonus")]
    pub trend_bonus: u32,

    /// Bonus when price has broken support (LONG) or resistance (SHORT).
    #[serde(default = "default_breakout_bonus")]
    pub breakout_bonus: u32,

    /// Results below this confidence are demoted to HOLD.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: u32,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            trend_fast_period: default_trend_fast_period(),
            trend_slow_period: default_trend_slow_period(),
            sr_lookback: default_sr_lookback(),
            atr_period: default_atr_period(),
            lag_bars: default_lag_bars(),
            move_trigger_ratio: default_move_trigger_ratio(),
            stop_ratio: default_stop_ratio(),
            rsi_long_below: default_rsi_long_below(),
            rsi_short_above: default_rsi_short_above(),
            base_confidence: default_base_confidence(),
            trend_bonus: default_trend_bonus(),
            breakout_bonus: default_breakout_bonus(),
            min_confidence: default_min_confidence(),
        }
    }
}

impl EngineParams {
    /// Fewest bars for which every indicator and the lagged price are defined.
    pub fn min_bars(&self) -> usize {
        [
            self.rsi_period + 1,
            self.trend_fast_period,
            self.trend_slow_period,
            self.sr_lookback,
            self.atr_period,
            self.lag_bars + 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }

    /// Highest confidence the scoring constants can produce.
    pub fn max_confidence(&self) -> u32 {
        self.base_confidence + self.trend_bonus + self.breakout_bonus
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration of the signal service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Market data ---------------------------------------------------------

    /// Symbols evaluated by the refresh loop, in exchange form (`BTCUSDT`).
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Kline interval requested from the exchange.
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Number of bars in each fetched window.
    #[serde(default = "default_candle_limit")]
    pub candle_limit: u32,

    /// Seconds between batch refreshes.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,

    /// Maximum symbols fetched and evaluated at the same time.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    // --- Endpoints -----------------------------------------------------------

    #[serde(default = "default_exchange_base_url")]
    pub exchange_base_url: String,

    #[serde(default = "default_liquidation_base_url")]
    pub liquidation_base_url: String,

    /// Address the dashboard API listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // --- Signal engine -------------------------------------------------------

    /// Default `min_confidence` used by the dashboard to flag a result as
    /// actionable.  Independent of the engine's own HOLD gate.
    #[serde(default = "default_display_min_confidence")]
    pub display_min_confidence: u32,

    /// Per-symbol move thresholds layered over the built-in table.
    #[serde(default)]
    pub threshold_overrides: HashMap<String, f64>,

    #[serde(default)]
    pub engine: EngineParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            interval: default_interval(),
            candle_limit: default_candle_limit(),
            refresh_secs: default_refresh_secs(),
            batch_concurrency: default_batch_concurrency(),
            exchange_base_url: default_exchange_base_url(),
            liquidation_base_url: default_liquidation_base_url(),
            bind_addr: default_bind_addr(),
            display_min_confidence: default_display_min_confidence(),
            threshold_overrides: HashMap::new(),
            engine: EngineParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            interval = %config.interval,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Apply `SCALP_SYMBOLS` / `SCALP_BIND_ADDR` style overrides.
    ///
    /// `symbols` is a comma-separated list; blank entries are ignored and an
    /// all-blank list leaves the configured symbols untouched.
    pub fn apply_overrides(&mut self, symbols: Option<&str>, bind_addr: Option<&str>) {
        if let Some(list) = symbols {
            let parsed: Vec<String> = list
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            if !parsed.is_empty() {
                self.symbols = parsed;
            }
        }
        if let Some(addr) = bind_addr.map(str::trim).filter(|a| !a.is_empty()) {
            self.bind_addr = addr.to_string();
        }
    }
}
