// =============================================================================
// Central Application State — scalp-signal service
// =============================================================================
//
// Ties the exchange client, the signal engine, the cached price windows and
// the latest batch results together for the refresh loop and the dashboard
// API.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for the latest-results map.
//   - The exchange client is shared through `Arc`; the engine is immutable.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::binance::BinanceClient;
use crate::liquidation::LiquidationFeed;
use crate::market_data::{Candle, CandleBuffer, CandleKey};
use crate::runtime_config::RuntimeConfig;
use crate::signals::{evaluate_batch, normalize_symbol, SignalEngine, SignalResult, ThresholdTable};
use crate::types::SignalClass;

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    /// Incremented after every refresh and on-demand evaluation.
    pub state_version: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub config: RuntimeConfig,

    // ── Upstream feeds ──────────────────────────────────────────────────
    pub client: Arc<BinanceClient>,
    pub liquidations: LiquidationFeed,

    // ── Signal pipeline ─────────────────────────────────────────────────
    pub engine: SignalEngine,
    pub candle_buffer: CandleBuffer,
    /// Latest result per normalised symbol.
    pub latest_signals: RwLock<HashMap<String, SignalResult>>,
    pub last_refresh: RwLock<Option<DateTime<Utc>>>,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Build the state from `config` and the already constructed upstream
    /// clients.  The engine's threshold table is the built-in one with the
    /// config's overrides layered on top.
    pub fn new(config: RuntimeConfig, client: Arc<BinanceClient>, liquidations: LiquidationFeed) -> Self {
        let thresholds = ThresholdTable::default().with_overrides(&config.threshold_overrides);
        let engine = SignalEngine::new(config.engine.clone(), thresholds);
        let candle_buffer = CandleBuffer::new(config.candle_limit as usize);

        Self {
            state_version: AtomicU64::new(1),
            config,
            client,
            liquidations,
            engine,
            candle_buffer,
            latest_signals: RwLock::new(HashMap::new()),
            last_refresh: RwLock::new(None),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Market data ─────────────────────────────────────────────────────

    pub fn candle_key(&self, symbol: &str) -> CandleKey {
        CandleKey::new(normalize_symbol(symbol), self.config.interval.clone())
    }

    /// True when `symbol` is one of the configured symbols, in any spelling.
    pub fn is_configured(&self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        self.config.symbols.iter().any(|s| normalize_symbol(s) == symbol)
    }

    /// Fetch the configured window for `symbol`.  Only configured symbols
    /// are cached for charting, so ad-hoc lookups cannot grow the cache.
    pub async fn fetch_window(&self, symbol: &str) -> Result<Vec<Candle>> {
        let symbol = normalize_symbol(symbol);
        let candles = self
            .client
            .fetch_series(&symbol, &self.config.interval, self.config.candle_limit)
            .await?;
        if self.is_configured(&symbol) {
            self.candle_buffer.replace(self.candle_key(&symbol), candles.clone());
        }
        Ok(candles)
    }

    // ── Evaluation ──────────────────────────────────────────────────────

    /// Run one batch over the configured symbols and publish the results.
    /// Returns the number of ERROR-class results.
    pub async fn refresh(&self) -> usize {
        let results = evaluate_batch(
            &self.config.symbols,
            self.config.batch_concurrency,
            |symbol: String| async move { self.fetch_window(&symbol).await },
            &self.engine,
        )
        .await;

        let errors = results.iter().filter(|r| r.signal == SignalClass::Error).count();
        let actionable = results
            .iter()
            .filter(|r| r.is_actionable(self.config.display_min_confidence))
            .count();

        {
            let mut latest = self.latest_signals.write();
            for result in results {
                let key = self.candle_key(&result.symbol);
                debug!(
                    symbol = %result.symbol,
                    signal = %result.signal,
                    bars = self.candle_buffer.count(&key),
                    last_close = ?self.candle_buffer.last_close(&key),
                    "signal published"
                );
                latest.insert(result.symbol.clone(), result);
            }
        }
        *self.last_refresh.write() = Some(Utc::now());
        self.increment_version();

        info!(
            symbols = self.config.symbols.len(),
            actionable,
            errors,
            used_weight = self.client.rate_limit().used_weight(),
            "refresh complete"
        );
        errors
    }

    /// Record an on-demand result so the batch view stays current.  Results
    /// for symbols outside the configured set are not retained.
    pub fn publish(&self, result: SignalResult) {
        if !self.is_configured(&result.symbol) {
            return;
        }
        self.latest_signals.write().insert(result.symbol.clone(), result);
        self.increment_version();
    }

    /// Latest results in configured symbol order; symbols not evaluated yet
    /// are skipped.
    pub fn latest_in_order(&self) -> Vec<SignalResult> {
        let latest = self.latest_signals.read();
        self.config
            .symbols
            .iter()
            .filter_map(|s| latest.get(&normalize_symbol(s)).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn klines(n: usize, start: f64) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = (0..n)
            .map(|i| {
                let c = start + i as f64;
                json!([
                    i as i64 * 300_000,
                    c.to_string(),
                    (c + 0.5).to_string(),
                    (c - 0.5).to_string(),
                    c.to_string(),
                    "1.0"
                ])
            })
            .collect();
        json!(rows)
    }

    async fn state_against(server: &MockServer, symbols: &[&str]) -> AppState {
        let config = RuntimeConfig {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            ..RuntimeConfig::default()
        };
        let client = Arc::new(BinanceClient::with_client(server.uri(), reqwest::Client::new()));
        let feed = LiquidationFeed::with_client(server.uri(), reqwest::Client::new());
        AppState::new(config, client, feed)
    }

    #[tokio::test]
    async fn refresh_publishes_every_symbol_and_caches_windows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/klines"))
            .and(query_param("symbol", "BTCUSDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(klines(40, 100.0)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/klines"))
            .and(query_param("symbol", "ETHUSDT"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"msg": "down"})))
            .mount(&server)
            .await;

        let state = state_against(&server, &["BTCUSDT", "ETHUSDT"]).await;
        let before = state.current_state_version();
        let errors = state.refresh().await;

        assert_eq!(errors, 1);
        assert!(state.current_state_version() > before);
        assert!(state.last_refresh.read().is_some());

        let latest = state.latest_in_order();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].symbol, "BTCUSDT");
        assert_eq!(latest[0].signal, SignalClass::Hold);
        assert_eq!(latest[1].signal, SignalClass::Error);

        let key = state.candle_key("BTC/USDT");
        assert_eq!(state.candle_buffer.count(&key), 40);
        assert_eq!(state.candle_buffer.last_close(&key), Some(139.0));
    }

    #[tokio::test]
    async fn unconfigured_symbols_are_not_retained() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/klines"))
            .respond_with(ResponseTemplate::new(200).set_body_json(klines(30, 10.0)))
            .mount(&server)
            .await;

        let state = state_against(&server, &["BTCUSDT"]).await;
        assert!(state.is_configured("btc/usdt"));
        assert!(!state.is_configured("DOGEUSDT"));

        let candles = state.fetch_window("DOGEUSDT").await.unwrap();
        assert_eq!(candles.len(), 30);
        assert_eq!(state.candle_buffer.count(&state.candle_key("DOGEUSDT")), 0);

        let version = state.current_state_version();
        state.publish(SignalResult::error("DOGEUSDT", "x"));
        assert!(state.latest_signals.read().is_empty());
        assert_eq!(state.current_state_version(), version);

        state.fetch_window("BTCUSDT").await.unwrap();
        assert_eq!(state.candle_buffer.count(&state.candle_key("BTCUSDT")), 30);
        state.publish(SignalResult::error("BTCUSDT", "x"));
        assert_eq!(state.latest_signals.read().len(), 1);
    }

    #[tokio::test]
    async fn threshold_overrides_reach_the_engine() {
        let server = MockServer::start().await;
        let mut config = RuntimeConfig::default();
        config.threshold_overrides.insert("btc/usdt".into(), 12.5);
        let client = Arc::new(BinanceClient::with_client(server.uri(), reqwest::Client::new()));
        let feed = LiquidationFeed::with_client(server.uri(), reqwest::Client::new());
        let state = AppState::new(config, client, feed);

        assert_eq!(state.engine.thresholds().lookup("BTCUSDT"), 12.5);
        assert_eq!(state.engine.thresholds().lookup("ETHUSDT"), 7.0);
    }
}
