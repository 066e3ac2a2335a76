// =============================================================================
// Scalp Signal — Main Entry Point
// =============================================================================
//
// Periodically pulls 5m klines for the configured symbols, runs the signal
// engine over each window and serves the latest results over a read-only
// JSON API.  The service never places orders.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod binance;
mod error;
mod indicators;
mod liquidation;
mod market_data;
mod runtime_config;
mod signals;
mod types;

use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::binance::BinanceClient;
use crate::liquidation::LiquidationFeed;
use crate::runtime_config::RuntimeConfig;

const DEFAULT_CONFIG_PATH: &str = "scalp_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Scalp Signal starting up");

    let config_path =
        std::env::var("SCALP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    config.apply_overrides(
        std::env::var("SCALP_SYMBOLS").ok().as_deref(),
        std::env::var("SCALP_BIND_ADDR").ok().as_deref(),
    );

    info!(
        symbols = ?config.symbols,
        interval = %config.interval,
        candle_limit = config.candle_limit,
        refresh_secs = config.refresh_secs,
        "Configured symbols"
    );

    // ── 2. Upstream clients (built once, shared by reference) ────────────
    let client = Arc::new(BinanceClient::new(config.exchange_base_url.clone())?);
    let liquidations = LiquidationFeed::new(config.liquidation_base_url.clone())?;

    // ── 3. Shared state ──────────────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let refresh_secs = config.refresh_secs.max(1);
    let state = Arc::new(AppState::new(config, client.clone(), liquidations));

    let listener = api::rest::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "API server listening");

    let params = state.engine.params();
    info!(
        min_bars = params.min_bars(),
        max_confidence = params.max_confidence(),
        min_confidence = params.min_confidence,
        "Signal engine parameters"
    );
    if (state.config.candle_limit as usize) < params.min_bars() {
        warn!(
            candle_limit = state.config.candle_limit,
            min_bars = params.min_bars(),
            "candle_limit is below the engine's minimum window; every symbol will report ERROR"
        );
    }

    // ── 4. Refresh loop ──────────────────────────────────────────────────
    let refresh_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(refresh_secs));
        loop {
            interval.tick().await;
            let errors = refresh_state.refresh().await;
            if errors == refresh_state.config.symbols.len() && errors > 0 {
                error!(errors, "every symbol failed this refresh");
            }
        }
    });

    // ── 5. Rate-limit window reset ───────────────────────────────────────
    // Binance resets its weight counter each minute; clear ours too so a
    // budget exhausted while idle does not block the next refresh.
    let weight_client = client.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
        interval.tick().await;
        loop {
            interval.tick().await;
            weight_client.rate_limit().reset_1m_weight();
        }
    });

    // ── 6. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state.clone());
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 7. Shutdown ──────────────────────────────────────────────────────
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            warn!("Shutdown signal received");
        }
        served = server => {
            served?.context("API server failed")?;
            anyhow::bail!("API server stopped unexpectedly");
        }
    }
    info!(
        state_version = state.current_state_version(),
        uptime_secs = state.start_time.elapsed().as_secs(),
        "Scalp Signal shut down complete."
    );
    Ok(())
}
