// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Read-only dashboard API under `/api/v1/`.  Nothing here places orders or
// mutates configuration; the only side effect is that an on-demand
// evaluation of a configured symbol refreshes its cached window and latest
// result.
//
// CORS is permissive so a locally served dashboard can poll the API.
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api::error::ApiError;
use crate::app_state::AppState;
use crate::binance::rate_limit::RateLimitSnapshot;
use crate::liquidation::{base_asset, LiquidationPreview};
use crate::market_data::Candle;
use crate::signals::{normalize_symbol, SignalResult};

/// Share of the price range added above and below the chart's y-axis.
const CHART_PADDING_RATIO: f64 = 0.05;

// =============================================================================
// Router construction
// =============================================================================

/// Build the REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/signals", get(signals))
        .route("/api/v1/signals/:symbol", get(signal_for_symbol))
        .route("/api/v1/candles/:symbol", get(candles))
        .route("/api/v1/liquidations/:symbol", get(liquidations))
        .layer(cors)
        .with_state(state)
}

/// Bind the API listener.  Called from `main` before anything is spawned so
/// an unusable address stops the process.
pub async fn bind(addr: &str) -> anyhow::Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind API server on {addr}"))
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
    uptime_secs: u64,
    last_refresh: Option<DateTime<Utc>>,
    rate_limit: RateLimitSnapshot,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: Utc::now().timestamp_millis(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        last_refresh: *state.last_refresh.read(),
        rate_limit: state.client.rate_limit().snapshot(),
    };
    Json(resp)
}

// =============================================================================
// Latest batch results
// =============================================================================

#[derive(Deserialize)]
struct SignalsQuery {
    #[serde(default)]
    min_confidence: Option<u32>,
}

#[derive(Serialize)]
struct SignalView {
    #[serde(flatten)]
    result: SignalResult,
    actionable: bool,
}

#[derive(Serialize)]
struct SignalsResponse {
    state_version: u64,
    min_confidence: u32,
    signals: Vec<SignalView>,
}

async fn signals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SignalsQuery>,
) -> impl IntoResponse {
    let min_confidence = query
        .min_confidence
        .unwrap_or(state.config.display_min_confidence);

    let signals = state
        .latest_in_order()
        .into_iter()
        .map(|result| SignalView {
            actionable: result.is_actionable(min_confidence),
            result,
        })
        .collect();

    Json(SignalsResponse {
        state_version: state.current_state_version(),
        min_confidence,
        signals,
    })
}

// =============================================================================
// On-demand evaluation
// =============================================================================

async fn signal_for_symbol(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<SignalResult>, ApiError> {
    let symbol = normalize_symbol(&symbol);
    let candles = state
        .fetch_window(&symbol)
        .await
        .map_err(|e| ApiError::Upstream(format!("{e:#}")))?;

    if candles.is_empty() {
        return Err(ApiError::NotFound(format!("no market data for {symbol}")));
    }

    let result = state.engine.evaluate(&candles, &symbol)?;
    info!(
        symbol = %result.symbol,
        signal = %result.signal,
        confidence = result.confidence,
        "on-demand evaluation"
    );
    state.publish(result.clone());
    Ok(Json(result))
}

// =============================================================================
// Cached window for charting
// =============================================================================

#[derive(Serialize)]
struct CandlesResponse {
    symbol: String,
    interval: String,
    threshold: f64,
    last_close: Option<f64>,
    last_bar_time: Option<DateTime<Utc>>,
    y_min: f64,
    y_max: f64,
    candles: Vec<Candle>,
}

/// Y-axis bounds for a candlestick chart: lowest low and highest high,
/// each pushed out by 5 % of the range.
fn chart_bounds(candles: &[Candle]) -> Option<(f64, f64)> {
    let low = candles.iter().map(|c| c.low).reduce(f64::min)?;
    let high = candles.iter().map(|c| c.high).reduce(f64::max)?;
    let pad = (high - low) * CHART_PADDING_RATIO;
    Some((low - pad, high + pad))
}

async fn candles(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<CandlesResponse>, ApiError> {
    let symbol = normalize_symbol(&symbol);
    let key = state.candle_key(&symbol);
    let candles = state
        .candle_buffer
        .get_recent(&key, state.config.candle_limit as usize);

    let (y_min, y_max) = chart_bounds(&candles)
        .ok_or_else(|| ApiError::NotFound(format!("no cached window for {key}")))?;

    Ok(Json(CandlesResponse {
        threshold: state.engine.thresholds().lookup(&symbol),
        last_close: state.candle_buffer.last_close(&key),
        last_bar_time: candles.last().and_then(Candle::timestamp),
        interval: state.config.interval.clone(),
        symbol,
        y_min,
        y_max,
        candles,
    }))
}

// =============================================================================
// Liquidation preview
// =============================================================================

#[derive(Serialize)]
struct LiquidationsResponse {
    symbol: String,
    base_asset: String,
    preview: LiquidationPreview,
    text: String,
}

async fn liquidations(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> impl IntoResponse {
    let symbol = normalize_symbol(&symbol);
    let preview = state.liquidations.fetch(&symbol).await;
    Json(LiquidationsResponse {
        base_asset: base_asset(&symbol),
        text: preview.render(),
        symbol,
        preview,
    })
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::binance::BinanceClient;
    use crate::liquidation::LiquidationFeed;
    use crate::runtime_config::RuntimeConfig;
    use crate::types::SignalClass;

    fn klines(n: usize) -> Value {
        let rows: Vec<Value> = (0..n)
            .map(|i| {
                let c = 100.0 + i as f64;
                json!([i as i64 * 300_000, c.to_string(), (c + 0.5).to_string(), (c - 0.5).to_string(), c.to_string(), "2"])
            })
            .collect();
        json!(rows)
    }

    fn state_for(server: &MockServer) -> Arc<AppState> {
        let config = RuntimeConfig {
            symbols: vec!["BTCUSDT".into(), "ETHUSDT".into()],
            ..RuntimeConfig::default()
        };
        let client = Arc::new(BinanceClient::with_client(server.uri(), reqwest::Client::new()));
        let feed = LiquidationFeed::with_client(server.uri(), reqwest::Client::new());
        Arc::new(AppState::new(config, client, feed))
    }

    async fn mount_klines(server: &MockServer, symbol: &str, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/api/v3/klines"))
            .and(query_param("symbol", symbol))
            .respond_with(template)
            .mount(server)
            .await;
    }

    async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
        let resp = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn long_result(symbol: &str, confidence: u32) -> SignalResult {
        SignalResult {
            symbol: symbol.into(),
            signal: SignalClass::Long,
            confidence,
            indicators: None,
            levels: None,
            reason: None,
        }
    }

    #[test]
    fn chart_bounds_pad_five_percent() {
        let candles = vec![
            Candle::new(0, 100.0, 110.0, 90.0, 105.0, 1.0),
            Candle::new(1, 105.0, 130.0, 100.0, 120.0, 1.0),
        ];
        let (lo, hi) = chart_bounds(&candles).unwrap();
        assert!((lo - 88.0).abs() < 1e-9);
        assert!((hi - 132.0).abs() < 1e-9);
        assert!(chart_bounds(&[]).is_none());
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let server = MockServer::start().await;
        let (status, body) = get(state_for(&server), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["rate_limit"]["hard_limit"], 1000);
        assert!(body["last_refresh"].is_null());
    }

    #[tokio::test]
    async fn signals_flag_actionable_by_min_confidence() {
        let server = MockServer::start().await;
        let state = state_for(&server);
        state.publish(long_result("ETHUSDT", 70));
        state.publish(long_result("BTCUSDT", 40));

        let (status, body) = get(state.clone(), "/api/v1/signals").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["min_confidence"], 50);
        let list = body["signals"].as_array().unwrap();
        assert_eq!(list[0]["symbol"], "BTCUSDT");
        assert_eq!(list[0]["actionable"], false);
        assert_eq!(list[1]["actionable"], true);
        assert_eq!(list[1]["signal"], "LONG");

        let (_, body) = get(state, "/api/v1/signals?min_confidence=80").await;
        assert_eq!(body["signals"][1]["actionable"], false);
    }

    #[tokio::test]
    async fn on_demand_evaluation_publishes_and_caches() {
        let server = MockServer::start().await;
        mount_klines(&server, "BTCUSDT", ResponseTemplate::new(200).set_body_json(klines(40))).await;
        let state = state_for(&server);

        let (status, body) = get(state.clone(), "/api/v1/signals/btc-usdt").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "BTCUSDT");
        assert_eq!(body["signal"], "HOLD");
        assert_eq!(body["reason"], "Low confidence");
        assert_eq!(state.latest_in_order().len(), 1);

        let (status, body) = get(state, "/api/v1/candles/BTCUSDT").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["candles"].as_array().unwrap().len(), 40);
        assert_eq!(body["last_close"], 139.0);
        assert_eq!(body["threshold"], 100.0);
        // low 99.5, high 139.5, range 40 -> pad 2
        assert_eq!(body["y_min"], 97.5);
        assert_eq!(body["y_max"], 141.5);
    }

    #[tokio::test]
    async fn on_demand_error_statuses() {
        let server = MockServer::start().await;
        mount_klines(&server, "EMPTYUSDT", ResponseTemplate::new(200).set_body_json(json!([]))).await;
        mount_klines(&server, "NEWUSDT", ResponseTemplate::new(200).set_body_json(klines(10))).await;
        mount_klines(
            &server,
            "BADUSDT",
            ResponseTemplate::new(400).set_body_json(json!({"code": -1121, "msg": "Invalid symbol."})),
        )
        .await;
        let state = state_for(&server);

        let (status, body) = get(state.clone(), "/api/v1/signals/EMPTYUSDT").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);

        let (status, body) = get(state.clone(), "/api/v1/signals/NEWUSDT").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("insufficient history"));

        let (status, _) = get(state, "/api/v1/signals/BADUSDT").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn bind_reports_an_occupied_address() {
        let first = bind("127.0.0.1:0").await.unwrap();
        let addr = first.local_addr().unwrap().to_string();
        let err = bind(&addr).await.unwrap_err();
        assert!(err.to_string().contains(&addr), "got: {err}");
    }

    #[tokio::test]
    async fn on_demand_lookup_of_unlisted_symbol_leaves_caches_alone() {
        let server = MockServer::start().await;
        mount_klines(&server, "DOGEUSDT", ResponseTemplate::new(200).set_body_json(klines(40))).await;
        let state = state_for(&server);

        let (status, body) = get(state.clone(), "/api/v1/signals/DOGEUSDT").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "DOGEUSDT");
        assert!(state.latest_signals.read().is_empty());

        let (status, _) = get(state, "/api/v1/candles/DOGEUSDT").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn candles_without_cache_is_not_found() {
        let server = MockServer::start().await;
        let (status, _) = get(state_for(&server), "/api/v1/candles/SOLUSDT").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn liquidations_render_preview() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/futures/liquidation_chart"))
            .and(query_param("symbol", "BONK"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "binance": [ { "dir": "short", "price": 0.00002, "sum": 1.234 } ] }
            })))
            .mount(&server)
            .await;

        let (status, body) = get(state_for(&server), "/api/v1/liquidations/1000BONKUSDT").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["base_asset"], "BONK");
        assert_eq!(body["preview"]["status"], "available");
        assert_eq!(body["text"], "short @ 0.00002 -> 1.23M");
    }
}
