// =============================================================================
// Batch Evaluation — bounded-concurrency fan-out over symbols
// =============================================================================
//
// Each symbol is fetched and evaluated independently.  A failure (fetch error
// or engine rejection) turns into an ERROR-class result for that symbol only;
// the other symbols are unaffected.  Results come back in completion order.
// =============================================================================

use std::future::Future;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::market_data::Candle;
use crate::signals::engine::SignalEngine;
use crate::signals::result::SignalResult;
use crate::signals::thresholds::normalize_symbol;
use crate::types::SignalClass;

/// Fetch and evaluate every symbol in `symbols`, running at most
/// `concurrency` fetches at once (a bound of zero is treated as one).
pub async fn evaluate_batch<F, Fut>(
    symbols: &[String],
    concurrency: usize,
    fetch: F,
    engine: &SignalEngine,
) -> Vec<SignalResult>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<Candle>>>,
{
    let results: Vec<SignalResult> = stream::iter(symbols.iter().cloned())
        .map(|symbol| {
            let pending = fetch(symbol.clone());
            async move {
                let candles = match pending.await {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "fetch failed");
                        return SignalResult::error(normalize_symbol(&symbol), format!("{e:#}"));
                    }
                };
                match engine.evaluate(&candles, &symbol) {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "evaluation failed");
                        SignalResult::error(normalize_symbol(&symbol), e.to_string())
                    }
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    debug!(
        symbols = symbols.len(),
        errors = results.iter().filter(|r| r.signal == SignalClass::Error).count(),
        "batch evaluated"
    );
    results
}
