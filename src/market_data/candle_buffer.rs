use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::candle::Candle;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Composite key that identifies a unique candle series.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CandleKey {
    pub symbol: String,
    pub interval: String,
}

impl CandleKey {
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
        }
    }
}

impl std::fmt::Display for CandleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.symbol, self.interval)
    }
}

// ---------------------------------------------------------------------------
// CandleBuffer -- latest fetched window per (symbol, interval)
// ---------------------------------------------------------------------------

/// Thread-safe store of the most recently fetched window per
/// `(symbol, interval)` pair.  Each refresh replaces the whole window; the
/// window is trimmed to `max_candles` newest bars.
pub struct CandleBuffer {
    buffers: RwLock<HashMap<CandleKey, Vec<Candle>>>,
    max_candles: usize,
}

impl CandleBuffer {
    pub fn new(max_candles: usize) -> Self {
        Self {
            buffers: RwLock::new(HashMap::new()),
            max_candles,
        }
    }

    /// Replace the stored window for `key` with `candles` (oldest-first).
    pub fn replace(&self, key: CandleKey, mut candles: Vec<Candle>) {
        if candles.len() > self.max_candles {
            let excess = candles.len() - self.max_candles;
            candles.drain(..excess);
        }
        self.buffers.write().insert(key, candles);
    }

    /// Return the most recent `count` candles (oldest-first order).
    pub fn get_recent(&self, key: &CandleKey, count: usize) -> Vec<Candle> {
        let map = self.buffers.read();
        match map.get(key) {
            Some(window) => {
                let start = window.len().saturating_sub(count);
                window[start..].to_vec()
            }
            None => Vec::new(),
        }
    }

    /// Close price of the most recent candle, if any.
    pub fn last_close(&self, key: &CandleKey) -> Option<f64> {
        self.buffers
            .read()
            .get(key)
            .and_then(|window| window.last())
            .map(|c| c.close)
    }

    pub fn count(&self, key: &CandleKey) -> usize {
        self.buffers.read().get(key).map_or(0, Vec::len)
    }
}
