// =============================================================================
// Per-symbol move thresholds
// =============================================================================
//
// Minimum absolute price move (in quote currency) that a symbol must make
// before a signal is considered.  The engine sizes its targets with
// max(threshold, ATR proxy), so these also act as the floor on target size.
// =============================================================================

use std::collections::HashMap;

/// Threshold applied to symbols that are not listed.
pub const DEFAULT_THRESHOLD: f64 = 100.0;

/// Normalise an instrument identifier to the exchange form used as the table
/// key: `"BTC/USDT"`, `"btc-usdt"` and `"BTCUSDT"` all become `"BTCUSDT"`.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| !matches!(c, '/' | '-' | '_' | ' '))
        .collect::<String>()
        .to_uppercase()
}

/// Lookup table of per-symbol thresholds with a fallback default.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    thresholds: HashMap<String, f64>,
    default: f64,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        let mut table = Self::empty(DEFAULT_THRESHOLD);
        for (symbol, value) in [
            ("BTCUSDT", 100.0),
            ("ETHUSDT", 7.0),
            ("SOLUSDT", 0.8),
            ("XRPUSDT", 0.002),
            ("1000BONKUSDT", 0.00005),
        ] {
            table.set(symbol, value);
        }
        table
    }
}

impl ThresholdTable {
    /// A table with no listed symbols.
    pub fn empty(default: f64) -> Self {
        Self {
            thresholds: HashMap::new(),
            default,
        }
    }

    /// Insert or replace the threshold for `symbol`.
    pub fn set(&mut self, symbol: &str, threshold: f64) {
        self.thresholds.insert(normalize_symbol(symbol), threshold);
    }

    /// Layer `overrides` on top of the current entries.
    pub fn with_overrides(mut self, overrides: &HashMap<String, f64>) -> Self {
        for (symbol, &threshold) in overrides {
            self.set(symbol, threshold);
        }
        self
    }

    /// Threshold for `symbol`, falling back to the table default.
    pub fn lookup(&self, symbol: &str) -> f64 {
        self.thresholds
            .get(&normalize_symbol(symbol))
            .copied()
            .unwrap_or(self.default)
    }
}
