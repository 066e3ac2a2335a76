// =============================================================================
// Signal Result — the engine's sole output record
// =============================================================================
//
// Built fresh on every evaluation and never mutated afterwards.  Price-like
// fields are rounded to 6 decimals and RSI to 2 decimals at construction so
// that two evaluations of the same window serialise byte-identically.
// =============================================================================

use serde::Serialize;

use crate::types::{SignalClass, Trend};

/// Decimal places kept on price-like fields.
pub const PRICE_DECIMALS: i32 = 6;
/// Decimal places kept on RSI.
pub const RSI_DECIMALS: i32 = 2;

/// Round `value` to `decimals` places (half away from zero).
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Indicator values observed during a successful evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub price: f64,
    pub prev_price: f64,
    pub price_move: f64,
    pub rsi: f64,
    pub trend: Trend,
    pub support: f64,
    pub resistance: f64,
    pub atr: f64,
}

impl IndicatorSnapshot {
    /// Copy of `self` with the output rounding applied.
    pub fn rounded(&self) -> Self {
        Self {
            price: round_to(self.price, PRICE_DECIMALS),
            prev_price: round_to(self.prev_price, PRICE_DECIMALS),
            price_move: round_to(self.price_move, PRICE_DECIMALS),
            rsi: round_to(self.rsi, RSI_DECIMALS),
            trend: self.trend,
            support: round_to(self.support, PRICE_DECIMALS),
            resistance: round_to(self.resistance, PRICE_DECIMALS),
            atr: round_to(self.atr, PRICE_DECIMALS),
        }
    }
}

/// Entry / target exit / stop-loss for a directional signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeLevels {
    pub entry: f64,
    pub exit: f64,
    pub stop_loss: f64,
}

impl TradeLevels {
    pub fn rounded(&self) -> Self {
        Self {
            entry: round_to(self.entry, PRICE_DECIMALS),
            exit: round_to(self.exit, PRICE_DECIMALS),
            stop_loss: round_to(self.stop_loss, PRICE_DECIMALS),
        }
    }
}

/// Outcome of evaluating one symbol.
///
/// `indicators` is absent only for `SignalClass::Error`; `levels` is present
/// only for LONG and SHORT.  Both are flattened into the top-level JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalResult {
    pub symbol: String,
    pub signal: SignalClass,
    pub confidence: u32,
    #[serde(flatten)]
    pub indicators: Option<IndicatorSnapshot>,
    #[serde(flatten)]
    pub levels: Option<TradeLevels>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SignalResult {
    /// Error-class result for a symbol whose data could not be evaluated.
    pub fn error(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            signal: SignalClass::Error,
            confidence: 0,
            indicators: None,
            levels: None,
            reason: Some(reason.into()),
        }
    }

    /// True for LONG / SHORT results at or above `min_confidence`.
    pub fn is_actionable(&self, min_confidence: u32) -> bool {
        self.signal.is_directional() && self.confidence >= min_confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            price: 100.123_456_789,
            prev_price: 99.0,
            price_move: 1.123_456_789,
            rsi: 43.333_333,
            trend: Trend::Uptrend,
            support: 98.5,
            resistance: 101.5,
            atr: 1.0,
        }
    }

    #[test]
    fn rounding_precision() {
        assert_eq!(round_to(1.234_567_89, 6), 1.234_568);
        assert_eq!(round_to(43.336, 2), 43.34);
        let r = snapshot().rounded();
        assert_eq!(r.price, 100.123_457);
        assert_eq!(r.rsi, 43.33);
    }

    #[test]
    fn hold_serialises_without_levels() {
        let result = SignalResult {
            symbol: "BTCUSDT".into(),
            signal: SignalClass::Hold,
            confidence: 0,
            indicators: Some(snapshot().rounded()),
            levels: None,
            reason: Some("Low confidence".into()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["signal"], "HOLD");
        assert_eq!(json["trend"], "Uptrend");
        assert_eq!(json["reason"], "Low confidence");
        assert!(json.get("entry").is_none());
        assert!(json.get("stop_loss").is_none());
    }

    #[test]
    fn long_serialises_levels_inline() {
        let result = SignalResult {
            symbol: "ETHUSDT".into(),
            signal: SignalClass::Long,
            confidence: 70,
            indicators: Some(snapshot().rounded()),
            levels: Some(TradeLevels {
                entry: 100.0,
                exit: 107.0,
                stop_loss: 96.5,
            }),
            reason: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["entry"], 100.0);
        assert_eq!(json["exit"], 107.0);
        assert_eq!(json["stop_loss"], 96.5);
        assert!(json.get("reason").is_none());
        assert!(result.is_actionable(50));
        assert!(!result.is_actionable(75));
    }

    #[test]
    fn error_result_carries_reason_only() {
        let result = SignalResult::error("SOLUSDT", "connection refused");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["signal"], "ERROR");
        assert_eq!(json["reason"], "connection refused");
        assert!(json.get("price").is_none());
        assert!(!result.is_actionable(0));
    }
}
