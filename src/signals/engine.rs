// =============================================================================
// Signal Engine — indicators in, LONG / SHORT / HOLD out
// =============================================================================
//
// Pipeline (single deterministic pass, no state between calls):
//   1. Validate the window holds enough bars for every look-back
//   2. price = latest close, prev_price = close `lag_bars` bars earlier
//   3. Compute RSI, trend, support/resistance, ATR proxy
//   4. target = max(symbol threshold, ATR proxy), stop = stop_ratio * target
//   5. Pick a candidate direction (move gate, then RSI zones) and score it
//   6. Demote anything under `min_confidence` to HOLD
//   7. Emit a rounded SignalResult
// =============================================================================

use tracing::debug;

use crate::error::SignalError;
use crate::indicators::atr::calculate_range_atr;
use crate::indicators::rsi::current_rsi;
use crate::indicators::support_resistance::calculate_support_resistance;
use crate::indicators::trend::detect_trend;
use crate::market_data::Candle;
use crate::runtime_config::EngineParams;
use crate::signals::result::{IndicatorSnapshot, SignalResult, TradeLevels};
use crate::signals::thresholds::{normalize_symbol, ThresholdTable};
use crate::types::{SignalClass, Trend};

/// Reason attached to results demoted by the confidence gate.
pub const LOW_CONFIDENCE_REASON: &str = "Low confidence";

// =============================================================================
// Decision rule
// =============================================================================

/// Everything the decision rule looks at, already computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionInputs {
    pub price: f64,
    pub price_move: f64,
    pub rsi: f64,
    pub trend: Trend,
    pub support: f64,
    pub resistance: f64,
    /// Target distance: max(threshold, ATR proxy).
    pub target: f64,
}

/// Output of the decision rule, before it is wrapped into a `SignalResult`.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub signal: SignalClass,
    pub confidence: u32,
    pub levels: Option<TradeLevels>,
    pub reason: Option<String>,
}

/// Apply the rule-based scoring to pre-computed indicator values.
///
/// First match wins: a move under `move_trigger_ratio * target` yields no
/// candidate; otherwise RSI below `rsi_long_below` proposes LONG and RSI above
/// `rsi_short_above` proposes SHORT.  The confidence gate then demotes any
/// result under `min_confidence` to HOLD with no levels.
pub fn decide(inputs: &DecisionInputs, params: &EngineParams) -> Decision {
    let stop = params.stop_ratio * inputs.target;
    let price = inputs.price;

    let mut confidence = 0;
    let mut candidate: Option<(SignalClass, TradeLevels)> = None;

    if inputs.price_move >= params.move_trigger_ratio * inputs.target {
        if inputs.rsi < params.rsi_long_below {
            confidence = params.base_confidence;
            if inputs.trend == Trend::Uptrend {
                confidence += params.trend_bonus;
            }
            if price < inputs.support {
                confidence += params.breakout_bonus;
            }
            candidate = Some((
                SignalClass::Long,
                TradeLevels {
                    entry: price,
                    exit: price + inputs.target,
                    stop_loss: price - stop,
                },
            ));
        } else if inputs.rsi > params.rsi_short_above {
            confidence = params.base_confidence;
            if inputs.trend == Trend::Downtrend {
                confidence += params.trend_bonus;
            }
            if price > inputs.resistance {
                confidence += params.breakout_bonus;
            }
            candidate = Some((
                SignalClass::Short,
                TradeLevels {
                    entry: price,
                    exit: price - inputs.target,
                    stop_loss: price + stop,
                },
            ));
        }
    }

    if confidence < params.min_confidence {
        return Decision {
            signal: SignalClass::Hold,
            confidence,
            levels: None,
            reason: Some(LOW_CONFIDENCE_REASON.to_string()),
        };
    }

    match candidate {
        Some((signal, levels)) => Decision {
            signal,
            confidence,
            levels: Some(levels),
            reason: None,
        },
        None => Decision {
            signal: SignalClass::Hold,
            confidence,
            levels: None,
            reason: None,
        },
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Stateless evaluator; safe to share across tasks by reference.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    params: EngineParams,
    thresholds: ThresholdTable,
}

impl SignalEngine {
    pub fn new(params: EngineParams, thresholds: ThresholdTable) -> Self {
        Self { params, thresholds }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    /// Evaluate one price window (oldest-first) for `symbol`.
    ///
    /// Fails fast with `InsufficientHistory` when the window is shorter than
    /// `EngineParams::min_bars`, and with `NonFinite` when an indicator comes
    /// out NaN or infinite.
    pub fn evaluate(&self, candles: &[Candle], symbol: &str) -> Result<SignalResult, SignalError> {
        let p = &self.params;
        let required = p.min_bars();
        if candles.len() < required {
            return Err(SignalError::InsufficientHistory {
                indicator: "signal window",
                required,
                available: candles.len(),
            });
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let last = closes.len() - 1;
        let price = closes[last];
        let prev_price = closes[last - p.lag_bars];
        if !price.is_finite() || !prev_price.is_finite() {
            return Err(SignalError::NonFinite("price"));
        }
        let price_move = (price - prev_price).abs();

        let rsi = current_rsi(&closes, p.rsi_period).ok_or(SignalError::NonFinite("rsi"))?;
        let trend = detect_trend(&closes, p.trend_fast_period, p.trend_slow_period)
            .ok_or(SignalError::NonFinite("trend"))?;
        let sr = calculate_support_resistance(candles, p.sr_lookback)
            .ok_or(SignalError::NonFinite("support/resistance"))?;
        let atr = calculate_range_atr(candles, p.atr_period).ok_or(SignalError::NonFinite("atr"))?;

        let threshold = self.thresholds.lookup(symbol);
        let target = threshold.max(atr);

        let decision = decide(
            &DecisionInputs {
                price,
                price_move,
                rsi,
                trend,
                support: sr.support,
                resistance: sr.resistance,
                target,
            },
            p,
        );

        debug!(
            symbol,
            signal = %decision.signal,
            confidence = decision.confidence,
            rsi,
            trend = %trend,
            price_move,
            target,
            "signal evaluated"
        );

        let snapshot = IndicatorSnapshot {
            price,
            prev_price,
            price_move,
            rsi,
            trend,
            support: sr.support,
            resistance: sr.resistance,
            atr,
        };

        Ok(SignalResult {
            symbol: normalize_symbol(symbol),
            signal: decision.signal,
            confidence: decision.confidence,
            indicators: Some(snapshot.rounded()),
            levels: decision.levels.map(|l| l.rounded()),
            reason: decision.reason,
        })
    }
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::new(EngineParams::default(), ThresholdTable::default())
    }
}
