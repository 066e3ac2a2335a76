// =============================================================================
// Rolling Support / Resistance
// =============================================================================
//
// support    = min(low)  over the last `lookback` bars
// resistance = max(high) over the last `lookback` bars
//
// The current bar is part of the window.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::market_data::Candle;

/// Rolling price bounds over a look-back window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
}

/// Compute support and resistance over the most recent `lookback` candles.
///
/// Returns `None` when `lookback == 0`, there are fewer than `lookback`
/// candles, or a bound comes out non-finite.
pub fn calculate_support_resistance(candles: &[Candle], lookback: usize) -> Option<SupportResistance> {
    if lookback == 0 || candles.len() < lookback {
        return None;
    }

    let window = &candles[candles.len() - lookback..];
    let support = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let resistance = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);

    if support.is_finite() && resistance.is_finite() {
        Some(SupportResistance { support, resistance })
    } else {
        None
    }
}
