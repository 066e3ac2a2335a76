// =============================================================================
// Average True Range proxy — SMA of the high-low range
// =============================================================================
//
// The canonical ATR uses True Range (max of H-L, |H-prevClose|, |L-prevClose|)
// smoothed with Wilder's method.  The signal engine sizes its targets with a
// cheaper proxy instead:
//
//   range_t   = high_t - low_t
//   ATR_proxy = SMA(range, period) at the latest bar
//
// Default period: 14 (see `EngineParams::atr_period`)
// =============================================================================

use crate::indicators::trend::calculate_sma;
use crate::market_data::Candle;

/// Compute the most recent ATR-proxy value from a slice of OHLCV candles.
///
/// # Returns
/// `None` when:
/// - `period` is zero.
/// - There are fewer than `period` candles.
/// - The result is non-finite.
pub fn calculate_range_atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }

    let ranges: Vec<f64> = candles[candles.len() - period..]
        .iter()
        .map(Candle::range)
        .collect();

    calculate_sma(&ranges, period)
        .last()
        .copied()
        .filter(|atr| atr.is_finite())
}
