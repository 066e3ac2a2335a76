// =============================================================================
// Relative Strength Index (RSI) — Simple Moving Average variant
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes.
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Split every delta into a gain (positive part) and a loss
//          (magnitude of the negative part).
// Step 3 — For every bar with at least `period` deltas behind it, take the
//          plain SMA of the last `period` gains and losses (no Wilder
//          smoothing).
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// The signal engine reads RSI < 45 as oversold-ish and RSI > 55 as
// overbought-ish; only the most recent value is consumed.
// =============================================================================

/// Compute the full RSI series for the given `closes` and `period`.
///
/// The returned vector has one RSI value for each close starting at index
/// `period` (the first close has no delta, and `period` deltas are needed for
/// the first average).  `result[i]` therefore belongs to `closes[i + period]`.
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - `closes.len() < period + 1` => empty vec
/// - Average loss of zero => RSI is 100.0 (returned directly, no division).
/// - Non-finite results truncate the series.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let period_f = period as f64;

    let mut result = Vec::with_capacity(deltas.len() - period + 1);
    for window in deltas.windows(period) {
        let (sum_gain, sum_loss) = window.iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });

        match rsi_from_averages(sum_gain / period_f, sum_loss / period_f) {
            Some(rsi) => result.push(rsi),
            None => break,
        }
    }

    result
}

/// RSI at the latest close, or `None` when there is insufficient data or the
/// calculation produces a non-finite result.
///
/// Only the trailing `period + 1` closes are read, so a bad value earlier in
/// the window cannot leave a stale reading behind.
pub fn current_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    calculate_rsi(&closes[closes.len() - period - 1..], period)
        .last()
        .copied()
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - If both averages are zero, RSI is 50.0 (no movement).
/// - If average loss is zero (only gains), RSI is 100.0.
/// - Returns `None` when the result is non-finite.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    if rsi.is_finite() {
        Some(rsi)
    } else {
        None
    }
}
