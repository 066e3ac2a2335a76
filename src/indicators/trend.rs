// =============================================================================
// Moving-Average Trend Classification
// =============================================================================
//
// Compares a fast SMA (default 5 bars) against a slow SMA (default 20 bars) of
// the close price at the latest bar:
//
//   SMA_fast >  SMA_slow  =>  Uptrend
//   otherwise             =>  Downtrend   (ties included; no neutral class)
// =============================================================================

use crate::types::Trend;

/// Compute the rolling simple moving average of `values`.
///
/// `result[i]` belongs to `values[i + period - 1]`.  Returns an empty `Vec`
/// when `period == 0` or there are fewer than `period` values.
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let period_f = period as f64;
    values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period_f)
        .collect()
}

/// SMA of the last `period` values only.
pub fn latest_sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let sma = values[values.len() - period..].iter().sum::<f64>() / period as f64;
    sma.is_finite().then_some(sma)
}

/// Classify the trend at the latest bar.
///
/// Returns `None` when there are fewer closes than `slow_period` (or
/// `fast_period`) or the averages are non-finite.
pub fn detect_trend(closes: &[f64], fast_period: usize, slow_period: usize) -> Option<Trend> {
    let fast = latest_sma(closes, fast_period)?;
    let slow = latest_sma(closes, slow_period)?;
    Some(if fast > slow {
        Trend::Uptrend
    } else {
        Trend::Downtrend
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_series() {
        let sma = calculate_sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(sma, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn sma_insufficient_or_zero_period() {
        assert!(calculate_sma(&[1.0, 2.0], 3).is_empty());
        assert!(calculate_sma(&[1.0, 2.0], 0).is_empty());
        assert!(latest_sma(&[1.0, 2.0], 3).is_none());
    }

    #[test]
    fn latest_sma_matches_series_tail() {
        let values: Vec<f64> = (0..40).map(|i| (i as f64 * 0.3).sin() * 10.0 + 50.0).collect();
        let tail = *calculate_sma(&values, 20).last().unwrap();
        assert!((latest_sma(&values, 20).unwrap() - tail).abs() < 1e-9);
    }

    #[test]
    fn rising_closes_are_uptrend() {
        let closes: Vec<f64> = (100..130).map(|x| x as f64).collect();
        assert_eq!(detect_trend(&closes, 5, 20), Some(Trend::Uptrend));
    }

    #[test]
    fn falling_closes_are_downtrend() {
        let closes: Vec<f64> = (100..130).rev().map(|x| x as f64).collect();
        assert_eq!(detect_trend(&closes, 5, 20), Some(Trend::Downtrend));
    }

    #[test]
    fn flat_closes_tie_to_downtrend() {
        let closes = vec![42.0; 25];
        assert_eq!(detect_trend(&closes, 5, 20), Some(Trend::Downtrend));
    }

    #[test]
    fn trend_needs_slow_window() {
        let closes = vec![1.0; 19];
        assert!(detect_trend(&closes, 5, 20).is_none());
    }
}
