// =============================================================================
// OHLCV Candle — one bar of the price series fed to the signal engine
// =============================================================================
//
// A price series is a plain `&[Candle]` ordered oldest-first.  The engine never
// mutates it; derived columns (high-low range, closes) are computed as scratch
// vectors by the indicator functions.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLCV candle as returned by the Binance klines endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time in milliseconds since the UNIX epoch.
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(open_time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// `high - low`, the per-bar range used by the ATR proxy.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Open time as a UTC timestamp, if it is representable.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.open_time)
    }

    /// True when all prices are finite and positive, volume is non-negative,
    /// and `low <= min(open, close) <= max(open, close) <= high`.
    pub fn is_well_formed(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return false;
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return false;
        }
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        self.low <= body_low && body_high <= self.high
    }
}

/// True when `series` is strictly ascending by `open_time` (which also rules
/// out duplicate timestamps).
pub fn is_ordered(series: &[Candle]) -> bool {
    series.windows(2).all(|w| w[0].open_time < w[1].open_time)
}

/// Sort `series` by open time and drop bars that repeat an earlier timestamp,
/// keeping the last one received for each timestamp.
pub fn normalize_order(series: &mut Vec<Candle>) {
    if is_ordered(series) {
        return;
    }
    series.sort_by_key(|c| c.open_time);
    let mut deduped: Vec<Candle> = Vec::with_capacity(series.len());
    for candle in series.drain(..) {
        match deduped.last_mut() {
            Some(last) if last.open_time == candle.open_time => *last = candle,
            _ => deduped.push(candle),
        }
    }
    *series = deduped;
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn bar(t: i64, close: f64) -> Candle {
        Candle::new(t, close, close + 0.5, close - 0.5, close, 10.0)
    }

    #[test]
    fn well_formed_bar_passes() {
        assert!(bar(0, 100.0).is_well_formed());
    }

    #[test]
    fn close_above_high_is_malformed() {
        let c = Candle::new(0, 100.0, 101.0, 99.0, 102.0, 1.0);
        assert!(!c.is_well_formed());
    }

    #[test]
    fn nan_and_negative_volume_are_malformed() {
        let mut c = bar(0, 100.0);
        c.low = f64::NAN;
        assert!(!c.is_well_formed());

        let mut c = bar(0, 100.0);
        c.volume = -1.0;
        assert!(!c.is_well_formed());
    }

    #[test]
    fn range_is_high_minus_low() {
        assert!((bar(0, 100.0).range() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn timestamp_converts_millis() {
        let c = bar(1_700_000_000_000, 1.0);
        assert_eq!(c.timestamp().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn ordering_check_rejects_duplicates() {
        assert!(is_ordered(&[bar(1, 1.0), bar(2, 1.0), bar(3, 1.0)]));
        assert!(!is_ordered(&[bar(1, 1.0), bar(1, 1.0)]));
        assert!(!is_ordered(&[bar(2, 1.0), bar(1, 1.0)]));
    }

    #[test]
    fn normalize_sorts_and_keeps_latest_duplicate() {
        let mut series = vec![bar(3, 3.0), bar(1, 1.0), bar(3, 4.0), bar(2, 2.0)];
        normalize_order(&mut series);
        let times: Vec<i64> = series.iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![1, 2, 3]);
        assert!((series[2].close - 4.0).abs() < 1e-12);
    }
}
