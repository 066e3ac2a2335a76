// =============================================================================
// Rate-Limit Tracker — monitors Binance request weight to avoid 429s
// =============================================================================
//
// Binance allows 1200 request weight per minute per IP; we hard-cap ourselves
// at 1000.  The tracker reads the `X-MBX-USED-WEIGHT-1M` response header after
// every request and keeps an atomic counter that any task may query lock-free.
// The exchange resets its own counter every minute; main.rs mirrors that with
// a one-minute timer calling `reset_1m_weight`.
// =============================================================================

use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

/// Hard ceiling at which we refuse to send additional requests.
const WEIGHT_HARD_LIMIT: u32 = 1000;
/// Soft warning threshold.
const WEIGHT_WARN_THRESHOLD: u32 = 800;

/// Thread-safe request-weight tracker backed by an atomic counter.
pub struct RateLimitTracker {
    used_weight_1m: AtomicU32,
}

/// Immutable snapshot of the current weight usage (served by the health
/// endpoint).
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitSnapshot {
    pub used_weight_1m: u32,
    pub hard_limit: u32,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            used_weight_1m: AtomicU32::new(0),
        }
    }

    /// Update the counter from the HTTP response headers returned by Binance.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let Some(weight) = headers
            .get("X-MBX-USED-WEIGHT-1M")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok())
        else {
            return;
        };

        let prev = self.used_weight_1m.swap(weight, Ordering::Relaxed);
        if weight >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "rate-limit weight crossed warning threshold"
            );
        }
        debug!(used_weight_1m = weight, "rate-limit weight updated from header");
    }

    /// Return `true` if we can afford to spend `weight` more request weight
    /// without exceeding the hard limit.
    pub fn can_send_request(&self, weight: u32) -> bool {
        let current = self.used_weight_1m.load(Ordering::Relaxed);
        let allowed = current.saturating_add(weight) <= WEIGHT_HARD_LIMIT;
        if !allowed {
            warn!(
                current_weight = current,
                requested_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "request blocked — would exceed rate-limit"
            );
        }
        allowed
    }

    pub fn used_weight(&self) -> u32 {
        self.used_weight_1m.load(Ordering::Relaxed)
    }

    /// Reset the 1-minute weight counter.
    pub fn reset_1m_weight(&self) {
        self.used_weight_1m.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            used_weight_1m: self.used_weight(),
            hard_limit: WEIGHT_HARD_LIMIT,
        }
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitTracker")
            .field("used_weight_1m", &self.used_weight())
            .finish()
    }
}
