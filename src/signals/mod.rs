// =============================================================================
// Signals Module
// =============================================================================
//
// Rule-based scalping signals:
// - Per-symbol move thresholds
// - The decision engine (indicators -> LONG / SHORT / HOLD)
// - Output record with rounding
// - Concurrent multi-symbol batch evaluation

pub mod batch;
pub mod engine;
pub mod result;
pub mod thresholds;

pub use batch::evaluate_batch;
pub use engine::SignalEngine;
pub use result::SignalResult;
pub use thresholds::{normalize_symbol, ThresholdTable};
