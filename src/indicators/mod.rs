// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators consumed by the
// signal engine.  Every public function returns `Option<T>` (or an empty
// series) so callers are forced to handle insufficient-data and
// numerical-edge-case scenarios.

pub mod atr;
pub mod rsi;
pub mod support_resistance;
pub mod trend;
