pub mod candle;
pub mod candle_buffer;

// Re-exports for `use crate::market_data::Candle` style imports.
pub use candle::{normalize_order, Candle};
pub use candle_buffer::{CandleBuffer, CandleKey};
