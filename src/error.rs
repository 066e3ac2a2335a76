use thiserror::Error;

/// Validation failures raised by the signal engine.
///
/// The engine never performs I/O, so these only describe input that is too
/// short or numerically broken.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("insufficient history: {indicator} needs {required} bars, got {available}")]
    InsufficientHistory {
        indicator: &'static str,
        required: usize,
        available: usize,
    },

    #[error("{0} produced a non-finite value")]
    NonFinite(&'static str),
}
