// =============================================================================
// Shared types used across the signal engine and the API
// =============================================================================

use serde::{Deserialize, Serialize};

/// Discrete output class of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalClass {
    Long,
    Short,
    Hold,
    /// The market data for the symbol could not be fetched or evaluated.
    Error,
}

impl SignalClass {
    /// LONG or SHORT.
    pub fn is_directional(self) -> bool {
        matches!(self, Self::Long | Self::Short)
    }
}

impl Default for SignalClass {
    fn default() -> Self {
        Self::Hold
    }
}

impl std::fmt::Display for SignalClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
            Self::Hold => write!(f, "HOLD"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Short-vs-long moving-average trend classification.  There is no neutral
/// class: a tie is a downtrend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Uptrend,
    Downtrend,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uptrend => write!(f, "Uptrend"),
            Self::Downtrend => write!(f, "Downtrend"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_class_serialises_uppercase() {
        assert_eq!(serde_json::to_string(&SignalClass::Long).unwrap(), "\"LONG\"");
        assert_eq!(serde_json::to_string(&SignalClass::Error).unwrap(), "\"ERROR\"");
        let parsed: SignalClass = serde_json::from_str("\"SHORT\"").unwrap();
        assert_eq!(parsed, SignalClass::Short);
    }

    #[test]
    fn trend_serialises_as_label() {
        assert_eq!(serde_json::to_string(&Trend::Uptrend).unwrap(), "\"Uptrend\"");
        assert_eq!(Trend::Downtrend.to_string(), "Downtrend");
    }

    #[test]
    fn only_long_and_short_are_directional() {
        assert!(SignalClass::Long.is_directional());
        assert!(SignalClass::Short.is_directional());
        assert!(!SignalClass::Hold.is_directional());
        assert!(!SignalClass::Error.is_directional());
        assert_eq!(SignalClass::default(), SignalClass::Hold);
    }
}
