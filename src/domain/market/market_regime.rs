use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current market regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Regime {
    #[default]
    Initializing,
    StrongUpTrend,
    StrongDownTrend,
    HighVolRange,
    LowVolRange,
}

impl Regime {
    pub fn is_trend(&self) -> bool {
        matches!(self, Regime::StrongUpTrend | Regime::StrongDownTrend)
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Initializing => write!(f, "Initializing"),
            Regime::StrongUpTrend => write!(f, "Strong Up Trend"),
            Regime::StrongDownTrend => write!(f, "Strong Down Trend"),
            Regime::HighVolRange => write!(f, "High Vol Range"),
            Regime::LowVolRange => write!(f, "Low Vol Range"),
        }
    }
}

/// Metrics the regime was classified from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeMetrics {
    pub close: Decimal,
    pub ma: Decimal,
    pub rsi: Decimal,
    /// ATR / close, zero when the close was not usable
    pub atr_ratio: Decimal,
    /// `None` when the 4h snapshot was not ready
    pub h4_confirm: Option<bool>,
}

/// Emitted whenever the current regime changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeTransition {
    pub symbol: String,
    pub from: Regime,
    pub to: Regime,
    pub metrics: RegimeMetrics,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_initializing() {
        assert_eq!(Regime::default(), Regime::Initializing);
    }

    #[test]
    fn test_trend_classification() {
        assert!(Regime::StrongUpTrend.is_trend());
        assert!(Regime::StrongDownTrend.is_trend());
        assert!(!Regime::LowVolRange.is_trend());
        assert!(!Regime::Initializing.is_trend());
    }
}
