use crate::domain::market::timeframe::Timeframe;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by an execution service
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    #[error("Insufficient margin: need ${need}, available ${available}")]
    InsufficientMargin { need: Decimal, available: Decimal },

    #[error("No market price observed yet for {symbol}")]
    NoMarketPrice { symbol: String },

    #[error("Invalid leverage: {leverage}. Must be positive")]
    InvalidLeverage { leverage: Decimal },

    #[error("Operation not supported by {backend}: {operation}")]
    Unsupported { backend: String, operation: String },
}

/// Errors from the indicator provider
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IndicatorError {
    #[error("Indicators for {timeframe} not ready: {have}/{need} bars")]
    NotReady {
        timeframe: Timeframe,
        have: usize,
        need: usize,
    },

    #[error("Indicator calculation failed for {timeframe}: {reason}")]
    Calculation { timeframe: Timeframe, reason: String },
}

/// Reasons a trade could not be sized; each one yields a no-op signal
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SizingRejection {
    #[error("Cannot size a flat direction")]
    NoDirection,

    #[error("Stop price {stop} is not positive")]
    NonPositiveStop { stop: Decimal },

    #[error("No risk budget: max risk ${max_risk}")]
    NoRiskBudget { max_risk: Decimal },

    #[error("Stop distance is zero")]
    ZeroStopDistance,

    #[error("Position size {size} below minimum {min}")]
    BelowMinimumSize { size: Decimal, min: Decimal },
}

/// Configuration validation errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value}. {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_margin_formatting() {
        let err = ExecutionError::InsufficientMargin {
            need: dec!(500),
            available: dec!(120.5),
        };

        let msg = err.to_string();
        assert!(msg.contains("$500"));
        assert!(msg.contains("$120.5"));
    }

    #[test]
    fn test_not_ready_formatting() {
        let err = IndicatorError::NotReady {
            timeframe: Timeframe::FiveMin,
            have: 12,
            need: 30,
        };

        assert_eq!(err.to_string(), "Indicators for 5m not ready: 12/30 bars");
    }
}
