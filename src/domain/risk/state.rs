use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Lower bound of the adaptive position scale factor
pub const MIN_SCALE_FACTOR: Decimal = dec!(0.3);
/// Upper bound of the adaptive position scale factor
pub const MAX_SCALE_FACTOR: Decimal = dec!(1.5);

/// Risk parameters of one trading instance.
///
/// Only `position_scale_factor` changes at runtime; it always stays within
/// `[MIN_SCALE_FACTOR, MAX_SCALE_FACTOR]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    pub max_total_capital: Decimal,
    pub max_per_trade_risk_fraction: Decimal,
    pub default_atr_stop_multiplier: Decimal,
    pub default_risk_reward_ratio: Decimal,
    pub min_position_size: Decimal,
    position_scale_factor: Decimal,
}

impl RiskState {
    pub fn new(
        max_total_capital: Decimal,
        max_per_trade_risk_fraction: Decimal,
        default_atr_stop_multiplier: Decimal,
        default_risk_reward_ratio: Decimal,
        min_position_size: Decimal,
        position_scale_factor: Decimal,
    ) -> Self {
        Self {
            max_total_capital,
            max_per_trade_risk_fraction,
            default_atr_stop_multiplier,
            default_risk_reward_ratio,
            min_position_size,
            position_scale_factor: clamp_scale_factor(position_scale_factor),
        }
    }

    pub fn position_scale_factor(&self) -> Decimal {
        self.position_scale_factor
    }

    /// Stores `factor` clamped into the allowed range and returns the stored value
    pub fn set_position_scale_factor(&mut self, factor: Decimal) -> Decimal {
        self.position_scale_factor = clamp_scale_factor(factor);
        self.position_scale_factor
    }

    /// Dollar amount a single trade may lose at its stop
    pub fn max_risk_amount(&self) -> Decimal {
        self.max_total_capital * self.max_per_trade_risk_fraction
    }
}

impl Default for RiskState {
    fn default() -> Self {
        Self::new(
            dec!(10000),
            dec!(0.01),
            dec!(1.5),
            dec!(1.5),
            dec!(0.001),
            Decimal::ONE,
        )
    }
}

pub fn clamp_scale_factor(factor: Decimal) -> Decimal {
    factor.clamp(MIN_SCALE_FACTOR, MAX_SCALE_FACTOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = RiskState::default();
        assert_eq!(state.max_risk_amount(), dec!(100));
        assert_eq!(state.position_scale_factor(), Decimal::ONE);
    }

    #[test]
    fn test_scale_factor_is_clamped() {
        let mut state = RiskState::default();
        assert_eq!(state.set_position_scale_factor(dec!(3)), MAX_SCALE_FACTOR);
        assert_eq!(state.set_position_scale_factor(dec!(0.01)), MIN_SCALE_FACTOR);
        assert_eq!(state.set_position_scale_factor(dec!(0.8)), dec!(0.8));

        let built = RiskState::new(dec!(1), dec!(1), dec!(1), dec!(1), dec!(0), dec!(-2));
        assert_eq!(built.position_scale_factor(), MIN_SCALE_FACTOR);
    }
}
