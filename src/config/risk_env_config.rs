//! Risk configuration parsing from environment variables.
//!
//! Capital, per-trade risk, stop/target multipliers, minimum size and the
//! starting position scale factor.

use super::{Lookup, ensure, parse_var};
use crate::domain::errors::ConfigError;
use crate::domain::risk::state::RiskState;
use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskEnvConfig {
    pub max_total_capital: Decimal,
    pub max_per_trade_risk: Decimal,
    pub default_stop_loss_atr_multiplier: Decimal,
    pub default_risk_reward_ratio: Decimal,
    pub min_position_size: Decimal,
    pub position_scale_factor: Decimal,
}

/// Per-instance overrides read from the instances file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskOverrides {
    pub max_total_capital: Option<Decimal>,
    pub max_per_trade_risk: Option<Decimal>,
    pub default_stop_loss_atr_multiplier: Option<Decimal>,
    pub default_risk_reward_ratio: Option<Decimal>,
    pub min_position_size: Option<Decimal>,
    pub position_scale_factor: Option<Decimal>,
}

impl RiskEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        Ok(Self {
            max_total_capital: parse_var(lookup, "MAX_TOTAL_CAPITAL", "10000")?,
            max_per_trade_risk: parse_var(lookup, "MAX_PER_TRADE_RISK", "0.01")?,
            default_stop_loss_atr_multiplier: parse_var(
                lookup,
                "DEFAULT_STOP_LOSS_ATR_MULTIPLIER",
                "1.5",
            )?,
            default_risk_reward_ratio: parse_var(lookup, "DEFAULT_RISK_REWARD_RATIO", "1.5")?,
            min_position_size: parse_var(lookup, "MIN_POSITION_SIZE", "0.001")?,
            position_scale_factor: parse_var(lookup, "POSITION_SCALE_FACTOR", "1.0")?,
        })
    }

    pub fn apply(&mut self, overrides: &RiskOverrides) {
        let RiskOverrides {
            max_total_capital,
            max_per_trade_risk,
            default_stop_loss_atr_multiplier,
            default_risk_reward_ratio,
            min_position_size,
            position_scale_factor,
        } = overrides;
        if let Some(v) = max_total_capital {
            self.max_total_capital = *v;
        }
        if let Some(v) = max_per_trade_risk {
            self.max_per_trade_risk = *v;
        }
        if let Some(v) = default_stop_loss_atr_multiplier {
            self.default_stop_loss_atr_multiplier = *v;
        }
        if let Some(v) = default_risk_reward_ratio {
            self.default_risk_reward_ratio = *v;
        }
        if let Some(v) = min_position_size {
            self.min_position_size = *v;
        }
        if let Some(v) = position_scale_factor {
            self.position_scale_factor = *v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.max_total_capital > Decimal::ZERO,
            "max_total_capital",
            self.max_total_capital,
            "Must be positive",
        )?;
        ensure(
            self.max_per_trade_risk > Decimal::ZERO && self.max_per_trade_risk <= Decimal::ONE,
            "max_per_trade_risk",
            self.max_per_trade_risk,
            "Must be in (0, 1]",
        )?;
        ensure(
            self.default_stop_loss_atr_multiplier > Decimal::ZERO,
            "default_stop_loss_atr_multiplier",
            self.default_stop_loss_atr_multiplier,
            "Must be positive",
        )?;
        ensure(
            self.default_risk_reward_ratio > Decimal::ZERO,
            "default_risk_reward_ratio",
            self.default_risk_reward_ratio,
            "Must be positive",
        )?;
        ensure(
            self.min_position_size >= Decimal::ZERO,
            "min_position_size",
            self.min_position_size,
            "Must not be negative",
        )
    }

    /// Scale factor is clamped into the allowed range here
    pub fn to_risk_state(&self) -> RiskState {
        RiskState::new(
            self.max_total_capital,
            self.max_per_trade_risk,
            self.default_stop_loss_atr_multiplier,
            self.default_risk_reward_ratio,
            self.min_position_size,
            self.position_scale_factor,
        )
    }
}

impl Default for RiskEnvConfig {
    fn default() -> Self {
        Self {
            max_total_capital: dec!(10000),
            max_per_trade_risk: dec!(0.01),
            default_stop_loss_atr_multiplier: dec!(1.5),
            default_risk_reward_ratio: dec!(1.5),
            min_position_size: dec!(0.001),
            position_scale_factor: Decimal::ONE,
        }
    }
}
