//! Strategy configuration parsing from environment variables.
//!
//! Regime thresholds and indicator history sizing.

use super::{Lookup, ensure, parse_var};
use crate::application::market_data::indicator_service::IndicatorSettings;
use crate::application::strategy::regime_state_machine::RegimeSettings;
use crate::domain::errors::ConfigError;
use anyhow::Result;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyEnvConfig {
    pub trend_threshold: Decimal,
    pub atr_vol_threshold: Decimal,
    pub indicator_min_history: usize,
    pub indicator_history_limit: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyOverrides {
    pub trend_threshold: Option<Decimal>,
    pub atr_vol_threshold: Option<Decimal>,
    pub indicator_min_history: Option<usize>,
    pub indicator_history_limit: Option<usize>,
}

impl StrategyEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        Ok(Self {
            trend_threshold: parse_var(lookup, "TREND_THRESHOLD", "60")?,
            atr_vol_threshold: parse_var(lookup, "ATR_VOL_THRESHOLD", "0.0005")?,
            indicator_min_history: parse_var(lookup, "INDICATOR_MIN_HISTORY", "30")?,
            indicator_history_limit: parse_var(lookup, "INDICATOR_HISTORY_LIMIT", "100")?,
        })
    }

    pub fn apply(&mut self, overrides: &StrategyOverrides) {
        if let Some(v) = overrides.trend_threshold {
            self.trend_threshold = v;
        }
        if let Some(v) = overrides.atr_vol_threshold {
            self.atr_vol_threshold = v;
        }
        if let Some(v) = overrides.indicator_min_history {
            self.indicator_min_history = v;
        }
        if let Some(v) = overrides.indicator_history_limit {
            self.indicator_history_limit = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.trend_threshold > Decimal::ZERO && self.trend_threshold <= Decimal::ONE_HUNDRED,
            "trend_threshold",
            self.trend_threshold,
            "Must be in (0, 100]",
        )?;
        ensure(
            self.atr_vol_threshold >= Decimal::ZERO,
            "atr_vol_threshold",
            self.atr_vol_threshold,
            "Must not be negative",
        )?;
        ensure(
            self.indicator_min_history > 0,
            "indicator_min_history",
            self.indicator_min_history,
            "Must be at least 1",
        )?;
        ensure(
            self.indicator_history_limit >= self.indicator_min_history,
            "indicator_history_limit",
            self.indicator_history_limit,
            "Must be at least indicator_min_history",
        )
    }

    pub fn regime_settings(&self) -> RegimeSettings {
        RegimeSettings {
            trend_threshold: self.trend_threshold,
            atr_vol_threshold: self.atr_vol_threshold,
        }
    }

    pub fn indicator_settings(&self) -> IndicatorSettings {
        IndicatorSettings {
            min_history: self.indicator_min_history,
            history_limit: self.indicator_history_limit,
            ..IndicatorSettings::default()
        }
    }
}
