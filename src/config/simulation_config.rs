use super::{Lookup, ensure, parse_var};
use crate::application::execution::simulator::SimulatorConfig;
use crate::domain::errors::ConfigError;
use anyhow::Result;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Simulated account settings
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationEnvConfig {
    pub initial_capital: Decimal,
    pub leverage: Decimal,
    pub fee_rate: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationOverrides {
    pub initial_capital: Option<Decimal>,
    pub leverage: Option<Decimal>,
    pub fee_rate: Option<Decimal>,
}

impl SimulationEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        Ok(Self {
            initial_capital: parse_var(lookup, "INITIAL_CAPITAL", "10000")?,
            leverage: parse_var(lookup, "LEVERAGE", "10")?,
            fee_rate: parse_var(lookup, "FEE_RATE", "0.0005")?,
        })
    }

    pub fn apply(&mut self, overrides: &SimulationOverrides) {
        if let Some(v) = overrides.initial_capital {
            self.initial_capital = v;
        }
        if let Some(v) = overrides.leverage {
            self.leverage = v;
        }
        if let Some(v) = overrides.fee_rate {
            self.fee_rate = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.initial_capital > Decimal::ZERO,
            "initial_capital",
            self.initial_capital,
            "Must be positive",
        )?;
        ensure(self.leverage > Decimal::ZERO, "leverage", self.leverage, "Must be positive")?;
        ensure(
            self.fee_rate >= Decimal::ZERO,
            "fee_rate",
            self.fee_rate,
            "Must not be negative",
        )
    }

    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            initial_capital: self.initial_capital,
            leverage: self.leverage,
            fee_rate: self.fee_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = SimulationEnvConfig::from_lookup(&|_| None).unwrap();
        assert_eq!(config.simulator_config(), SimulatorConfig::default());
    }

    #[test]
    fn test_zero_leverage_rejected() {
        let config = SimulationEnvConfig::from_lookup(&|k| {
            (k == "LEVERAGE").then(|| "0".to_string())
        })
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("leverage"));

        let mut fixed = config.clone();
        fixed.apply(&SimulationOverrides {
            leverage: Some(dec!(5)),
            ..Default::default()
        });
        assert!(fixed.validate().is_ok());
    }
}
