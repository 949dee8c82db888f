//! Configuration module.
//!
//! Structured configuration loaded from environment variables, organized by
//! concern: Risk, Strategy, Simulation and Queues. Trading instances come
//! either from `SYMBOLS` (one instance per symbol, all sharing the
//! environment settings) or from a TOML instances file with per-instance
//! overrides.

mod instances_file;
mod queue_config;
mod risk_env_config;
mod simulation_config;
mod strategy_config;

pub use instances_file::{InstanceEntry, InstancesFile};
pub use queue_config::QueueEnvConfig;
pub use risk_env_config::{RiskEnvConfig, RiskOverrides};
pub use simulation_config::{SimulationEnvConfig, SimulationOverrides};
pub use strategy_config::{StrategyEnvConfig, StrategyOverrides};

use crate::domain::errors::ConfigError;
use anyhow::{Context, Result};
use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Source of raw configuration values, keyed by variable name
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Parses `key` from `lookup`, falling back to `default` when unset
pub(crate) fn parse_var<T>(lookup: Lookup, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<T>()
        .context(format!("Failed to parse {}", key))
}

pub(crate) fn ensure(
    condition: bool,
    field: &str,
    value: impl Display,
    expected: &str,
) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        })
    }
}

/// Where order execution goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Simulated,
    Live,
}

impl FromStr for ExecutionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "sim" => Ok(ExecutionMode::Simulated),
            "live" => Ok(ExecutionMode::Live),
            _ => anyhow::bail!(
                "Invalid EXECUTION_MODE: {}. Must be 'simulated' or 'live'",
                s
            ),
        }
    }
}

/// Settings of one trading instance
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceConfig {
    pub name: String,
    pub symbol: String,
    pub risk: RiskEnvConfig,
    pub strategy: StrategyEnvConfig,
    pub simulation: SimulationEnvConfig,
}

impl InstanceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            !self.symbol.trim().is_empty(),
            "symbol",
            &self.name,
            "Instance symbol must not be empty",
        )?;
        self.risk.validate()?;
        self.strategy.validate()?;
        self.simulation.validate()
    }
}

/// Explicit sources that take precedence over the environment (CLI flags)
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub instances_file: Option<PathBuf>,
    pub symbols: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub execution_mode: ExecutionMode,
    pub queues: QueueEnvConfig,
    pub instances: Vec<InstanceConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::load(&ConfigSources::default(), &|key| env::var(key).ok())
    }

    pub fn from_env_with(sources: &ConfigSources) -> Result<Self> {
        Self::load(sources, &|key| env::var(key).ok())
    }

    /// Builds and validates the configuration.
    ///
    /// Instance precedence: `sources.instances_file`, `sources.symbols`,
    /// `INSTANCES_FILE`, then `SYMBOLS` (default `BTC-USDT`).
    pub fn load(sources: &ConfigSources, lookup: Lookup) -> Result<Self> {
        let risk = RiskEnvConfig::from_lookup(lookup)?;
        let strategy = StrategyEnvConfig::from_lookup(lookup)?;
        let simulation = SimulationEnvConfig::from_lookup(lookup)?;
        let queues = QueueEnvConfig::from_lookup(lookup)?;

        let mode_str = lookup("EXECUTION_MODE").unwrap_or_else(|| "simulated".to_string());
        let execution_mode = ExecutionMode::from_str(&mode_str)?;

        let base = InstanceConfig {
            name: String::new(),
            symbol: String::new(),
            risk,
            strategy,
            simulation,
        };

        let file_path = sources
            .instances_file
            .clone()
            .or_else(|| lookup("INSTANCES_FILE").filter(|p| !p.trim().is_empty()).map(PathBuf::from));

        let instances = match (&sources.instances_file, &sources.symbols, file_path) {
            (None, Some(symbols), _) => Self::instances_for_symbols(&base, symbols),
            (_, _, Some(path)) => Self::instances_from_file(&base, &path)?,
            (_, _, None) => {
                let symbols = lookup("SYMBOLS").unwrap_or_else(|| "BTC-USDT".to_string());
                Self::instances_for_symbols(&base, &split_symbols(&symbols))
            }
        };

        let config = Self {
            execution_mode,
            queues,
            instances,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            !self.instances.is_empty(),
            "instances",
            0,
            "At least one trading instance is required",
        )?;
        self.queues.validate()?;
        for instance in &self.instances {
            instance.validate()?;
        }
        Ok(())
    }

    pub fn symbols(&self) -> Vec<String> {
        self.instances.iter().map(|i| i.symbol.clone()).collect()
    }

    fn instances_for_symbols(base: &InstanceConfig, symbols: &[String]) -> Vec<InstanceConfig> {
        symbols
            .iter()
            .map(|symbol| InstanceConfig {
                name: symbol.clone(),
                symbol: symbol.clone(),
                ..base.clone()
            })
            .collect()
    }

    fn instances_from_file(base: &InstanceConfig, path: &Path) -> Result<Vec<InstanceConfig>> {
        let file = InstancesFile::load(path)?;
        Ok(Self::instances_from_entries(base, &file))
    }

    fn instances_from_entries(base: &InstanceConfig, file: &InstancesFile) -> Vec<InstanceConfig> {
        file.instances
            .iter()
            .map(|(name, entry)| {
                let mut instance = InstanceConfig {
                    name: name.clone(),
                    symbol: entry.symbol.trim().to_string(),
                    ..base.clone()
                };
                instance.risk.apply(&entry.risk);
                instance.strategy.apply(&entry.strategy);
                instance.simulation.apply(&entry.simulation);
                instance
            })
            .collect()
    }
}

/// Comma separated list, blanks removed
pub fn split_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)], sources: ConfigSources) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::load(&sources, &|k| vars.get(k).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[], ConfigSources::default()).expect("Should parse with defaults");
        assert_eq!(config.execution_mode, ExecutionMode::Simulated);
        assert_eq!(config.symbols(), vec!["BTC-USDT"]);
        assert_eq!(config.queues, QueueEnvConfig::default());
        assert_eq!(config.instances[0].simulation.leverage, dec!(10));
    }

    #[test]
    fn test_symbols_create_one_instance_each() {
        let config = load(
            &[("SYMBOLS", "BTC-USDT, ETH-USDT,,SOL-USDT"), ("LEVERAGE", "3")],
            ConfigSources::default(),
        )
        .unwrap();
        assert_eq!(config.symbols(), vec!["BTC-USDT", "ETH-USDT", "SOL-USDT"]);
        assert!(config.instances.iter().all(|i| i.simulation.leverage == dec!(3)));
    }

    #[test]
    fn test_cli_symbols_win_over_env() {
        let sources = ConfigSources {
            symbols: Some(vec!["ETH-USDT".to_string()]),
            ..Default::default()
        };
        let config = load(&[("SYMBOLS", "BTC-USDT")], sources).unwrap();
        assert_eq!(config.symbols(), vec!["ETH-USDT"]);
    }

    #[test]
    fn test_execution_mode_parsing() {
        assert_eq!(ExecutionMode::from_str("LIVE").unwrap(), ExecutionMode::Live);
        assert_eq!(ExecutionMode::from_str("simulated").unwrap(), ExecutionMode::Simulated);
        assert!(ExecutionMode::from_str("paper").is_err());
        assert!(load(&[("EXECUTION_MODE", "paper")], ConfigSources::default()).is_err());
    }

    #[test]
    fn test_invalid_values_fail_fast() {
        let err = load(&[("FEE_RATE", "-0.1")], ConfigSources::default()).unwrap_err();
        assert!(err.to_string().contains("fee_rate"));

        assert!(load(&[("TICK_QUEUE_CAPACITY", "0")], ConfigSources::default()).is_err());
        assert!(load(&[("SYMBOLS", " , ")], ConfigSources::default()).is_err());
    }

    #[test]
    fn test_file_entries_override_env_base() {
        let base = load(&[("MAX_TOTAL_CAPITAL", "20000")], ConfigSources::default())
            .unwrap()
            .instances
            .remove(0);
        let file = InstancesFile::parse(
            r#"
            [instances.alpha]
            symbol = "ETH-USDT"

            [instances.alpha.strategy]
            trend_threshold = 70

            [instances.beta]
            symbol = "BTC-USDT"
            "#,
        )
        .unwrap();

        let instances = Config::instances_from_entries(&base, &file);
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].name, "alpha");
        assert_eq!(instances[0].strategy.trend_threshold, dec!(70));
        assert_eq!(instances[0].risk.max_total_capital, dec!(20000));
        assert_eq!(instances[1].strategy.trend_threshold, dec!(60));
    }

    #[test]
    fn test_missing_instances_file_is_an_error() {
        let result = load(
            &[("INSTANCES_FILE", "/nonexistent/instances.toml")],
            ConfigSources::default(),
        );
        assert!(result.is_err());
    }
}
