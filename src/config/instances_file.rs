//! TOML instance definitions.
//!
//! ```toml
//! [instances.btc]
//! symbol = "BTC-USDT"
//!
//! [instances.btc.risk]
//! max_total_capital = 5000
//!
//! [instances.eth]
//! symbol = "ETH-USDT"
//!
//! [instances.eth.simulation]
//! leverage = 5
//! ```

use super::risk_env_config::RiskOverrides;
use super::simulation_config::SimulationOverrides;
use super::strategy_config::StrategyOverrides;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct InstancesFile {
    /// Keyed by instance name, iterated in name order
    pub instances: BTreeMap<String, InstanceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceEntry {
    pub symbol: String,
    #[serde(default)]
    pub risk: RiskOverrides,
    #[serde(default)]
    pub strategy: StrategyOverrides,
    #[serde(default)]
    pub simulation: SimulationOverrides,
}

impl InstancesFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read instances file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid instances file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let file: Self = toml::from_str(raw).context("Failed to parse instances TOML")?;
        if file.instances.is_empty() {
            anyhow::bail!("Instances file defines no [instances.<name>] table");
        }
        Ok(file)
    }
}
