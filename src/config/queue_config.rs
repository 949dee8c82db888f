use super::{Lookup, ensure, parse_var};
use crate::application::market_data::streaming_engine::StreamingCapacities;
use crate::domain::errors::ConfigError;
use anyhow::Result;

/// Bounded queue capacities shared by every instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueEnvConfig {
    /// Per-instance tick input and per-aggregator input
    pub tick_queue_capacity: usize,
    /// Closed candles per instance
    pub kline_queue_capacity: usize,
    /// Ticks forwarded to the execution monitor
    pub broadcast_queue_capacity: usize,
}

impl QueueEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        Ok(Self {
            tick_queue_capacity: parse_var(lookup, "TICK_QUEUE_CAPACITY", "1000")?,
            kline_queue_capacity: parse_var(lookup, "KLINE_QUEUE_CAPACITY", "100")?,
            broadcast_queue_capacity: parse_var(lookup, "BROADCAST_QUEUE_CAPACITY", "1000")?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("tick_queue_capacity", self.tick_queue_capacity),
            ("kline_queue_capacity", self.kline_queue_capacity),
            ("broadcast_queue_capacity", self.broadcast_queue_capacity),
        ] {
            ensure(value > 0, field, value, "Queue capacity must be at least 1")?;
        }
        Ok(())
    }

    pub fn streaming_capacities(&self) -> StreamingCapacities {
        StreamingCapacities {
            aggregator_input: self.tick_queue_capacity,
            candles: self.kline_queue_capacity,
            tick_broadcast: self.broadcast_queue_capacity,
        }
    }
}

impl Default for QueueEnvConfig {
    fn default() -> Self {
        Self {
            tick_queue_capacity: 1000,
            kline_queue_capacity: 100,
            broadcast_queue_capacity: 1000,
        }
    }
}
