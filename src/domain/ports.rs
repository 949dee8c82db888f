use crate::domain::errors::{ExecutionError, IndicatorError};
use crate::domain::market::candle::{Candle, Tick};
use crate::domain::market::indicators::IndicatorSnapshot;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::trading::position::Position;
use crate::domain::trading::types::{AccountBalance, Signal, TradeRecord};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::mpsc::Receiver;

/// Upstream tick feed (exchange connector or simulation)
#[async_trait]
pub trait TickSource: Send + Sync {
    /// Starts streaming ticks for `symbols` into a single multiplexed channel
    async fn subscribe(&self, symbols: Vec<String>) -> Result<Receiver<Tick>>;
}

/// Derived indicators per timeframe, fed with closed candles
#[async_trait]
pub trait IndicatorProvider: Send + Sync {
    async fn update_candle(&self, candle: &Candle);

    /// Returns `IndicatorError::NotReady` until enough history is available
    async fn snapshot(&self, timeframe: Timeframe) -> Result<IndicatorSnapshot, IndicatorError>;
}

/// Order execution capability shared by the simulator and the live adapter
#[async_trait]
pub trait ExecutionService: Send + Sync {
    async fn execute_signal(&self, signal: &Signal) -> Result<(), ExecutionError>;
    async fn get_position(&self) -> Result<Position, ExecutionError>;
    async fn get_balance(&self) -> Result<AccountBalance, ExecutionError>;
    async fn get_trade_history(&self) -> Result<Vec<TradeRecord>, ExecutionError>;
    async fn get_peak_equity(&self) -> Result<Decimal, ExecutionError>;
}
