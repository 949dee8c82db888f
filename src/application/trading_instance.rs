//! One trading instance: the decision loop of a single symbol.
//!
//! Each closed candle runs through indicators, regime, position lookup,
//! signal generation and execution, in that order.

use crate::application::execution::simulator::SimulatedExecutor;
use crate::application::market_data::indicator_service::TaIndicatorProvider;
use crate::application::market_data::streaming_engine::{StreamingCapacities, StreamingEngine};
use crate::application::strategy::regime_state_machine::RegimeStateMachine;
use crate::application::strategy::signal_generator::SignalGenerator;
use crate::config::{ExecutionMode, InstanceConfig};
use crate::domain::market::candle::{Candle, Tick};
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::{ExecutionService, IndicatorProvider};
use crate::domain::trading::types::Signal;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::live_execution::LiveExecutionStub;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct TradingInstance {
    name: String,
    symbol: String,
    indicators: Arc<dyn IndicatorProvider>,
    regime: Arc<RegimeStateMachine>,
    signals: SignalGenerator,
    execution: Arc<dyn ExecutionService>,
}

impl TradingInstance {
    pub fn new(
        name: &str,
        symbol: &str,
        indicators: Arc<dyn IndicatorProvider>,
        regime: Arc<RegimeStateMachine>,
        signals: SignalGenerator,
        execution: Arc<dyn ExecutionService>,
    ) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            indicators,
            regime,
            signals,
            execution,
        }
    }

    /// Wires a complete instance for `config` and spawns its workers:
    /// the streaming engine, the candle loop and, when simulated, the
    /// execution monitor. Must run inside a tokio runtime.
    pub fn launch(
        config: &InstanceConfig,
        mode: ExecutionMode,
        capacities: StreamingCapacities,
        events: EventBus,
        ticks: Receiver<Tick>,
    ) -> InstanceHandle {
        let symbol = config.symbol.as_str();
        let (engine, channels) = StreamingEngine::start(symbol, &Timeframe::all(), capacities);
        let mut tasks = Vec::with_capacity(3);

        let execution: Arc<dyn ExecutionService> = match mode {
            ExecutionMode::Simulated => {
                let simulator = Arc::new(SimulatedExecutor::new(
                    symbol,
                    config.simulation.simulator_config(),
                    events.clone(),
                ));
                tasks.push(simulator.clone().start_monitor(channels.ticks));
                simulator
            }
            ExecutionMode::Live => {
                // Order routing is not wired; broadcast ticks have no consumer
                drop(channels.ticks);
                Arc::new(LiveExecutionStub::new(symbol))
            }
        };

        let indicators: Arc<dyn IndicatorProvider> =
            Arc::new(TaIndicatorProvider::new(config.strategy.indicator_settings()));
        let regime = Arc::new(RegimeStateMachine::new(
            symbol,
            config.strategy.regime_settings(),
            indicators.clone(),
            events.clone(),
        ));
        let signals = SignalGenerator::new(
            symbol,
            indicators.clone(),
            regime.clone(),
            execution.clone(),
            config.risk.to_risk_state(),
            events,
        );

        let instance = Arc::new(Self::new(
            &config.name,
            symbol,
            indicators,
            regime,
            signals,
            execution,
        ));
        tasks.push(tokio::spawn(instance.clone().run(channels.candles)));
        tasks.push(tokio::spawn(engine.run(ticks)));

        info!(
            "TradingInstance: {} ({}) launched in {:?} mode",
            config.name, symbol, mode
        );

        InstanceHandle { instance, tasks }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn regime(&self) -> &Arc<RegimeStateMachine> {
        &self.regime
    }

    pub fn signals(&self) -> &SignalGenerator {
        &self.signals
    }

    pub fn execution(&self) -> Arc<dyn ExecutionService> {
        self.execution.clone()
    }

    /// Runs the pipeline for one closed candle.
    ///
    /// Returns the actionable signal handed to execution, if any. Execution
    /// rejections are logged and do not stop the loop.
    pub async fn on_candle(&self, candle: &Candle) -> Option<Signal> {
        if candle.symbol != self.symbol {
            return None;
        }

        self.indicators.update_candle(candle).await;
        self.regime.on_candle(candle).await;

        let position = match self.execution.get_position().await {
            Ok(position) => position,
            Err(e) => {
                warn!(
                    "TradingInstance: {} position unavailable, skipping {} candle: {}",
                    self.name, candle.timeframe, e
                );
                return None;
            }
        };

        let signal = self.signals.on_candle(candle, &position).await;
        if !signal.is_actionable() {
            return None;
        }

        match self.execution.execute_signal(&signal).await {
            Ok(()) => debug!("TradingInstance: {} executed {}", self.name, signal),
            Err(e) => warn!(
                "TradingInstance: {} {} {} rejected: {}",
                self.name, signal.action, signal.direction, e
            ),
        }
        Some(signal)
    }

    /// Consumes closed candles until the queue closes
    pub async fn run(self: Arc<Self>, mut candles: Receiver<Candle>) {
        info!("TradingInstance: {} candle loop started", self.name);
        while let Some(candle) = candles.recv().await {
            self.on_candle(&candle).await;
        }
        info!("TradingInstance: {} candle stream closed, stopping", self.name);
    }
}

/// A launched instance and its worker tasks
pub struct InstanceHandle {
    pub instance: Arc<TradingInstance>,
    pub tasks: Vec<JoinHandle<()>>,
}

impl InstanceHandle {
    pub fn symbol(&self) -> &str {
        self.instance.symbol()
    }

    pub fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::execution::simulator::SimulatorConfig;
    use crate::application::strategy::regime_state_machine::RegimeSettings;
    use crate::domain::errors::ExecutionError;
    use crate::domain::market::market_regime::Regime;
    use crate::domain::risk::state::RiskState;
    use crate::domain::trading::position::Position;
    use crate::domain::trading::types::{AccountBalance, Direction, SignalAction, TradeRecord};
    use crate::infrastructure::mock::{MockIndicatorProvider, snapshot_with};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const SYMBOL: &str = "BTC-USDT";
    const HOUR_START: i64 = 1704067200000;

    fn build(
        provider: Arc<MockIndicatorProvider>,
        execution: Arc<dyn ExecutionService>,
    ) -> TradingInstance {
        let events = EventBus::new();
        let regime = Arc::new(RegimeStateMachine::new(
            SYMBOL,
            RegimeSettings::default(),
            provider.clone(),
            events.clone(),
        ));
        let signals = SignalGenerator::new(
            SYMBOL,
            provider.clone(),
            regime.clone(),
            execution.clone(),
            RiskState::default(),
            events,
        );
        TradingInstance::new("btc", SYMBOL, provider, regime, signals, execution)
    }

    fn candle(timeframe: Timeframe, close: Decimal, ts: i64) -> Candle {
        let tick = Tick::new(SYMBOL, close, dec!(1), ts);
        Candle::open_at(&tick, timeframe, close)
    }

    struct UnreachableExecution;

    #[async_trait]
    impl ExecutionService for UnreachableExecution {
        async fn execute_signal(&self, _signal: &Signal) -> Result<(), ExecutionError> {
            panic!("must not execute without a position");
        }

        async fn get_position(&self) -> Result<Position, ExecutionError> {
            Err(ExecutionError::Unsupported {
                backend: "test".to_string(),
                operation: "get_position".to_string(),
            })
        }

        async fn get_balance(&self) -> Result<AccountBalance, ExecutionError> {
            Ok(AccountBalance::default())
        }

        async fn get_trade_history(&self) -> Result<Vec<TradeRecord>, ExecutionError> {
            Ok(Vec::new())
        }

        async fn get_peak_equity(&self) -> Result<Decimal, ExecutionError> {
            Ok(Decimal::ZERO)
        }
    }

    #[tokio::test]
    async fn test_candle_flows_to_execution() {
        let provider = MockIndicatorProvider::new();
        provider
            .set_snapshot(snapshot_with(Timeframe::OneHour, dec!(105), dec!(100), dec!(65), dec!(1)))
            .await;
        provider
            .set_snapshot(snapshot_with(Timeframe::FiveMin, dec!(105), dec!(100), dec!(60), dec!(2)))
            .await;

        let simulator = Arc::new(SimulatedExecutor::new(
            SYMBOL,
            SimulatorConfig::default(),
            EventBus::new(),
        ));
        simulator.on_tick(&Tick::new(SYMBOL, dec!(105), dec!(1), HOUR_START)).await;
        let instance = build(provider.clone(), simulator.clone());

        // Hourly candle sets the regime, no trade
        assert!(instance
            .on_candle(&candle(Timeframe::OneHour, dec!(105), HOUR_START))
            .await
            .is_none());
        assert_eq!(instance.regime().current().await, Regime::StrongUpTrend);

        let signal = instance
            .on_candle(&candle(Timeframe::FiveMin, dec!(105), HOUR_START))
            .await
            .expect("up-trend entry");
        assert_eq!(signal.action, SignalAction::Open);

        let position = simulator.get_position().await.unwrap();
        assert_eq!(position.side, Direction::Long);
        assert_eq!(position.entry_regime, Regime::StrongUpTrend);
        assert_eq!(provider.updates().await.len(), 2);
    }

    #[tokio::test]
    async fn test_position_failure_skips_signal() {
        let provider = MockIndicatorProvider::new();
        provider
            .set_snapshot(snapshot_with(Timeframe::FiveMin, dec!(105), dec!(100), dec!(60), dec!(2)))
            .await;
        let instance = build(provider.clone(), Arc::new(UnreachableExecution));

        let result = instance
            .on_candle(&candle(Timeframe::FiveMin, dec!(105), HOUR_START))
            .await;
        assert!(result.is_none());
        // Indicators were still fed
        assert_eq!(provider.updates().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_execution_keeps_running() {
        let provider = MockIndicatorProvider::new();
        provider
            .set_snapshot(snapshot_with(Timeframe::OneHour, dec!(105), dec!(100), dec!(65), dec!(1)))
            .await;
        provider
            .set_snapshot(snapshot_with(Timeframe::FiveMin, dec!(105), dec!(100), dec!(60), dec!(2)))
            .await;
        // No tick observed yet, so the fill is rejected
        let simulator = Arc::new(SimulatedExecutor::new(
            SYMBOL,
            SimulatorConfig::default(),
            EventBus::new(),
        ));
        let instance = build(provider, simulator.clone());

        instance
            .on_candle(&candle(Timeframe::OneHour, dec!(105), HOUR_START))
            .await;
        let signal = instance
            .on_candle(&candle(Timeframe::FiveMin, dec!(105), HOUR_START))
            .await;
        assert!(signal.is_some());
        assert!(simulator.get_position().await.unwrap().is_flat());
    }

    #[tokio::test]
    async fn test_other_symbol_candles_are_ignored() {
        let provider = MockIndicatorProvider::new();
        let instance = build(provider.clone(), Arc::new(UnreachableExecution));
        let mut foreign = candle(Timeframe::FiveMin, dec!(2300), HOUR_START);
        foreign.symbol = "ETH-USDT".to_string();

        assert!(instance.on_candle(&foreign).await.is_none());
        assert!(provider.updates().await.is_empty());
    }
}
