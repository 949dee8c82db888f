//! Simulated execution engine.
//!
//! Holds one leveraged position per symbol with margin, fee and PnL
//! accounting. Fills always use the last observed tick price. A monitor task
//! marks the account to market on every tick and closes the position when
//! its stop-loss, liquidation or take-profit level is crossed.

use crate::domain::errors::ExecutionError;
use crate::domain::events::TradingEvent;
use crate::domain::market::candle::Tick;
use crate::domain::ports::ExecutionService;
use crate::domain::trading::position::{Position, liquidation_price};
use crate::domain::trading::types::{
    AccountBalance, Direction, Signal, SignalAction, TradeRecord, TriggerReason,
};
use crate::infrastructure::event_bus::EventBus;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    pub initial_capital: Decimal,
    pub leverage: Decimal,
    /// Fraction of notional charged on entry and on exit
    pub fee_rate: Decimal,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(10000),
            leverage: dec!(10),
            fee_rate: dec!(0.0005),
        }
    }
}

#[derive(Debug, Clone)]
struct AccountState {
    balance: Decimal,
    margin_used: Decimal,
    equity: Decimal,
    peak_equity: Decimal,
    last_price: Option<Decimal>,
    last_tick_time: i64,
    position: Position,
    trades: Vec<TradeRecord>,
}

impl AccountState {
    fn mark_to_market(&mut self) {
        self.position.unrealized_pnl = match self.last_price {
            Some(price) if !self.position.is_flat() => self.position.pnl_at(price),
            _ => Decimal::ZERO,
        };
        self.equity = self.balance + self.position.unrealized_pnl;
    }
}

pub struct SimulatedExecutor {
    symbol: String,
    config: SimulatorConfig,
    state: RwLock<AccountState>,
    events: EventBus,
}

impl SimulatedExecutor {
    pub fn new(symbol: &str, config: SimulatorConfig, events: EventBus) -> Self {
        let capital = config.initial_capital;
        info!(
            "SimulatedExecutor: {} ready with capital ${}, leverage {}x, fee rate {}",
            symbol, capital, config.leverage, config.fee_rate
        );
        Self {
            symbol: symbol.to_string(),
            state: RwLock::new(AccountState {
                balance: capital,
                margin_used: Decimal::ZERO,
                equity: capital,
                peak_equity: capital,
                last_price: None,
                last_tick_time: 0,
                position: Position::flat(symbol),
                trades: Vec::new(),
            }),
            config,
            events,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub async fn last_price(&self) -> Option<Decimal> {
        self.state.read().await.last_price
    }

    /// Marks the account to `tick` and fires any due exit.
    ///
    /// Returns the trade closed by this tick, if any.
    pub async fn on_tick(&self, tick: &Tick) -> Option<TradeRecord> {
        if tick.symbol != self.symbol {
            return None;
        }

        let mut state = self.state.write().await;
        state.last_price = Some(tick.price);
        state.last_tick_time = tick.timestamp;
        state.mark_to_market();
        // Peak equity only moves with the monitor
        if state.equity > state.peak_equity {
            state.peak_equity = state.equity;
        }

        let trigger = state.position.exit_trigger(tick.price);
        let closed = match trigger {
            Some(reason) => {
                info!(
                    "SimulatedExecutor: {} {} triggered at {} (SL={} TP={} liq={})",
                    self.symbol,
                    reason,
                    tick.price,
                    state.position.stop_loss_price,
                    state.position.take_profit_price,
                    state.position.liquidation_price
                );
                Some(self.close_locked(&mut state, tick.price, reason))
            }
            None => None,
        };
        drop(state);

        if let Some(record) = &closed {
            self.events
                .publish(TradingEvent::PositionClosed(record.clone()))
                .await;
        }
        closed
    }

    /// Consumes broadcast ticks until the channel closes
    pub fn start_monitor(self: Arc<Self>, mut ticks: Receiver<Tick>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("SimulatedExecutor: {} monitor started", self.symbol);
            while let Some(tick) = ticks.recv().await {
                self.on_tick(&tick).await;
            }
            info!("SimulatedExecutor: {} monitor stopped, tick stream closed", self.symbol);
        })
    }

    fn open_locked(
        &self,
        state: &mut AccountState,
        signal: &Signal,
    ) -> Result<Option<TradingEvent>, ExecutionError> {
        if !state.position.is_flat() {
            warn!(
                "SimulatedExecutor: {} open {} ignored, {} position already held",
                self.symbol, signal.direction, state.position.side
            );
            return Ok(None);
        }
        if signal.direction == Direction::Flat || signal.position_size <= Decimal::ZERO {
            warn!(
                "SimulatedExecutor: {} open ignored, direction {} size {}",
                self.symbol, signal.direction, signal.position_size
            );
            return Ok(None);
        }
        if self.config.leverage <= Decimal::ZERO {
            return Err(ExecutionError::InvalidLeverage {
                leverage: self.config.leverage,
            });
        }
        let price = state.last_price.ok_or_else(|| ExecutionError::NoMarketPrice {
            symbol: self.symbol.clone(),
        })?;

        let size = signal.position_size;
        let notional = size * price;
        let required_margin = notional / self.config.leverage;
        let available = state.balance - state.margin_used;
        if available < required_margin {
            return Err(ExecutionError::InsufficientMargin {
                need: required_margin,
                available,
            });
        }

        let fee = notional * self.config.fee_rate;
        let liquidation = liquidation_price(signal.direction, price, self.config.leverage);
        state.balance -= fee;
        state.margin_used = required_margin;
        state.position = Position {
            symbol: self.symbol.clone(),
            side: signal.direction,
            size,
            avg_price: price,
            liquidation_price: liquidation,
            stop_loss_price: signal.stop_loss_price,
            take_profit_price: signal.take_profit_price,
            unrealized_pnl: Decimal::ZERO,
            entry_time: state.last_tick_time,
            entry_fee: fee,
            margin: required_margin,
            entry_regime: signal.source_regime,
        };
        state.mark_to_market();

        Ok(Some(TradingEvent::PositionOpened {
            symbol: self.symbol.clone(),
            side: signal.direction,
            size,
            price,
            fee,
            liquidation_price: liquidation,
            timestamp: state.last_tick_time,
        }))
    }

    fn close_locked(&self, state: &mut AccountState, price: Decimal, reason: TriggerReason) -> TradeRecord {
        let position = std::mem::replace(&mut state.position, Position::flat(&self.symbol));
        let pnl = position.pnl_at(price);
        let close_fee = position.size * price * self.config.fee_rate;

        state.balance += pnl - close_fee;
        state.margin_used = Decimal::ZERO;
        state.mark_to_market();

        let record = TradeRecord {
            id: Uuid::new_v4().to_string(),
            entry_time: position.entry_time,
            exit_time: state.last_tick_time,
            symbol: self.symbol.clone(),
            side: position.side,
            entry_price: position.avg_price,
            exit_price: price,
            size: position.size,
            realized_pnl: pnl,
            fee: position.entry_fee + close_fee,
            trigger_reason: reason,
        };
        state.trades.push(record.clone());
        debug!(
            "SimulatedExecutor: {} balance now {} after {} trades",
            self.symbol,
            state.balance,
            state.trades.len()
        );
        record
    }

    fn update_locked(&self, state: &mut AccountState, signal: &Signal) {
        if state.position.is_flat() {
            warn!("SimulatedExecutor: {} update ignored, no open position", self.symbol);
            return;
        }
        if !signal.stop_loss_price.is_zero() {
            state.position.stop_loss_price = signal.stop_loss_price;
        }
        if !signal.take_profit_price.is_zero() {
            state.position.take_profit_price = signal.take_profit_price;
        }
        info!(
            "SimulatedExecutor: {} levels updated SL={} TP={}",
            self.symbol, state.position.stop_loss_price, state.position.take_profit_price
        );
    }
}

#[async_trait]
impl ExecutionService for SimulatedExecutor {
    async fn execute_signal(&self, signal: &Signal) -> Result<(), ExecutionError> {
        if signal.symbol != self.symbol {
            warn!(
                "SimulatedExecutor: {} ignoring signal for {}",
                self.symbol, signal.symbol
            );
            return Ok(());
        }

        let mut state = self.state.write().await;
        let event = match signal.action {
            SignalAction::None => None,
            SignalAction::Open => self.open_locked(&mut state, signal)?,
            SignalAction::Close => {
                if state.position.is_flat() {
                    warn!("SimulatedExecutor: {} close ignored, already flat", self.symbol);
                    None
                } else {
                    let price = state.last_price.ok_or_else(|| ExecutionError::NoMarketPrice {
                        symbol: self.symbol.clone(),
                    })?;
                    Some(TradingEvent::PositionClosed(self.close_locked(
                        &mut state,
                        price,
                        TriggerReason::Signal,
                    )))
                }
            }
            SignalAction::Update => {
                self.update_locked(&mut state, signal);
                None
            }
        };
        drop(state);

        if let Some(event) = event {
            self.events.publish(event).await;
        }
        Ok(())
    }

    async fn get_position(&self) -> Result<Position, ExecutionError> {
        Ok(self.state.read().await.position.clone())
    }

    async fn get_balance(&self) -> Result<AccountBalance, ExecutionError> {
        let state = self.state.read().await;
        Ok(AccountBalance {
            balance: state.balance,
            margin_used: state.margin_used,
            available: state.balance - state.margin_used,
            equity: state.equity,
        })
    }

    async fn get_trade_history(&self) -> Result<Vec<TradeRecord>, ExecutionError> {
        Ok(self.state.read().await.trades.clone())
    }

    async fn get_peak_equity(&self) -> Result<Decimal, ExecutionError> {
        Ok(self.state.read().await.peak_equity)
    }
}
