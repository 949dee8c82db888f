//! Signal Generator
//!
//! Turns closed candles into trading signals for one symbol:
//! - hourly candles closing on the hour adapt the position scale factor
//! - 5-minute candles run the open / close rules against the current regime
//!
//! Every other timeframe yields a `SignalAction::None` signal.

use crate::application::strategy::position_scaling::{
    MIN_TRADES_FOR_ADAPTATION, drawdown, max_loss_streak, next_scale_factor,
};
use crate::application::strategy::regime_state_machine::RegimeStateMachine;
use crate::application::strategy::risk_sizing::{SizingEngine, SizingRequest};
use crate::domain::events::TradingEvent;
use crate::domain::market::candle::Candle;
use crate::domain::market::indicators::IndicatorSnapshot;
use crate::domain::market::market_regime::Regime;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::{ExecutionService, IndicatorProvider};
use crate::domain::risk::state::RiskState;
use crate::domain::trading::position::Position;
use crate::domain::trading::types::{Direction, Signal, SignalAction};
use crate::infrastructure::event_bus::EventBus;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Tighter stop used by the mean-reversion entry
const MEAN_REVERSION_ATR_MULTIPLIER: Decimal = dec!(0.7);
const MEAN_REVERSION_RSI_ENTRY: Decimal = dec!(50);
const MEAN_REVERSION_RSI_EXIT_LOW: Decimal = dec!(45);
const MEAN_REVERSION_RSI_EXIT_HIGH: Decimal = dec!(55);

/// An entry rule that matched, before sizing
struct EntryRule {
    direction: Direction,
    atr_multiplier: Option<Decimal>,
    reason: String,
}

pub struct SignalGenerator {
    symbol: String,
    indicators: Arc<dyn IndicatorProvider>,
    regime: Arc<RegimeStateMachine>,
    execution: Arc<dyn ExecutionService>,
    risk: RwLock<RiskState>,
    events: EventBus,
}

impl SignalGenerator {
    pub fn new(
        symbol: &str,
        indicators: Arc<dyn IndicatorProvider>,
        regime: Arc<RegimeStateMachine>,
        execution: Arc<dyn ExecutionService>,
        risk: RiskState,
        events: EventBus,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            indicators,
            regime,
            execution,
            risk: RwLock::new(risk),
            events,
        }
    }

    pub async fn scale_factor(&self) -> Decimal {
        self.risk.read().await.position_scale_factor()
    }

    pub async fn risk_state(&self) -> RiskState {
        self.risk.read().await.clone()
    }

    /// Entry point for every closed candle of this symbol
    pub async fn on_candle(&self, candle: &Candle, position: &Position) -> Signal {
        match candle.timeframe {
            Timeframe::OneHour => {
                if candle.closes_on_the_hour() {
                    self.adapt_position_scale().await;
                }
                Signal::none(&self.symbol, candle.end_time)
            }
            Timeframe::FiveMin => {
                let signal = self.generate(candle, position).await;
                if signal.is_actionable() {
                    self.events
                        .publish(TradingEvent::SignalEmitted(signal.clone()))
                        .await;
                }
                signal
            }
            _ => Signal::none(&self.symbol, candle.end_time),
        }
    }

    /// Adjusts the position scale factor from drawdown and recent losses.
    ///
    /// Returns the new factor, or `None` when adaptation was skipped. Fetch
    /// failures are logged and leave the last known factor in place.
    pub async fn adapt_position_scale(&self) -> Option<Decimal> {
        let balance = match self.execution.get_balance().await {
            Ok(balance) => balance,
            Err(e) => {
                warn!("SignalGenerator: {} adaptation skipped, balance unavailable: {}", self.symbol, e);
                return None;
            }
        };
        let peak = match self.execution.get_peak_equity().await {
            Ok(peak) => peak,
            Err(e) => {
                warn!("SignalGenerator: {} adaptation skipped, peak equity unavailable: {}", self.symbol, e);
                return None;
            }
        };
        let history = match self.execution.get_trade_history().await {
            Ok(history) => history,
            Err(e) => {
                warn!("SignalGenerator: {} adaptation skipped, trade history unavailable: {}", self.symbol, e);
                return None;
            }
        };

        if history.len() < MIN_TRADES_FOR_ADAPTATION {
            debug!(
                "SignalGenerator: {} adaptation skipped, {} trades (need {})",
                self.symbol,
                history.len(),
                MIN_TRADES_FOR_ADAPTATION
            );
            return None;
        }

        let dd = drawdown(peak, balance.equity);
        let loss_streak = max_loss_streak(&history);

        let mut risk = self.risk.write().await;
        let previous = risk.position_scale_factor();
        let current = risk.set_position_scale_factor(next_scale_factor(previous, dd, loss_streak));
        drop(risk);

        if current != previous {
            self.events
                .publish(TradingEvent::ScaleFactorAdjusted {
                    symbol: self.symbol.clone(),
                    previous,
                    current,
                    drawdown: dd,
                    loss_streak,
                })
                .await;
        } else {
            debug!(
                "SignalGenerator: {} scale factor unchanged at {} (drawdown={}, loss streak={})",
                self.symbol, current, dd, loss_streak
            );
        }
        Some(current)
    }

    async fn generate(&self, candle: &Candle, position: &Position) -> Signal {
        let snapshot = match self.indicators.snapshot(Timeframe::FiveMin).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("SignalGenerator: {} no signal: {}", self.symbol, e);
                return Signal::none(&self.symbol, candle.end_time);
            }
        };
        let regime = self.regime.current().await;

        if position.is_flat() {
            self.open_signal(candle, &snapshot, regime).await
        } else {
            self.close_signal(candle, &snapshot, regime, position)
        }
    }

    fn match_entry(close: Decimal, snapshot: &IndicatorSnapshot, regime: Regime) -> Option<EntryRule> {
        match regime {
            Regime::StrongUpTrend if close > snapshot.ma => Some(EntryRule {
                direction: Direction::Long,
                atr_multiplier: None,
                reason: format!("Trend follow: close {} above MA {}", close, snapshot.ma),
            }),
            Regime::StrongDownTrend if close < snapshot.ma => Some(EntryRule {
                direction: Direction::Short,
                atr_multiplier: None,
                reason: format!("Trend follow: close {} below MA {}", close, snapshot.ma),
            }),
            Regime::LowVolRange
                if close < snapshot.lower_band && snapshot.rsi < MEAN_REVERSION_RSI_ENTRY =>
            {
                Some(EntryRule {
                    direction: Direction::Long,
                    atr_multiplier: Some(MEAN_REVERSION_ATR_MULTIPLIER),
                    reason: format!(
                        "Mean reversion: close {} below lower band {}, RSI {}",
                        close, snapshot.lower_band, snapshot.rsi
                    ),
                })
            }
            _ => None,
        }
    }

    async fn open_signal(&self, candle: &Candle, snapshot: &IndicatorSnapshot, regime: Regime) -> Signal {
        let Some(rule) = Self::match_entry(candle.close, snapshot, regime) else {
            return Signal::none(&self.symbol, candle.end_time);
        };

        let request = SizingRequest {
            direction: rule.direction,
            entry_price: candle.close,
            atr: snapshot.atr,
            atr_multiplier: rule.atr_multiplier,
        };
        let risk = self.risk.read().await;
        let sized = match SizingEngine::size(&risk, &request) {
            Ok(sized) => sized,
            Err(rejection) => {
                info!(
                    "SignalGenerator: {} {} entry rejected in {}: {}",
                    self.symbol, rule.direction, regime, rejection
                );
                return Signal::none(&self.symbol, candle.end_time);
            }
        };

        Signal {
            symbol: self.symbol.clone(),
            action: SignalAction::Open,
            direction: rule.direction,
            price: candle.close,
            risked_usd: sized.risked_usd,
            position_size: sized.position_size,
            stop_loss_price: sized.stop_loss_price,
            take_profit_price: sized.take_profit_price,
            source_regime: regime,
            reason: rule.reason,
            timestamp: candle.end_time,
        }
    }

    fn close_signal(
        &self,
        candle: &Candle,
        snapshot: &IndicatorSnapshot,
        regime: Regime,
        position: &Position,
    ) -> Signal {
        let mean_reversion = position.entry_regime == Regime::LowVolRange;
        let rsi = snapshot.rsi;

        // Rotation only counts for positions opened outside LowVolRange
        let reason = (!mean_reversion && regime == Regime::LowVolRange)
            .then(|| format!("Regime rotated to {}", regime))
            .or_else(|| Self::macd_exit(position.side, snapshot))
            .or_else(|| {
                (mean_reversion
                    && rsi >= MEAN_REVERSION_RSI_EXIT_LOW
                    && rsi <= MEAN_REVERSION_RSI_EXIT_HIGH)
                    .then(|| format!("Mean reversion complete: RSI {} back in range", rsi))
            });

        match reason {
            Some(reason) => Signal::close(
                &self.symbol,
                position.side,
                candle.close,
                regime,
                reason,
                candle.end_time,
            ),
            None => Signal::none(&self.symbol, candle.end_time),
        }
    }

    /// MACD histogram crossing zero against the held direction
    fn macd_exit(side: Direction, snapshot: &IndicatorSnapshot) -> Option<String> {
        let (prev, last) = snapshot.macd_histogram_tail()?;
        let crossed = match side {
            Direction::Long => prev >= Decimal::ZERO && last < Decimal::ZERO,
            Direction::Short => prev <= Decimal::ZERO && last > Decimal::ZERO,
            Direction::Flat => false,
        };
        crossed.then(|| format!("MACD histogram crossed {} -> {} against {}", prev, last, side))
    }
}
