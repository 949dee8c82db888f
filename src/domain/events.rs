//! Observability events emitted by the trading pipeline.

use crate::domain::market::market_regime::RegimeTransition;
use crate::domain::trading::types::{Direction, Signal, TradeRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TradingEvent {
    RegimeChanged(RegimeTransition),
    SignalEmitted(Signal),
    PositionOpened {
        symbol: String,
        side: Direction,
        size: Decimal,
        price: Decimal,
        fee: Decimal,
        liquidation_price: Decimal,
        timestamp: i64,
    },
    PositionClosed(TradeRecord),
    ScaleFactorAdjusted {
        symbol: String,
        previous: Decimal,
        current: Decimal,
        drawdown: Decimal,
        loss_streak: usize,
    },
}

/// Receives every event published on the bus
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &TradingEvent);
}

/// Renders events as human-readable log lines
pub struct LoggingListener;

impl EventListener for LoggingListener {
    fn on_event(&self, event: &TradingEvent) {
        match event {
            TradingEvent::RegimeChanged(t) => info!(
                "RegimeStateMachine: {} {} -> {} (close={} ma={} rsi={} atr%={})",
                t.symbol, t.from, t.to, t.metrics.close, t.metrics.ma, t.metrics.rsi,
                t.metrics.atr_ratio
            ),
            TradingEvent::SignalEmitted(signal) => info!("SignalGenerator: {}", signal),
            TradingEvent::PositionOpened {
                symbol,
                side,
                size,
                price,
                fee,
                liquidation_price,
                ..
            } => info!(
                "SimulatedExecutor: {} opened {} {} @ {} (fee={}, liq={})",
                symbol, side, size, price, fee, liquidation_price
            ),
            TradingEvent::PositionClosed(record) => info!(
                "SimulatedExecutor: {} closed {} {} @ {} -> {} [{}] pnl={} fee={}",
                record.symbol,
                record.side,
                record.size,
                record.entry_price,
                record.exit_price,
                record.trigger_reason,
                record.realized_pnl,
                record.fee
            ),
            TradingEvent::ScaleFactorAdjusted {
                symbol,
                previous,
                current,
                drawdown,
                loss_streak,
            } => warn!(
                "SignalGenerator: {} position scale {} -> {} (drawdown={}, loss streak={})",
                symbol, previous, current, drawdown, loss_streak
            ),
        }
    }
}

/// Emits each event as a single JSON line, for log shippers
pub struct JsonListener;

impl EventListener for JsonListener {
    fn on_event(&self, event: &TradingEvent) {
        match serde_json::to_string(event) {
            Ok(line) => info!(target: "events", "{}", line),
            Err(e) => warn!("JsonListener: failed to serialize event: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::types::TriggerReason;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = TradingEvent::PositionClosed(TradeRecord {
            id: "t-1".to_string(),
            entry_time: 1,
            exit_time: 2,
            symbol: "BTC-USDT".to_string(),
            side: Direction::Long,
            entry_price: dec!(100),
            exit_price: dec!(96),
            size: dec!(1),
            realized_pnl: dec!(-4),
            fee: dec!(0.1),
            trigger_reason: TriggerReason::StopLoss,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"PositionClosed\""));
        assert!(json.contains("\"trigger_reason\":\"StopLoss\""));
    }
}
