use crate::domain::market::market_regime::Regime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    #[default]
    Flat,
}

impl Direction {
    /// Directional PnL of `size` units moved from `entry` to `exit`
    pub fn pnl(&self, entry: Decimal, exit: Decimal, size: Decimal) -> Decimal {
        match self {
            Direction::Long => (exit - entry) * size,
            Direction::Short => (entry - exit) * size,
            Direction::Flat => Decimal::ZERO,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
            Direction::Flat => write!(f, "FLAT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignalAction {
    #[default]
    None,
    Open,
    Close,
    /// Replace the stop-loss / take-profit of the open position
    Update,
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Trading instruction produced by the signal generator.
///
/// A `SignalAction::None` signal carries no intent and is never executed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub action: SignalAction,
    pub direction: Direction,
    /// Quoted price at decision time; fills use the last observed tick instead
    pub price: Decimal,
    pub risked_usd: Decimal,
    /// Zero on a Close signal means "close the whole position"
    pub position_size: Decimal,
    pub stop_loss_price: Decimal,
    pub take_profit_price: Decimal,
    pub source_regime: Regime,
    pub reason: String,
    pub timestamp: i64,
}

impl Signal {
    pub fn none(symbol: &str, timestamp: i64) -> Self {
        Self {
            symbol: symbol.to_string(),
            timestamp,
            ..Default::default()
        }
    }

    pub fn close(
        symbol: &str,
        direction: Direction,
        price: Decimal,
        regime: Regime,
        reason: String,
        timestamp: i64,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            action: SignalAction::Close,
            direction,
            price,
            source_regime: regime,
            reason,
            timestamp,
            ..Default::default()
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.action != SignalAction::None
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ {} size={} SL={} TP={} risk=${} [{}] {}",
            self.symbol,
            self.action,
            self.direction,
            self.price,
            self.position_size,
            self.stop_loss_price,
            self.take_profit_price,
            self.risked_usd,
            self.source_regime,
            self.reason
        )
    }
}

/// What closed a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerReason {
    Signal,
    StopLoss,
    TakeProfit,
    Liquidation,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerReason::Signal => write!(f, "Signal"),
            TriggerReason::StopLoss => write!(f, "SL"),
            TriggerReason::TakeProfit => write!(f, "TP"),
            TriggerReason::Liquidation => write!(f, "Liquidation"),
        }
    }
}

/// A completed round trip. Never mutated once appended to the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub entry_time: i64,
    pub exit_time: i64,
    pub symbol: String,
    pub side: Direction,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub size: Decimal,
    pub realized_pnl: Decimal,
    /// Entry and exit fees combined
    pub fee: Decimal,
    pub trigger_reason: TriggerReason,
}

impl TradeRecord {
    pub fn net_pnl(&self) -> Decimal {
        self.realized_pnl - self.fee
    }

    pub fn is_loss(&self) -> bool {
        self.net_pnl() < Decimal::ZERO
    }
}

/// Account figures reported by an execution service
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Wallet balance (realized PnL and fees applied, margin included)
    pub balance: Decimal,
    pub margin_used: Decimal,
    /// `balance - margin_used`
    pub available: Decimal,
    /// `balance + unrealized PnL`
    pub equity: Decimal,
}
