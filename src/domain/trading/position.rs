use crate::domain::market::market_regime::Regime;
use crate::domain::trading::types::{Direction, TriggerReason};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The single simulated position of an execution engine.
///
/// `side == Flat` if and only if `size == 0`. Stop-loss, take-profit and
/// liquidation prices of zero mean "not set".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: Direction,
    pub size: Decimal,
    pub avg_price: Decimal,
    pub liquidation_price: Decimal,
    pub stop_loss_price: Decimal,
    pub take_profit_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub entry_time: i64,
    pub entry_fee: Decimal,
    pub margin: Decimal,
    /// Regime of the signal that opened the position
    pub entry_regime: Regime,
}

impl Position {
    pub fn flat(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }

    pub fn is_flat(&self) -> bool {
        self.side == Direction::Flat
    }

    pub fn pnl_at(&self, price: Decimal) -> Decimal {
        self.side.pnl(self.avg_price, price, self.size)
    }

    pub fn should_stop_loss(&self, price: Decimal) -> bool {
        if self.stop_loss_price.is_zero() {
            return false;
        }
        match self.side {
            Direction::Long => price <= self.stop_loss_price,
            Direction::Short => price >= self.stop_loss_price,
            Direction::Flat => false,
        }
    }

    pub fn should_take_profit(&self, price: Decimal) -> bool {
        if self.take_profit_price.is_zero() {
            return false;
        }
        match self.side {
            Direction::Long => price >= self.take_profit_price,
            Direction::Short => price <= self.take_profit_price,
            Direction::Flat => false,
        }
    }

    pub fn should_liquidate(&self, price: Decimal) -> bool {
        if self.liquidation_price.is_zero() {
            return false;
        }
        match self.side {
            Direction::Long => price <= self.liquidation_price,
            Direction::Short => price >= self.liquidation_price,
            Direction::Flat => false,
        }
    }

    /// Autonomous exit due at `price`, if any.
    ///
    /// Stop-loss wins over liquidation, liquidation over take-profit.
    pub fn exit_trigger(&self, price: Decimal) -> Option<TriggerReason> {
        if self.should_stop_loss(price) {
            Some(TriggerReason::StopLoss)
        } else if self.should_liquidate(price) {
            Some(TriggerReason::Liquidation)
        } else if self.should_take_profit(price) {
            Some(TriggerReason::TakeProfit)
        } else {
            None
        }
    }
}

/// Simplified liquidation price ignoring maintenance margin.
///
/// Returns zero (check disabled) for a flat side or a non-positive leverage.
pub fn liquidation_price(side: Direction, avg_price: Decimal, leverage: Decimal) -> Decimal {
    if leverage <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let offset = Decimal::ONE / leverage;
    match side {
        Direction::Long => avg_price * (Decimal::ONE - offset),
        Direction::Short => avg_price * (Decimal::ONE + offset),
        Direction::Flat => Decimal::ZERO,
    }
}
