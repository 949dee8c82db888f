use crate::domain::errors::SizingRejection;
use crate::domain::risk::state::RiskState;
use crate::domain::trading::types::Direction;
use rust_decimal::Decimal;
use tracing::info;

/// Inputs for sizing a new position
#[derive(Debug, Clone, PartialEq)]
pub struct SizingRequest {
    pub direction: Direction,
    pub entry_price: Decimal,
    pub atr: Decimal,
    /// Overrides `RiskState::default_atr_stop_multiplier` when set
    pub atr_multiplier: Option<Decimal>,
}

/// Stop, target and size of an accepted trade
#[derive(Debug, Clone, PartialEq)]
pub struct SizedTrade {
    pub stop_loss_price: Decimal,
    pub take_profit_price: Decimal,
    pub position_size: Decimal,
    pub risked_usd: Decimal,
}

pub struct SizingEngine;

impl SizingEngine {
    /// Fixed-fractional sizing with an ATR stop.
    ///
    /// # Arguments
    /// * `risk` - Capital, risk fraction, reward ratio and current scale factor
    /// * `request` - Direction, entry, ATR and optional multiplier override
    ///
    /// # Returns
    /// The sized trade, or the reason it must not be opened
    pub fn size(risk: &RiskState, request: &SizingRequest) -> Result<SizedTrade, SizingRejection> {
        let multiplier = request
            .atr_multiplier
            .unwrap_or(risk.default_atr_stop_multiplier);
        let stop_distance = request.atr * multiplier;

        let stop_loss_price = match request.direction {
            Direction::Long => request.entry_price - stop_distance,
            Direction::Short => request.entry_price + stop_distance,
            Direction::Flat => return Err(SizingRejection::NoDirection),
        };
        if stop_loss_price <= Decimal::ZERO {
            return Err(SizingRejection::NonPositiveStop {
                stop: stop_loss_price,
            });
        }

        let max_risk = risk.max_risk_amount();
        if max_risk <= Decimal::ZERO {
            return Err(SizingRejection::NoRiskBudget { max_risk });
        }

        let price_diff = (request.entry_price - stop_loss_price).abs();
        if price_diff.is_zero() || stop_distance <= Decimal::ZERO {
            return Err(SizingRejection::ZeroStopDistance);
        }
        let raw_size = max_risk / price_diff;

        let tp_distance = stop_distance * risk.default_risk_reward_ratio;
        let take_profit_price = match request.direction {
            Direction::Long => request.entry_price + tp_distance,
            _ => request.entry_price - tp_distance,
        };

        let position_size = raw_size * risk.position_scale_factor();
        if position_size < risk.min_position_size {
            return Err(SizingRejection::BelowMinimumSize {
                size: position_size,
                min: risk.min_position_size,
            });
        }

        info!(
            "SizingEngine: {} @ {} stop={} tp={} size={} (raw {} x scale {}), risk=${}",
            request.direction,
            request.entry_price,
            stop_loss_price,
            take_profit_price,
            position_size,
            raw_size,
            risk.position_scale_factor(),
            max_risk
        );

        Ok(SizedTrade {
            stop_loss_price,
            take_profit_price,
            position_size,
            risked_usd: max_risk,
        })
    }
}
