//! Adaptive position scale factor driven by recent performance.

use crate::domain::risk::state::{MAX_SCALE_FACTOR, MIN_SCALE_FACTOR, clamp_scale_factor};
use crate::domain::trading::types::TradeRecord;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Trade records required before adapting
pub const MIN_TRADES_FOR_ADAPTATION: usize = 11;
/// Number of most recent trades scanned for a loss streak
pub const LOSS_STREAK_LOOKBACK: usize = 10;
pub const DRAWDOWN_LIMIT: Decimal = dec!(0.15);
pub const LOSS_STREAK_LIMIT: usize = 3;
pub const LOSS_STREAK_CUT: Decimal = dec!(0.85);
/// Growth is only allowed below half the drawdown limit
pub const GROWTH_DRAWDOWN_CEILING: Decimal = dec!(0.075);
pub const GROWTH_STEP: Decimal = dec!(1.05);

/// Longest run of consecutive losing trades among the last
/// [`LOSS_STREAK_LOOKBACK`] records, scanned oldest to newest.
pub fn max_loss_streak(history: &[TradeRecord]) -> usize {
    let start = history.len().saturating_sub(LOSS_STREAK_LOOKBACK);
    let mut current = 0;
    let mut max = 0;
    for record in &history[start..] {
        if record.is_loss() {
            current += 1;
            max = max.max(current);
        } else {
            current = 0;
        }
    }
    max
}

/// Fractional decline of `equity` from `peak`; zero without a positive peak
pub fn drawdown(peak: Decimal, equity: Decimal) -> Decimal {
    if peak <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (peak - equity) / peak
}

/// Next scale factor, always within `[MIN_SCALE_FACTOR, MAX_SCALE_FACTOR]`.
///
/// Rules in priority order: a deep drawdown snaps to the minimum, a losing
/// streak cuts, and a clean record with shallow drawdown grows.
pub fn next_scale_factor(current: Decimal, drawdown: Decimal, loss_streak: usize) -> Decimal {
    let next = if drawdown >= DRAWDOWN_LIMIT {
        MIN_SCALE_FACTOR
    } else if loss_streak >= LOSS_STREAK_LIMIT {
        current * LOSS_STREAK_CUT
    } else if loss_streak == 0 && drawdown < GROWTH_DRAWDOWN_CEILING && current < MAX_SCALE_FACTOR {
        current * GROWTH_STEP
    } else {
        current
    };
    clamp_scale_factor(next)
}
