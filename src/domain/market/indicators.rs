use crate::domain::market::timeframe::Timeframe;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Read-only view of the derived indicators for one timeframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub timeframe: Timeframe,
    /// Oldest first
    pub closes: Vec<Decimal>,
    pub ma: Decimal,
    pub rsi: Decimal,
    pub atr: Decimal,
    pub upper_band: Decimal,
    pub lower_band: Decimal,
    /// Oldest first, aligned with `closes`
    pub macd_histogram: Vec<Decimal>,
}

impl IndicatorSnapshot {
    pub fn last_close(&self) -> Option<Decimal> {
        self.closes.last().copied()
    }

    /// Previous and latest MACD histogram values
    pub fn macd_histogram_tail(&self) -> Option<(Decimal, Decimal)> {
        match self.macd_histogram.as_slice() {
            [.., prev, last] => Some((*prev, *last)),
            _ => None,
        }
    }

    /// ATR relative to the last close, `None` when the close is not positive
    pub fn atr_ratio(&self) -> Option<Decimal> {
        self.last_close()
            .filter(|close| *close > Decimal::ZERO)
            .map(|close| self.atr / close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(closes: Vec<Decimal>, hist: Vec<Decimal>) -> IndicatorSnapshot {
        IndicatorSnapshot {
            timeframe: Timeframe::OneHour,
            closes,
            ma: dec!(100),
            rsi: dec!(50),
            atr: dec!(2),
            upper_band: dec!(104),
            lower_band: dec!(96),
            macd_histogram: hist,
        }
    }

    #[test]
    fn test_macd_tail() {
        let s = snapshot(vec![dec!(100)], vec![dec!(0.4), dec!(0.1), dec!(-0.2)]);
        assert_eq!(s.macd_histogram_tail(), Some((dec!(0.1), dec!(-0.2))));

        let short = snapshot(vec![dec!(100)], vec![dec!(0.4)]);
        assert_eq!(short.macd_histogram_tail(), None);
    }

    #[test]
    fn test_atr_ratio_guards_zero_close() {
        let s = snapshot(vec![dec!(100), dec!(200)], vec![]);
        assert_eq!(s.atr_ratio(), Some(dec!(0.01)));

        let zero = snapshot(vec![Decimal::ZERO], vec![]);
        assert_eq!(zero.atr_ratio(), None);

        let empty = snapshot(vec![], vec![]);
        assert_eq!(empty.atr_ratio(), None);
    }
}
