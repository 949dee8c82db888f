use crate::domain::market::timeframe::Timeframe;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const HOUR_MS: i64 = 3_600_000;

/// A single trade (or price-only snapshot when `volume` is zero)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub price: Decimal,
    pub volume: Decimal,
    pub is_taker_sell: bool,
}

impl Tick {
    pub fn new(symbol: &str, price: Decimal, volume: Decimal, timestamp: i64) -> Self {
        Self {
            symbol: symbol.to_string(),
            timestamp,
            price,
            volume,
            is_taker_sell: false,
        }
    }
}

/// OHLCV bar for one symbol over one timeframe bucket.
///
/// `end_time` is the last millisecond of the bucket (`start_time + duration - 1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub start_time: i64,
    pub end_time: i64,
}

impl Candle {
    /// Opens a bucket for `tick` with the given open price.
    ///
    /// High, low and close start at the tick price. A carried-over `open`
    /// (the previous close) stays outside the range, so `low <= open <= high`
    /// only holds for the first candle of a stream. Volume starts at zero;
    /// call [`Candle::apply`] with the opening tick to account for it.
    pub fn open_at(tick: &Tick, timeframe: Timeframe, open: Decimal) -> Self {
        let start_time = timeframe.period_start(tick.timestamp);
        Self {
            symbol: tick.symbol.clone(),
            timeframe,
            open,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            volume: Decimal::ZERO,
            start_time,
            end_time: timeframe.period_end(start_time),
        }
    }

    /// Folds one tick into the bar
    pub fn apply(&mut self, price: Decimal, volume: Decimal) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
        self.volume += volume;
    }

    pub fn contains(&self, timestamp_ms: i64) -> bool {
        timestamp_ms >= self.start_time && timestamp_ms <= self.end_time
    }

    /// True when the bar's close boundary (`end_time + 1ms`) falls on a full hour
    pub fn closes_on_the_hour(&self) -> bool {
        (self.end_time + 1).rem_euclid(HOUR_MS) == 0
    }
}
