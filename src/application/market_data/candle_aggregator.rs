use crate::domain::market::candle::{Candle, Tick};
use crate::domain::market::timeframe::Timeframe;
use crate::infrastructure::queue::DropQueue;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info, warn};

/// Builds candles of one timeframe for one symbol.
///
/// The in-progress candle is owned here; readers only get copies through
/// [`CandleAggregator::snapshot`]. Closed candles go to a drop-on-full queue.
pub struct CandleAggregator {
    symbol: String,
    timeframe: Timeframe,
    current: RwLock<Option<Candle>>,
    output: DropQueue<Candle>,
}

impl CandleAggregator {
    pub fn new(symbol: &str, timeframe: Timeframe, output: DropQueue<Candle>) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe,
            current: RwLock::new(None),
            output,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Copy of the in-progress candle
    pub async fn snapshot(&self) -> Option<Candle> {
        self.current.read().await.clone()
    }

    /// Folds `tick` into the in-progress candle.
    ///
    /// Returns the candle closed by this tick, if any. Ticks from an
    /// already-closed bucket are applied to the current candle as-is.
    pub async fn process(&self, tick: &Tick) -> Option<Candle> {
        if tick.symbol != self.symbol {
            return None;
        }

        let bucket_start = self.timeframe.period_start(tick.timestamp);
        let mut current = self.current.write().await;

        let (next, closed) = match current.take() {
            None => {
                debug!(
                    "CandleAggregator: {} {} - First tick @ {}, starting aggregation",
                    self.symbol, self.timeframe, tick.price
                );
                let mut candle = Candle::open_at(tick, self.timeframe, tick.price);
                candle.apply(tick.price, tick.volume);
                (candle, None)
            }
            Some(candle) if bucket_start > candle.start_time => {
                let mut next = Candle::open_at(tick, self.timeframe, candle.close);
                next.apply(tick.price, tick.volume);
                (next, Some(candle))
            }
            Some(mut candle) => {
                candle.apply(tick.price, tick.volume);
                (candle, None)
            }
        };
        *current = Some(next);
        drop(current);

        if let Some(completed) = &closed {
            info!(
                "CandleAggregator: {} {} candle completed → O:{} H:{} L:{} C:{} V:{}",
                self.symbol,
                self.timeframe,
                completed.open,
                completed.high,
                completed.low,
                completed.close,
                completed.volume
            );
            if !self.output.push(completed.clone()) {
                warn!(
                    "CandleAggregator: {} {} candle @ {} dropped, output queue full",
                    self.symbol, self.timeframe, completed.start_time
                );
            }
        }

        closed
    }

    /// Worker loop: consumes `input` until the sender side closes
    pub async fn run(self: Arc<Self>, mut input: Receiver<Tick>) {
        while let Some(tick) = input.recv().await {
            self.process(&tick).await;
        }
        debug!(
            "CandleAggregator: {} {} input closed, worker exiting",
            self.symbol, self.timeframe
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::queue::drop_queue;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn at(h: u32, m: u32, s: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, s)
            .unwrap()
            .timestamp_millis()
    }

    #[tokio::test]
    async fn test_candle_aggregation_realistic_prices() {
        let (out, mut rx) = drop_queue("test-1m", 8);
        let agg = CandleAggregator::new("BTC-USDT", Timeframe::OneMin, out);
        let symbol = "BTC-USDT";

        assert!(agg.process(&Tick::new(symbol, dec!(68000), dec!(1.5), at(0, 0, 1))).await.is_none());
        assert!(agg.process(&Tick::new(symbol, dec!(68150), dec!(2.5), at(0, 0, 30))).await.is_none());
        assert!(agg.process(&Tick::new(symbol, dec!(68100), dec!(0.8), at(0, 0, 45))).await.is_none());
        assert!(agg.process(&Tick::new(symbol, dec!(67900), dec!(1.0), at(0, 0, 59))).await.is_none());

        // New minute completes the previous candle
        let candle = agg
            .process(&Tick::new(symbol, dec!(67950), dec!(0.5), at(0, 1, 5)))
            .await
            .expect("bucket change should close the candle");

        assert_eq!(candle.open, dec!(68000));
        assert_eq!(candle.high, dec!(68150));
        assert_eq!(candle.low, dec!(67900));
        assert_eq!(candle.close, dec!(67900));
        assert_eq!(candle.volume, dec!(5.8));
        assert_eq!(candle.start_time, at(0, 0, 0));
        assert_eq!(candle.end_time, at(0, 1, 0) - 1);

        // Emitted exactly once on the output queue
        assert_eq!(rx.recv().await.unwrap(), candle);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_new_candle_opens_at_previous_close() {
        let (out, _rx) = drop_queue("test-5m", 8);
        let agg = CandleAggregator::new("ETH-USDT", Timeframe::FiveMin, out);

        agg.process(&Tick::new("ETH-USDT", dec!(2300), dec!(1), at(9, 0, 0))).await;
        agg.process(&Tick::new("ETH-USDT", dec!(2305), dec!(1), at(9, 4, 59))).await;
        agg.process(&Tick::new("ETH-USDT", dec!(2320), dec!(2), at(9, 5, 0))).await;

        let current = agg.snapshot().await.unwrap();
        assert_eq!(current.open, dec!(2305));
        assert_eq!(current.close, dec!(2320));
        assert_eq!(current.high, dec!(2320));
        assert_eq!(current.low, dec!(2320));
        assert_eq!(current.volume, dec!(2));
        assert_eq!(current.start_time, at(9, 5, 0));
    }

    #[tokio::test]
    async fn test_range_only_covers_own_ticks() {
        let (out, _rx) = drop_queue("test-1m", 8);
        let agg = CandleAggregator::new("BTC-USDT", Timeframe::OneMin, out);

        agg.process(&Tick::new("BTC-USDT", dec!(100), dec!(1), at(0, 0, 0))).await;
        agg.process(&Tick::new("BTC-USDT", dec!(110), dec!(1), at(0, 1, 0))).await;
        agg.process(&Tick::new("BTC-USDT", dec!(111), dec!(1), at(0, 1, 0) + 500)).await;
        let second = agg
            .process(&Tick::new("BTC-USDT", dec!(112), dec!(1), at(0, 2, 0)))
            .await
            .expect("minute two closes the second candle");

        // Open carries the previous close; high/low come from this bucket only
        assert_eq!(second.open, dec!(100));
        assert_eq!(second.high, dec!(111));
        assert_eq!(second.low, dec!(110));
        assert_eq!(second.close, dec!(111));
        assert_eq!(second.volume, dec!(2));
    }

    #[tokio::test]
    async fn test_ignores_other_symbols() {
        let (out, _rx) = drop_queue("test", 8);
        let agg = CandleAggregator::new("BTC-USDT", Timeframe::OneMin, out);

        agg.process(&Tick::new("ETH-USDT", dec!(2300), dec!(1), at(0, 0, 0))).await;
        assert!(agg.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_late_tick_applies_to_current_candle() {
        let (out, _rx) = drop_queue("test", 8);
        let agg = CandleAggregator::new("BTC-USDT", Timeframe::OneMin, out);

        agg.process(&Tick::new("BTC-USDT", dec!(100), dec!(1), at(0, 0, 10))).await;
        let closed = agg.process(&Tick::new("BTC-USDT", dec!(101), dec!(1), at(0, 1, 10))).await;
        assert!(closed.is_some());

        // Belongs to the 00:00 bucket, lands in the 00:01 candle
        let late = agg.process(&Tick::new("BTC-USDT", dec!(99), dec!(3), at(0, 0, 50))).await;
        assert!(late.is_none());

        let current = agg.snapshot().await.unwrap();
        assert_eq!(current.start_time, at(0, 1, 0));
        assert_eq!(current.low, dec!(99));
        assert_eq!(current.close, dec!(99));
        assert_eq!(current.volume, dec!(4));
    }

    #[tokio::test]
    async fn test_full_output_drops_candle_but_keeps_aggregating() {
        let (out, mut rx) = drop_queue("tiny", 1);
        let agg = CandleAggregator::new("BTC-USDT", Timeframe::OneMin, out.clone());

        for minute in 0..4 {
            agg.process(&Tick::new("BTC-USDT", dec!(100), dec!(1), at(0, minute, 0))).await;
        }

        // Three closes, one queued, two dropped
        assert_eq!(out.dropped(), 2);
        assert_eq!(rx.recv().await.unwrap().start_time, at(0, 0, 0));
        assert_eq!(agg.snapshot().await.unwrap().start_time, at(0, 3, 0));
    }
}
