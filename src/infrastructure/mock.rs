use crate::domain::errors::IndicatorError;
use crate::domain::market::candle::{Candle, Tick};
use crate::domain::market::indicators::IndicatorSnapshot;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::{IndicatorProvider, TickSource};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};

/// Random-walk tick feed used when no exchange connector is wired in
#[derive(Clone)]
pub struct MockTickSource {
    interval: Duration,
    seed: u64,
}

impl MockTickSource {
    pub fn new(interval: Duration, seed: u64) -> Self {
        Self { interval, seed }
    }

    fn base_price(symbol: &str) -> f64 {
        if symbol.contains("BTC") {
            96000.0
        } else if symbol.contains("ETH") {
            3400.0
        } else if symbol.contains("SOL") {
            180.0
        } else {
            100.0
        }
    }
}

impl Default for MockTickSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(250), 42)
    }
}

#[async_trait]
impl TickSource for MockTickSource {
    async fn subscribe(&self, symbols: Vec<String>) -> Result<mpsc::Receiver<Tick>> {
        let (tx, rx) = mpsc::channel(1000);
        let interval = self.interval;
        let seed = self.seed;

        info!("MockTickSource: Starting price simulation for {:?}", symbols);

        tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut prices: HashMap<String, f64> = symbols
                .iter()
                .map(|s| (s.clone(), Self::base_price(s)))
                .collect();
            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;
                for symbol in &symbols {
                    let current = prices.get(symbol).copied().unwrap_or(100.0);
                    // -0.1% to +0.1% per step
                    let change_pct = rng.random_range(-0.001..0.001);
                    let next = current * (1.0 + change_pct);
                    prices.insert(symbol.clone(), next);

                    let tick = Tick {
                        symbol: symbol.clone(),
                        timestamp: Utc::now().timestamp_millis(),
                        price: Decimal::from_f64(next).unwrap_or(Decimal::ONE).round_dp(2),
                        volume: Decimal::from_f64(rng.random_range(0.0..2.0))
                            .unwrap_or(Decimal::ZERO)
                            .round_dp(4),
                        is_taker_sell: rng.random_bool(0.5),
                    };

                    if tx.send(tick).await.is_err() {
                        debug!("MockTickSource: receiver dropped, stopping simulation");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// Indicator provider serving scripted snapshots
#[derive(Default)]
pub struct MockIndicatorProvider {
    snapshots: RwLock<HashMap<Timeframe, IndicatorSnapshot>>,
    updates: RwLock<Vec<Candle>>,
}

impl MockIndicatorProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn set_snapshot(&self, snapshot: IndicatorSnapshot) {
        self.snapshots
            .write()
            .await
            .insert(snapshot.timeframe, snapshot);
    }

    pub async fn clear_snapshot(&self, timeframe: Timeframe) {
        self.snapshots.write().await.remove(&timeframe);
    }

    /// Candles received through `update_candle`, oldest first
    pub async fn updates(&self) -> Vec<Candle> {
        self.updates.read().await.clone()
    }
}

#[async_trait]
impl IndicatorProvider for MockIndicatorProvider {
    async fn update_candle(&self, candle: &Candle) {
        self.updates.write().await.push(candle.clone());
    }

    async fn snapshot(&self, timeframe: Timeframe) -> Result<IndicatorSnapshot, IndicatorError> {
        self.snapshots
            .read()
            .await
            .get(&timeframe)
            .cloned()
            .ok_or(IndicatorError::NotReady {
                timeframe,
                have: 0,
                need: 30,
            })
    }
}

/// Snapshot builder for tests: `closes` ends with `close`
pub fn snapshot_with(
    timeframe: Timeframe,
    close: Decimal,
    ma: Decimal,
    rsi: Decimal,
    atr: Decimal,
) -> IndicatorSnapshot {
    IndicatorSnapshot {
        timeframe,
        closes: vec![ma, close],
        ma,
        rsi,
        atr,
        upper_band: ma + atr * Decimal::TWO,
        lower_band: ma - atr * Decimal::TWO,
        macd_histogram: vec![Decimal::ZERO, Decimal::ZERO],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_mock_indicator_provider_not_ready_by_default() {
        let provider = MockIndicatorProvider::new();
        let result = provider.snapshot(Timeframe::OneHour).await;
        assert!(matches!(result, Err(IndicatorError::NotReady { .. })));

        provider
            .set_snapshot(snapshot_with(
                Timeframe::OneHour,
                dec!(105),
                dec!(100),
                dec!(65),
                dec!(1),
            ))
            .await;
        let snap = provider.snapshot(Timeframe::OneHour).await.unwrap();
        assert_eq!(snap.last_close(), Some(dec!(105)));
    }

    #[tokio::test]
    async fn test_mock_tick_source_streams_requested_symbols() {
        let source = MockTickSource::new(Duration::from_millis(5), 7);
        let mut rx = source
            .subscribe(vec!["BTC-USDT".to_string(), "ETH-USDT".to_string()])
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.symbol, "BTC-USDT");
        assert_eq!(second.symbol, "ETH-USDT");
        assert!(first.price > Decimal::ZERO);
    }
}
