//! Indicator provider backed by the `ta` crate.
//!
//! Keeps a rolling candle window per timeframe and recomputes the snapshot
//! over the whole window on request, so results only depend on the window.

use crate::domain::errors::IndicatorError;
use crate::domain::market::candle::Candle;
use crate::domain::market::indicators::IndicatorSnapshot;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::IndicatorProvider;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::{HashMap, VecDeque};
use ta::Next;
use ta::indicators::{
    AverageTrueRange, BollingerBands, MovingAverageConvergenceDivergence, RelativeStrengthIndex,
    SimpleMovingAverage,
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct IndicatorSettings {
    /// Bars required before a snapshot is served
    pub min_history: usize,
    /// Bars retained per timeframe
    pub history_limit: usize,
    pub ma_period: usize,
    pub rsi_period: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            min_history: 30,
            history_limit: 100,
            ma_period: 20,
            rsi_period: 14,
            bb_period: 20,
            bb_std_dev: 2.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_period: 14,
        }
    }
}

pub struct TaIndicatorProvider {
    settings: IndicatorSettings,
    history: RwLock<HashMap<Timeframe, VecDeque<Candle>>>,
}

impl TaIndicatorProvider {
    pub fn new(settings: IndicatorSettings) -> Self {
        Self {
            settings,
            history: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    async fn history_len(&self, timeframe: Timeframe) -> usize {
        self.history
            .read()
            .await
            .get(&timeframe)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    fn compute(
        &self,
        timeframe: Timeframe,
        candles: &VecDeque<Candle>,
    ) -> Result<IndicatorSnapshot, ta::errors::TaError> {
        let s = &self.settings;
        let mut sma = SimpleMovingAverage::new(s.ma_period)?;
        let mut rsi = RelativeStrengthIndex::new(s.rsi_period)?;
        let mut bb = BollingerBands::new(s.bb_period, s.bb_std_dev)?;
        let mut macd = MovingAverageConvergenceDivergence::new(s.macd_fast, s.macd_slow, s.macd_signal)?;
        let mut atr = AverageTrueRange::new(s.atr_period)?;

        let to_f64 = |v: Decimal| v.to_f64().unwrap_or(0.0);
        let to_dec = |v: f64| Decimal::from_f64_retain(v).unwrap_or(Decimal::ZERO);

        let mut closes = Vec::with_capacity(candles.len());
        let mut macd_histogram = Vec::with_capacity(candles.len());
        let (mut ma_val, mut rsi_val, mut atr_val) = (0.0, 0.0, 0.0);
        let (mut upper, mut lower) = (0.0, 0.0);

        for candle in candles {
            let close = to_f64(candle.close);
            let item = ta::DataItem::builder()
                .open(to_f64(candle.open))
                .high(to_f64(candle.high))
                .low(to_f64(candle.low))
                .close(close)
                .volume(to_f64(candle.volume))
                .build()?;

            ma_val = sma.next(close);
            rsi_val = rsi.next(close);
            atr_val = atr.next(&item);
            let bands = bb.next(close);
            upper = bands.upper;
            lower = bands.lower;

            closes.push(candle.close);
            macd_histogram.push(to_dec(macd.next(close).histogram));
        }

        Ok(IndicatorSnapshot {
            timeframe,
            closes,
            ma: to_dec(ma_val),
            rsi: to_dec(rsi_val),
            atr: to_dec(atr_val),
            upper_band: to_dec(upper),
            lower_band: to_dec(lower),
            macd_histogram,
        })
    }
}

impl Default for TaIndicatorProvider {
    fn default() -> Self {
        Self::new(IndicatorSettings::default())
    }
}

#[async_trait]
impl IndicatorProvider for TaIndicatorProvider {
    async fn update_candle(&self, candle: &Candle) {
        let mut history = self.history.write().await;
        let series = history.entry(candle.timeframe).or_default();
        series.push_back(candle.clone());
        while series.len() > self.settings.history_limit {
            series.pop_front();
        }
        debug!(
            "TaIndicatorProvider: {} {} history now {} bars",
            candle.symbol,
            candle.timeframe,
            series.len()
        );
    }

    async fn snapshot(&self, timeframe: Timeframe) -> Result<IndicatorSnapshot, IndicatorError> {
        let history = self.history.read().await;
        let have = history.get(&timeframe).map(VecDeque::len).unwrap_or(0);
        let need = self.settings.min_history;

        let Some(candles) = history.get(&timeframe).filter(|_| have >= need) else {
            return Err(IndicatorError::NotReady {
                timeframe,
                have,
                need,
            });
        };

        self.compute(timeframe, candles).map_err(|e| {
            warn!("TaIndicatorProvider: {} calculation failed: {}", timeframe, e);
            IndicatorError::Calculation {
                timeframe,
                reason: e.to_string(),
            }
        })
    }
}
