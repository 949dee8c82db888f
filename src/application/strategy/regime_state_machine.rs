//! Market Regime State Machine
//!
//! Classifies the market of one symbol from closed hourly candles, using the
//! 1h indicators with a 4h trend filter. Sole writer of the current regime.

use crate::domain::events::TradingEvent;
use crate::domain::market::candle::Candle;
use crate::domain::market::indicators::IndicatorSnapshot;
use crate::domain::market::market_regime::{Regime, RegimeMetrics, RegimeTransition};
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::IndicatorProvider;
use crate::infrastructure::event_bus::EventBus;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeSettings {
    /// RSI level an up-trend must reach (down-trend mirrors it as `100 - x`)
    pub trend_threshold: Decimal,
    /// ATR / close ratio separating high from low volatility ranges
    pub atr_vol_threshold: Decimal,
}

impl Default for RegimeSettings {
    fn default() -> Self {
        Self {
            trend_threshold: dec!(60),
            atr_vol_threshold: dec!(0.0005),
        }
    }
}

pub struct RegimeStateMachine {
    symbol: String,
    settings: RegimeSettings,
    indicators: Arc<dyn IndicatorProvider>,
    current: RwLock<Regime>,
    events: EventBus,
}

impl RegimeStateMachine {
    pub fn new(
        symbol: &str,
        settings: RegimeSettings,
        indicators: Arc<dyn IndicatorProvider>,
        events: EventBus,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            settings,
            indicators,
            current: RwLock::new(Regime::Initializing),
            events,
        }
    }

    pub async fn current(&self) -> Regime {
        *self.current.read().await
    }

    /// Re-evaluates the regime on a closed hourly candle.
    ///
    /// Other timeframes are ignored. Returns the transition when the regime changed.
    pub async fn on_candle(&self, candle: &Candle) -> Option<RegimeTransition> {
        if candle.timeframe != Timeframe::OneHour {
            return None;
        }

        let mut current = self.current.write().await;

        let h1 = match self.indicators.snapshot(Timeframe::OneHour).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("RegimeStateMachine: {} skipping evaluation: {}", self.symbol, e);
                return None;
            }
        };
        let h4 = self.indicators.snapshot(Timeframe::FourHour).await.ok();

        let (regime, metrics) = self.classify(&h1, h4.as_ref());
        if regime == *current {
            return None;
        }

        let transition = RegimeTransition {
            symbol: self.symbol.clone(),
            from: *current,
            to: regime,
            metrics,
            timestamp: candle.end_time,
        };
        *current = regime;
        drop(current);

        self.events
            .publish(TradingEvent::RegimeChanged(transition.clone()))
            .await;
        Some(transition)
    }

    /// Pure classification of the 1h snapshot with the optional 4h filter
    pub fn classify(
        &self,
        h1: &IndicatorSnapshot,
        h4: Option<&IndicatorSnapshot>,
    ) -> (Regime, RegimeMetrics) {
        let close = h1.last_close().unwrap_or(Decimal::ZERO);
        let atr_ratio = h1.atr_ratio().unwrap_or(Decimal::ZERO);

        // Missing 4h data counts as confirmation
        let h4_trend = h4.map(|s| s.last_close().is_some_and(|c| c > s.ma));
        let h4_confirm = h4_trend.unwrap_or(true);

        let up = close > h1.ma && h1.rsi >= self.settings.trend_threshold && h4_confirm;
        let down = close < h1.ma
            && h1.rsi <= dec!(100) - self.settings.trend_threshold
            && !h4_confirm;

        let regime = if up {
            Regime::StrongUpTrend
        } else if down {
            Regime::StrongDownTrend
        } else if close > Decimal::ZERO && atr_ratio >= self.settings.atr_vol_threshold {
            Regime::HighVolRange
        } else {
            Regime::LowVolRange
        };

        (
            regime,
            RegimeMetrics {
                close,
                ma: h1.ma,
                rsi: h1.rsi,
                atr_ratio,
                h4_confirm: h4_trend,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::candle::Tick;
    use crate::infrastructure::event_bus::RecordingListener;
    use crate::infrastructure::mock::{MockIndicatorProvider, snapshot_with};

    fn hourly_candle() -> Candle {
        let tick = Tick::new("BTC-USDT", dec!(105), dec!(1), 1704067200000);
        Candle::open_at(&tick, Timeframe::OneHour, tick.price)
    }

    fn machine(provider: Arc<MockIndicatorProvider>) -> RegimeStateMachine {
        RegimeStateMachine::new(
            "BTC-USDT",
            RegimeSettings::default(),
            provider,
            EventBus::new(),
        )
    }

    #[tokio::test]
    async fn test_skips_when_hourly_not_ready() {
        let provider = MockIndicatorProvider::new();
        let rsm = machine(provider);

        assert!(rsm.on_candle(&hourly_candle()).await.is_none());
        assert_eq!(rsm.current().await, Regime::Initializing);
    }

    #[tokio::test]
    async fn test_ignores_non_hourly_candles() {
        let provider = MockIndicatorProvider::new();
        provider
            .set_snapshot(snapshot_with(Timeframe::OneHour, dec!(105), dec!(100), dec!(65), dec!(1)))
            .await;
        let rsm = machine(provider);

        let mut candle = hourly_candle();
        candle.timeframe = Timeframe::FiveMin;
        assert!(rsm.on_candle(&candle).await.is_none());
        assert_eq!(rsm.current().await, Regime::Initializing);
    }

    #[tokio::test]
    async fn test_up_trend_without_four_hour_data() {
        let provider = MockIndicatorProvider::new();
        provider
            .set_snapshot(snapshot_with(Timeframe::OneHour, dec!(105), dec!(100), dec!(65), dec!(1)))
            .await;
        let events = EventBus::new();
        let recorder = Arc::new(RecordingListener::default());
        events.subscribe(recorder.clone()).await;
        let rsm = RegimeStateMachine::new("BTC-USDT", RegimeSettings::default(), provider, events);

        let transition = rsm.on_candle(&hourly_candle()).await.unwrap();
        assert_eq!(transition.from, Regime::Initializing);
        assert_eq!(transition.to, Regime::StrongUpTrend);
        assert_eq!(transition.metrics.h4_confirm, None);
        assert_eq!(rsm.current().await, Regime::StrongUpTrend);
        assert_eq!(recorder.events().len(), 1);

        // Same inputs, no new transition
        assert!(rsm.on_candle(&hourly_candle()).await.is_none());
        assert_eq!(recorder.events().len(), 1);
    }

    #[tokio::test]
    async fn test_four_hour_filter_blocks_up_trend() {
        let provider = MockIndicatorProvider::new();
        provider
            .set_snapshot(snapshot_with(Timeframe::OneHour, dec!(105), dec!(100), dec!(65), dec!(1)))
            .await;
        provider
            .set_snapshot(snapshot_with(Timeframe::FourHour, dec!(95), dec!(100), dec!(40), dec!(3)))
            .await;
        let rsm = machine(provider);

        let transition = rsm.on_candle(&hourly_candle()).await.unwrap();
        // ATR 1 / close 105 is well above 0.0005
        assert_eq!(transition.to, Regime::HighVolRange);
    }

    #[tokio::test]
    async fn test_down_trend_requires_failed_four_hour_confirmation() {
        let provider = MockIndicatorProvider::new();
        provider
            .set_snapshot(snapshot_with(Timeframe::OneHour, dec!(95), dec!(100), dec!(35), dec!(0.01)))
            .await;
        let rsm = machine(provider.clone());

        // 4h unavailable counts as confirmation, which vetoes the down-trend
        let first = rsm.on_candle(&hourly_candle()).await.unwrap();
        assert_eq!(first.to, Regime::LowVolRange);

        provider
            .set_snapshot(snapshot_with(Timeframe::FourHour, dec!(90), dec!(100), dec!(30), dec!(2)))
            .await;
        let second = rsm.on_candle(&hourly_candle()).await.unwrap();
        assert_eq!(second.from, Regime::LowVolRange);
        assert_eq!(second.to, Regime::StrongDownTrend);
    }

    #[tokio::test]
    async fn test_range_volatility_split() {
        let provider = MockIndicatorProvider::new();
        let rsm = machine(provider);

        let calm = snapshot_with(Timeframe::OneHour, dec!(100), dec!(100), dec!(50), dec!(0.04));
        assert_eq!(rsm.classify(&calm, None).0, Regime::LowVolRange);

        let busy = snapshot_with(Timeframe::OneHour, dec!(100), dec!(100), dec!(50), dec!(0.05));
        assert_eq!(rsm.classify(&busy, None).0, Regime::HighVolRange);

        let mut broken = busy.clone();
        broken.closes = vec![Decimal::ZERO];
        assert_eq!(rsm.classify(&broken, None).0, Regime::LowVolRange);
    }
}
