use crate::application::market_data::candle_aggregator::CandleAggregator;
use crate::domain::market::candle::{Candle, Tick};
use crate::domain::market::timeframe::Timeframe;
use crate::infrastructure::queue::{DropQueue, drop_queue};
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Queue sizes for one streaming engine
#[derive(Debug, Clone, Copy)]
pub struct StreamingCapacities {
    /// Per-aggregator tick input
    pub aggregator_input: usize,
    /// Closed candles shared by all aggregators
    pub candles: usize,
    /// Raw ticks forwarded to the execution monitor
    pub tick_broadcast: usize,
}

impl Default for StreamingCapacities {
    fn default() -> Self {
        Self {
            aggregator_input: 1000,
            candles: 100,
            tick_broadcast: 1000,
        }
    }
}

/// Consumer ends handed out by [`StreamingEngine::start`]
pub struct StreamingChannels {
    pub candles: Receiver<Candle>,
    pub ticks: Receiver<Tick>,
}

/// Fans the ticks of one symbol out to its candle aggregators and to the
/// execution monitor. Never blocks on a slow consumer.
pub struct StreamingEngine {
    symbol: String,
    aggregators: Vec<Arc<CandleAggregator>>,
    aggregator_inputs: Vec<DropQueue<Tick>>,
    tick_broadcast: DropQueue<Tick>,
    workers: Vec<JoinHandle<()>>,
}

impl StreamingEngine {
    /// Spawns one aggregator worker per timeframe. Must run inside a tokio runtime.
    pub fn start(
        symbol: &str,
        timeframes: &[Timeframe],
        capacities: StreamingCapacities,
    ) -> (Self, StreamingChannels) {
        let (candle_queue, candles) = drop_queue(&format!("{}/candles", symbol), capacities.candles);
        let (tick_broadcast, ticks) =
            drop_queue(&format!("{}/tick-broadcast", symbol), capacities.tick_broadcast);

        let mut aggregators = Vec::with_capacity(timeframes.len());
        let mut aggregator_inputs = Vec::with_capacity(timeframes.len());
        let mut workers = Vec::with_capacity(timeframes.len());

        for &timeframe in timeframes {
            let (input, input_rx) = drop_queue(
                &format!("{}/{}-aggregator", symbol, timeframe),
                capacities.aggregator_input,
            );
            let aggregator = Arc::new(CandleAggregator::new(symbol, timeframe, candle_queue.clone()));
            workers.push(tokio::spawn(aggregator.clone().run(input_rx)));
            aggregators.push(aggregator);
            aggregator_inputs.push(input);
        }

        info!(
            "StreamingEngine: {} started with timeframes {:?}",
            symbol,
            timeframes.iter().map(|tf| tf.as_str()).collect::<Vec<_>>()
        );

        (
            Self {
                symbol: symbol.to_string(),
                aggregators,
                aggregator_inputs,
                tick_broadcast,
                workers,
            },
            StreamingChannels { candles, ticks },
        )
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn aggregator(&self, timeframe: Timeframe) -> Option<Arc<CandleAggregator>> {
        self.aggregators
            .iter()
            .find(|a| a.timeframe() == timeframe)
            .cloned()
    }

    /// Pushes `tick` to every aggregator and to the tick broadcast.
    ///
    /// Returns the number of destinations that accepted it; ticks for other
    /// symbols are ignored and yield zero.
    pub fn dispatch(&self, tick: &Tick) -> usize {
        if tick.symbol != self.symbol {
            return 0;
        }

        let mut accepted = self
            .aggregator_inputs
            .iter()
            .filter(|input| input.push(tick.clone()))
            .count();

        // Live mode never consumes the broadcast
        if self.tick_broadcast.is_closed() {
            return accepted;
        }
        if self.tick_broadcast.push(tick.clone()) {
            accepted += 1;
        } else {
            debug!(
                "StreamingEngine: {} tick @ {} missed the execution monitor",
                self.symbol, tick.timestamp
            );
        }
        accepted
    }

    /// Consumes `input` until it closes, then lets the aggregator workers drain
    pub async fn run(self, mut input: Receiver<Tick>) {
        while let Some(tick) = input.recv().await {
            self.dispatch(&tick);
        }
        info!("StreamingEngine: {} input closed, shutting down", self.symbol);

        let Self {
            aggregator_inputs,
            tick_broadcast,
            workers,
            ..
        } = self;
        drop(aggregator_inputs);
        drop(tick_broadcast);
        for worker in workers {
            let _ = worker.await;
        }
    }
}
