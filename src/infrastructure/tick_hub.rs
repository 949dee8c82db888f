use crate::domain::market::candle::Tick;
use crate::infrastructure::queue::{DropQueue, drop_queue};
use std::collections::HashMap;
use tokio::sync::mpsc::Receiver;
use tracing::{info, warn};

/// Fans one upstream tick stream out to per-instance queues keyed by symbol.
///
/// Every route is a drop-on-full queue, so a slow instance loses its own
/// ticks without stalling the others.
#[derive(Default)]
pub struct TickHub {
    routes: HashMap<String, Vec<DropQueue<Tick>>>,
}

impl TickHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a consumer for `symbol`
    pub fn subscribe(&mut self, symbol: &str, capacity: usize) -> Receiver<Tick> {
        let subscribers = self.routes.entry(symbol.to_string()).or_default();
        let (queue, rx) = drop_queue(&format!("tick-hub/{}#{}", symbol, subscribers.len()), capacity);
        subscribers.push(queue);
        rx
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.routes.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Delivers `tick` to every subscriber of its symbol.
    ///
    /// Returns how many subscribers accepted it.
    pub fn route(&self, tick: &Tick) -> usize {
        self.routes
            .get(&tick.symbol)
            .map(|subs| subs.iter().filter(|q| q.push(tick.clone())).count())
            .unwrap_or(0)
    }

    /// True once every subscriber has dropped its receiver
    pub fn all_closed(&self) -> bool {
        self.routes.values().flatten().all(DropQueue::is_closed)
    }

    /// Consumes `upstream` until it closes or no subscriber is left
    pub async fn run(self, mut upstream: Receiver<Tick>) {
        info!("TickHub: routing ticks for {:?}", self.symbols());
        while let Some(tick) = upstream.recv().await {
            self.route(&tick);
            if self.all_closed() {
                warn!("TickHub: every subscriber is gone, stopping");
                return;
            }
        }
        warn!("TickHub: upstream closed, stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_routes_by_symbol() {
        let mut hub = TickHub::new();
        let mut btc = hub.subscribe("BTC-USDT", 8);
        let mut eth = hub.subscribe("ETH-USDT", 8);

        assert_eq!(hub.route(&Tick::new("BTC-USDT", dec!(42000), dec!(1), 1)), 1);
        assert_eq!(hub.route(&Tick::new("ETH-USDT", dec!(2300), dec!(1), 2)), 1);
        assert_eq!(hub.route(&Tick::new("SOL-USDT", dec!(90), dec!(1), 3)), 0);

        assert_eq!(btc.recv().await.unwrap().price, dec!(42000));
        assert_eq!(eth.recv().await.unwrap().price, dec!(2300));
        assert!(btc.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_stops_when_subscribers_are_gone() {
        let mut hub = TickHub::new();
        let btc = hub.subscribe("BTC-USDT", 8);
        let eth = hub.subscribe("ETH-USDT", 8);
        assert!(!hub.all_closed());
        drop(btc);
        assert!(!hub.all_closed());
        drop(eth);
        assert!(hub.all_closed());

        // Upstream stays open; the hub must still return
        let (tx, upstream) = tokio::sync::mpsc::channel(4);
        tx.send(Tick::new("BTC-USDT", dec!(42000), dec!(1), 1)).await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), hub.run(upstream))
            .await
            .expect("hub should stop without subscribers");
        drop(tx);
    }

    #[tokio::test]
    async fn test_slow_consumer_does_not_block_others() {
        let mut hub = TickHub::new();
        let _stalled = hub.subscribe("BTC-USDT", 1);
        let mut healthy = hub.subscribe("BTC-USDT", 16);

        for i in 0..10 {
            hub.route(&Tick::new("BTC-USDT", dec!(42000) + rust_decimal::Decimal::from(i), dec!(1), i));
        }

        let mut received = 0;
        while healthy.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 10);
    }
}
