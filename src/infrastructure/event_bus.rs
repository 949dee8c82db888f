//! In-process fan-out of [`TradingEvent`]s to registered listeners.

use crate::domain::events::{EventListener, TradingEvent};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::trace;

/// Shared handle: clones publish to the same listener set
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<RwLock<Vec<Arc<dyn EventListener>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.listeners.write().await.push(listener);
    }

    /// Delivers `event` to every listener in subscription order.
    ///
    /// Listeners run on a snapshot of the set; the lock is released first.
    pub async fn publish(&self, event: TradingEvent) {
        let listeners: Vec<Arc<dyn EventListener>> = self.listeners.read().await.clone();
        trace!("EventBus: delivering event to {} listeners", listeners.len());
        for listener in &listeners {
            listener.on_event(&event);
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.listeners.read().await.len()
    }
}

/// Listener that keeps every event, for assertions in tests
#[derive(Default)]
pub struct RecordingListener {
    events: std::sync::Mutex<Vec<TradingEvent>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<TradingEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventListener for RecordingListener {
    fn on_event(&self, event: &TradingEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
