//! Bounded queues whose producers never block.
//!
//! A push onto a full queue drops the item, counts it and returns `false`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tracing::{debug, warn};

/// Log the first drop and then every Nth one
const DROP_LOG_EVERY: u64 = 100;

pub struct DropQueue<T> {
    name: Arc<str>,
    tx: Sender<T>,
    dropped: Arc<AtomicU64>,
}

impl<T> Clone for DropQueue<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            tx: self.tx.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }
}

/// Creates a bounded queue of `capacity` items
pub fn drop_queue<T>(name: &str, capacity: usize) -> (DropQueue<T>, Receiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        DropQueue {
            name: Arc::from(name),
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}

impl<T> DropQueue<T> {
    /// Non-blocking push. Returns whether the item was enqueued.
    pub fn push(&self, item: T) -> bool {
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if total == 1 || total % DROP_LOG_EVERY == 0 {
                    warn!(
                        "DropQueue: {} full, dropping newest item ({} dropped so far)",
                        self.name, total
                    );
                }
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("DropQueue: {} consumer gone, item discarded", self.name);
                false
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
