//! In-process transport with the collaborator's table semantics.
//!
//! Every clone of a `MemoryHub` shares one table. A write replaces the row
//! for its id and fans the full table out to every subscriber. Fan-out runs
//! under the table lock so subscribers see writes in the order they happened.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace};

use super::{Batch, Transport, TransportError};
use crate::wire::WireUpdate;

const FANOUT_CAPACITY: usize = 256;
const SUBSCRIBER_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct MemoryHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    rows: Mutex<BTreeMap<String, serde_json::Value>>,
    fanout: broadcast::Sender<Arc<Batch>>,
}

impl MemoryHub {
    #[must_use]
    pub fn new() -> Self {
        let (fanout, _) = broadcast::channel(FANOUT_CAPACITY);
        Self { inner: Arc::new(HubInner { rows: Mutex::new(BTreeMap::new()), fanout }) }
    }

    /// Store `row` under `key` and deliver the table to all subscribers.
    /// Rows are not validated here; that is the subscriber's job.
    pub fn write(&self, key: &str, row: serde_json::Value) {
        let mut rows = self
            .inner
            .rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        rows.insert(key.to_owned(), row);
        let batch: Batch = rows.values().cloned().collect();
        if self.inner.fanout.send(Arc::new(batch)).is_err() {
            trace!(key, "memory hub: write with no subscribers");
        }
    }

    /// Current table contents, in key order.
    #[must_use]
    pub fn rows(&self) -> Batch {
        self.inner
            .rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Row stored for `key`, if any.
    #[must_use]
    pub fn row(&self, key: &str) -> Option<serde_json::Value> {
        self.inner
            .rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for MemoryHub {
    async fn publish(&self, update: &WireUpdate) -> Result<(), TransportError> {
        self.write(&update.id, update.to_value());
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<Batch>, TransportError> {
        // Snapshot and subscribe under one lock so no write falls in between.
        let (initial, mut fanout_rx) = {
            let rows = self
                .inner
                .rows
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            (rows.values().cloned().collect::<Batch>(), self.inner.fanout.subscribe())
        };
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);

        tokio::spawn(async move {
            if tx.send(initial).await.is_err() {
                return;
            }
            loop {
                match fanout_rx.recv().await {
                    Ok(batch) => {
                        if tx.send(batch.as_ref().clone()).await.is_err() {
                            break;
                        }
                    }
                    // Every batch is a full table, so the next one repairs the gap.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "memory hub: subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
