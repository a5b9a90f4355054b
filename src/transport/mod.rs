//! Transport seam between the engine and the realtime pub/sub collaborator.
//!
//! DESIGN
//! ======
//! The collaborator stores one latest row per participant and, on every
//! write, delivers the whole table to every subscriber. `Transport` captures
//! exactly that: publish one row, receive batches of raw rows. Rows stay raw
//! JSON until the reconciler validates them one by one.
//!
//! Reconnection belongs to the implementation, not the session. A gap in
//! delivery just lets remote entries age toward eviction.

pub mod memory;
pub mod ws;

use tokio::sync::mpsc;

use crate::wire::WireUpdate;

pub use memory::MemoryHub;
pub use ws::WsTransport;

/// One delivery: the collaborator's full table, one JSON row per participant.
pub type Batch = Vec<serde_json::Value>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("subscription already taken")]
    AlreadySubscribed,
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Provider-neutral pub/sub seam. Enables in-process testing.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Write the local participant's latest row.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the row cannot be handed off.
    async fn publish(&self, update: &WireUpdate) -> Result<(), TransportError>;

    /// Start receiving table deliveries. The first batch is the current table.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no subscription can be opened.
    async fn subscribe(&self) -> Result<mpsc::Receiver<Batch>, TransportError>;
}
