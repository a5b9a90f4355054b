//! WebSocket transport that talks to the relay.
//!
//! Outbound text frames carry one row; inbound text frames carry the relay's
//! full table as a JSON array. A writer task and a reader task own the two
//! halves of the socket so `publish` never waits on the network.

use std::sync::{Mutex, PoisonError};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::{Batch, Transport, TransportError};
use crate::wire::WireUpdate;

const OUTBOUND_CAPACITY: usize = 64;
const INBOUND_CAPACITY: usize = 64;

pub struct WsTransport {
    outbound: mpsc::Sender<String>,
    inbound: Mutex<Option<mpsc::Receiver<Batch>>>,
}

impl WsTransport {
    /// Connect to a relay at `url` (e.g. `ws://127.0.0.1:3000/ws`).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::WsConnect`] if the handshake fails.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::WsConnect(Box::new(e)))?;
        info!(%url, "ws transport: connected");

        let (mut sink, mut source) = stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel::<Batch>(INBOUND_CAPACITY);

        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if let Err(e) = sink.send(Message::text(text)).await {
                    warn!(error = %e, "ws transport: send failed");
                    break;
                }
            }
            if let Err(e) = sink.close().await {
                debug!(error = %e, "ws transport: close failed");
            }
        });

        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<Batch>(text.as_str()) {
                        Ok(batch) => {
                            if in_tx.send(batch).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "ws transport: dropped non-array frame"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "ws transport: receive failed");
                        break;
                    }
                }
            }
            info!("ws transport: inbound stream ended");
        });

        Ok(Self { outbound: out_tx, inbound: Mutex::new(Some(in_rx)) })
    }
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    async fn publish(&self, update: &WireUpdate) -> Result<(), TransportError> {
        let text = serde_json::to_string(update)?;
        self.outbound
            .send(text)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<Batch>, TransportError> {
        let taken = self
            .inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        taken.ok_or(TransportError::AlreadySubscribed)
    }
}
