//! WebSocket relay: the shared presence table for one room.
//!
//! DESIGN
//! ======
//! The relay plays the realtime collaborator for the `ws` transport. It keeps
//! one latest row per participant id and, after every accepted write, sends
//! the whole table to every connected client. It does no ordering of its own;
//! last-write-wins happens in each client's reconciler.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register the client and send the current table
//! 2. Client text frame → validate the row, store it, fan the table out
//! 3. Close → drop the client and every row it wrote, fan the table out
//!
//! TRADE-OFFS
//! ==========
//! Fan-out is best-effort: a client whose queue is full misses that delivery.
//! The next write carries the full table again, so nothing is lost for long.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use tokio::sync::{RwLock, mpsc};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::wire::{WireError, WireUpdate};

/// Outbound table deliveries buffered per client.
const CLIENT_QUEUE: usize = 64;

// =============================================================================
// STATE
// =============================================================================

#[derive(Clone, Default)]
pub struct RelayState {
    room: Arc<RwLock<Room>>,
}

#[derive(Default)]
struct Room {
    /// Latest row per participant id, with the connection that wrote it.
    rows: BTreeMap<String, (Uuid, serde_json::Value)>,
    clients: HashMap<Uuid, mpsc::Sender<String>>,
}

impl Room {
    fn table_json(&self) -> String {
        let rows: Vec<&serde_json::Value> = self.rows.values().map(|(_, row)| row).collect();
        serde_json::to_string(&rows).unwrap_or_else(|_| String::from("[]"))
    }

    fn fan_out(&self) {
        let table = self.table_json();
        for (client_id, tx) in &self.clients {
            if tx.try_send(table.clone()).is_err() {
                debug!(%client_id, "relay: client queue full, delivery skipped");
            }
        }
    }
}

impl RelayState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client and return the table it should start from.
    pub async fn join(&self, client_id: Uuid, tx: mpsc::Sender<String>) -> String {
        let mut room = self.room.write().await;
        room.clients.insert(client_id, tx);
        room.table_json()
    }

    /// Validate and store one row written by `client_id`, then fan out.
    ///
    /// # Errors
    ///
    /// Returns a [`WireError`] for a malformed row; the table is untouched.
    pub async fn write(&self, client_id: Uuid, text: &str) -> Result<(), WireError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let state = WireUpdate::parse(&value)?;
        let row = WireUpdate::from_state(&state).to_value();

        let mut room = self.room.write().await;
        room.rows.insert(state.id.as_str().to_owned(), (client_id, row));
        room.fan_out();
        Ok(())
    }

    /// Drop a client and the rows it wrote.
    pub async fn leave(&self, client_id: Uuid) {
        let mut room = self.room.write().await;
        room.clients.remove(&client_id);
        let before = room.rows.len();
        room.rows.retain(|_, (writer, _)| *writer != client_id);
        if room.rows.len() != before {
            room.fan_out();
        }
    }

    /// Number of participant rows currently held.
    pub async fn row_count(&self) -> usize {
        self.room.read().await.rows.len()
    }

    pub async fn client_count(&self) -> usize {
        self.room.read().await.clients.len()
    }
}

// =============================================================================
// ROUTES
// =============================================================================

pub fn app(state: RelayState) -> Router {
    Router::new()
        .route("/ws", get(handle_ws))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn handle_ws(State(state): State<RelayState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: RelayState) {
    let client_id = Uuid::new_v4();
    let (client_tx, mut client_rx) = mpsc::channel::<String>(CLIENT_QUEUE);

    let table = state.join(client_id, client_tx).await;
    if socket.send(Message::Text(table.into())).await.is_ok() {
        info!(%client_id, "relay: client connected");
        loop {
            tokio::select! {
                msg = socket.recv() => {
                    let Some(Ok(msg)) = msg else { break };
                    match msg {
                        Message::Text(text) => {
                            if let Err(e) = state.write(client_id, text.as_str()).await {
                                warn!(%client_id, error = %e, "relay: dropped malformed row");
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                Some(table) = client_rx.recv() => {
                    if socket.send(Message::Text(table.into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    state.leave(client_id).await;
    info!(%client_id, "relay: client disconnected");
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
