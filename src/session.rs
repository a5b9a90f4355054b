//! Session driver: one task per local participant.
//!
//! DESIGN
//! ======
//! The session task owns the `Reconciler` and the `Throttler` outright. UI
//! threads talk to it through a cloneable [`SessionHandle`] that enqueues
//! commands; render snapshots come back over a `oneshot`. Every mutation is
//! therefore serialized without a lock.
//!
//! LIFECYCLE
//! =========
//! 1. Subscribe to the transport and publish the initial presence row
//! 2. `select!` over commands, inbound batches, the throttler's trailing
//!    deadline, and a slow housekeeping tick
//! 3. On shutdown (or when every handle is dropped) end any stroke, publish
//!    the final state, and return
//!
//! ERROR HANDLING
//! ==============
//! Only a failed subscribe aborts the session. Publish failures are logged
//! and the next state supersedes the lost one. An ended inbound stream is
//! logged; local input and snapshots keep working.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::clock::{Clock, Timestamp};
use crate::config::EngineConfig;
use crate::consts::HOUSEKEEPING_INTERVAL_MS;
use crate::engine::{PointerSample, Reconciler, RenderSnapshot, Throttler};
use crate::participant::{CursorState, ParticipantId};
use crate::transport::{Transport, TransportError};
use crate::wire::WireUpdate;

/// Upper bound on a single idle wait, so a clock jump is noticed promptly.
const MAX_WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session has stopped")]
    Stopped,
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

enum Command {
    Pointer(PointerSample),
    FocusLost,
    Snapshot(oneshot::Sender<RenderSnapshot>),
    Shutdown,
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable front end of a running session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Queue one local pointer sample.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the session has exited.
    pub async fn pointer(&self, sample: PointerSample) -> Result<(), SessionError> {
        self.send(Command::Pointer(sample)).await
    }

    /// The surface lost focus; end any stroke in progress.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the session has exited.
    pub async fn focus_lost(&self) -> Result<(), SessionError> {
        self.send(Command::FocusLost).await
    }

    /// Pull a render snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the session has exited.
    pub async fn snapshot(&self) -> Result<RenderSnapshot, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot(reply_tx)).await?;
        reply_rx.await.map_err(|_| SessionError::Stopped)
    }

    /// Ask the session to publish its final state and exit.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the session has already exited.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.tx.send(command).await.map_err(|_| SessionError::Stopped)
    }
}

// =============================================================================
// SESSION
// =============================================================================

pub struct Session {
    reconciler: Reconciler,
    throttler: Throttler,
    clock: Arc<dyn Clock>,
    transport: Arc<dyn Transport>,
    command_queue: usize,
}

impl Session {
    #[must_use]
    pub fn new(
        config: &EngineConfig,
        local: CursorState,
        clock: Arc<dyn Clock>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(local, config.stale_after_secs),
            throttler: Throttler::new(config.publish_interval),
            clock,
            transport,
            command_queue: config.command_queue,
        }
    }

    #[must_use]
    pub fn local_id(&self) -> &ParticipantId {
        &self.reconciler.local_state().id
    }

    /// Start the session task.
    #[must_use]
    pub fn spawn(self) -> (SessionHandle, JoinHandle<Result<(), SessionError>>) {
        let (tx, rx) = mpsc::channel(self.command_queue.max(1));
        (SessionHandle { tx }, tokio::spawn(self.run(rx)))
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Result<(), SessionError> {
        let mut inbound = self.transport.subscribe().await?;
        let mut inbound_open = true;
        let mut housekeeping = tokio::time::interval(Duration::from_millis(HOUSEKEEPING_INTERVAL_MS));
        housekeeping.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let id = self.local_id().clone();
        info!(%id, "session: started");
        self.offer_local().await;

        loop {
            let wait = self.throttler.deadline().map(|d| until(d, self.clock.now()));
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Pointer(sample)) => {
                        self.reconciler.handle_pointer(sample);
                        self.offer_local().await;
                    }
                    Some(Command::FocusLost) => {
                        if self.reconciler.focus_lost(self.clock.now()) {
                            self.offer_local().await;
                        }
                    }
                    Some(Command::Snapshot(reply)) => {
                        let snapshot = self.reconciler.get_snapshot(self.clock.now());
                        if reply.send(snapshot).is_err() {
                            debug!(%id, "session: snapshot requester went away");
                        }
                    }
                    Some(Command::Shutdown) | None => break,
                },
                batch = inbound.recv(), if inbound_open => match batch {
                    Some(rows) => {
                        let summary = self.reconciler.apply_rows(&rows);
                        debug!(%id, rows = rows.len(), accepted = summary.accepted, rejected = summary.rejected, "session: inbound batch");
                    }
                    None => {
                        warn!(%id, "session: inbound stream ended");
                        inbound_open = false;
                    }
                },
                () = tokio::time::sleep(wait.unwrap_or(MAX_WAIT)), if wait.is_some() => {
                    if let Some(state) = self.throttler.poll(self.clock.now()) {
                        self.publish(&state).await;
                    }
                }
                _ = housekeeping.tick() => {
                    self.reconciler.housekeep(self.clock.now());
                }
            }
        }

        self.finish().await;
        info!(%id, "session: stopped");
        Ok(())
    }

    /// End any stroke and publish whatever the relay has not seen yet,
    /// including a held stroke position ahead of the pen-up.
    async fn finish(&mut self) {
        let now = self.clock.now();
        let outgoing = if self.reconciler.focus_lost(now) {
            self.throttler.offer(self.reconciler.local_state().clone(), now)
        } else {
            self.throttler.flush(now).into_iter().collect()
        };
        for state in &outgoing {
            self.publish(state).await;
        }
    }

    async fn offer_local(&mut self) {
        let state = self.reconciler.local_state().clone();
        for state in self.throttler.offer(state, self.clock.now()) {
            self.publish(&state).await;
        }
    }

    async fn publish(&self, state: &CursorState) {
        if let Err(e) = self.transport.publish(&WireUpdate::from_state(state)).await {
            warn!(id = %state.id, error = %e, "session: publish failed");
        }
    }
}

/// Real time left until `deadline`, capped at [`MAX_WAIT`].
fn until(deadline: Timestamp, now: Timestamp) -> Duration {
    Duration::try_from_secs_f64((deadline - now).max(0.0)).map_or(MAX_WAIT, |d| d.min(MAX_WAIT))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
