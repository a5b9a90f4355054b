//! Reconciler: the single owner of ledger, remote table and local state.
//!
//! DESIGN
//! ======
//! Inbound rows go through the table's last-write-wins guard first. Only an
//! accepted update can synthesize a remote segment, so redelivered rows never
//! draw twice. A remote segment needs the participant to be drawing both
//! before and after the update; the pen-down row itself only sets the anchor,
//! matching how the local reducer treats a down event. This is deliberately
//! stricter than "new state drawing and a previous position exists": without
//! it, a pen-down would draw a line from wherever the idle cursor last was.
//!
//! Snapshots are pulled, never pushed. Each pull prunes the ledger and evicts
//! stale participants before assembling the view. The session also calls
//! `housekeep` on a slow tick so memory stays bounded with no renderer attached.

use tracing::{debug, trace, warn};

use crate::clock::Timestamp;
use crate::engine::ledger::{SegmentLedger, TrailSegment};
use crate::engine::reducer::{LocalReducer, PointerSample, ReducerOutcome};
use crate::engine::table::{RemoteTable, Upsert};
use crate::participant::{CursorState, ParticipantId};
use crate::wire::WireUpdate;

// =============================================================================
// SNAPSHOT
// =============================================================================

/// A segment paired with its opacity at snapshot time.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleSegment {
    pub segment: TrailSegment,
    pub alpha: f64,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    pub taken_at: Timestamp,
    pub local_id: ParticipantId,
    /// Every live participant, local included, in id order.
    pub cursors: Vec<CursorState>,
    /// Visible segments, by owner id then creation time.
    pub segments: Vec<VisibleSegment>,
}

impl RenderSnapshot {
    #[must_use]
    pub fn cursor(&self, id: &ParticipantId) -> Option<&CursorState> {
        self.cursors.iter().find(|c| &c.id == id)
    }

    pub fn segments_of(&self, id: &ParticipantId) -> impl Iterator<Item = &VisibleSegment> + '_ {
        let id = id.clone();
        self.segments.iter().filter(move |v| v.segment.owner == id)
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// Result of applying one inbound state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// Our own row echoed back by the transport.
    Echo,
    /// Not newer than what the table holds.
    Ignored,
    /// Stored; `segment` tells whether a trail segment was synthesized.
    Accepted { segment: bool },
}

/// Tally of one inbound batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub accepted: usize,
    pub ignored: usize,
    pub rejected: usize,
    pub segments: usize,
}

// =============================================================================
// RECONCILER
// =============================================================================

#[derive(Debug)]
pub struct Reconciler {
    ledger: SegmentLedger,
    table: RemoteTable,
    local: LocalReducer,
    stale_after_secs: f64,
}

impl Reconciler {
    #[must_use]
    pub fn new(local: CursorState, stale_after_secs: f64) -> Self {
        Self {
            ledger: SegmentLedger::new(),
            table: RemoteTable::new(),
            local: LocalReducer::new(local),
            stale_after_secs,
        }
    }

    // --- Local input ---

    /// Feed one local pointer sample through the reducer.
    pub fn handle_pointer(&mut self, sample: PointerSample) -> ReducerOutcome {
        self.local.apply(sample, &mut self.ledger)
    }

    /// End any stroke in progress. Returns `true` when one was ended.
    pub fn focus_lost(&mut self, at: Timestamp) -> bool {
        self.local.focus_lost(at)
    }

    #[must_use]
    pub fn local_state(&self) -> &CursorState {
        self.local.state()
    }

    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.local.is_drawing()
    }

    // --- Remote input ---

    /// Apply one validated remote state.
    pub fn apply_remote(&mut self, state: CursorState) -> RemoteOutcome {
        if state.id == self.local.state().id {
            return RemoteOutcome::Echo;
        }
        let next = state.clone();
        match self.table.upsert(state) {
            Upsert::Ignored => RemoteOutcome::Ignored,
            Upsert::Inserted => {
                debug!(id = %next.id, "reconcile: new participant");
                RemoteOutcome::Accepted { segment: false }
            }
            Upsert::Updated { previous } => {
                let segment = previous.drawing
                    && next.drawing
                    && previous.position() != next.position()
                    && self.ledger.append(TrailSegment {
                        owner: next.id.clone(),
                        from: previous.position(),
                        to: next.position(),
                        created_at: next.last_update,
                        color: next.color.clone(),
                    });
                RemoteOutcome::Accepted { segment }
            }
        }
    }

    /// Apply a full-table delivery from the transport. Malformed rows are
    /// logged and skipped; the rest of the batch still applies.
    pub fn apply_rows(&mut self, rows: &[serde_json::Value]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for row in rows {
            let state = match WireUpdate::parse(row) {
                Ok(state) => state,
                Err(e) => {
                    warn!(error = %e, "reconcile: dropped malformed row");
                    summary.rejected += 1;
                    continue;
                }
            };
            match self.apply_remote(state) {
                RemoteOutcome::Accepted { segment } => {
                    summary.accepted += 1;
                    summary.segments += usize::from(segment);
                }
                RemoteOutcome::Ignored | RemoteOutcome::Echo => summary.ignored += 1,
            }
        }
        trace!(?summary, "reconcile: batch applied");
        summary
    }

    // --- Rendering ---

    /// Drop expired segments and stale participants. Returns the number of
    /// segments pruned and the ids evicted.
    pub fn housekeep(&mut self, now: Timestamp) -> (usize, Vec<ParticipantId>) {
        let pruned = self.ledger.prune(now);
        let evicted = self.table.evict_stale(now, self.stale_after_secs, &mut self.ledger);
        if pruned > 0 || !evicted.is_empty() {
            debug!(pruned, evicted = evicted.len(), "reconcile: housekeeping");
        }
        (pruned, evicted)
    }

    /// Prune, evict, and assemble the current view.
    pub fn get_snapshot(&mut self, now: Timestamp) -> RenderSnapshot {
        self.housekeep(now);

        let mut cursors: Vec<CursorState> = self.table.values().cloned().collect();
        cursors.push(self.local.state().clone());
        cursors.sort_by(|a, b| a.id.cmp(&b.id));

        let segments = self
            .ledger
            .visible(now)
            .map(|(segment, alpha)| VisibleSegment { segment: segment.clone(), alpha })
            .collect();

        RenderSnapshot { taken_at: now, local_id: self.local.state().id.clone(), cursors, segments }
    }

    #[must_use]
    pub fn ledger(&self) -> &SegmentLedger {
        &self.ledger
    }

    #[must_use]
    pub fn table(&self) -> &RemoteTable {
        &self.table
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod tests;
