//! Remote participant table: latest state per remote id.
//!
//! DESIGN
//! ======
//! Last-write-wins keyed by id, ordered by the sender's `last_update`. The
//! transport may redeliver or reorder rows, so an update that is not strictly
//! newer than the stored one is ignored. Eviction is driven by silence only
//! and cascades into the ledger so an evicted participant leaves no trails.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::clock::{Timestamp, age};
use crate::engine::ledger::SegmentLedger;
use crate::participant::{CursorState, ParticipantId};

/// What `upsert` did with an inbound state.
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert {
    /// First sighting of this id.
    Inserted,
    /// Replaced an older state, returned here.
    Updated { previous: CursorState },
    /// Not newer than the stored state; nothing changed.
    Ignored,
}

#[derive(Debug, Default)]
pub struct RemoteTable {
    entries: HashMap<ParticipantId, CursorState>,
}

impl RemoteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `state` unless an equal-or-newer state for the same id is held.
    pub fn upsert(&mut self, state: CursorState) -> Upsert {
        match self.entries.get_mut(&state.id) {
            None => {
                self.entries.insert(state.id.clone(), state);
                Upsert::Inserted
            }
            Some(current) if state.last_update > current.last_update => {
                let previous = std::mem::replace(current, state);
                Upsert::Updated { previous }
            }
            Some(_) => Upsert::Ignored,
        }
    }

    /// Remove every participant silent for longer than `threshold_secs`, along
    /// with their trail segments. Returns the evicted ids.
    pub fn evict_stale(
        &mut self,
        now: Timestamp,
        threshold_secs: f64,
        ledger: &mut SegmentLedger,
    ) -> Vec<ParticipantId> {
        let mut evicted = Vec::new();
        self.entries.retain(|id, state| {
            if age(now, state.last_update) > threshold_secs {
                evicted.push(id.clone());
                false
            } else {
                true
            }
        });
        for id in &evicted {
            let segments = ledger.drop_owner(id);
            debug!(%id, segments, "table: evicted stale participant");
        }
        evicted
    }

    /// Current mapping of id to state, in id order.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<ParticipantId, CursorState> {
        self.entries
            .iter()
            .map(|(id, state)| (id.clone(), state.clone()))
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: &ParticipantId) -> Option<&CursorState> {
        self.entries.get(id)
    }

    pub fn values(&self) -> impl Iterator<Item = &CursorState> + '_ {
        self.entries.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
