//! Segment ledger: every live trail segment, local and remote.
//!
//! DESIGN
//! ======
//! Segments are grouped per owner in a `VecDeque` ordered by `created_at`,
//! so dropping an evicted participant removes one map entry. A min-heap keyed
//! by each queue's front timestamp lets `prune` visit only owners that have
//! something expired; entries for dropped owners are discarded lazily.
//! Alpha is derived from the segment's age at read time and never stored.
//!
//! A watermark remembers the oldest creation time still admissible after the
//! latest prune. Appends older than it are refused, so a pruned segment can
//! never come back through a late duplicate.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, VecDeque};

use crate::clock::{Timestamp, age};
use crate::consts::FADE_WINDOW;
use crate::participant::{Color, ParticipantId, Point};

// =============================================================================
// TRAIL SEGMENT
// =============================================================================

/// One immutable line piece of a decaying stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailSegment {
    pub owner: ParticipantId,
    pub from: Point,
    pub to: Point,
    pub created_at: Timestamp,
    /// Copied from the owner when the segment was created.
    pub color: Color,
}

impl TrailSegment {
    /// Opacity at `now`: 1.0 when fresh, 0.0 from `FADE_WINDOW` seconds on.
    #[must_use]
    pub fn alpha(&self, now: Timestamp) -> f64 {
        (1.0 - age(now, self.created_at) / FADE_WINDOW).clamp(0.0, 1.0)
    }

    fn expired(&self, now: Timestamp) -> bool {
        age(now, self.created_at) > FADE_WINDOW
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// Heap key: the creation time at the front of one owner's queue.
#[derive(Debug, Clone, PartialEq)]
struct FrontKey {
    created_at: Timestamp,
    owner: ParticipantId,
}

impl Eq for FrontKey {}

impl PartialOrd for FrontKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.created_at
            .total_cmp(&other.created_at)
            .then_with(|| self.owner.cmp(&other.owner))
    }
}

#[derive(Debug)]
pub struct SegmentLedger {
    by_owner: HashMap<ParticipantId, VecDeque<TrailSegment>>,
    /// Every non-empty queue's current front has an entry here. Stale entries
    /// may linger until they reach the top.
    fronts: BinaryHeap<Reverse<FrontKey>>,
    len: usize,
    /// Segments created before this are gone for good.
    watermark: Timestamp,
}

impl Default for SegmentLedger {
    fn default() -> Self {
        Self { by_owner: HashMap::new(), fronts: BinaryHeap::new(), len: 0, watermark: f64::NEG_INFINITY }
    }
}

impl SegmentLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a segment. Returns `false` when the segment predates the last prune
    /// and was refused.
    pub fn append(&mut self, segment: TrailSegment) -> bool {
        if segment.created_at < self.watermark {
            return false;
        }
        let key = FrontKey { created_at: segment.created_at, owner: segment.owner.clone() };
        let queue = self.by_owner.entry(segment.owner.clone()).or_default();
        let at = match queue.back() {
            Some(last) if last.created_at > segment.created_at => {
                queue.partition_point(|s| s.created_at <= segment.created_at)
            }
            _ => queue.len(),
        };
        queue.insert(at, segment);
        if at == 0 {
            self.fronts.push(Reverse(key));
        }
        self.len += 1;
        true
    }

    /// Drop every segment older than the fade window. Returns how many were
    /// removed; a second call with the same `now` removes nothing. Only owners
    /// holding an expired segment are visited.
    pub fn prune(&mut self, now: Timestamp) -> usize {
        let mut removed = 0;
        while let Some(Reverse(key)) = self.fronts.peek() {
            if age(now, key.created_at) <= FADE_WINDOW {
                break;
            }
            let Some(Reverse(key)) = self.fronts.pop() else {
                break;
            };
            let Some(queue) = self.by_owner.get_mut(&key.owner) else {
                continue;
            };
            let before = queue.len();
            while queue.front().is_some_and(|s| s.expired(now)) {
                queue.pop_front();
            }
            let popped = before - queue.len();
            removed += popped;
            match queue.front().map(|s| s.created_at) {
                None => {
                    self.by_owner.remove(&key.owner);
                }
                Some(created_at) if popped > 0 => {
                    self.fronts.push(Reverse(FrontKey { created_at, owner: key.owner }));
                }
                Some(_) => {}
            }
        }
        self.len -= removed;
        self.watermark = self.watermark.max(now - FADE_WINDOW);
        removed
    }

    /// Remove all segments owned by `owner`. Returns how many were removed.
    pub fn drop_owner(&mut self, owner: &ParticipantId) -> usize {
        let removed = self.by_owner.remove(owner).map_or(0, |q| q.len());
        self.len -= removed;
        removed
    }

    /// Visible segments with their alpha, ordered by owner id then creation
    /// time. The iterator is lazy and can be cloned to walk it again.
    pub fn visible(&self, now: Timestamp) -> impl Iterator<Item = (&TrailSegment, f64)> + Clone + '_ {
        let mut owners: Vec<(&ParticipantId, &VecDeque<TrailSegment>)> = self.by_owner.iter().collect();
        owners.sort_unstable_by(|a, b| a.0.cmp(b.0));
        owners
            .into_iter()
            .flat_map(|(_, queue)| queue.iter())
            .filter_map(move |s| {
                let alpha = s.alpha(now);
                (alpha > 0.0).then_some((s, alpha))
            })
    }

    /// Segments currently held for `owner`, oldest first.
    pub fn segments_of(&self, owner: &ParticipantId) -> impl Iterator<Item = &TrailSegment> + '_ {
        self.by_owner.get(owner).into_iter().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
