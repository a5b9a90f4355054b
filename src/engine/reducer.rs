//! Local input reducer: pointer samples in, local cursor state out.
//!
//! Two gesture states. `Idle` only tracks the cursor. `Drawing` carries the
//! anchor of the stroke in progress; each move appends one segment from the
//! anchor to the new point and advances the anchor.
//!
//! | From    | Event      | To      | Effect                               |
//! |---------|------------|---------|--------------------------------------|
//! | Idle    | down       | Drawing | anchor = point, `drawing = true`     |
//! | Drawing | move       | Drawing | segment anchor→point, anchor = point |
//! | Drawing | up / focus | Idle    | `drawing = false`, no segment        |
//! | Idle    | move / up  | Idle    | position only                        |
//!
//! Every sample stamps the local `last_update`, drawing or not.

use tracing::trace;

use crate::clock::Timestamp;
use crate::engine::ledger::{SegmentLedger, TrailSegment};
use crate::participant::{CursorState, Point};

/// What the pointer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Move,
    Down,
    Up,
}

/// One positioned pointer event from the input surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub kind: PointerKind,
    /// Normalized position.
    pub pos: Point,
    pub at: Timestamp,
}

impl PointerSample {
    #[must_use]
    pub fn new(kind: PointerKind, x: f64, y: f64, at: Timestamp) -> Self {
        Self { kind, pos: Point::new(x, y), at }
    }

    #[must_use]
    pub fn down(x: f64, y: f64, at: Timestamp) -> Self {
        Self::new(PointerKind::Down, x, y, at)
    }

    #[must_use]
    pub fn moved(x: f64, y: f64, at: Timestamp) -> Self {
        Self::new(PointerKind::Move, x, y, at)
    }

    #[must_use]
    pub fn up(x: f64, y: f64, at: Timestamp) -> Self {
        Self::new(PointerKind::Up, x, y, at)
    }
}

/// Gesture state between pointer-down and pointer-up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InputState {
    #[default]
    Idle,
    Drawing {
        /// End of the last segment, start of the next.
        anchor: Point,
    },
}

/// What a single reducer step changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReducerOutcome {
    /// The `drawing` flag flipped on this step.
    pub drawing_changed: bool,
    /// A segment was appended to the ledger on this step.
    pub segment_appended: bool,
}

#[derive(Debug)]
pub struct LocalReducer {
    state: CursorState,
    input: InputState,
}

impl LocalReducer {
    #[must_use]
    pub fn new(state: CursorState) -> Self {
        Self { state, input: InputState::Idle }
    }

    #[must_use]
    pub fn state(&self) -> &CursorState {
        &self.state
    }

    #[must_use]
    pub fn input(&self) -> InputState {
        self.input
    }

    #[must_use]
    pub fn is_drawing(&self) -> bool {
        matches!(self.input, InputState::Drawing { .. })
    }

    /// Apply one pointer sample, appending to `ledger` when a stroke advances.
    pub fn apply(&mut self, sample: PointerSample, ledger: &mut SegmentLedger) -> ReducerOutcome {
        let point = self.sanitize(sample.pos);
        let mut outcome = ReducerOutcome::default();

        self.input = match (self.input, sample.kind) {
            (InputState::Idle, PointerKind::Down) => {
                outcome.drawing_changed = true;
                InputState::Drawing { anchor: point }
            }
            (InputState::Drawing { anchor }, PointerKind::Move) => {
                if anchor != point {
                    outcome.segment_appended = ledger.append(TrailSegment {
                        owner: self.state.id.clone(),
                        from: anchor,
                        to: point,
                        created_at: sample.at,
                        color: self.state.color.clone(),
                    });
                }
                InputState::Drawing { anchor: point }
            }
            // A second down without an up restarts the stroke where it lands.
            (InputState::Drawing { .. }, PointerKind::Down) => InputState::Drawing { anchor: point },
            (InputState::Drawing { .. }, PointerKind::Up) => {
                outcome.drawing_changed = true;
                InputState::Idle
            }
            (InputState::Idle, PointerKind::Move | PointerKind::Up) => InputState::Idle,
        };

        self.state.x = point.x;
        self.state.y = point.y;
        self.state.drawing = self.is_drawing();
        self.state.last_update = sample.at;
        trace!(kind = ?sample.kind, x = point.x, y = point.y, ?outcome, "reducer: sample");
        outcome
    }

    /// Force the stroke to end, as an up-event at the current position would.
    /// Returns `true` when a stroke was actually in progress.
    pub fn focus_lost(&mut self, at: Timestamp) -> bool {
        if !self.is_drawing() {
            return false;
        }
        self.input = InputState::Idle;
        self.state.drawing = false;
        self.state.last_update = at;
        true
    }

    /// Clamp into the unit square; a non-finite axis keeps the current value.
    fn sanitize(&self, p: Point) -> Point {
        let axis = |v: f64, current: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { current };
        Point::new(axis(p.x, self.state.x), axis(p.y, self.state.y))
    }
}

#[cfg(test)]
#[path = "reducer_test.rs"]
mod tests;
