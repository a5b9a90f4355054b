//! Publication throttler for outbound local state.
//!
//! DESIGN
//! ======
//! Leading edge plus trailing edge. A position change publishes at once when
//! the last publish is at least one interval old; otherwise it replaces the
//! pending state and goes out when the interval elapses, so the newest state
//! always wins. A `drawing` flip publishes at once regardless of the interval.
//! When the pen lifts with a drawn position still held, that position goes
//! out first: peers only draw between published `drawing` positions, so
//! dropping it would cut the end off the stroke.
//!
//! Nothing is published without a change: a participant who stops moving goes
//! quiet, and remote staleness thresholds must allow for that.

use std::time::Duration;

use crate::clock::Timestamp;
use crate::participant::CursorState;

#[derive(Debug)]
pub struct Throttler {
    interval: f64,
    last_emit: Option<Timestamp>,
    last_drawing: Option<bool>,
    pending: Option<CursorState>,
}

impl Throttler {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval: interval.as_secs_f64(), last_emit: None, last_drawing: None, pending: None }
    }

    /// Offer the latest local state. Returns the states to publish now,
    /// oldest first; empty while the interval holds it back.
    pub fn offer(&mut self, state: CursorState, now: Timestamp) -> Vec<CursorState> {
        if self.last_drawing != Some(state.drawing) {
            let tail = self.pending.take().filter(|held| held.drawing && !state.drawing);
            return tail.into_iter().chain([self.emit(state, now)]).collect();
        }
        if self.ready(now) {
            return vec![self.emit(state, now)];
        }
        self.pending = Some(state);
        Vec::new()
    }

    /// Release the pending state if its interval has elapsed.
    pub fn poll(&mut self, now: Timestamp) -> Option<CursorState> {
        if self.pending.is_none() || !self.ready(now) {
            return None;
        }
        let state = self.pending.take()?;
        Some(self.emit(state, now))
    }

    /// Release the pending state unconditionally.
    pub fn flush(&mut self, now: Timestamp) -> Option<CursorState> {
        let state = self.pending.take()?;
        Some(self.emit(state, now))
    }

    /// When the pending state becomes publishable, if one is waiting.
    #[must_use]
    pub fn deadline(&self) -> Option<Timestamp> {
        self.pending.as_ref()?;
        Some(self.last_emit.map_or(f64::NEG_INFINITY, |t| t + self.interval))
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// A clock that ran backwards past the last publish counts as ready.
    fn ready(&self, now: Timestamp) -> bool {
        self.last_emit
            .is_none_or(|t| now < t || now - t >= self.interval)
    }

    fn emit(&mut self, state: CursorState, now: Timestamp) -> CursorState {
        self.last_emit = Some(now);
        self.last_drawing = Some(state.drawing);
        self.pending = None;
        state
    }
}

#[cfg(test)]
#[path = "throttle_test.rs"]
mod tests;
