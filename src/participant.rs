//! Participant identity and per-participant cursor state.
//!
//! A participant is one anonymous session. Its id and color are fixed for the
//! life of the process; its `CursorState` is the only thing that changes.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Timestamp;

// =============================================================================
// IDENTITY
// =============================================================================

/// Opaque, globally unique participant identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh anonymous id (UUID v4).
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Render color, carried on the wire as a CSS-style string (`#rrggbb`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Stable color for an id: FNV-1a of the id bytes picks the hue, saturation
    /// and lightness are fixed. Same id, same color, on every platform.
    #[must_use]
    pub fn from_id(id: &ParticipantId) -> Self {
        let hue = u16::try_from(fnv1a(id.as_str().as_bytes()) % 360).unwrap_or(0);
        let (r, g, b) = hsl_to_rgb(f64::from(hue), 0.7, 0.55);
        Self(format!("#{r:02x}{g:02x}{b:02x}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp {
        hp if hp < 1.0 => (c, x, 0.0),
        hp if hp < 2.0 => (x, c, 0.0),
        hp if hp < 3.0 => (0.0, c, x),
        hp if hp < 4.0 => (0.0, x, c),
        hp if hp < 5.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (channel(r1), channel(g1), channel(b1))
}

// =============================================================================
// POSITION
// =============================================================================

/// A resolution-independent position; both axes in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Normalize a screen-space position against the surface size, clamping
    /// into the unit square. A degenerate surface maps to the origin.
    #[must_use]
    pub fn from_screen(px: f64, py: f64, width: f64, height: f64) -> Self {
        let norm = |v: f64, extent: f64| {
            if extent > 0.0 && v.is_finite() { (v / extent).clamp(0.0, 1.0) } else { 0.0 }
        };
        Self { x: norm(px, width), y: norm(py, height) }
    }
}

// =============================================================================
// CURSOR STATE
// =============================================================================

/// Latest known state of one participant, local or remote.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorState {
    pub id: ParticipantId,
    pub x: f64,
    pub y: f64,
    pub drawing: bool,
    pub color: Color,
    pub last_update: Timestamp,
}

impl CursorState {
    /// Idle cursor at `pos`, colored from the id.
    #[must_use]
    pub fn new(id: ParticipantId, pos: Point, now: Timestamp) -> Self {
        let color = Color::from_id(&id);
        Self { id, x: pos.x, y: pos.y, drawing: false, color, last_update: now }
    }

    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[cfg(test)]
#[path = "participant_test.rs"]
mod tests;
