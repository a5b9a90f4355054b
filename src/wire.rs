//! Wire row exchanged with the realtime transport.
//!
//! DESIGN
//! ======
//! One row per participant, six fields, JSON. Inbound rows arrive as raw
//! `serde_json::Value`s so each row is validated on its own: a bad row is
//! rejected with a [`WireError`] and the caller drops it without touching any
//! other participant. Unknown extra fields are ignored on input and never
//! emitted.

use serde::{Deserialize, Serialize};

use crate::participant::{Color, CursorState, ParticipantId};

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed row: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("empty participant id")]
    EmptyId,
    #[error("empty color for participant {0}")]
    EmptyColor(String),
    #[error("coordinate {axis}={value} out of range [0, 1]")]
    OutOfRange { axis: &'static str, value: f64 },
    #[error("non-finite timestamp for participant {0}")]
    BadTimestamp(String),
}

// =============================================================================
// WIRE ROW
// =============================================================================

/// `{ id, x, y, color, drawing, timestamp }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireUpdate {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub drawing: bool,
    pub timestamp: f64,
}

impl WireUpdate {
    /// Encode a cursor state for publication.
    #[must_use]
    pub fn from_state(state: &CursorState) -> Self {
        Self {
            id: state.id.as_str().to_owned(),
            x: state.x,
            y: state.y,
            color: state.color.as_str().to_owned(),
            drawing: state.drawing,
            timestamp: state.last_update,
        }
    }

    /// Decode and validate one inbound row.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Malformed`] when a field is missing or mistyped,
    /// and a specific variant when a field is present but invalid.
    pub fn parse(row: &serde_json::Value) -> Result<CursorState, WireError> {
        let update = Self::deserialize(row)?;
        update.into_state()
    }

    /// Validate and convert into a `CursorState`.
    ///
    /// # Errors
    ///
    /// Returns a [`WireError`] naming the first invalid field.
    pub fn into_state(self) -> Result<CursorState, WireError> {
        if self.id.is_empty() {
            return Err(WireError::EmptyId);
        }
        if self.color.is_empty() {
            return Err(WireError::EmptyColor(self.id));
        }
        check_unit("x", self.x)?;
        check_unit("y", self.y)?;
        if !self.timestamp.is_finite() {
            return Err(WireError::BadTimestamp(self.id));
        }
        Ok(CursorState {
            id: ParticipantId::new(self.id),
            x: self.x,
            y: self.y,
            drawing: self.drawing,
            color: Color::new(self.color),
            last_update: self.timestamp,
        })
    }

    /// JSON value form, as written to the transport.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "x": self.x,
            "y": self.y,
            "color": self.color,
            "drawing": self.drawing,
            "timestamp": self.timestamp,
        })
    }
}

fn check_unit(axis: &'static str, value: f64) -> Result<(), WireError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(WireError::OutOfRange { axis, value })
    }
}

#[cfg(test)]
#[path = "wire_test.rs"]
mod tests;
