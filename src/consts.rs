//! Shared timing constants for the trail engine.

// ── Decay ───────────────────────────────────────────────────────

/// Seconds after creation at which a trail segment is fully transparent and
/// eligible for pruning.
pub const FADE_WINDOW: f64 = 60.0;

// ── Publication ─────────────────────────────────────────────────

/// Default minimum spacing between position-only publishes, in milliseconds.
pub const DEFAULT_PUBLISH_INTERVAL_MS: u64 = 40;

/// Lower edge of the recommended publish interval range, in milliseconds.
pub const MIN_RECOMMENDED_PUBLISH_INTERVAL_MS: u64 = 30;

/// Upper edge of the recommended publish interval range, in milliseconds.
pub const MAX_RECOMMENDED_PUBLISH_INTERVAL_MS: u64 = 60;

// ── Presence ────────────────────────────────────────────────────

/// Default seconds of silence after which a remote participant is evicted.
///
/// Longer than [`FADE_WINDOW`]: an idle participant keeps their cursor after
/// their last trail has faded.
pub const DEFAULT_STALE_AFTER_SECS: f64 = 120.0;

/// The staleness threshold must be at least this many publish intervals.
pub const STALE_INTERVAL_MULTIPLIER: f64 = 3.0;

// ── Session ─────────────────────────────────────────────────────

/// Default capacity of the session command queue.
pub const DEFAULT_COMMAND_QUEUE: usize = 256;

/// Interval of the session's background prune and evict pass, in milliseconds.
pub const HOUSEKEEPING_INTERVAL_MS: u64 = 1_000;
