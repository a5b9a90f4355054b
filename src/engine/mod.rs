//! Presence and trail synchronization engine.
//!
//! ARCHITECTURE
//! ============
//! Pure, synchronous state containers with no I/O:
//!
//! - [`ledger`]: trail segments with derived alpha and expiry
//! - [`table`]: latest state per remote participant, staleness eviction
//! - [`reducer`]: pointer samples into local state and local segments
//! - [`throttle`]: pacing of outbound local state
//! - [`reconciler`]: owns the three containers and builds render snapshots
//!
//! Nothing here locks. The session loop owns one `Reconciler` and serializes
//! every mutation through its command channel.

pub mod ledger;
pub mod reconciler;
pub mod reducer;
pub mod table;
pub mod throttle;

pub use ledger::{SegmentLedger, TrailSegment};
pub use reconciler::{BatchSummary, Reconciler, RemoteOutcome, RenderSnapshot, VisibleSegment};
pub use reducer::{InputState, LocalReducer, PointerKind, PointerSample, ReducerOutcome};
pub use table::{RemoteTable, Upsert};
pub use throttle::Throttler;
