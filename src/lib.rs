//! Presence and ephemeral-trail synchronization for a shared drawing surface.
//!
//! Every participant publishes a live cursor and, while drawing, leaves a
//! trail that fades to nothing over sixty seconds. Trails are never
//! persisted; peers rebuild them from the stream of cursor updates.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Ledger, remote table, local reducer, throttle, reconciler |
//! | [`session`] | Async task that drives one participant's engine |
//! | [`transport`] | Pub/sub seam with in-memory and websocket backends |
//! | [`relay`] | Axum websocket relay holding the shared presence table |
//! | [`wire`] | Wire row codec and validation |
//! | [`participant`] | Ids, colors, points, cursor state |
//! | [`clock`] | Time source trait, system and manual clocks |
//! | [`config`] | Environment-driven engine configuration |
//! | [`consts`] | Shared timing constants |

pub mod clock;
pub mod config;
pub mod consts;
pub mod engine;
pub mod participant;
pub mod relay;
pub mod session;
pub mod transport;
pub mod wire;
