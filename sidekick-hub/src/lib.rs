//! # sidekick-hub — WebSocket relay for Sidekick sessions
//!
//! Connects one Hero (the driving program) with any number of Sidekick
//! hosts (the UIs rendering its components).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     WebSocket      ┌─────────────┐
//! │ PeerClient  │ ◄─────────────────► │ HubServer   │
//! │ (Hero)      │     JSON text       │ (relay)     │
//! └─────────────┘                     └──────┬──────┘
//! ┌─────────────┐                            │
//! │ PeerClient  │ ◄──────────────────────────┤
//! │ (Sidekick)  │                     ┌──────┴────────┐
//! └─────────────┘                     │ Hub           │
//!                                     │ ├ Presence    │
//!                                     │ └ Broadcast   │
//!                                     └───────────────┘
//! ```
//!
//! The hub never interprets component messages: it decodes each frame only
//! to reject malformed ones and to pick out presence announces, then relays
//! the original text to every other connection.
//!
//! ## Modules
//!
//! - [`broadcast`] — Fan-out of pre-encoded frames
//! - [`presence`] — Per-connection announce tracking
//! - [`hub`] — Frame routing state machine
//! - [`server`] — WebSocket listener and connection tasks
//! - [`client`] — Peer client with offline queue
//! - [`config`] — Listen address
//! - [`error`] — Hub errors

pub mod broadcast;
pub mod client;
pub mod config;
pub mod error;
pub mod hub;
pub mod presence;
pub mod server;

// Re-exports for convenience
pub use broadcast::{BroadcastGroup, BroadcastReport, BroadcastStats, ConnectionId, Frame};
pub use client::{ConnectionState, OfflineQueue, PeerClient, PeerEvent, ShutdownOutcome};
pub use config::{HubConfig, DEFAULT_PORT};
pub use error::HubError;
pub use hub::{Hub, HubStats};
pub use presence::{PresenceAction, PresenceRegistry};
pub use server::HubServer;
