//! Hub state machine: presence registry + broadcast group.
//!
//! ```text
//! frame from conn ──► Message::decode ──┬─ Err ──────────► drop, count
//!                                       ├─ system/announce ► PresenceRegistry ─► actions
//!                                       └─ anything else ──► relay verbatim to others
//! ```
//!
//! `Hub` is synchronous. The server keeps it behind one async mutex and
//! handles each frame to completion, which preserves per-sender ordering.

use std::sync::Arc;

use sidekick_core::Message;
use tokio::sync::mpsc;

use crate::broadcast::{BroadcastGroup, BroadcastStats, ConnectionId, Frame};
use crate::presence::{PresenceAction, PresenceRegistry};

/// Hub-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    pub active_connections: usize,
    pub total_connections: u64,
    pub frames_relayed: u64,
    pub frames_dropped: u64,
    pub announces: u64,
    pub broadcast: BroadcastStats,
}

#[derive(Debug, Default)]
pub struct Hub {
    presence: PresenceRegistry,
    group: BroadcastGroup,
    total_connections: u64,
    frames_relayed: u64,
    frames_dropped: u64,
    announces: u64,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new socket. The receiver yields frames to write to it.
    pub fn connect(&mut self) -> (ConnectionId, mpsc::UnboundedReceiver<Frame>) {
        let conn = ConnectionId::new();
        let rx = self.group.join(conn);
        self.total_connections += 1;
        log::debug!("Connection {conn} joined ({} active)", self.group.len());
        (conn, rx)
    }

    /// Handle one inbound text frame from `conn`.
    pub fn handle_frame(&mut self, conn: ConnectionId, text: &str) {
        if !self.group.contains(conn) {
            log::warn!("Frame from unregistered connection {conn} dropped");
            self.frames_dropped += 1;
            return;
        }

        let message = match Message::decode(text) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Dropping malformed frame from {conn}: {e}");
                self.frames_dropped += 1;
                return;
            }
        };

        if message.is_system() {
            match message.announce_payload() {
                Ok(announce) => {
                    self.announces += 1;
                    let actions = self.presence.on_announce(conn, announce);
                    self.apply(actions);
                }
                Err(e) => {
                    log::warn!("Dropping announce from {conn}: {e}");
                    self.frames_dropped += 1;
                }
            }
            return;
        }

        let report = self.group.broadcast(Some(conn), Arc::from(text));
        self.frames_relayed += 1;
        log::debug!(
            "Relayed {} `{}` from {conn} to {} peers ({} failed)",
            message.component,
            message.kind,
            report.delivered,
            report.failed
        );
    }

    /// Unregister `conn`, announcing it offline if it never said goodbye.
    pub fn disconnect(&mut self, conn: ConnectionId) {
        if !self.group.leave(conn) {
            return;
        }
        let actions = self.presence.on_disconnect(conn);
        self.apply(actions);
        log::debug!("Connection {conn} left ({} active)", self.group.len());
    }

    fn apply(&mut self, actions: Vec<PresenceAction>) {
        for action in actions {
            match action {
                PresenceAction::SendTo(conn, message) => match message.encode() {
                    Ok(text) => {
                        self.group.send_to(conn, Arc::from(text));
                    }
                    Err(e) => log::error!("Failed to encode presence snapshot: {e}"),
                },
                PresenceAction::Broadcast { except, message } => match message.encode() {
                    Ok(text) => {
                        self.group.broadcast(Some(except), Arc::from(text));
                    }
                    Err(e) => log::error!("Failed to encode presence broadcast: {e}"),
                },
            }
        }
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            active_connections: self.group.len(),
            total_connections: self.total_connections,
            frames_relayed: self.frames_relayed,
            frames_dropped: self.frames_dropped,
            announces: self.announces,
            broadcast: self.group.stats(),
        }
    }
}
