//! Peer presence tracking for the hub.
//!
//! ## Lifecycle (per socket)
//!
//! ```text
//!            announce(online)              announce(offline)
//! unknown ──────────────────────► online ───────────────────► offline
//!    ▲        snapshot → new peer    │      broadcast to others    │
//!    │        broadcast to others    │                             │
//!    │                               └──── socket closed ──────────┤
//!    │                                 synthesize offline,         │
//!    │                                 broadcast once              ▼
//!    └─────────────────────── re-announce online ─────────── (record kept
//!                                                             until close)
//! ```
//!
//! Transitions are pure: they update the records and return the
//! [`PresenceAction`]s the caller must deliver. Nothing here touches a socket.

use std::collections::HashMap;

use sidekick_core::{AnnouncePayload, Message};

use crate::broadcast::ConnectionId;

/// Outbound effect of a presence transition.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceAction {
    /// Deliver to one connection.
    SendTo(ConnectionId, Message),
    /// Deliver to every connection except `except`.
    Broadcast { except: ConnectionId, message: Message },
}

/// Latest announce of every connection that has announced.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    records: HashMap<ConnectionId, AnnouncePayload>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an announce received on `conn`.
    pub fn on_announce(&mut self, conn: ConnectionId, announce: AnnouncePayload) -> Vec<PresenceAction> {
        let mut actions = Vec::new();
        let previous = match self.records.get(&conn) {
            // Same socket, new identity: the old peer is gone.
            Some(prev) if prev.peer_id != announce.peer_id => {
                if prev.is_online() {
                    log::info!(
                        "Connection {conn} switched from peer {} to {}, announcing {} offline",
                        prev.peer_id,
                        announce.peer_id,
                        prev.peer_id
                    );
                    actions.push(PresenceAction::Broadcast {
                        except: conn,
                        message: Message::announce(&prev.to_offline()),
                    });
                }
                None
            }
            other => other,
        };

        if announce.is_online() {
            let newly_online = !previous.is_some_and(AnnouncePayload::is_online);
            if newly_online {
                actions.extend(
                    self.online_peers_except(conn)
                        .into_iter()
                        .map(|peer| PresenceAction::SendTo(conn, Message::announce(peer))),
                );
            }
            log::info!(
                "Peer {} ({:?}) online on connection {conn}",
                announce.peer_id,
                announce.role
            );
        } else {
            if previous.is_some_and(|p| !p.is_online() && p.peer_id == announce.peer_id) {
                log::debug!("Peer {} already offline, ignoring repeat", announce.peer_id);
                return actions;
            }
            log::info!("Peer {} offline on connection {conn}", announce.peer_id);
        }

        actions.push(PresenceAction::Broadcast {
            except: conn,
            message: Message::announce(&announce),
        });
        self.records.insert(conn, announce);
        actions
    }

    /// Forget `conn`. An online record is announced offline to everyone else.
    pub fn on_disconnect(&mut self, conn: ConnectionId) -> Vec<PresenceAction> {
        let Some(record) = self.records.remove(&conn) else {
            return Vec::new();
        };
        if !record.is_online() {
            return Vec::new();
        }

        let offline = record.to_offline();
        log::info!("Peer {} dropped with connection {conn}, announcing offline", offline.peer_id);
        vec![PresenceAction::Broadcast {
            except: conn,
            message: Message::announce(&offline),
        }]
    }

    /// Last announce of every online connection, ordered by peer id.
    pub fn online_peers(&self) -> Vec<&AnnouncePayload> {
        let mut peers: Vec<&AnnouncePayload> = self.records.values().filter(|a| a.is_online()).collect();
        peers.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));
        peers
    }

    fn online_peers_except(&self, conn: ConnectionId) -> Vec<&AnnouncePayload> {
        let mut peers: Vec<&AnnouncePayload> = self
            .records
            .iter()
            .filter(|(c, a)| **c != conn && a.is_online())
            .map(|(_, a)| a)
            .collect();
        peers.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));
        peers
    }

    pub fn record(&self, conn: ConnectionId) -> Option<&AnnouncePayload> {
        self.records.get(&conn)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidekick_core::{PeerRole, PeerStatus};

    fn online(peer_id: &str, role: PeerRole) -> AnnouncePayload {
        AnnouncePayload::now(peer_id, role, PeerStatus::Online, "test")
    }

    fn announced(action: &PresenceAction) -> AnnouncePayload {
        match action {
            PresenceAction::SendTo(_, m) | PresenceAction::Broadcast { message: m, .. } => {
                m.announce_payload().unwrap()
            }
        }
    }

    #[test]
    fn test_first_peer_gets_empty_snapshot() {
        let mut registry = PresenceRegistry::new();
        let conn = ConnectionId::new();
        let actions = registry.on_announce(conn, online("hero", PeerRole::Hero));

        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], PresenceAction::Broadcast { except, .. } if *except == conn));
        assert_eq!(registry.online_peers().len(), 1);
    }

    #[test]
    fn test_second_peer_snapshot_includes_first() {
        let mut registry = PresenceRegistry::new();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        registry.on_announce(a, online("sidekick-1", PeerRole::Sidekick));
        let actions = registry.on_announce(b, online("hero", PeerRole::Hero));

        assert_eq!(actions.len(), 2);
        match &actions[0] {
            PresenceAction::SendTo(to, _) => assert_eq!(*to, b),
            other => panic!("expected snapshot, got {other:?}"),
        }
        assert_eq!(announced(&actions[0]).peer_id, "sidekick-1");
        assert_eq!(announced(&actions[1]).peer_id, "hero");
    }

    #[test]
    fn test_snapshot_skips_offline_peers() {
        let mut registry = PresenceRegistry::new();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        let first = online("sidekick-1", PeerRole::Sidekick);
        registry.on_announce(a, first.clone());
        registry.on_announce(a, first.to_offline());

        let actions = registry.on_announce(b, online("hero", PeerRole::Hero));
        assert_eq!(actions.len(), 1);
        assert_eq!(registry.record(a).map(|r| r.status), Some(PeerStatus::Offline));
    }

    #[test]
    fn test_repeat_online_announce_skips_snapshot() {
        let mut registry = PresenceRegistry::new();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        registry.on_announce(a, online("sidekick-1", PeerRole::Sidekick));
        registry.on_announce(b, online("hero", PeerRole::Hero));

        let actions = registry.on_announce(b, online("hero", PeerRole::Hero));
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], PresenceAction::Broadcast { .. }));
    }

    #[test]
    fn test_graceful_offline_then_close_announces_once() {
        let mut registry = PresenceRegistry::new();
        let conn = ConnectionId::new();
        let peer = online("sidekick-1", PeerRole::Sidekick);
        registry.on_announce(conn, peer.clone());

        let actions = registry.on_announce(conn, peer.to_offline());
        assert_eq!(actions.len(), 1);
        assert_eq!(announced(&actions[0]).status, PeerStatus::Offline);

        assert!(registry.on_announce(conn, peer.to_offline()).is_empty());
        assert!(registry.on_disconnect(conn).is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ungraceful_close_synthesizes_offline() {
        let mut registry = PresenceRegistry::new();
        let conn = ConnectionId::new();
        registry.on_announce(conn, online("sidekick-1", PeerRole::Sidekick));

        let actions = registry.on_disconnect(conn);
        assert_eq!(actions.len(), 1);
        let offline = announced(&actions[0]);
        assert_eq!(offline.peer_id, "sidekick-1");
        assert_eq!(offline.status, PeerStatus::Offline);

        assert!(registry.on_disconnect(conn).is_empty());
    }

    #[test]
    fn test_identity_change_announces_previous_peer_offline() {
        let mut registry = PresenceRegistry::new();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        registry.on_announce(a, online("hero", PeerRole::Hero));
        registry.on_announce(b, online("sidekick-1", PeerRole::Sidekick));

        let actions = registry.on_announce(b, online("sidekick-2", PeerRole::Sidekick));
        assert_eq!(actions.len(), 3);
        let dropped = announced(&actions[0]);
        assert_eq!(dropped.peer_id, "sidekick-1");
        assert_eq!(dropped.status, PeerStatus::Offline);
        assert!(matches!(actions[1], PresenceAction::SendTo(to, _) if to == b));
        assert_eq!(announced(&actions[2]).peer_id, "sidekick-2");

        let offline = registry.on_announce(b, online("sidekick-3", PeerRole::Sidekick).to_offline());
        let statuses: Vec<(String, PeerStatus)> = offline
            .iter()
            .map(announced)
            .map(|a| (a.peer_id, a.status))
            .collect();
        assert_eq!(
            statuses,
            [
                ("sidekick-2".to_string(), PeerStatus::Offline),
                ("sidekick-3".to_string(), PeerStatus::Offline),
            ]
        );
        assert!(registry.on_disconnect(b).is_empty());
    }

    #[test]
    fn test_silent_connection_disconnect() {
        let mut registry = PresenceRegistry::new();
        assert!(registry.on_disconnect(ConnectionId::new()).is_empty());
    }

    #[test]
    fn test_reannounce_after_offline_gets_snapshot() {
        let mut registry = PresenceRegistry::new();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        registry.on_announce(a, online("hero", PeerRole::Hero));
        let peer = online("sidekick-1", PeerRole::Sidekick);
        registry.on_announce(b, peer.clone());
        registry.on_announce(b, peer.to_offline());

        let actions = registry.on_announce(b, online("sidekick-1", PeerRole::Sidekick));
        assert_eq!(actions.len(), 2);
        assert_eq!(announced(&actions[0]).peer_id, "hero");
    }
}
