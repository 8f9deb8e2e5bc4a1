//! Fan-out of text frames to connected sockets.
//!
//! Each connection owns an unbounded outbound queue drained by its socket
//! task. Frames are pre-encoded once and shared as `Arc<str>`, so fan-out to
//! N peers costs N pointer clones.
//!
//! A failed send (the connection task is gone) is counted and logged; it
//! never stops delivery to the remaining peers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

/// Pre-encoded text frame.
pub type Frame = Arc<str>;

/// Identity of one live socket. A peer that reconnects gets a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // first 8 hex digits
        let id = self.0.simple().to_string();
        f.write_str(&id[..8])
    }
}

/// Cumulative broadcast statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    pub frames_sent: u64,
    pub send_failures: u64,
    pub active_peers: usize,
}

/// Result of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// The set of connected sockets.
#[derive(Debug, Default)]
pub struct BroadcastGroup {
    peers: HashMap<ConnectionId, mpsc::UnboundedSender<Frame>>,
    frames_sent: u64,
    send_failures: u64,
}

impl BroadcastGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. Returns the receiver its socket task drains.
    pub fn join(&mut self, conn: ConnectionId) -> mpsc::UnboundedReceiver<Frame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers.insert(conn, tx);
        rx
    }

    /// Unregister a connection. Its receiver sees the channel close.
    pub fn leave(&mut self, conn: ConnectionId) -> bool {
        self.peers.remove(&conn).is_some()
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.peers.contains_key(&conn)
    }

    /// Queue a frame for one connection.
    pub fn send_to(&mut self, conn: ConnectionId, frame: Frame) -> bool {
        let Some(tx) = self.peers.get(&conn) else {
            log::debug!("Dropping frame for departed connection {conn}");
            return false;
        };
        if tx.send(frame).is_err() {
            log::warn!("Send to connection {conn} failed: receiver closed");
            self.send_failures += 1;
            return false;
        }
        self.frames_sent += 1;
        true
    }

    /// Queue a frame for every connection except `except`.
    pub fn broadcast(&mut self, except: Option<ConnectionId>, frame: Frame) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for (conn, tx) in &self.peers {
            if Some(*conn) == except {
                continue;
            }
            match tx.send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(_) => {
                    log::warn!("Broadcast to connection {conn} failed: receiver closed");
                    report.failed += 1;
                }
            }
        }
        self.frames_sent += report.delivered as u64;
        self.send_failures += report.failed as u64;
        report
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            frames_sent: self.frames_sent,
            send_failures: self.send_failures,
            active_peers: self.peers.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(text: &str) -> Frame {
        Arc::from(text)
    }

    #[test]
    fn test_join_leave() {
        let mut group = BroadcastGroup::new();
        let conn = ConnectionId::new();
        let _rx = group.join(conn);
        assert!(group.contains(conn));
        assert_eq!(group.len(), 1);

        assert!(group.leave(conn));
        assert!(!group.leave(conn));
        assert!(group.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        let mut group = BroadcastGroup::new();
        let (a, b, c) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());
        let mut rx_a = group.join(a);
        let mut rx_b = group.join(b);
        let mut rx_c = group.join(c);

        let report = group.broadcast(Some(a), frame("hello"));
        assert_eq!(report, BroadcastReport { delivered: 2, failed: 0 });

        assert_eq!(&*rx_b.recv().await.unwrap(), "hello");
        assert_eq!(&*rx_c.recv().await.unwrap(), "hello");
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_peer_does_not_abort_fan_out() {
        let mut group = BroadcastGroup::new();
        let (dead, live) = (ConnectionId::new(), ConnectionId::new());
        drop(group.join(dead));
        let mut rx_live = group.join(live);

        let report = group.broadcast(None, frame("x"));
        assert_eq!(report, BroadcastReport { delivered: 1, failed: 1 });
        assert_eq!(&*rx_live.recv().await.unwrap(), "x");

        let stats = group.stats();
        assert_eq!(stats.frames_sent, 1);
        assert_eq!(stats.send_failures, 1);
        assert_eq!(stats.active_peers, 2);
    }

    #[tokio::test]
    async fn test_send_to() {
        let mut group = BroadcastGroup::new();
        let conn = ConnectionId::new();
        let mut rx = group.join(conn);

        assert!(group.send_to(conn, frame("one")));
        assert!(!group.send_to(ConnectionId::new(), frame("nobody")));
        assert_eq!(&*rx.recv().await.unwrap(), "one");
    }

    #[test]
    fn test_connection_id_display() {
        let conn = ConnectionId::new();
        assert_eq!(conn.to_string().len(), 8);
        assert_ne!(conn, ConnectionId::new());
    }
}
