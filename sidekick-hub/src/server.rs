//! WebSocket hub server.
//!
//! Architecture:
//! ```text
//! Hero ──────┐                       ┌──► Sidekick A
//!            ├── connection task ──► Hub ──┤
//! Sidekick A ┘    (select! loop)     │     └──► Sidekick B
//!                                    └── PresenceRegistry
//! ```
//!
//! One task per socket runs a `tokio::select!` over inbound frames and the
//! connection's outbound queue. Inbound frames are handed to the shared
//! [`Hub`] under its mutex; the hub never awaits while holding it.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::config::HubConfig;
use crate::error::HubError;
use crate::hub::{Hub, HubStats};

/// The hub server.
pub struct HubServer {
    config: HubConfig,
    hub: Arc<Mutex<Hub>>,
}

impl HubServer {
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            hub: Arc::new(Mutex::new(Hub::new())),
        }
    }

    /// Server on the default address (127.0.0.1:5163).
    pub fn with_defaults() -> Self {
        Self::new(HubConfig::default())
    }

    /// Bind the configured address. Failure is fatal for the caller.
    pub async fn bind(&self) -> Result<TcpListener, HubError> {
        let addr = self.config.bind_addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| HubError::Bind { addr, source })
    }

    /// Bind and serve until the listener fails.
    pub async fn run(&self) -> Result<(), HubError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), HubError> {
        let local = listener.local_addr()?;
        log::info!("Sidekick hub listening on ws://{local}");

        loop {
            let (stream, addr) = listener.accept().await?;
            log::debug!("New TCP connection from {addr}");

            let hub = self.hub.clone();
            tokio::spawn(async move {
                if let Err(e) = Self::handle_connection(stream, addr, hub).await {
                    log::warn!("Connection error from {addr}: {e}");
                }
            });
        }
    }

    /// Handle a single WebSocket connection.
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        hub: Arc<Mutex<Hub>>,
    ) -> Result<(), HubError> {
        let ws_stream = tokio_tungstenite::accept_async(stream).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let (conn, mut outbound) = hub.lock().await.connect();
        log::info!("WebSocket connection {conn} established from {addr}");

        let result = loop {
            tokio::select! {
                // Incoming WebSocket message
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => {
                            hub.lock().await.handle_frame(conn, text.as_str());
                        }
                        Some(Ok(WsMessage::Binary(data))) => {
                            log::warn!("Dropping {}-byte binary frame from {conn}", data.len());
                        }
                        Some(Ok(WsMessage::Ping(data))) => {
                            if let Err(e) = ws_sender.send(WsMessage::Pong(data)).await {
                                break Err(e.into());
                            }
                        }
                        Some(Ok(WsMessage::Close(_))) | None => {
                            log::info!("Connection {conn} closed from {addr}");
                            break Ok(());
                        }
                        Some(Err(e)) => {
                            break Err(e.into());
                        }
                        _ => {}
                    }
                }

                // Outgoing frames for this connection
                frame = outbound.recv() => {
                    let Some(frame) = frame else {
                        break Ok(());
                    };
                    if let Err(e) = ws_sender.send(WsMessage::text(frame.to_string())).await {
                        break Err(e.into());
                    }
                }
            }
        };

        // Ungraceful or not, the hub announces the departure.
        hub.lock().await.disconnect(conn);
        result
    }

    pub async fn stats(&self) -> HubStats {
        self.hub.lock().await.stats()
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_creation() {
        let server = HubServer::with_defaults();
        assert_eq!(server.config().bind_addr(), "127.0.0.1:5163");
    }

    #[tokio::test]
    async fn test_server_stats_initial() {
        let server = HubServer::with_defaults();
        let stats = server.stats().await;
        assert_eq!(stats.active_connections, 0);
        assert_eq!(stats.total_connections, 0);
        assert_eq!(stats.frames_relayed, 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_fatal() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let server = HubServer::new(HubConfig::new("127.0.0.1", port));
        match server.run().await {
            Err(HubError::Bind { addr, .. }) => assert_eq!(addr, format!("127.0.0.1:{port}")),
            other => panic!("expected bind error, got {other:?}"),
        }
    }
}
