use sidekick_core::ProtocolError;
use thiserror::Error;

/// Hub and peer-client errors.
#[derive(Debug, Error)]
pub enum HubError {
    /// The listen address could not be bound. Fatal at startup.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("offline queue is full")]
    QueueFull,
}
