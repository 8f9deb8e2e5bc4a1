//! Hub configuration.

/// Default hub port.
pub const DEFAULT_PORT: u16 = 5163;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Interface to listen on
    pub host: String,
    pub port: u16,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl HubConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port`, as passed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// WebSocket URL peers connect to.
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}
