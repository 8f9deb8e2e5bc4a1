//! WebSocket peer client used by Hero drivers and Sidekick hosts.
//!
//! Provides:
//! - Connection lifecycle (connect, announce online, shutdown with grace)
//! - Message send with an offline queue while disconnected
//! - Presence and message events for the application

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use sidekick_core::{AnnouncePayload, Message, PeerRole, PeerStatus};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::error::HubError;

/// Client connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Forcibly torn down after a shutdown grace period expired
    Terminated,
}

/// Events emitted by the peer client.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// Connection established
    Connected,
    /// Connection lost or closed
    Disconnected,
    /// Another peer announced itself
    Presence(AnnouncePayload),
    /// Any other message relayed by the hub
    Message(Message),
}

/// How [`PeerClient::shutdown`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Offline announce and close frame were flushed in time.
    Graceful,
    /// The grace period expired and the connection tasks were aborted.
    Terminated,
}

/// Messages sent while disconnected, replayed on the next connect.
pub struct OfflineQueue {
    queue: VecDeque<Message>,
    max_size: usize,
}

impl OfflineQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    /// Queue a message. Returns false when full.
    pub fn enqueue(&mut self, message: Message) -> bool {
        if self.queue.len() >= self.max_size {
            return false;
        }
        self.queue.push_back(message);
        true
    }

    /// Take every queued message, oldest first.
    pub fn drain(&mut self) -> Vec<Message> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

/// A peer connection to the hub.
pub struct PeerClient {
    /// Identity announced on connect
    peer_id: String,
    role: PeerRole,
    version: String,

    state: Arc<RwLock<ConnectionState>>,
    offline_queue: Arc<Mutex<OfflineQueue>>,

    /// Channel to the WebSocket writer task
    outgoing_tx: Option<mpsc::UnboundedSender<WsMessage>>,

    event_rx: Option<mpsc::Receiver<PeerEvent>>,
    event_tx: mpsc::Sender<PeerEvent>,

    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,

    url: String,
}

impl PeerClient {
    pub fn new(peer_id: impl Into<String>, role: PeerRole, url: impl Into<String>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        Self {
            peer_id: peer_id.into(),
            role,
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            offline_queue: Arc::new(Mutex::new(OfflineQueue::new(10_000))),
            outgoing_tx: None,
            event_rx: Some(event_rx),
            event_tx,
            writer: None,
            reader: None,
            url: url.into(),
        }
    }

    /// Take the event receiver (can only be called once).
    pub fn take_event_rx(&mut self) -> Option<mpsc::Receiver<PeerEvent>> {
        self.event_rx.take()
    }

    fn announce(&self, status: PeerStatus) -> Message {
        Message::announce(&AnnouncePayload::now(
            self.peer_id.clone(),
            self.role,
            status,
            self.version.clone(),
        ))
    }

    /// Connect, announce online and replay the offline queue.
    pub async fn connect(&mut self) -> Result<(), HubError> {
        *self.state.write().await = ConnectionState::Connecting;

        let ws_stream = match tokio_tungstenite::connect_async(self.url.as_str()).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(e.into());
            }
        };
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        // Writer task: forward the outgoing channel to the socket
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WsMessage>();
        self.writer = Some(tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let closing = msg.is_close();
                if ws_writer.send(msg).await.is_err() || closing {
                    break;
                }
            }
        }));

        out_tx
            .send(WsMessage::text(self.announce(PeerStatus::Online).encode()?))
            .map_err(|_| HubError::ConnectionClosed)?;

        let queued = self.offline_queue.lock().await.drain();
        if !queued.is_empty() {
            log::info!("Replaying {} queued messages", queued.len());
        }
        for message in queued {
            out_tx
                .send(WsMessage::text(message.encode()?))
                .map_err(|_| HubError::ConnectionClosed)?;
        }
        self.outgoing_tx = Some(out_tx);

        *self.state.write().await = ConnectionState::Connected;
        self.emit(PeerEvent::Connected);

        // Reader task: turn inbound frames into events
        let event_tx = self.event_tx.clone();
        let state = self.state.clone();
        self.reader = Some(tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        let event = match Message::decode(text.as_str()) {
                            Ok(message) if message.is_system() => match message.announce_payload() {
                                Ok(announce) => PeerEvent::Presence(announce),
                                Err(e) => {
                                    log::warn!("Ignoring bad announce from hub: {e}");
                                    continue;
                                }
                            },
                            Ok(message) => PeerEvent::Message(message),
                            Err(e) => {
                                log::warn!("Ignoring malformed frame from hub: {e}");
                                continue;
                            }
                        };
                        if event_tx.send(event).await.is_err() {
                            log::debug!("Event receiver dropped");
                        }
                    }
                    Ok(WsMessage::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }

            // Connection lost
            let mut state = state.write().await;
            if *state != ConnectionState::Terminated {
                *state = ConnectionState::Disconnected;
            }
            drop(state);
            let _ = event_tx.send(PeerEvent::Disconnected).await;
        }));

        log::info!("Peer {} connected to {}", self.peer_id, self.url);
        Ok(())
    }

    /// Lifecycle events never wait on a full event channel.
    fn emit(&self, event: PeerEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            log::warn!("Peer {} dropped lifecycle event: {e}", self.peer_id);
        }
    }

    /// Send a message to the hub, or queue it while disconnected.
    pub async fn send(&self, message: &Message) -> Result<(), HubError> {
        let state = *self.state.read().await;
        let tx = match (&self.outgoing_tx, state) {
            (Some(tx), ConnectionState::Connected) => tx,
            _ => {
                let mut queue = self.offline_queue.lock().await;
                if !queue.enqueue(message.clone()) {
                    return Err(HubError::QueueFull);
                }
                return Ok(());
            }
        };

        let text = message.encode()?;
        tx.send(WsMessage::text(text)).map_err(|_| HubError::ConnectionClosed)
    }

    /// Announce offline, close the socket and wait up to `grace` for the
    /// connection tasks to finish. On timeout they are aborted.
    pub async fn shutdown(&mut self, grace: Duration) -> ShutdownOutcome {
        let deadline = Instant::now() + grace;
        if let Some(tx) = self.outgoing_tx.take() {
            match self.announce(PeerStatus::Offline).encode() {
                Ok(text) => {
                    let _ = tx.send(WsMessage::text(text));
                }
                Err(e) => log::error!("Failed to encode offline announce: {e}"),
            }
            let _ = tx.send(WsMessage::Close(None));
        }

        let writer_done = match self.writer.take() {
            Some(writer) => join_within(writer, grace).await,
            None => true,
        };

        if !writer_done {
            if let Some(reader) = self.reader.take() {
                reader.abort();
            }
            *self.state.write().await = ConnectionState::Terminated;
            self.emit(PeerEvent::Disconnected);
            log::warn!("Peer {} did not shut down within {grace:?}, terminated", self.peer_id);
            return ShutdownOutcome::Terminated;
        }

        if let Some(reader) = self.reader.take() {
            join_within(reader, deadline.saturating_duration_since(Instant::now())).await;
        }
        *self.state.write().await = ConnectionState::Disconnected;
        log::info!("Peer {} disconnected", self.peer_id);
        ShutdownOutcome::Graceful
    }

    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn role(&self) -> PeerRole {
        self.role
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn offline_queue_len(&self) -> usize {
        self.offline_queue.lock().await.len()
    }
}

/// Wait for `task` up to `grace`; abort it on timeout. Returns whether it finished.
async fn join_within(task: JoinHandle<()>, grace: Duration) -> bool {
    let abort = task.abort_handle();
    match tokio::time::timeout(grace, task).await {
        Ok(_) => true,
        Err(_) => {
            abort.abort();
            false
        }
    }
}
