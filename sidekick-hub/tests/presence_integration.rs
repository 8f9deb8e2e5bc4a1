//! Integration tests for peer presence across real sockets.

use std::sync::Arc;

use futures_util::SinkExt;
use sidekick_core::{AnnouncePayload, Message, PeerRole, PeerStatus, SidekickSession};
use sidekick_hub::{ConnectionState, HubConfig, HubServer, PeerClient, PeerEvent, ShutdownOutcome};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::Message as WsMessage;

async fn start_test_server() -> (Arc<HubServer>, u16) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = Arc::new(HubServer::new(HubConfig::new("127.0.0.1", port)));
    let serving = server.clone();
    tokio::spawn(async move {
        let _ = serving.serve(listener).await;
    });
    (server, port)
}

async fn wait_for_announces(server: &HubServer, count: u64) {
    timeout(Duration::from_secs(2), async {
        while server.stats().await.announces < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("announces should arrive");
}

async fn next_presence(events: &mut mpsc::Receiver<PeerEvent>) -> AnnouncePayload {
    timeout(Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Some(PeerEvent::Presence(announce)) => return announce,
                Some(_) => continue,
                None => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("presence should arrive")
}

/// Collect presence events until the channel stays quiet for `quiet`.
async fn remaining_presence(events: &mut mpsc::Receiver<PeerEvent>, quiet: Duration) -> Vec<AnnouncePayload> {
    let mut seen = Vec::new();
    while let Ok(Some(event)) = timeout(quiet, events.recv()).await {
        if let PeerEvent::Presence(announce) = event {
            seen.push(announce);
        }
    }
    seen
}

async fn connected_peer(id: &str, role: PeerRole, port: u16) -> (PeerClient, mpsc::Receiver<PeerEvent>) {
    let mut client = PeerClient::new(id, role, format!("ws://127.0.0.1:{port}"));
    let events = client.take_event_rx().unwrap();
    client.connect().await.unwrap();
    (client, events)
}

#[tokio::test]
async fn test_presence_round_trip() {
    let (server, port) = start_test_server().await;
    let (_sidekick, mut sidekick_events) = connected_peer("sidekick-1", PeerRole::Sidekick, port).await;
    wait_for_announces(&server, 1).await;

    let (_hero, mut hero_events) = connected_peer("hero", PeerRole::Hero, port).await;

    // Late joiner gets a snapshot of who is already online.
    let snapshot = next_presence(&mut hero_events).await;
    assert_eq!(snapshot.peer_id, "sidekick-1");
    assert_eq!(snapshot.role, PeerRole::Sidekick);
    assert!(snapshot.is_online());

    let joined = next_presence(&mut sidekick_events).await;
    assert_eq!(joined.peer_id, "hero");
    assert_eq!(joined.status, PeerStatus::Online);

    let mut session = SidekickSession::with_builtins();
    session.handle_message(&Message::announce(&joined));
    assert!(session.state().hero_online());
}

#[tokio::test]
async fn test_ungraceful_close_announces_offline_once() {
    let (server, port) = start_test_server().await;
    let (_sidekick, mut sidekick_events) = connected_peer("sidekick-1", PeerRole::Sidekick, port).await;
    wait_for_announces(&server, 1).await;

    let (mut raw, _) = tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{port}"))
        .await
        .unwrap();
    let online = AnnouncePayload::now("hero", PeerRole::Hero, PeerStatus::Online, "test");
    raw.send(WsMessage::text(Message::announce(&online).encode().unwrap()))
        .await
        .unwrap();
    assert_eq!(next_presence(&mut sidekick_events).await.status, PeerStatus::Online);

    // Drop the socket without a close frame.
    drop(raw);

    let offline = next_presence(&mut sidekick_events).await;
    assert_eq!(offline.peer_id, "hero");
    assert_eq!(offline.status, PeerStatus::Offline);
    assert!(remaining_presence(&mut sidekick_events, Duration::from_millis(200)).await.is_empty());
    assert_eq!(server.stats().await.active_connections, 1);
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let (server, port) = start_test_server().await;
    let (_sidekick, mut sidekick_events) = connected_peer("sidekick-1", PeerRole::Sidekick, port).await;
    wait_for_announces(&server, 1).await;

    let (mut hero, _hero_events) = connected_peer("hero", PeerRole::Hero, port).await;
    assert_eq!(next_presence(&mut sidekick_events).await.status, PeerStatus::Online);

    let outcome = hero.shutdown(Duration::from_secs(2)).await;
    assert_eq!(outcome, ShutdownOutcome::Graceful);
    assert_eq!(hero.connection_state().await, ConnectionState::Disconnected);

    let offline = next_presence(&mut sidekick_events).await;
    assert_eq!(offline.peer_id, "hero");
    assert_eq!(offline.status, PeerStatus::Offline);

    // The socket closing after the goodbye must not repeat it.
    assert!(remaining_presence(&mut sidekick_events, Duration::from_millis(200)).await.is_empty());
}
