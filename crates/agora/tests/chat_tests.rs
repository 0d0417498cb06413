//! WebSocket chat integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

mod common;
use common::{BackendReply, serve, test_app};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start() -> (SocketAddr, common::TestApp) {
    let app = test_app(BackendReply::Single("unused")).await;
    let addr = serve(app.router.clone()).await;
    (addr, app)
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws/chat")).await.unwrap();
    client
}

async fn send(client: &mut Client, value: Value) {
    client
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

/// Next chat message, skipping control frames.
async fn next_message(client: &mut Client) -> Value {
    let read = async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .unwrap()
}

/// Wait until the hub has `n` members.
async fn wait_for_members(app: &common::TestApp, n: usize) {
    for _ in 0..100 {
        if app.hub.member_count().await.unwrap() == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("hub never reached {n} members");
}

#[tokio::test]
async fn test_message_is_broadcast_to_all_clients() {
    let (addr, app) = start().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    wait_for_members(&app, 2).await;

    send(
        &mut alice,
        json!({"userId": "1", "username": "alice", "text": "hello room"}),
    )
    .await;

    let seen_by_alice = next_message(&mut alice).await;
    let seen_by_bob = next_message(&mut bob).await;
    assert_eq!(seen_by_alice, seen_by_bob);
    assert_eq!(seen_by_bob["username"], "alice");
    assert_eq!(seen_by_bob["userId"], "1");
    assert_eq!(seen_by_bob["text"], "hello room");
    assert!(seen_by_bob["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(seen_by_bob["timestamp"].is_string());
}

#[tokio::test]
async fn test_late_joiner_receives_history_first() {
    let (addr, app) = start().await;
    let mut alice = connect(addr).await;
    wait_for_members(&app, 1).await;

    for text in ["one", "two"] {
        send(&mut alice, json!({"username": "alice", "text": text})).await;
        next_message(&mut alice).await;
    }

    let mut carol = connect(addr).await;
    assert_eq!(next_message(&mut carol).await["text"], "one");
    assert_eq!(next_message(&mut carol).await["text"], "two");

    wait_for_members(&app, 2).await;
    send(&mut alice, json!({"username": "alice", "text": "three"})).await;
    assert_eq!(next_message(&mut carol).await["text"], "three");
}

#[tokio::test]
async fn test_history_endpoint_matches_broadcasts() {
    let (addr, app) = start().await;
    let mut alice = connect(addr).await;
    wait_for_members(&app, 1).await;

    send(&mut alice, json!({"username": "alice", "text": "persisted?"})).await;
    let broadcast = next_message(&mut alice).await;

    let body: Value = reqwest::get(format!("http://{addr}/api/chat/messages"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0], broadcast);
}

#[tokio::test]
async fn test_malformed_frame_ends_session() {
    let (addr, app) = start().await;
    let mut mallory = connect(addr).await;
    let mut alice = connect(addr).await;
    wait_for_members(&app, 2).await;

    mallory
        .send(Message::Text("{not json".into()))
        .await
        .unwrap();
    wait_for_members(&app, 1).await;

    // The remaining member is unaffected.
    send(&mut alice, json!({"username": "alice", "text": "still here"})).await;
    assert_eq!(next_message(&mut alice).await["text"], "still here");
    assert_eq!(app.hub.history().len(), 1);
}

#[tokio::test]
async fn test_disconnect_unregisters() {
    let (addr, app) = start().await;
    let mut client = connect(addr).await;
    wait_for_members(&app, 1).await;

    client.close(None).await.unwrap();
    wait_for_members(&app, 0).await;
}

#[tokio::test]
async fn test_session_ends_when_hub_drops_member() {
    let (addr, app) = start().await;
    let mut client = connect(addr).await;
    wait_for_members(&app, 1).await;

    // The first member of a fresh hub gets id 1.
    app.hub.unregister(1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // The client has not read the server's Close yet and keeps posting.
    let _ = client
        .send(Message::Text(
            json!({"username": "mallory", "text": "still talking"})
                .to_string()
                .into(),
        ))
        .await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    app.hub.member_count().await.unwrap();
    assert!(app.hub.history().is_empty());

    let closed = async {
        loop {
            match client.next().await {
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(other)) => panic!("unexpected frame: {other:?}"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), closed)
        .await
        .unwrap();
}
