//! WebSocket and history handlers for the chat room.

use std::time::Duration;

use axum::{
    Json,
    body::Bytes,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::api::AppState;

use super::hub::ChatHub;
use super::types::{ChatHistoryResponse, ChatMessage, InboundMessage};

/// WebSocket upgrade handler.
///
/// GET /ws/chat
pub async fn ws_chat_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let hub = state.chat_hub.clone();
    let ping_interval = Duration::from_secs(state.chat.ping_interval_secs.max(1));
    ws.on_upgrade(move |socket| handle_chat_connection(socket, hub, ping_interval))
}

/// Current room history.
///
/// GET /api/chat/messages
pub async fn list_messages(State(state): State<AppState>) -> Json<ChatHistoryResponse> {
    Json(ChatHistoryResponse {
        data: state.chat_hub.history(),
    })
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ChatMessage,
) -> Result<(), ()> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize chat message: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}

fn parse_frame(frame: Message) -> Option<Result<InboundMessage, serde_json::Error>> {
    match frame {
        Message::Text(text) => Some(serde_json::from_str(text.as_str())),
        Message::Binary(data) => Some(serde_json::from_slice(&data)),
        _ => None,
    }
}

/// Serve one chat connection until it closes, sends something unreadable,
/// or stops being delivered to.
async fn handle_chat_connection(socket: WebSocket, hub: ChatHub, ping_interval: Duration) {
    let registration = match hub.register().await {
        Ok(registration) => registration,
        Err(e) => {
            warn!("Rejecting chat connection: {}", e);
            return;
        }
    };
    let connection = registration.id;
    let mut receiver = registration.receiver;
    let history = registration.history;

    let (mut sender, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        for message in &history {
            if send_message(&mut sender, message).await.is_err() {
                return;
            }
        }

        let mut ping = tokio::time::interval(ping_interval);
        ping.tick().await;

        loop {
            tokio::select! {
                message = receiver.recv() => {
                    let Some(message) = message else {
                        // Removed from the hub.
                        break;
                    };
                    if send_message(&mut sender, &message).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sender.close().await;
    });

    loop {
        // Once the writer is gone (client too slow, or removed from the hub)
        // nothing more is read from this client.
        let frame = tokio::select! {
            frame = stream.next() => frame,
            _ = &mut send_task => {
                debug!(connection, "chat writer finished, ending session");
                break;
            }
        };
        let Some(frame) = frame else {
            break;
        };
        let frame = match frame {
            Ok(Message::Close(_)) => break,
            Ok(frame) => frame,
            Err(e) => {
                debug!(connection, "chat read failed: {}", e);
                break;
            }
        };

        match parse_frame(frame) {
            Some(Ok(inbound)) => {
                if hub.broadcast(ChatMessage::stamp(inbound)).await.is_err() {
                    break;
                }
            }
            Some(Err(e)) => {
                debug!(connection, "malformed chat frame, closing: {}", e);
                break;
            }
            None => {}
        }
    }

    hub.unregister(connection).await;
    send_task.abort();
    info!(connection, "chat connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_and_binary_frames() {
        let text = Message::Text(r#"{"username":"a","text":"hi"}"#.into());
        let inbound = parse_frame(text).unwrap().unwrap();
        assert_eq!(inbound.text, "hi");

        let binary = Message::Binary(Bytes::from_static(br#"{"text":"bin"}"#));
        assert_eq!(parse_frame(binary).unwrap().unwrap().text, "bin");
    }

    #[test]
    fn test_parse_rejects_malformed_and_skips_control() {
        assert!(parse_frame(Message::Text("not json".into())).unwrap().is_err());
        assert!(parse_frame(Message::Ping(Bytes::new())).is_none());
        assert!(parse_frame(Message::Pong(Bytes::new())).is_none());
    }
}
