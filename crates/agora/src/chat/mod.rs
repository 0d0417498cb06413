//! Single-room chat over WebSocket.
//!
//! Every connected client joins the same room. New members first receive
//! the recent history, then every message posted while they stay connected.

mod handler;
mod hub;
mod types;

pub use handler::{list_messages, ws_chat_handler};
pub use hub::{ChatHub, ConnectionId, HubClosed, Registration};
pub use types::{
    ChatConfig, ChatHistoryResponse, ChatMessage, InboundMessage, MAX_HISTORY_CAPACITY,
};
