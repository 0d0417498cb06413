//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::AuthState;
use crate::chat::{ChatConfig, ChatHub};
use crate::chatbot::ChatbotService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The single chat room.
    pub chat_hub: ChatHub,
    pub chat: Arc<ChatConfig>,
    pub chatbot: ChatbotService,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(
        chat_hub: ChatHub,
        chat: ChatConfig,
        chatbot: ChatbotService,
        auth: AuthState,
    ) -> Self {
        Self {
            chat_hub,
            chat: Arc::new(chat),
            chatbot,
            auth,
        }
    }
}
