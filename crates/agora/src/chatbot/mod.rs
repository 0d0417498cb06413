//! Chatbot module: answers questions through the generation backend and
//! records every exchange.

mod category;
mod error;
mod models;
mod repository;
mod service;

pub use category::Category;
pub use error::{ChatbotError, ChatbotResult};
pub use models::{
    ANONYMOUS_USER_ID, ANONYMOUS_USERNAME, ASKER_ROLE, AiExchange, AskRequest, AskResponse,
    ChatbotConfig, ExchangeQuery, NewAiExchange,
};
pub use repository::{ExchangeRepository, ExchangeStore};
pub use service::ChatbotService;
