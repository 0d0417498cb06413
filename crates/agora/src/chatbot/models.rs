//! Chatbot data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::category::Category;

/// Username that callers without an identity present as.
pub const ANONYMOUS_USERNAME: &str = "anonymous";

/// User id recorded for anonymous or unresolved askers.
pub const ANONYMOUS_USER_ID: i64 = 0;

/// Role stored on exchanges asked through the API.
pub const ASKER_ROLE: &str = "user";

/// A stored question/answer round.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AiExchange {
    pub id: i64,
    /// User id of the asker, or `ANONYMOUS_USER_ID`.
    pub asked_by: i64,
    pub role: String,
    pub category: Option<String>,
    /// The question.
    pub content: String,
    /// The generated answer.
    pub response: Option<String>,
    pub model_name: String,
    pub provider: String,
    pub created_at: String,
}

/// Input for storing a new exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAiExchange {
    pub asked_by: i64,
    pub role: String,
    pub category: Category,
    pub content: String,
    pub response: String,
    pub model_name: String,
    pub provider: String,
}

/// Filters for listing exchanges.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangeQuery {
    pub category: Option<Category>,
    pub asked_by: Option<i64>,
    pub limit: Option<i64>,
}

/// Chatbot behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatbotConfig {
    /// Reject questions from a claimed username that cannot be resolved,
    /// instead of recording them as anonymous.
    pub strict_identity: bool,
    /// Upper bound for storing one exchange, in seconds.
    pub persist_timeout_secs: u64,
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self {
            strict_identity: false,
            persist_timeout_secs: 10,
        }
    }
}

/// Body of `POST /api/chatbot/ask`.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub query_message: String,
}

/// Payload returned for a successful ask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub response: String,
}
