//! The ask pipeline: identity, category, generation, persistence.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, instrument, warn};

use super::category::Category;
use super::error::{ChatbotError, ChatbotResult};
use super::models::{
    ASKER_ROLE, ANONYMOUS_USER_ID, ANONYMOUS_USERNAME, AiExchange, ChatbotConfig, ExchangeQuery,
    NewAiExchange,
};
use super::repository::ExchangeStore;
use crate::generation::TextGenerator;
use crate::user::UserDirectory;

/// Orchestrates one question/answer round per call.
#[derive(Clone)]
pub struct ChatbotService {
    users: Arc<dyn UserDirectory>,
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn ExchangeStore>,
    config: ChatbotConfig,
}

impl ChatbotService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn ExchangeStore>,
        config: ChatbotConfig,
    ) -> Self {
        Self {
            users,
            generator,
            store,
            config,
        }
    }

    /// Answer `question` on behalf of `username` and record the exchange.
    ///
    /// The answer is only returned once the exchange is stored. When storing
    /// fails the error still carries the answer.
    #[instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn ask(&self, username: Option<&str>, question: &str) -> ChatbotResult<String> {
        let asked_by = self.resolve_asker(username).await?;
        let category = Category::classify(question);

        let answer = self.generator.generate(question).await?.into_text();

        let exchange = NewAiExchange {
            asked_by,
            role: ASKER_ROLE.to_string(),
            category,
            content: question.to_string(),
            response: answer.clone(),
            model_name: self.generator.model().to_string(),
            provider: self.generator.provider().to_string(),
        };

        let secs = self.config.persist_timeout_secs;
        match tokio::time::timeout(Duration::from_secs(secs), self.store.save_exchange(exchange))
            .await
        {
            Ok(Ok(saved)) => {
                info!(id = saved.id, asked_by, %category, "chatbot exchange stored");
                Ok(answer)
            }
            Ok(Err(source)) => Err(ChatbotError::Persistence { answer, source }),
            Err(_) => Err(ChatbotError::PersistenceTimeout { answer, secs }),
        }
    }

    /// List stored exchanges.
    pub async fn exchanges(&self, query: ExchangeQuery) -> Result<Vec<AiExchange>> {
        self.store.list_exchanges(query).await
    }

    async fn resolve_asker(&self, username: Option<&str>) -> ChatbotResult<i64> {
        let username = match username {
            None | Some(ANONYMOUS_USERNAME) => return Ok(ANONYMOUS_USER_ID),
            Some(name) => name,
        };

        match self.users.resolve_user_id(username).await {
            Ok(id) => Ok(id),
            Err(source) if self.config.strict_identity => Err(ChatbotError::Identity {
                username: username.to_string(),
                source,
            }),
            Err(e) => {
                warn!(username, error = %e, "could not resolve asker, recording as anonymous");
                Ok(ANONYMOUS_USER_ID)
            }
        }
    }
}
