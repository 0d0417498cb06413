//! Chatbot pipeline errors.

use thiserror::Error;

use crate::generation::GenerationError;

/// Ways a single ask can fail.
#[derive(Debug, Error)]
pub enum ChatbotError {
    /// A claimed username could not be resolved while identity is strict.
    #[error("could not resolve user '{username}'")]
    Identity {
        username: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The answer was generated but could not be stored.
    #[error("failed to store exchange: {source}")]
    Persistence {
        answer: String,
        #[source]
        source: anyhow::Error,
    },

    /// Storing the exchange took longer than the configured bound.
    #[error("storing exchange timed out after {secs}s")]
    PersistenceTimeout { answer: String, secs: u64 },
}

impl ChatbotError {
    /// The generated answer, if the failure happened after generation.
    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Persistence { answer, .. } | Self::PersistenceTimeout { answer, .. } => {
                Some(answer)
            }
            _ => None,
        }
    }
}

pub type ChatbotResult<T> = std::result::Result<T, ChatbotError>;
