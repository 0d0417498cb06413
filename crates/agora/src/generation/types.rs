//! Wire types for the generation backend.

use serde::{Deserialize, Serialize};

/// Default Ollama endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default model name.
pub const DEFAULT_MODEL: &str = "tinyllama";

/// Generation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of the backend (e.g. "http://localhost:11434").
    pub base_url: String,
    /// Model to request.
    pub model: String,
    /// Provider label recorded alongside each exchange.
    pub provider: String,
    /// Ask the backend for a newline-delimited streaming reply.
    pub stream: bool,
    /// Upper bound for one full completion, in seconds.
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            provider: "ollama".to_string(),
            stream: false,
            timeout_secs: 120,
        }
    }
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

/// One reply object. A non-streaming reply is a single chunk with `done` set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateChunk {
    /// Partial (or full) generated text.
    #[serde(default)]
    pub response: String,
    /// Set on the final chunk.
    #[serde(default)]
    pub done: bool,
    /// Error reported by the backend in place of text.
    #[serde(default)]
    pub error: Option<String>,
}
