//! Generation backend HTTP client.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use super::decode::{ChunkDecoder, GenerationReply};
use super::error::{GenerationError, GenerationResult};
use super::types::{GenerateRequest, GenerationConfig};

/// Something that can turn a prompt into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model name recorded with each exchange.
    fn model(&self) -> &str;

    /// Provider label recorded with each exchange.
    fn provider(&self) -> &str;

    /// Generate a full completion for `prompt`.
    async fn generate(&self, prompt: &str) -> GenerationResult<GenerationReply>;
}

/// Client for an Ollama-compatible generation endpoint.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    client: Client,
    config: GenerationConfig,
}

impl GenerationClient {
    /// Create a new client. The configured timeout bounds the whole
    /// round trip, including reading a streamed body.
    pub fn new(config: GenerationConfig) -> GenerationResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(GenerationError::ClientBuild)?;

        Ok(Self { client, config })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }

    fn map_request_error(&self, url: &str, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.config.timeout_secs)
        } else {
            GenerationError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl TextGenerator for GenerationClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    fn provider(&self) -> &str {
        &self.config.provider
    }

    #[instrument(skip_all)]
    async fn generate(&self, prompt: &str) -> GenerationResult<GenerationReply> {
        let url = self.generate_url();
        debug!(model = %self.config.model, stream = self.config.stream, "calling generation backend");
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            stream: self.config.stream,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_request_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut decoder = ChunkDecoder::new();
        let mut body = response.bytes_stream();
        while let Some(bytes) = body.next().await {
            let bytes = bytes.map_err(|e| self.map_request_error(&url, e))?;
            decoder.feed(&bytes)?;
            if decoder.is_done() {
                break;
            }
        }

        let reply = decoder.finish()?;
        debug!(complete = reply.is_complete(), "generation finished");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GenerationClient::new(GenerationConfig::default()).unwrap();
        assert_eq!(client.model(), "tinyllama");
        assert_eq!(client.provider(), "ollama");
        assert_eq!(client.generate_url(), "http://localhost:11434/api/generate");
    }

    #[test]
    fn test_generate_url_trims_trailing_slash() {
        let config = GenerationConfig {
            base_url: "http://127.0.0.1:9000/".to_string(),
            ..GenerationConfig::default()
        };
        let client = GenerationClient::new(config).unwrap();
        assert_eq!(client.generate_url(), "http://127.0.0.1:9000/api/generate");
    }

    fn client_for(addr: std::net::SocketAddr, timeout_secs: u64) -> GenerationClient {
        GenerationClient::new(GenerationConfig {
            base_url: format!("http://{addr}"),
            timeout_secs,
            ..GenerationConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(addr, 5).generate("hi").await.unwrap_err();
        match err {
            GenerationError::Transport { url, .. } => {
                assert_eq!(url, format!("http://{addr}/api/generate"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_silent_backend_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and never answer.
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let err = client_for(addr, 1).generate("hi").await.unwrap_err();
        assert!(matches!(err, GenerationError::Timeout(1)), "got {err:?}");
        server.abort();
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest {
            model: "tinyllama".to_string(),
            prompt: "hi".to_string(),
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "tinyllama", "prompt": "hi", "stream": false})
        );
    }
}
