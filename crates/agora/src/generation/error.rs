//! Generation client error types.

use thiserror::Error;

/// Result type for generation operations.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Errors that can occur while asking the generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Could not reach the backend, or the connection broke mid-response.
    #[error("failed to call generation backend at {url}: {message}")]
    Transport { url: String, message: String },

    /// The backend did not answer within the configured timeout.
    #[error("generation backend timed out after {0}s")]
    Timeout(u64),

    /// The backend answered with a non-success status.
    #[error("generation backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend reported an error inside an otherwise successful response.
    #[error("generation backend error: {0}")]
    Backend(String),

    /// The response body could not be decoded.
    #[error("failed to decode generation response: {0}")]
    Decode(String),
}
