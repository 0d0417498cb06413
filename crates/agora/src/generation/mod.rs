//! Text-generation backend client.
//!
//! Talks to an Ollama-compatible `/api/generate` endpoint and normalizes both
//! single-object and newline-delimited streaming replies into one answer.

mod client;
mod decode;
mod error;
mod types;

pub use client::{GenerationClient, TextGenerator};
pub use decode::{ChunkDecoder, GenerationReply};
pub use error::{GenerationError, GenerationResult};
pub use types::{GenerateChunk, GenerateRequest, GenerationConfig};
