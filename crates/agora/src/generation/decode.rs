//! Incremental decoding of generation replies.
//!
//! The backend either answers with one JSON object or with a sequence of
//! newline-delimited objects, each carrying a fragment of the answer. Both
//! shapes are read through [`ChunkDecoder`], which accepts the body in
//! arbitrary byte slices as they arrive off the wire.

use super::error::{GenerationError, GenerationResult};
use super::types::GenerateChunk;

/// A fully received reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationReply {
    /// The backend returned a single object.
    Single(String),
    /// The backend streamed several objects. `done` is false when the stream
    /// ended without a terminal chunk.
    Stream { chunks: Vec<String>, done: bool },
}

impl GenerationReply {
    /// Collapse the reply into the answer text.
    pub fn into_text(self) -> String {
        match self {
            Self::Single(text) => text,
            Self::Stream { chunks, .. } => chunks.concat(),
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Self::Single(_) => true,
            Self::Stream { done, .. } => *done,
        }
    }
}

/// Accumulates reply chunks from a byte stream.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    buffer: Vec<u8>,
    chunks: Vec<String>,
    done: bool,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the terminal chunk has been seen. Later input is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed the next slice of the body.
    pub fn feed(&mut self, bytes: &[u8]) -> GenerationResult<()> {
        if self.done {
            return Ok(());
        }
        self.buffer.extend_from_slice(bytes);

        let (parsed, consumed) = {
            let mut stream =
                serde_json::Deserializer::from_slice(&self.buffer).into_iter::<GenerateChunk>();
            let mut parsed = Vec::new();
            let mut consumed = 0;
            loop {
                match stream.next() {
                    Some(Ok(chunk)) => {
                        consumed = stream.byte_offset();
                        let done = chunk.done;
                        parsed.push(chunk);
                        if done {
                            break;
                        }
                    }
                    // Partial object at the end of the buffer: wait for more bytes.
                    Some(Err(e)) if e.is_eof() => break,
                    Some(Err(e)) => return Err(GenerationError::Decode(e.to_string())),
                    None => {
                        consumed = stream.byte_offset();
                        break;
                    }
                }
            }
            (parsed, consumed)
        };

        self.buffer.drain(..consumed);
        for chunk in parsed {
            self.accept(chunk)?;
        }
        Ok(())
    }

    fn accept(&mut self, chunk: GenerateChunk) -> GenerationResult<()> {
        if let Some(message) = chunk.error {
            return Err(GenerationError::Backend(message));
        }
        self.chunks.push(chunk.response);
        self.done = chunk.done;
        Ok(())
    }

    /// Finish decoding once the body has ended.
    pub fn finish(self) -> GenerationResult<GenerationReply> {
        if !self.done && self.buffer.iter().any(|b| !b.is_ascii_whitespace()) {
            return Err(GenerationError::Decode(
                "response ended inside a JSON object".to_string(),
            ));
        }

        match self.chunks.len() {
            0 => Err(GenerationError::Decode("empty response body".to_string())),
            1 => Ok(GenerationReply::Single(
                self.chunks.into_iter().next().unwrap_or_default(),
            )),
            _ => Ok(GenerationReply::Stream {
                chunks: self.chunks,
                done: self.done,
            }),
        }
    }
}
