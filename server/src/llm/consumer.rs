//! Upstream stream consumer: pulls chunks and keeps the running text.
//!
//! DESIGN
//! ======
//! Wraps a [`ChunkStream`] so callers see each fragment exactly once while
//! the full response accumulates alongside. The sequence is not restartable:
//! after the first end or error the consumer is exhausted for good.

use futures::StreamExt;

use super::types::{ChatRequest, ChunkStream, LlmError, LlmStream};

pub struct UpstreamConsumer {
    chunks: ChunkStream,
    text: String,
    exhausted: bool,
}

impl UpstreamConsumer {
    #[must_use]
    pub fn new(chunks: ChunkStream) -> Self {
        Self { chunks, text: String::new(), exhausted: false }
    }

    /// Open a streaming request against `llm`.
    ///
    /// # Errors
    ///
    /// Propagates the provider's failure to start the stream.
    pub async fn open(llm: &dyn LlmStream, request: &ChatRequest) -> Result<Self, LlmError> {
        Ok(Self::new(llm.open_stream(request).await?))
    }

    /// Await the next fragment, appending it to the accumulated text.
    ///
    /// Returns `None` once the stream has finished or failed.
    pub async fn next_chunk(&mut self) -> Option<Result<String, LlmError>> {
        if self.exhausted {
            return None;
        }
        match self.chunks.next().await {
            Some(Ok(chunk)) => {
                self.text.push_str(&chunk);
                Some(Ok(chunk))
            }
            Some(Err(e)) => {
                self.exhausted = true;
                Some(Err(e))
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }

    /// Text accumulated so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}
