//! LLM: multi-provider streaming adapter for the fortune relay.
//!
//! DESIGN
//! ======
//! Configured from environment variables. The `LlmClient` dispatches to
//! `OpenAI` (default) or Anthropic based on `LLM_PROVIDER`. Both providers
//! stream over SSE and are reduced to the same [`ChunkStream`] of text.

pub mod anthropic;
pub mod config;
pub mod consumer;
pub mod openai;
mod sse;
pub mod types;

use config::{LlmConfig, LlmProviderKind};
pub use consumer::UpstreamConsumer;
pub use types::{ChatRequest, LlmError, LlmStream};
use types::ChunkStream;

// =============================================================================
// CLIENT DISPATCH
// =============================================================================

/// Concrete LLM client that dispatches to either Anthropic or `OpenAI`.
///
/// Configured from environment variables by [`LlmClient::from_env`].
pub struct LlmClient {
    inner: LlmProvider,
    model: String,
}

enum LlmProvider {
    Anthropic(anthropic::AnthropicClient),
    OpenAi(openai::OpenAiClient),
}

impl LlmClient {
    /// Build an LLM client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = LlmConfig::from_env()?;
        Self::from_config(config)
    }

    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider HTTP client fails to build.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let inner = match config.provider {
            LlmProviderKind::Anthropic => LlmProvider::Anthropic(anthropic::AnthropicClient::new(
                config.api_key,
                config.base_url,
                config.timeouts,
            )?),
            LlmProviderKind::OpenAi => {
                LlmProvider::OpenAi(openai::OpenAiClient::new(config.api_key, config.base_url, config.timeouts)?)
            }
        };
        Ok(Self { inner, model: config.model })
    }

    /// Return the configured model name (e.g. `"gpt-4o-mini"`).
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl LlmStream for LlmClient {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ChunkStream, LlmError> {
        match &self.inner {
            LlmProvider::Anthropic(c) => c.open_stream(&self.model, request).await,
            LlmProvider::OpenAi(c) => c.open_stream(&self.model, request).await,
        }
    }
}
