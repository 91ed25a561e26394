//! LLM types: provider-neutral request, stream, and error types.
//!
//! Shared by the Anthropic and `OpenAI` streaming clients. The relay only
//! ever sees a [`ChunkStream`] of text fragments; provider wire formats stay
//! inside the client modules.

use std::pin::Pin;

use futures::Stream;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The provider could not be reached at all.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider rejected the request for rate or quota reasons.
    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    /// The HTTP exchange failed after the connection was established.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The LLM provider returned a non-success HTTP status.
    #[error("API response error: status {status}: {body}")]
    ApiResponse { status: u16, body: String },

    /// A stream event could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The provider reported an error inside the event stream.
    #[error("provider error: {0}")]
    Provider(String),
}

/// Client-visible classification of an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    Unavailable,
    RateLimited,
    Other,
}

impl LlmError {
    /// Map into the three categories the relay distinguishes for clients.
    #[must_use]
    pub fn kind(&self) -> UpstreamErrorKind {
        match self {
            Self::Unavailable(_) => UpstreamErrorKind::Unavailable,
            Self::RateLimited(_) | Self::ApiResponse { status: 429, .. } => UpstreamErrorKind::RateLimited,
            _ => UpstreamErrorKind::Other,
        }
    }

    /// Classify a `reqwest` failure raised while sending or reading.
    #[must_use]
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Unavailable(err.to_string())
        } else {
            Self::ApiRequest(err.to_string())
        }
    }
}

impl crate::frame::ErrorCode for LlmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::Unavailable(_) => "E_UPSTREAM_UNAVAILABLE",
            Self::RateLimited(_) => "E_RATE_LIMITED",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::Provider(_) => "E_UPSTREAM",
        }
    }

    fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::RateLimited(_) | Self::ApiResponse { status: 429 | 500..=599, .. }
        )
    }
}

// =============================================================================
// REQUEST / STREAM
// =============================================================================

/// One completion request: a system instruction plus a single user prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Lazy, finite sequence of text fragments from the provider.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// What one upstream SSE record contributes to the chunk stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StreamStep {
    Chunk(String),
    Skip,
    End,
}

// =============================================================================
// LLM STREAM TRAIT
// =============================================================================

/// Provider-neutral async trait for streaming completions. Enables mocking in tests.
#[async_trait::async_trait]
pub trait LlmStream: Send + Sync {
    /// Open a streaming completion.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the provider cannot be reached or rejects
    /// the request before streaming starts.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ChunkStream, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
