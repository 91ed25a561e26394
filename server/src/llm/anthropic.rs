//! Anthropic Messages API streaming client.
//!
//! Thin HTTP wrapper for `/v1/messages` with `stream: true`. Text arrives as
//! `content_block_delta` events carrying a `text_delta`; `message_stop` ends
//! the stream. Pure record parsing in `parse_stream_record` for testability.

use std::time::Duration;

use frames::Record;
use serde_json::Value;

use super::config::LlmTimeouts;
use super::sse::{check_status, record_stream};
use super::types::{ChatRequest, ChunkStream, LlmError, StreamStep};

const API_VERSION: &str = "2023-06-01";

// =============================================================================
// CLIENT
// =============================================================================

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(api_key: String, base_url: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// Open a streaming message.
    ///
    /// # Errors
    ///
    /// Connection failures map to [`LlmError::Unavailable`], HTTP 429 to
    /// [`LlmError::RateLimited`], other non-2xx statuses to [`LlmError::ApiResponse`].
    pub async fn open_stream(&self, model: &str, request: &ChatRequest) -> Result<ChunkStream, LlmError> {
        let messages = [ApiMessage { role: "user", content: &request.prompt }];
        let body = ApiRequest {
            model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            stream: true,
            messages: &messages,
        };

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;
        let response = check_status(response).await?;
        Ok(record_stream(response, parse_stream_record))
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    stream: bool,
    messages: &'a [ApiMessage<'a>],
}

#[derive(serde::Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn parse_stream_record(record: &Record) -> Result<StreamStep, LlmError> {
    let Some(data) = record.data.as_deref() else {
        return Ok(StreamStep::Skip);
    };
    let root: Value = serde_json::from_str(data).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let kind = record
        .event
        .as_deref()
        .or_else(|| root.get("type").and_then(Value::as_str))
        .unwrap_or("");

    match kind {
        "content_block_delta" => {
            let text = root
                .get("delta")
                .filter(|d| d.get("type").and_then(Value::as_str) == Some("text_delta"))
                .and_then(|d| d.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("");
            if text.is_empty() {
                Ok(StreamStep::Skip)
            } else {
                Ok(StreamStep::Chunk(text.to_string()))
            }
        }
        "message_stop" => Ok(StreamStep::End),
        "error" => Err(provider_error(root.get("error").unwrap_or(&Value::Null))),
        _ => Ok(StreamStep::Skip),
    }
}

fn provider_error(error: &Value) -> LlmError {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown provider error")
        .to_string();
    match error.get("type").and_then(Value::as_str) {
        Some("rate_limit_error") => LlmError::RateLimited(message),
        _ => LlmError::Provider(message),
    }
}

#[cfg(test)]
#[path = "anthropic_test.rs"]
mod tests;
