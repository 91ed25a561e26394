//! OpenAI-compatible streaming client.
//!
//! Speaks `/chat/completions` with `stream: true`. Each SSE record carries a
//! `chat.completion.chunk` whose `choices[0].delta.content` is one fragment;
//! the literal `[DONE]` record ends the stream.

use std::time::Duration;

use frames::Record;
use serde::Serialize;
use serde_json::Value;

use super::config::LlmTimeouts;
use super::sse::{check_status, record_stream};
use super::types::{ChatRequest, ChunkStream, LlmError, StreamStep};

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
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

    /// Open a streaming chat completion.
    ///
    /// # Errors
    ///
    /// Connection failures map to [`LlmError::Unavailable`], HTTP 429 to
    /// [`LlmError::RateLimited`], other non-2xx statuses to [`LlmError::ApiResponse`].
    pub async fn open_stream(&self, model: &str, request: &ChatRequest) -> Result<ChunkStream, LlmError> {
        let messages = build_messages(request);
        let body = CcRequest {
            model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
            messages: &messages,
        };
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;
        let response = check_status(response).await?;
        Ok(record_stream(response, parse_stream_record))
    }
}

// =============================================================================
// CHAT COMPLETIONS WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    messages: &'a [CcMessage<'a>],
}

#[derive(Serialize)]
struct CcMessage<'a> {
    role: &'static str,
    content: &'a str,
}

fn build_messages(request: &ChatRequest) -> Vec<CcMessage<'_>> {
    let mut out = Vec::with_capacity(2);
    if !request.system.trim().is_empty() {
        out.push(CcMessage { role: "system", content: &request.system });
    }
    out.push(CcMessage { role: "user", content: &request.prompt });
    out
}

// =============================================================================
// STREAM PARSING
// =============================================================================

pub(crate) fn parse_stream_record(record: &Record) -> Result<StreamStep, LlmError> {
    let Some(data) = record.data.as_deref() else {
        return Ok(StreamStep::Skip);
    };
    if data.trim() == "[DONE]" {
        return Ok(StreamStep::End);
    }

    let root: Value = serde_json::from_str(data).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    if let Some(error) = root.get("error").filter(|e| !e.is_null()) {
        return Err(provider_error(error));
    }

    let text = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
        .unwrap_or("");
    if text.is_empty() {
        Ok(StreamStep::Skip)
    } else {
        Ok(StreamStep::Chunk(text.to_string()))
    }
}

fn provider_error(error: &Value) -> LlmError {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map_or_else(|| error.to_string(), str::to_owned);
    let is_rate_limit = ["type", "code"]
        .iter()
        .filter_map(|key| error.get(*key).and_then(Value::as_str))
        .any(|tag| tag.contains("rate_limit"));
    if is_rate_limit {
        LlmError::RateLimited(message)
    } else {
        LlmError::Provider(message)
    }
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
