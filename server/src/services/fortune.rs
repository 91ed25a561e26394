//! Fortune service: question → upstream stream → relay frames.
//!
//! DESIGN
//! ======
//! `run_relay` is the whole server-side protocol: one `Content` frame per
//! upstream chunk as soon as it arrives, then exactly one terminal frame
//! (`Done` with the full text and side payload, or `Error`). Frames go into
//! a bounded channel that backs the HTTP body; a closed channel means the
//! client left, which ends the loop quietly.
//!
//! The service holds no state across invocations.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{ErrorCode, Frame};
use crate::llm::types::UpstreamErrorKind;
use crate::llm::{ChatRequest, LlmError, UpstreamConsumer};
use crate::state::AppState;

pub const SYSTEM_PROMPT: &str = "You are a mystical fortune teller who speaks in an enchanting and mysterious way, \
offering insights and guidance. Use mystical and ethereal language, and keep responses concise but impactful.";

pub const DAILY_FORTUNE_PROMPT: &str = "As a mystical fortune teller, provide a daily fortune with spiritual \
insights and guidance for the day ahead. Keep it concise (2-3 sentences).";

const QUESTION_PROMPT_PREFIX: &str =
    "As a mystical fortune teller, provide a specific response to this question: ";

pub const MSG_UNAVAILABLE: &str = "Completion service is unavailable";
pub const MSG_RATE_LIMITED: &str = "Rate limit exceeded";
pub const MSG_UNKNOWN: &str = "Unknown error";

// =============================================================================
// PROMPTS / MESSAGES
// =============================================================================

/// The trimmed question, or `None` when it is absent or blank.
#[must_use]
pub fn question_text(question: Option<&str>) -> Option<&str> {
    question.map(str::trim).filter(|q| !q.is_empty())
}

/// Build the user prompt. Absent or blank questions get the daily fortune.
#[must_use]
pub fn build_prompt(question: Option<&str>) -> String {
    match question_text(question) {
        Some(question) => format!("{QUESTION_PROMPT_PREFIX}{question}"),
        None => DAILY_FORTUNE_PROMPT.to_string(),
    }
}

/// Client-visible message for an upstream failure.
///
/// Raw details only leave the process in development mode.
#[must_use]
pub fn client_error_message(err: &LlmError, dev_mode: bool) -> String {
    match err.kind() {
        UpstreamErrorKind::Unavailable => MSG_UNAVAILABLE.to_string(),
        UpstreamErrorKind::RateLimited => MSG_RATE_LIMITED.to_string(),
        UpstreamErrorKind::Other if dev_mode => err.to_string(),
        UpstreamErrorKind::Other => MSG_UNKNOWN.to_string(),
    }
}

// =============================================================================
// RELAY
// =============================================================================

/// How a relay invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Done frame delivered.
    Completed { chunks: usize, chars: usize },
    /// Error frame delivered (or attempted) with this code.
    Failed { code: &'static str },
    /// The body channel closed before the terminal frame could be written.
    ClientGone,
}

/// Drive one upstream stream into `tx`.
pub async fn run_relay(state: AppState, question: Option<String>, tx: mpsc::Sender<Frame>) -> RelayOutcome {
    let request_id = Uuid::new_v4();
    let request = ChatRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt: build_prompt(question.as_deref()),
        max_tokens: state.config.max_tokens,
        temperature: state.config.temperature,
    };
    info!(%request_id, has_question = question_text(question.as_deref()).is_some(), "fortune: relay started");

    let outcome = relay(&state, &request, &tx).await;
    match &outcome {
        RelayOutcome::Completed { chunks, chars } => info!(%request_id, chunks, chars, "fortune: relay completed"),
        RelayOutcome::Failed { code } => info!(%request_id, code, "fortune: relay failed"),
        RelayOutcome::ClientGone => debug!(%request_id, "fortune: client disconnected"),
    }
    outcome
}

async fn relay(state: &AppState, request: &ChatRequest, tx: &mpsc::Sender<Frame>) -> RelayOutcome {
    let mut consumer = match UpstreamConsumer::open(state.llm.as_ref(), request).await {
        Ok(consumer) => consumer,
        Err(e) => return fail(&e, state.config.dev_mode, tx).await,
    };

    let mut chunks = 0;
    while let Some(next) = consumer.next_chunk().await {
        match next {
            Ok(chunk) => {
                chunks += 1;
                if tx.send(Frame::content(chunk)).await.is_err() {
                    return RelayOutcome::ClientGone;
                }
            }
            Err(e) => return fail(&e, state.config.dev_mode, tx).await,
        }
    }

    let final_text = consumer.into_text();
    let chars = final_text.chars().count();
    let done = Frame::done(final_text, state.side_payload.generate());
    if tx.send(done).await.is_err() {
        return RelayOutcome::ClientGone;
    }
    RelayOutcome::Completed { chunks, chars }
}

async fn fail(err: &LlmError, dev_mode: bool, tx: &mpsc::Sender<Frame>) -> RelayOutcome {
    warn!(error = %err, code = err.error_code(), retryable = err.retryable(), "fortune: upstream failed");
    if tx.send(Frame::error(client_error_message(err, dev_mode))).await.is_err() {
        return RelayOutcome::ClientGone;
    }
    RelayOutcome::Failed { code: err.error_code() }
}

#[cfg(test)]
#[path = "fortune_test.rs"]
mod tests;
