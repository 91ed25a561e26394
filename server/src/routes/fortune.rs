//! Fortune endpoint: validates the request and opens the SSE channel.
//!
//! DESIGN
//! ======
//! The handler never touches the upstream itself. It checks the method,
//! spawns `services::fortune::run_relay` on its own task, and returns a
//! response whose body drains the relay's frame channel, encoding each frame
//! as one `data:` record the moment it arrives.
//!
//! LIFECYCLE
//! =========
//! 1. Non-GET → 405 JSON, nothing spawned
//! 2. GET → streaming headers, relay task spawned
//! 3. Relay sends content*, then done | error, then drops its sender
//! 4. Channel closes → body ends → connection released

use std::collections::HashMap;
use std::convert::Infallible;

use axum::Json;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::warn;

use crate::frame::{ErrorCode, Frame, encode_frame};
use crate::services;
use crate::state::AppState;

/// Frames buffered between the relay task and the socket writer.
const RELAY_CHANNEL_CAPACITY: usize = 32;

/// Query parameter carrying the free-text question.
pub const QUESTION_PARAM: &str = "question";

// =============================================================================
// ERRORS
// =============================================================================

/// Request-shape violations rejected before any stream is opened.
#[derive(Debug, thiserror::Error)]
pub enum FortuneRequestError {
    #[error("Method not allowed")]
    MethodNotAllowed(Method),
}

impl ErrorCode for FortuneRequestError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed(_) => "E_METHOD_NOT_ALLOWED",
        }
    }
}

impl IntoResponse for FortuneRequestError {
    fn into_response(self) -> Response {
        match &self {
            Self::MethodNotAllowed(method) => {
                warn!(%method, code = self.error_code(), "fortune: rejected request");
                (
                    StatusCode::METHOD_NOT_ALLOWED,
                    [(header::ALLOW, "GET")],
                    Json(json!({ "message": self.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

// =============================================================================
// HANDLER
// =============================================================================

pub async fn handle_fortune(
    State(state): State<AppState>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if method != Method::GET {
        return FortuneRequestError::MethodNotAllowed(method).into_response();
    }

    let question = params.get(QUESTION_PARAM).cloned();
    let (tx, rx) = mpsc::channel::<Frame>(RELAY_CHANNEL_CAPACITY);
    tokio::spawn(services::fortune::run_relay(state, question, tx));

    sse_response(rx)
}

/// Wrap a frame channel as a `text/event-stream` response.
fn sse_response(rx: mpsc::Receiver<Frame>) -> Response {
    let records = futures::stream::unfold(rx, |mut rx| async move {
        let frame = rx.recv().await?;
        Some((Ok::<_, Infallible>(encode_frame(&frame)), rx))
    });

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(records),
    )
        .into_response()
}

#[cfg(test)]
#[path = "fortune_test.rs"]
mod tests;
