//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One streaming endpoint (`/api/fortune`) plus a health check. The fortune
//! route is mounted with `any` so the handler itself can answer every non-GET
//! method, preflight `OPTIONS` included, with the protocol's JSON 405 instead
//! of Axum's empty default. No layer may answer on the handler's behalf.

pub mod fortune;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{any, get};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/fortune", any(fortune::handle_fortune))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
