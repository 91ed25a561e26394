//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds only immutable collaborators: the upstream LLM client, the side
//! payload source, and the relay config. Relay invocations share nothing
//! mutable, so no locks live here.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::llm::LlmStream;
use crate::services::lucky::SidePayloadSource;

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn LlmStream>,
    pub side_payload: Arc<dyn SidePayloadSource>,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmStream>, side_payload: Arc<dyn SidePayloadSource>, config: RelayConfig) -> Self {
        Self { llm, side_payload, config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
