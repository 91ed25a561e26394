//! Frame: server-side view of the stream protocol.
//!
//! ARCHITECTURE
//! ============
//! The wire model and SSE codec live in the shared `frames` crate. This
//! module re-exports it for the relay and adds the grepable error-code
//! trait that server error types implement for structured logging.

pub use frames::{Frame, SidePayload, encode_frame};

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error logs.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
