//! # client-rust
//!
//! Client side of the fortune relay: opens the `/api/fortune` stream, turns
//! the decoded frames into an ordered conversation, and guarantees that at
//! most one stream is open at a time.
//!
//! The crate has no UI of its own. A front end (the `cli` crate) drives
//! [`state::session::ClientSession`] and renders whatever
//! [`state::messages::MessageStore`] holds after each update.

pub mod net;
pub mod state;
