//! Client-side conversation state.
//!
//! DESIGN
//! ======
//! `messages` is a plain ordered store with no knowledge of the wire.
//! `session` is the state machine that applies wire events to it.

pub mod messages;
pub mod session;
