//! Network plumbing between the session and the relay.
//!
//! DESIGN
//! ======
//! `connection` owns the transport-agnostic pieces (event channel, handle,
//! slot). `http` is the production [`connection::Connector`] backed by
//! `reqwest`. Tests swap in scripted connectors that feed events directly.

pub mod connection;
pub mod http;
