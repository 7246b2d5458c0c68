//! WebSocket Gateway
//!
//! This module maps transport-level connect/message/disconnect events onto
//! the core interview session state machine. It is structured into
//! submodules for clarity:
//!
//! - `protocol`: the JSON message format between client and server.
//! - `registry`: the explicit session registry (session id to owned session).
//! - `session`: the connection lifecycle, from authentication to teardown.

pub mod protocol;
pub mod registry;
pub mod session;

pub use session::ws_handler;
