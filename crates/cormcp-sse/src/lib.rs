//! # cormcp-sse
//!
//! Server-Sent Events + HTTP POST transport for MCP (§4.E): the server GETs
//! announce a session-scoped POST endpoint as the mandatory first SSE event,
//! the client POSTs outbound messages there, same-origin enforced (§6, P10).

#![warn(rust_2018_idioms)]

mod client;
mod config;
mod server;
mod session;

pub use client::SseClientTransport;
pub use config::SseServerConfig;
pub use server::{handle_sse_connection, post_handler, SessionIdQuery, SseServerTransport};
pub use session::{DeliveryOutcome, SessionManager};
