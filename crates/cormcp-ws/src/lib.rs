//! # cormcp-ws
//!
//! WebSocket transport for MCP (§4.F): text frames only, over a connection
//! opened with the `mcp` subprotocol. Binary and control frames are a
//! framing error; a mismatched subprotocol is rejected before any frame is
//! processed.

#![warn(rust_2018_idioms)]

mod client;
mod server;

pub use client::WebSocketClientTransport;
pub use server::{accept_mcp_subprotocol, WebSocketServerTransport};

/// The mandatory MCP WebSocket subprotocol name (§4.F, §6).
pub const MCP_SUBPROTOCOL: &str = "mcp";
