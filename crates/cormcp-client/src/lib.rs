//! # cormcp-client
//!
//! The MCP client role (§4.I): drives the `initialize` handshake, asserts
//! the server's advertised capabilities before sending gated requests, and
//! exposes typed convenience calls over a `cormcp-dispatcher`.

#![warn(rust_2018_idioms)]

mod capability;
mod client;

pub use client::Client;
