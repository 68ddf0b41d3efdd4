//! # cormcp-server
//!
//! The MCP server role (§4.I): `initialize` handshake policy, in-process
//! tool/prompt/resource catalogues, and the capability assertions that
//! gate registration and server-initiated calls.

#![warn(rust_2018_idioms)]

mod capability;
mod catalog;
mod handlers;
mod server;
mod state;

pub use catalog::{Prompt, PromptHandler, Resource, ResourceHandler, Tool, ToolHandler};
pub use server::Server;
