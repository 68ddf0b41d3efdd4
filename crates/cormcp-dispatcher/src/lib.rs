//! # cormcp-dispatcher
//!
//! The transport-agnostic protocol core shared by both MCP roles (§4.H):
//! request ID allocation and correlation, progress fan-out, inbound
//! cancellation, per-request timeouts, and the built-in `ping` handler.
//! Capability negotiation and gating live one layer up, in `cormcp-client`
//! and `cormcp-server`, since the two roles disagree on capability shape.

#![warn(rust_2018_idioms)]

mod config;
mod dispatcher;
mod handler;
mod state;

pub use config::DispatcherConfig;
pub use dispatcher::{Dispatcher, ProgressCallback, RequestOptions};
pub use handler::{FnNotificationHandler, FnRequestHandler, NotificationHandler, RequestHandler};
pub use state::DispatcherState;
