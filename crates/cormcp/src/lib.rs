//! # cormcp
//!
//! Umbrella crate for the `cormcp` Model Context Protocol stack: re-exports
//! the protocol types, the transport-agnostic dispatcher, the client and
//! server role engines, and (behind their feature flags) the concrete
//! transports. Pull in individual `cormcp-*` crates directly if you only
//! need one layer.

#![warn(rust_2018_idioms)]

pub use cormcp_client as client;
pub use cormcp_dispatcher as dispatcher;
pub use cormcp_protocol as protocol;
pub use cormcp_server as server;
pub use cormcp_transport as transport;

#[cfg(feature = "stdio")]
pub use cormcp_stdio as stdio;

#[cfg(feature = "sse")]
pub use cormcp_sse as sse;

#[cfg(feature = "ws")]
pub use cormcp_ws as ws;

#[cfg(feature = "loopback")]
pub use cormcp_loopback as loopback;

pub use cormcp_client::Client;
pub use cormcp_dispatcher::{Dispatcher, DispatcherConfig, DispatcherState, RequestOptions};
pub use cormcp_protocol::{
    ClientCapabilities, Error, Implementation, Method, Result, ServerCapabilities,
};
pub use cormcp_server::Server;
pub use cormcp_transport::Transport;
