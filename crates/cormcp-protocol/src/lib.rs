//! # cormcp-protocol
//!
//! Wire types and JSON-RPC 2.0 codec for the `cormcp` Model Context Protocol
//! stack: the message envelope, the well-known method registry, capability
//! records, and the error kinds shared by every other crate in the
//! workspace.
//!
//! This crate has no async runtime dependency and no transport knowledge;
//! it is the thing both `cormcp-client` and `cormcp-server` build on.

#![warn(rust_2018_idioms)]

pub mod capabilities;
pub mod error;
pub mod handshake;
pub mod jsonrpc;
pub mod methods;
pub mod notifications;
pub mod types;

pub use capabilities::{ClientCapabilities, ServerCapabilities};
pub use error::Error;
pub use handshake::{InitializeParams, InitializeResult};
pub use jsonrpc::{
    decode, decode_value, encode, CodecError, ErrorCode, ErrorResponse, Message, Notification,
    Request, RequestId, Response, RpcError, Version, JSONRPC_VERSION,
};
pub use methods::Method;
pub use notifications::{CancelledParams, ProgressMeta, ProgressParams};
pub use types::{
    is_supported_protocol_version, Implementation, LATEST_PROTOCOL_VERSION,
    LEGACY_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};

/// Convenience alias matching this crate's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
