//! Error kinds surfaced by the dispatcher and role engines (§7).

use crate::jsonrpc::RpcError;
use serde_json::Value;
use std::time::Duration;

/// Every way a protocol-level call can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport closed while a request was outstanding, or a call was
    /// attempted on an already-closed dispatcher.
    #[error("connection closed")]
    ConnectionClosed,

    /// The per-request deadline elapsed before a response arrived.
    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// The peer replied with a JSON-RPC error object.
    #[error("peer error {code}: {message}")]
    PeerError {
        code: i32,
        message: String,
        data: Option<Value>,
    },

    /// A local pre-send or handler-registration capability assertion failed.
    #[error("capability `{capability}` missing, required for method `{method}`")]
    CapabilityMissing { capability: String, method: String },

    /// The handshake was rejected because the peer negotiated an
    /// unsupported protocol version.
    #[error("unsupported protocol version offered: {offered}")]
    ProtocolVersionUnsupported { offered: String },

    /// An inbound envelope failed to decode. Non-fatal: reported via
    /// `on_error`, never tears down the connection.
    #[error("failed to decode inbound message: {0}")]
    Decode(#[from] crate::jsonrpc::CodecError),

    /// A low-level transport I/O or framing failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Convert a peer-supplied [`RpcError`] into the analogous [`Error`] variant.
    pub fn from_rpc_error(err: RpcError) -> Self {
        Self::PeerError {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }

    /// Convert this error into a wire-level [`RpcError`] suitable for
    /// replying to a peer (used when an inbound handler fails).
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            Error::PeerError { code, message, data } => RpcError {
                code: *code,
                message: message.clone(),
                data: data.clone(),
            },
            Error::RequestTimeout(_) => {
                RpcError::new(crate::jsonrpc::ErrorCode::RequestTimeout, self.to_string())
            }
            Error::ConnectionClosed => {
                RpcError::new(crate::jsonrpc::ErrorCode::ConnectionClosed, self.to_string())
            }
            other => RpcError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_error_round_trips_through_rpc_error() {
        let rpc = RpcError::method_not_found("tools/list");
        let err = Error::from_rpc_error(rpc.clone());
        match &err {
            Error::PeerError { code, message, .. } => {
                assert_eq!(*code, rpc.code);
                assert_eq!(message, &rpc.message);
            }
            _ => panic!("expected PeerError"),
        }
    }
}
