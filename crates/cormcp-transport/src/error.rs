//! Transport-local error type (§4.C); converts into `cormcp_protocol::Error::Transport`
//! at the dispatcher boundary.

/// Failures a concrete [`crate::Transport`] implementation can report.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// `start()` was called a second time on the same instance.
    #[error("transport already started")]
    AlreadyStarted,

    /// `send()` was called before `start()` succeeded, or after the peer closed.
    #[error("transport not connected")]
    NotConnected,

    /// Low-level I/O failure (read, write, connect).
    #[error("I/O error: {0}")]
    Io(String),

    /// The peer violated the framing contract (e.g. a binary WebSocket frame,
    /// a mismatched subprotocol, a cross-origin SSE endpoint).
    #[error("framing violation: {0}")]
    Framing(String),
}

impl From<TransportError> for cormcp_protocol::Error {
    fn from(err: TransportError) -> Self {
        cormcp_protocol::Error::Transport(err.to_string())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}
