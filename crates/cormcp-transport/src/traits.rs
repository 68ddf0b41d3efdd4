//! The abstract duplex transport contract (§4.C).

use crate::error::TransportError;
use async_trait::async_trait;
use cormcp_protocol::jsonrpc::Message;
use tokio::sync::mpsc;

/// One event delivered from the transport's single inbound-delivery task.
///
/// This replaces the source material's `on_message` / `on_close` /
/// `on_error` callback triple with a single ordered stream, which reads
/// more idiomatically against `tokio::sync::mpsc` than registering
/// closures ahead of `start()`. The ordering and at-most-once-`Closed`
/// guarantees of §4.C are unchanged.
#[derive(Debug)]
pub enum InboundEvent {
    /// A fully decoded message, in wire-receipt order.
    Message(Message),
    /// A non-fatal decode or I/O error. Does not imply the transport closed.
    Error(TransportError),
    /// The transport closed, for any reason. Delivered exactly once, and is
    /// always the last event on the channel.
    Closed,
}

/// A duplex JSON-RPC message channel.
///
/// Implementations MUST serialize concurrent `send` calls so that wire
/// order matches caller order (§4.C, §5).
#[async_trait]
pub trait Transport: Send {
    /// Acquire resources and begin delivering inbound events. Valid exactly
    /// once per instance; a second call fails with
    /// [`TransportError::AlreadyStarted`].
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<InboundEvent>, TransportError>;

    /// Enqueue one message for transmission to the peer.
    async fn send(&self, message: Message) -> Result<(), TransportError>;

    /// Release resources. Idempotent; guarantees exactly one
    /// [`InboundEvent::Closed`] is (or was already) delivered.
    async fn close(&mut self) -> Result<(), TransportError>;
}
