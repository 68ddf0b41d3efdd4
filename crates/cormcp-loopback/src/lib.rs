//! # cormcp-loopback
//!
//! A pair of transports whose `send` directly enqueues onto the other's
//! inbound channel, for tests and in-process client/server pairing (§4.G).

#![warn(rust_2018_idioms)]

use async_trait::async_trait;
use cormcp_protocol::jsonrpc::Message;
use cormcp_transport::{InboundEvent, Transport, TransportError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One half of an in-memory transport pair. `send` pushes straight onto the
/// peer's inbound channel; since the channel exists from [`pair`] onward,
/// messages sent before the peer calls `start` simply queue in order and
/// are delivered once it does.
pub struct LoopbackTransport {
    peer_tx: mpsc::UnboundedSender<InboundEvent>,
    own_rx: Option<mpsc::UnboundedReceiver<InboundEvent>>,
    started: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

/// Create a connected pair of loopback transports.
pub fn pair() -> (LoopbackTransport, LoopbackTransport) {
    let (tx_a_to_b, rx_a_to_b) = mpsc::unbounded_channel();
    let (tx_b_to_a, rx_b_to_a) = mpsc::unbounded_channel();

    let a = LoopbackTransport {
        peer_tx: tx_a_to_b,
        own_rx: Some(rx_b_to_a),
        started: Arc::new(AtomicBool::new(false)),
        closed: Arc::new(AtomicBool::new(false)),
    };
    let b = LoopbackTransport {
        peer_tx: tx_b_to_a,
        own_rx: Some(rx_a_to_b),
        started: Arc::new(AtomicBool::new(false)),
        closed: Arc::new(AtomicBool::new(false)),
    };
    (a, b)
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<InboundEvent>, TransportError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TransportError::AlreadyStarted);
        }
        Ok(self.own_rx.take().expect("receiver consumed without starting"))
    }

    async fn send(&self, message: Message) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) || !self.started.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.peer_tx
            .send(InboundEvent::Message(message))
            .map_err(|_| TransportError::NotConnected)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.peer_tx.send(InboundEvent::Closed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cormcp_protocol::jsonrpc::{Notification, Version};

    fn ping_notification() -> Message {
        Message::Notification(Notification {
            jsonrpc: Version,
            method: "ping".into(),
            params: None,
        })
    }

    #[tokio::test]
    async fn messages_flow_in_order() {
        let (mut a, mut b) = pair();
        let mut b_events = b.start().await.unwrap();
        a.start().await.unwrap();

        a.send(ping_notification()).await.unwrap();
        let event = b_events.recv().await.unwrap();
        assert!(matches!(event, InboundEvent::Message(Message::Notification(_))));
    }

    #[tokio::test]
    async fn messages_sent_before_peer_start_are_buffered() {
        let (mut a, mut b) = pair();
        a.start().await.unwrap();
        a.send(ping_notification()).await.unwrap();

        let mut b_events = b.start().await.unwrap();
        let event = b_events.recv().await.unwrap();
        assert!(matches!(event, InboundEvent::Message(_)));
    }

    #[tokio::test]
    async fn close_delivers_exactly_one_closed_event_to_the_peer() {
        let (mut a, mut b) = pair();
        let mut b_events = b.start().await.unwrap();
        a.start().await.unwrap();

        a.close().await.unwrap();
        a.close().await.unwrap(); // idempotent
        let event = b_events.recv().await.unwrap();
        assert!(matches!(event, InboundEvent::Closed));
    }

    #[tokio::test]
    async fn send_before_start_is_not_connected() {
        let (a, _b) = pair();
        let err = a.send(ping_notification()).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }
}
