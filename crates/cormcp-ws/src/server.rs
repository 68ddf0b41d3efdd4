//! Server-side WebSocket transport: wraps an already-upgraded
//! `axum::extract::ws::WebSocket`. Subprotocol negotiation happens in
//! [`accept_mcp_subprotocol`], before any frame is read, so a mismatched
//! client is rejected at the handshake boundary (§4.F, P11).

use crate::MCP_SUBPROTOCOL;
use async_trait::async_trait;
use axum::extract::ws::{Message as AxumMessage, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use cormcp_protocol::jsonrpc::{decode, encode, Message};
use cormcp_transport::{InboundEvent, Transport, TransportError};
use futures::{SinkExt, StreamExt};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Negotiate the `mcp` subprotocol on `ws` and hand the accepted connection
/// to `on_connect`. If the client did not request `mcp`, the socket is
/// closed immediately and `on_connect` is never called.
pub fn accept_mcp_subprotocol<F, Fut>(ws: WebSocketUpgrade, on_connect: F) -> impl IntoResponse
where
    F: FnOnce(WebSocketServerTransport) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    ws.protocols([MCP_SUBPROTOCOL]).on_upgrade(move |socket| async move {
        if socket
            .protocol()
            .map(|v| v.as_bytes() == MCP_SUBPROTOCOL.as_bytes())
            != Some(true)
        {
            tracing::warn!("rejecting websocket: client did not negotiate `mcp` subprotocol");
            let mut socket = socket;
            let _ = socket.close().await;
            return;
        }
        on_connect(WebSocketServerTransport::new(socket)).await;
    })
}

type AxumSink = futures::stream::SplitSink<WebSocket, AxumMessage>;

/// A transport over an already-upgraded, subprotocol-negotiated WebSocket.
pub struct WebSocketServerTransport {
    socket: Option<WebSocket>,
    write: Arc<Mutex<Option<AxumSink>>>,
    started: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl WebSocketServerTransport {
    /// Wrap an upgraded socket. Prefer [`accept_mcp_subprotocol`], which
    /// enforces subprotocol negotiation before this is ever constructed.
    pub fn new(socket: WebSocket) -> Self {
        Self {
            socket: Some(socket),
            write: Arc::new(Mutex::new(None)),
            started: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl Transport for WebSocketServerTransport {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<InboundEvent>, TransportError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TransportError::AlreadyStarted);
        }
        let socket = self.socket.take().expect("socket consumed without starting");
        let (sink, mut stream) = socket.split();
        *self.write.lock().await = Some(sink);

        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::clone(&self.closed);
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(AxumMessage::Text(text)) => match decode(&text) {
                        Ok(message) => {
                            if tx.send(InboundEvent::Message(message)).is_err() {
                                return;
                            }
                        }
                        Err(err) => {
                            if tx
                                .send(InboundEvent::Error(TransportError::Framing(err.to_string())))
                                .is_err()
                            {
                                return;
                            }
                        }
                    },
                    Ok(AxumMessage::Close(_)) => break,
                    Ok(other) => {
                        let _ = tx.send(InboundEvent::Error(TransportError::Framing(format!(
                            "unexpected non-text frame: {other:?}"
                        ))));
                    }
                    Err(err) => {
                        let _ = tx.send(InboundEvent::Error(TransportError::Io(err.to_string())));
                        break;
                    }
                }
            }
            closed.store(true, Ordering::SeqCst);
            let _ = tx.send(InboundEvent::Closed);
        });

        Ok(rx)
    }

    async fn send(&self, message: Message) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let text = encode(&message).map_err(|e| TransportError::Framing(e.to_string()))?;
        let mut guard = self.write.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::NotConnected)?;
        sink.send(AxumMessage::Text(text))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let mut guard = self.write.lock().await;
            if let Some(sink) = guard.as_mut() {
                let _ = sink.send(AxumMessage::Close(None)).await;
            }
            *guard = None;
        }
        Ok(())
    }
}
