//! Client-side WebSocket transport: connects out to a server, requesting
//! the `mcp` subprotocol, and rejects the connection if the server answers
//! with anything else (§4.F, P11).

use crate::MCP_SUBPROTOCOL;
use async_trait::async_trait;
use cormcp_protocol::jsonrpc::{decode, encode, Message};
use cormcp_transport::{InboundEvent, Transport, TransportError};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::Message as WsMessage;

type WsSink = futures::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    WsMessage,
>;

/// A WebSocket transport that dials out to `url`.
pub struct WebSocketClientTransport {
    url: String,
    write: Arc<Mutex<Option<WsSink>>>,
    started: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl WebSocketClientTransport {
    /// Create a transport that will connect to `url` on [`Transport::start`].
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            write: Arc::new(Mutex::new(None)),
            started: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl Transport for WebSocketClientTransport {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<InboundEvent>, TransportError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TransportError::AlreadyStarted);
        }

        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Framing(e.to_string()))?;
        request.headers_mut().insert(
            SEC_WEBSOCKET_PROTOCOL,
            MCP_SUBPROTOCOL.parse().expect("static subprotocol is valid"),
        );

        let (stream, response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;

        let negotiated = response
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|v| v.to_str().ok());
        if negotiated != Some(MCP_SUBPROTOCOL) {
            return Err(TransportError::Framing(format!(
                "server did not negotiate the `{MCP_SUBPROTOCOL}` subprotocol (got {negotiated:?})"
            )));
        }

        let (sink, mut stream) = stream.split();
        *self.write.lock().await = Some(sink);

        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::clone(&self.closed);
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(WsMessage::Text(text)) => match decode(&text) {
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
                    Ok(WsMessage::Close(_)) => break,
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
        sink.send(WsMessage::Text(text))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let mut guard = self.write.lock().await;
            if let Some(sink) = guard.as_mut() {
                let _ = sink.send(WsMessage::Close(None)).await;
            }
            *guard = None;
        }
        Ok(())
    }
}
