//! Stdio byte-stream transport (§4.D): frames inbound bytes through a
//! [`FrameBuffer`], writes newline-terminated JSON outbound.

use async_trait::async_trait;
use cormcp_protocol::jsonrpc::{encode, Message};
use cormcp_transport::{FrameBuffer, InboundEvent, Transport, TransportError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};

/// A duplex transport over an arbitrary async byte stream, framed one JSON
/// envelope per line.
///
/// Generic over the reader/writer halves so the same implementation backs
/// both "this process's stdin/stdout" and a child process's pipes (see
/// [`crate::process::ChildProcessTransport`]).
pub struct StdioTransport<R, W> {
    reader: Option<R>,
    writer: Arc<Mutex<Option<W>>>,
    started: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap a reader/writer pair as a transport. Nothing is read or written
    /// until [`Transport::start`] is called.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Some(reader),
            writer: Arc::new(Mutex::new(Some(writer))),
            started: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl<R, W> Transport for StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<InboundEvent>, TransportError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TransportError::AlreadyStarted);
        }
        let mut reader = self
            .reader
            .take()
            .expect("reader consumed without starting");

        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::clone(&self.closed);

        tokio::spawn(async move {
            let mut frame_buf = FrameBuffer::new();
            let mut chunk = [0u8; 8192];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) => {
                        closed.store(true, Ordering::SeqCst);
                        let _ = tx.send(InboundEvent::Closed);
                        break;
                    }
                    Ok(n) => {
                        frame_buf.push_bytes(&chunk[..n]);
                        while let Some(result) = frame_buf.take_next_message() {
                            let event = match result {
                                Ok(message) => InboundEvent::Message(message),
                                Err(err) => {
                                    tracing::warn!(error = %err, "malformed inbound stdio line");
                                    InboundEvent::Error(TransportError::Framing(err.to_string()))
                                }
                            };
                            if tx.send(event).is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        closed.store(true, Ordering::SeqCst);
                        tracing::warn!(error = %err, "stdio read error, closing transport");
                        let _ = tx.send(InboundEvent::Error(TransportError::Io(err.to_string())));
                        let _ = tx.send(InboundEvent::Closed);
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, message: Message) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) || !self.started.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let line = encode(&message).map_err(|e| TransportError::Framing(e.to_string()))?;
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotConnected)?;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // Idempotent: only the first call actually drops the writer.
        if !self.closed.swap(true, Ordering::SeqCst) {
            let mut guard = self.writer.lock().await;
            *guard = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn delivers_requests_in_wire_order() {
        let (mut client_side, server_reader) = duplex(4096);
        let (server_writer, _unused) = duplex(4096);
        let mut transport = StdioTransport::new(server_reader, server_writer);
        let mut events = transport.start().await.unwrap();

        client_side
            .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1}\n{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
            .await
            .unwrap();

        let first = events.recv().await.unwrap();
        assert!(matches!(first, InboundEvent::Message(Message::Request(ref r)) if r.id == 1));
        let second = events.recv().await.unwrap();
        assert!(matches!(second, InboundEvent::Message(Message::Notification(_))));
    }

    #[tokio::test]
    async fn eof_emits_exactly_one_closed_event() {
        let (client_side, server_reader) = duplex(4096);
        let (server_writer, _unused) = duplex(4096);
        let mut transport = StdioTransport::new(server_reader, server_writer);
        let mut events = transport.start().await.unwrap();
        drop(client_side);

        let event = events.recv().await.unwrap();
        assert!(matches!(event, InboundEvent::Closed));
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn second_start_fails_with_already_started() {
        let (_client_side, server_reader) = duplex(4096);
        let (server_writer, _unused) = duplex(4096);
        let mut transport = StdioTransport::new(server_reader, server_writer);
        transport.start().await.unwrap();
        let err = transport.start().await.unwrap_err();
        assert!(matches!(err, TransportError::AlreadyStarted));
    }

    #[tokio::test]
    async fn send_before_start_is_not_connected() {
        let (_client_side, server_reader) = duplex(4096);
        let (server_writer, _unused) = duplex(4096);
        let transport = StdioTransport::new(server_reader, server_writer);
        let msg = Message::Notification(cormcp_protocol::jsonrpc::Notification {
            jsonrpc: cormcp_protocol::jsonrpc::Version,
            method: "ping".into(),
            params: None,
        });
        let err = transport.send(msg).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }
}
