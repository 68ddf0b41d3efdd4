//! Client side of the SSE+POST transport (§4.E): opens the SSE stream,
//! records the `endpoint` event, and POSTs outbound messages there.

use async_trait::async_trait;
use cormcp_protocol::jsonrpc::{decode, encode, Message};
use cormcp_transport::{InboundEvent, Transport, TransportError};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use url::Url;

/// A transport that opens an SSE stream at `sse_url` and POSTs outbound
/// messages to whatever endpoint the server announces (§4.E, P10).
pub struct SseClientTransport {
    sse_url: Url,
    http: reqwest::Client,
    endpoint: Arc<Mutex<Option<Url>>>,
    started: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl SseClientTransport {
    /// Create a transport for the given SSE URL; nothing connects until
    /// [`Transport::start`].
    pub fn new(sse_url: Url) -> Self {
        Self {
            sse_url,
            http: reqwest::Client::new(),
            endpoint: Arc::new(Mutex::new(None)),
            started: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn same_origin(a: &Url, b: &Url) -> bool {
        a.scheme() == b.scheme() && a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
    }
}

#[async_trait]
impl Transport for SseClientTransport {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<InboundEvent>, TransportError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TransportError::AlreadyStarted);
        }

        let response = self
            .http
            .get(self.sse_url.clone())
            .header("accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        let mut events = response.bytes_stream().eventsource();

        let (tx, rx) = mpsc::unbounded_channel();
        let endpoint_slot = Arc::clone(&self.endpoint);
        let sse_url = self.sse_url.clone();
        let closed = Arc::clone(&self.closed);

        tokio::spawn(async move {
            let mut endpoint_seen = false;
            while let Some(item) = events.next().await {
                let event = match item {
                    Ok(event) => event,
                    Err(err) => {
                        let _ = tx.send(InboundEvent::Error(TransportError::Io(err.to_string())));
                        continue;
                    }
                };
                if event.event == "open" {
                    continue;
                }
                if !endpoint_seen {
                    if event.event != "endpoint" {
                        let _ = tx.send(InboundEvent::Error(TransportError::Framing(format!(
                            "expected `endpoint` as the first event, got `{}`",
                            event.event
                        ))));
                        continue;
                    }
                    let resolved = match sse_url.join(&event.data) {
                        Ok(url) => url,
                        Err(err) => {
                            let _ =
                                tx.send(InboundEvent::Error(TransportError::Framing(err.to_string())));
                            break;
                        }
                    };
                    if !SseClientTransport::same_origin(&sse_url, &resolved) {
                        let _ = tx.send(InboundEvent::Error(TransportError::Framing(format!(
                            "endpoint `{resolved}` has a different origin than the SSE URL `{sse_url}`"
                        ))));
                        break;
                    }
                    *endpoint_slot.lock().await = Some(resolved);
                    endpoint_seen = true;
                    continue;
                }

                match decode(&event.data) {
                    Ok(message) => {
                        if tx.send(InboundEvent::Message(message)).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(InboundEvent::Error(TransportError::Framing(err.to_string())));
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
        let endpoint = self
            .endpoint
            .lock()
            .await
            .clone()
            .ok_or(TransportError::NotConnected)?;
        let body = encode(&message).map_err(|e| TransportError::Framing(e.to_string()))?;
        let response = self
            .http
            .post(endpoint)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TransportError::Io(format!(
                "POST rejected with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_origin_ignores_path_and_query() {
        let a = Url::parse("https://host.example:8443/sse").unwrap();
        let b = Url::parse("https://host.example:8443/message?sessionId=abc").unwrap();
        assert!(SseClientTransport::same_origin(&a, &b));
    }

    #[test]
    fn different_host_is_rejected() {
        let a = Url::parse("https://host.example/sse").unwrap();
        let b = Url::parse("https://evil.example/message").unwrap();
        assert!(!SseClientTransport::same_origin(&a, &b));
    }

    #[test]
    fn different_scheme_is_rejected() {
        let a = Url::parse("https://host.example/sse").unwrap();
        let b = Url::parse("http://host.example/message").unwrap();
        assert!(!SseClientTransport::same_origin(&a, &b));
    }
}
