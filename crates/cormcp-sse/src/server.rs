//! Server side of the SSE+POST transport (§4.E): one [`SseServerTransport`]
//! per SSE session, plus the two axum handlers that drive it.

use crate::config::SseServerConfig;
use crate::session::{DeliveryOutcome, SessionManager};
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use cormcp_protocol::jsonrpc::{decode, encode, Message};
use cormcp_transport::{InboundEvent, Transport, TransportError};
use futures::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt as _;

/// One SSE session's transport. Constructed (and registered with the
/// [`SessionManager`]) by [`handle_sse_connection`]; applications should
/// not build this directly.
pub struct SseServerTransport {
    session_id: String,
    manager: Arc<SessionManager>,
    outbound_tx: Option<mpsc::UnboundedSender<Event>>,
    inbound_tx: mpsc::UnboundedSender<InboundEvent>,
    inbound_rx: Option<mpsc::UnboundedReceiver<InboundEvent>>,
    started: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl SseServerTransport {
    /// The session id this transport was assigned.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl Transport for SseServerTransport {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<InboundEvent>, TransportError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TransportError::AlreadyStarted);
        }
        Ok(self.inbound_rx.take().expect("receiver consumed without starting"))
    }

    async fn send(&self, message: Message) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let Some(outbound_tx) = self.outbound_tx.as_ref() else {
            return Err(TransportError::NotConnected);
        };
        let json = encode(&message).map_err(|e| TransportError::Framing(e.to_string()))?;
        outbound_tx
            .send(Event::default().event("message").data(json))
            .map_err(|_| TransportError::NotConnected)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.manager.remove(&self.session_id);
            self.outbound_tx = None;
            let _ = self.inbound_tx.send(InboundEvent::Closed);
        }
        Ok(())
    }
}

/// Register a new session with `manager`, emit the mandatory first
/// `endpoint` event onto its outbound channel, and return the transport
/// together with the raw outbound event stream (before it is wrapped in an
/// [`Sse`] response). Split out from [`handle_sse_connection`] so tests can
/// observe the first event without going through axum's response body.
fn open_session(
    manager: Arc<SessionManager>,
    config: &SseServerConfig,
) -> (SseServerTransport, mpsc::UnboundedReceiver<Event>) {
    let session_id = uuid::Uuid::new_v4().to_string();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Event>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<InboundEvent>();
    manager.insert(session_id.clone(), inbound_tx.clone());

    let endpoint_path = format!("{}?sessionId={}", config.post_path_prefix, session_id);
    let _ = outbound_tx.send(Event::default().event("endpoint").data(endpoint_path));

    let transport = SseServerTransport {
        session_id,
        manager,
        outbound_tx: Some(outbound_tx),
        inbound_tx,
        inbound_rx: Some(inbound_rx),
        started: Arc::new(AtomicBool::new(false)),
        closed: Arc::new(AtomicBool::new(false)),
    };
    (transport, outbound_rx)
}

/// Open a new SSE session: register it with `manager`, emit the mandatory
/// first `endpoint` event, hand the transport to `on_connect` (which is
/// expected to `start()` it and drive a dispatcher), and return the
/// axum SSE response the GET handler should reply with.
pub fn handle_sse_connection<F, Fut>(
    manager: Arc<SessionManager>,
    config: SseServerConfig,
    on_connect: F,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    F: FnOnce(SseServerTransport) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let keep_alive_interval = config.keep_alive_interval;
    let (transport, outbound_rx) = open_session(manager, &config);
    tokio::spawn(on_connect(transport));

    let stream = UnboundedReceiverStream::new(outbound_rx).map(Ok);
    let mut sse = Sse::new(stream);
    if let Some(interval) = keep_alive_interval {
        sse = sse.keep_alive(KeepAlive::new().interval(interval));
    }
    sse
}

/// `?sessionId=<id>` query extractor for the POST endpoint.
#[derive(Debug, Deserialize)]
pub struct SessionIdQuery {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Route an inbound POST body to its session (§6): `202` on success, `400`
/// on malformed JSON, `404` on an unknown session, `500` if the session's
/// SSE stream is gone.
pub async fn post_handler(
    State(manager): State<Arc<SessionManager>>,
    Query(query): Query<SessionIdQuery>,
    body: axum::body::Bytes,
) -> StatusCode {
    let text = match std::str::from_utf8(&body) {
        Ok(text) => text,
        Err(_) => return StatusCode::BAD_REQUEST,
    };
    let message = match decode(text) {
        Ok(message) => message,
        Err(_) => return StatusCode::BAD_REQUEST,
    };
    match manager.deliver(&query.session_id, InboundEvent::Message(message)) {
        DeliveryOutcome::Delivered => StatusCode::ACCEPTED,
        DeliveryOutcome::UnknownSession => StatusCode::NOT_FOUND,
        DeliveryOutcome::SessionGone => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_event_registers_the_session_and_is_sent_before_anything_else() {
        let manager = SessionManager::new();
        let config = SseServerConfig::default();
        let (transport, mut outbound_rx) = open_session(Arc::clone(&manager), &config);
        assert_eq!(manager.len(), 1);
        // Exactly one event (the endpoint announcement) is queued so far.
        assert!(outbound_rx.try_recv().is_ok());
        assert!(outbound_rx.try_recv().is_err());
        assert!(!transport.session_id().is_empty());
    }

    #[tokio::test]
    async fn post_to_unknown_session_is_404() {
        let manager = SessionManager::new();
        let status = post_handler(
            State(manager),
            Query(SessionIdQuery {
                session_id: "missing".into(),
            }),
            axum::body::Bytes::from_static(b"{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1}"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn post_malformed_json_is_400() {
        let manager = SessionManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        manager.insert("abc".into(), tx);
        let status = post_handler(
            State(manager),
            Query(SessionIdQuery {
                session_id: "abc".into(),
            }),
            axum::body::Bytes::from_static(b"not json"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_well_formed_message_is_202_and_delivered() {
        let manager = SessionManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.insert("abc".into(), tx);
        let status = post_handler(
            State(Arc::clone(&manager)),
            Query(SessionIdQuery {
                session_id: "abc".into(),
            }),
            axum::body::Bytes::from_static(b"{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1}"),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, InboundEvent::Message(Message::Request(ref r)) if r.id == 1));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_removes_the_session() {
        let manager = SessionManager::new();
        let config = SseServerConfig::default();
        let (mut transport, _outbound_rx) = open_session(Arc::clone(&manager), &config);
        transport.start().await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert!(manager.is_empty());
    }
}
