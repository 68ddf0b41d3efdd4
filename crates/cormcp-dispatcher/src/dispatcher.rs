//! The transport-agnostic protocol core (§4.H): request ID allocation,
//! response correlation, notification routing, progress fan-out,
//! cancellation, timeouts, and the built-in `ping` handler.

use crate::config::DispatcherConfig;
use crate::handler::{NotificationHandler, PingHandler, RequestHandler};
use crate::state::DispatcherState;
use cormcp_protocol::jsonrpc::{ErrorResponse, Message, Notification, Request, Response, RpcError, Version};
use cormcp_protocol::{CancelledParams, Error, Method, ProgressMeta, ProgressParams, RequestId, Result};
use cormcp_transport::{InboundEvent, Transport};
use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::Mutex as SyncMutex;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

/// A callback fired for each `notifications/progress` that echoes a
/// previously attached progress token: `(progress, total)`.
pub type ProgressCallback = Arc<dyn Fn(f64, Option<f64>) + Send + Sync>;

/// Per-call overrides for [`Dispatcher::send_request`].
#[derive(Clone)]
pub struct RequestOptions {
    /// Invoked for every `notifications/progress` that echoes this
    /// request's progress token. When set, the token is embedded as
    /// `params._meta.progressToken` on the outbound request.
    pub on_progress: Option<ProgressCallback>,
    /// Overrides [`DispatcherConfig::default_timeout`] for this call.
    pub timeout: Option<Duration>,
    /// Whether a timeout on this call emits `notifications/cancelled`.
    /// `initialize` MUST NOT be cancellable by the client (§5, §9(b)), so
    /// the handshake sends with this set to `false`.
    pub cancellable: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            on_progress: None,
            timeout: None,
            cancellable: true,
        }
    }
}

enum PendingOutcome {
    Response(Value),
    Error(RpcError),
    Closed,
}

/// The protocol-core dispatcher. Both `cormcp-client` and `cormcp-server`
/// embed one; the asymmetry between roles lives entirely above this type.
pub struct Dispatcher {
    config: DispatcherConfig,
    next_id: AtomicU64,
    pending: DashMap<RequestId, oneshot::Sender<PendingOutcome>>,
    progress_cb: DashMap<RequestId, ProgressCallback>,
    request_handlers: DashMap<String, Arc<dyn RequestHandler>>,
    notification_handlers: DashMap<String, Arc<dyn NotificationHandler>>,
    request_fallback: SyncMutex<Option<Arc<dyn RequestHandler>>>,
    notification_fallback: SyncMutex<Option<Arc<dyn NotificationHandler>>>,
    in_flight_inbound: DashMap<RequestId, CancellationToken>,
    transport: AsyncMutex<Option<Box<dyn Transport>>>,
    state: SyncMutex<DispatcherState>,
}

impl Dispatcher {
    /// A fresh, unconnected dispatcher. Registers the built-in `ping`
    /// handler immediately.
    pub fn new(config: DispatcherConfig) -> Arc<Self> {
        let dispatcher = Arc::new(Self {
            config,
            next_id: AtomicU64::new(1),
            pending: DashMap::new(),
            progress_cb: DashMap::new(),
            request_handlers: DashMap::new(),
            notification_handlers: DashMap::new(),
            request_fallback: SyncMutex::new(None),
            notification_fallback: SyncMutex::new(None),
            in_flight_inbound: DashMap::new(),
            transport: AsyncMutex::new(None),
            state: SyncMutex::new(DispatcherState::Unconnected),
        });
        dispatcher
            .request_handlers
            .insert(Method::Ping.as_str().to_string(), Arc::new(PingHandler));
        dispatcher
    }

    /// This dispatcher's configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DispatcherState {
        *self.state.lock()
    }

    /// Set the lifecycle state. Exposed so role engines can advance
    /// `Connecting -> Ready` once their handshake completes.
    pub fn set_state(&self, state: DispatcherState) {
        *self.state.lock() = state;
    }

    /// Attach a transport, start it, and begin the inbound delivery loop on
    /// a spawned task. Advances `Unconnected -> Connecting`.
    pub async fn connect(self: &Arc<Self>, mut transport: Box<dyn Transport>) -> Result<()> {
        self.set_state(DispatcherState::Connecting);
        let inbound_rx = transport.start().await?;
        *self.transport.lock().await = Some(transport);
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            dispatcher.run_inbound_loop(inbound_rx).await;
        });
        Ok(())
    }

    /// Register (or replace) the handler for one well-known or custom
    /// method name.
    pub fn register_request_handler(&self, method: impl Into<String>, handler: Arc<dyn RequestHandler>) {
        self.request_handlers.insert(method.into(), handler);
    }

    /// Register (or replace) the handler for one notification method name.
    pub fn register_notification_handler(&self, method: impl Into<String>, handler: Arc<dyn NotificationHandler>) {
        self.notification_handlers.insert(method.into(), handler);
    }

    /// Handler invoked for any request method with no specific registration.
    pub fn set_request_fallback(&self, handler: Arc<dyn RequestHandler>) {
        *self.request_fallback.lock() = Some(handler);
    }

    /// Handler invoked for any notification method with no specific
    /// registration.
    pub fn set_notification_fallback(&self, handler: Arc<dyn NotificationHandler>) {
        *self.notification_fallback.lock() = Some(handler);
    }

    /// Send a request and await its correlated response.
    ///
    /// Capability gating is the caller's responsibility (§4.I); this method
    /// only implements the wire-level request/response/timeout/progress
    /// machinery of §4.H.
    pub async fn send_request(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
        options: RequestOptions,
    ) -> Result<Value> {
        let method = method.into();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let params = if let Some(cb) = options.on_progress {
            self.progress_cb.insert(id, cb);
            Some(attach_progress_token(params, id))
        } else {
            params
        };

        let (tx, rx) = oneshot::channel();
        // Insert before handing off to the transport so a same-loop reply
        // can never race ahead of the correlation entry (§9).
        self.pending.insert(id, tx);

        let envelope = Message::Request(Request {
            jsonrpc: Version,
            id,
            method,
            params,
        });
        if let Err(err) = self.send_envelope(envelope).await {
            self.pending.remove(&id);
            self.progress_cb.remove(&id);
            return Err(err);
        }

        let timeout_duration = options.timeout.unwrap_or(self.config.default_timeout);
        match tokio::time::timeout(timeout_duration, rx).await {
            Ok(Ok(PendingOutcome::Response(value))) => Ok(value),
            Ok(Ok(PendingOutcome::Error(rpc_error))) => Err(Error::from_rpc_error(rpc_error)),
            Ok(Ok(PendingOutcome::Closed)) => Err(Error::ConnectionClosed),
            Ok(Err(_recv_error)) => Err(Error::ConnectionClosed),
            Err(_elapsed) => {
                self.pending.remove(&id);
                self.progress_cb.remove(&id);
                if options.cancellable {
                    let cancelled_params = serde_json::to_value(CancelledParams {
                        request_id: id,
                        reason: Some("timeout".to_string()),
                    })
                    .expect("CancelledParams always serializes");
                    let _ = self
                        .send_notification(Method::NotificationCancelled.as_str(), Some(cancelled_params))
                        .await;
                }
                Err(Error::RequestTimeout(timeout_duration))
            }
        }
    }

    /// Send a fire-and-forget notification. Capability gating, again, is
    /// the caller's responsibility.
    pub async fn send_notification(&self, method: impl Into<String>, params: Option<Value>) -> Result<()> {
        let envelope = Message::Notification(Notification {
            jsonrpc: Version,
            method: method.into(),
            params,
        });
        self.send_envelope(envelope).await
    }

    /// Idempotent teardown: closes the transport (if any) and resolves
    /// every pending outbound request with [`Error::ConnectionClosed`].
    pub async fn close(&self) -> Result<()> {
        if self.state() == DispatcherState::Closed {
            return Ok(());
        }
        self.set_state(DispatcherState::Closing);
        let mut guard = self.transport.lock().await;
        if let Some(mut transport) = guard.take() {
            transport.close().await?;
        }
        drop(guard);
        self.resolve_all_pending_as_closed();
        self.set_state(DispatcherState::Closed);
        Ok(())
    }

    async fn send_envelope(&self, message: Message) -> Result<()> {
        let guard = self.transport.lock().await;
        let transport = guard.as_ref().ok_or(Error::ConnectionClosed)?;
        transport.send(message).await.map_err(Error::from)
    }

    fn resolve_all_pending_as_closed(&self) {
        let ids: Vec<RequestId> = self.pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(PendingOutcome::Closed);
            }
            self.progress_cb.remove(&id);
        }
    }

    fn resolve_pending(&self, id: RequestId, outcome: PendingOutcome) {
        self.progress_cb.remove(&id);
        match self.pending.remove(&id) {
            Some((_, tx)) => {
                let _ = tx.send(outcome);
            }
            None => tracing::warn!(id, "orphan response for unknown request id"),
        }
    }

    async fn run_inbound_loop(self: Arc<Self>, mut inbound_rx: mpsc::UnboundedReceiver<InboundEvent>) {
        while let Some(event) = inbound_rx.recv().await {
            match event {
                InboundEvent::Message(message) => self.handle_message(message).await,
                InboundEvent::Error(err) => {
                    tracing::warn!(error = %err, "transport reported a non-fatal error");
                }
                InboundEvent::Closed => {
                    tracing::info!("transport closed");
                    self.resolve_all_pending_as_closed();
                    self.set_state(DispatcherState::Closed);
                    break;
                }
            }
        }
    }

    async fn handle_message(self: &Arc<Self>, message: Message) {
        match message {
            Message::Response(Response { id, result, .. }) => {
                self.resolve_pending(id, PendingOutcome::Response(result));
            }
            Message::ErrorResponse(ErrorResponse { id, error, .. }) => {
                self.resolve_pending(id, PendingOutcome::Error(error));
            }
            Message::Request(request) => self.handle_inbound_request(request).await,
            Message::Notification(notification) => self.handle_inbound_notification(notification).await,
        }
    }

    async fn handle_inbound_request(self: &Arc<Self>, request: Request) {
        let handler = self
            .request_handlers
            .get(&request.method)
            .map(|entry| Arc::clone(entry.value()))
            .or_else(|| self.request_fallback.lock().clone());

        let Some(handler) = handler else {
            self.reply_error(request.id, RpcError::method_not_found(&request.method)).await;
            return;
        };

        let token = CancellationToken::new();
        self.in_flight_inbound.insert(request.id, token.clone());

        let dispatcher = Arc::clone(self);
        let id = request.id;
        let params = request.params;
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(handler.handle(params, token)).catch_unwind().await;
            // `remove` succeeds only if no `notifications/cancelled` beat the
            // handler to this entry; if it already lost that race, suppress
            // the response per §4.H.
            if dispatcher.in_flight_inbound.remove(&id).is_none() {
                tracing::debug!(id, "suppressing response for a cancelled inbound request");
                return;
            }
            match outcome {
                Ok(Ok(value)) => dispatcher.reply_success(id, value).await,
                Ok(Err(rpc_error)) => dispatcher.reply_error(id, rpc_error).await,
                Err(_panic) => dispatcher.reply_error(id, RpcError::internal("handler panicked")).await,
            }
        });
    }

    async fn handle_inbound_notification(&self, notification: Notification) {
        match Method::parse(&notification.method) {
            Method::NotificationCancelled => self.handle_cancelled(notification.params),
            Method::NotificationProgress => self.handle_progress(notification.params),
            _ => {
                let handler = self
                    .notification_handlers
                    .get(&notification.method)
                    .map(|entry| Arc::clone(entry.value()))
                    .or_else(|| self.notification_fallback.lock().clone());
                match handler {
                    Some(handler) => handler.handle(notification.params).await,
                    None => tracing::debug!(method = %notification.method, "no handler for notification, dropped"),
                }
            }
        }
    }

    fn handle_cancelled(&self, params: Option<Value>) {
        let Some(params) = params else {
            tracing::warn!("notifications/cancelled with no params");
            return;
        };
        match serde_json::from_value::<CancelledParams>(params) {
            Ok(cancelled) => {
                if let Some((_, token)) = self.in_flight_inbound.remove(&cancelled.request_id) {
                    token.cancel();
                }
            }
            Err(err) => tracing::warn!(error = %err, "malformed notifications/cancelled params"),
        }
    }

    fn handle_progress(&self, params: Option<Value>) {
        let Some(params) = params else {
            tracing::warn!("notifications/progress with no params");
            return;
        };
        match serde_json::from_value::<ProgressParams>(params) {
            Ok(progress) => {
                let token_id = progress.progress_token.as_u64();
                match token_id.and_then(|id| self.progress_cb.get(&id)) {
                    Some(callback) => callback.value()(progress.progress, progress.total),
                    None => tracing::warn!(
                        token = ?progress.progress_token,
                        "progress notification for unknown token, dropped"
                    ),
                }
            }
            Err(err) => tracing::warn!(error = %err, "malformed notifications/progress params"),
        }
    }

    async fn reply_success(&self, id: RequestId, result: Value) {
        let envelope = Message::Response(Response {
            jsonrpc: Version,
            id,
            result,
        });
        if let Err(err) = self.send_envelope(envelope).await {
            tracing::warn!(id, error = %err, "failed to send response");
        }
    }

    async fn reply_error(&self, id: RequestId, error: RpcError) {
        let envelope = Message::ErrorResponse(ErrorResponse {
            jsonrpc: Version,
            id,
            error,
        });
        if let Err(err) = self.send_envelope(envelope).await {
            tracing::warn!(id, error = %err, "failed to send error response");
        }
    }
}

fn attach_progress_token(params: Option<Value>, id: RequestId) -> Value {
    let meta = serde_json::to_value(ProgressMeta { progress_token: id })
        .expect("ProgressMeta always serializes");
    match params {
        Some(Value::Object(mut map)) => {
            map.insert("_meta".to_string(), meta);
            Value::Object(map)
        }
        Some(other) => other,
        None => serde_json::json!({"_meta": meta}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cormcp_loopback::pair;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn ping_round_trips_on_loopback() {
        let (client_transport, server_transport) = pair();
        let client = Dispatcher::new(DispatcherConfig::default());
        let server = Dispatcher::new(DispatcherConfig::default());
        client.connect(Box::new(client_transport)).await.unwrap();
        server.connect(Box::new(server_transport)).await.unwrap();

        let result = client
            .send_request(Method::Ping.as_str(), None, RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({}));
    }

    #[tokio::test]
    async fn unregistered_method_yields_peer_error() {
        let (client_transport, server_transport) = pair();
        let client = Dispatcher::new(DispatcherConfig::default());
        let server = Dispatcher::new(DispatcherConfig::default());
        client.connect(Box::new(client_transport)).await.unwrap();
        server.connect(Box::new(server_transport)).await.unwrap();

        let err = client
            .send_request("tools/list", None, RequestOptions::default())
            .await
            .unwrap_err();
        match err {
            Error::PeerError { code, message, .. } => {
                assert_eq!(code, cormcp_protocol::ErrorCode::MethodNotFound.code());
                assert!(message.contains("tools/list"));
            }
            other => panic!("expected PeerError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn request_times_out_and_notifies_cancellation() {
        let (client_transport, server_transport) = pair();
        let client = Dispatcher::new(DispatcherConfig::default());
        let server = Dispatcher::new(DispatcherConfig::default());
        client.connect(Box::new(client_transport)).await.unwrap();
        server.connect(Box::new(server_transport)).await.unwrap();

        let cancelled_seen = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled_seen);
        server.register_request_handler(
            "resources/list",
            Arc::new(crate::handler::FnRequestHandler(move |_params, cancel| {
                let flag = Arc::clone(&flag);
                async move {
                    // Cooperates with the cancellation signal instead of
                    // ever completing on its own.
                    cancel.cancelled().await;
                    flag.store(true, Ordering::SeqCst);
                    Ok(serde_json::json!({}))
                }
            })),
        );

        let options = RequestOptions {
            on_progress: None,
            timeout: Some(StdDuration::from_millis(20)),
            cancellable: true,
        };
        let err = client
            .send_request("resources/list", None, options)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RequestTimeout(_)));

        tokio::time::sleep(StdDuration::from_millis(50)).await;
        assert!(cancelled_seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn non_cancellable_request_times_out_without_notifying_cancellation() {
        let (client_transport, server_transport) = pair();
        let client = Dispatcher::new(DispatcherConfig::default());
        let server = Dispatcher::new(DispatcherConfig::default());
        client.connect(Box::new(client_transport)).await.unwrap();
        server.connect(Box::new(server_transport)).await.unwrap();

        let cancelled_seen = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled_seen);
        server.register_request_handler(
            "resources/list",
            Arc::new(crate::handler::FnRequestHandler(move |_params, cancel| {
                let flag = Arc::clone(&flag);
                async move {
                    cancel.cancelled().await;
                    flag.store(true, Ordering::SeqCst);
                    Ok(serde_json::json!({}))
                }
            })),
        );

        let options = RequestOptions {
            on_progress: None,
            timeout: Some(StdDuration::from_millis(20)),
            cancellable: false,
        };
        let err = client
            .send_request("resources/list", None, options)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RequestTimeout(_)));

        tokio::time::sleep(StdDuration::from_millis(50)).await;
        assert!(!cancelled_seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn progress_callback_fires_for_matching_token() {
        let (client_transport, server_transport) = pair();
        let client = Dispatcher::new(DispatcherConfig::default());
        let server = Dispatcher::new(DispatcherConfig::default());
        client.connect(Box::new(client_transport)).await.unwrap();
        server.connect(Box::new(server_transport)).await.unwrap();

        let seen = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&seen);
        server.register_request_handler(
            "tools/call",
            Arc::new(crate::handler::FnRequestHandler(|params, _cancel| async move {
                let token = params
                    .as_ref()
                    .and_then(|p| p.get("_meta"))
                    .and_then(|m| m.get("progressToken"))
                    .cloned()
                    .unwrap();
                Ok(serde_json::json!({"echoedToken": token}))
            })),
        );

        let options = RequestOptions {
            on_progress: Some(Arc::new(move |_progress, _total| {
                flag.store(true, Ordering::SeqCst);
            })),
            timeout: None,
            cancellable: true,
        };
        let result = client.send_request("tools/call", None, options).await.unwrap();
        assert!(result.get("echoedToken").is_some());
        // No actual progress notification was sent in this test; it only
        // exercises that the token was attached and echoed correctly.
        assert!(!seen.load(Ordering::SeqCst));
    }
}
