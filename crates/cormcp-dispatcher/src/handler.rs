//! Inbound request/notification handler traits (§4.H).

use async_trait::async_trait;
use cormcp_protocol::jsonrpc::RpcError;
use serde_json::Value;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Handles one inbound request, returning the `result` value or an
/// [`RpcError`] to send back as an `ErrorResponse`.
///
/// `cancel` is signalled if a `notifications/cancelled` for this request's
/// ID arrives while the handler is running; cooperating with it is
/// optional but recommended for long-running handlers.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(
        &self,
        params: Option<Value>,
        cancel: CancellationToken,
    ) -> Result<Value, RpcError>;
}

/// Handles one inbound notification. Notifications never produce a reply.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn handle(&self, params: Option<Value>);
}

/// Adapts a plain async closure into a [`RequestHandler`].
pub struct FnRequestHandler<F>(pub F);

#[async_trait]
impl<F, Fut> RequestHandler for FnRequestHandler<F>
where
    F: Fn(Option<Value>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
{
    async fn handle(&self, params: Option<Value>, cancel: CancellationToken) -> Result<Value, RpcError> {
        (self.0)(params, cancel).await
    }
}

/// Adapts a plain async closure into a [`NotificationHandler`].
pub struct FnNotificationHandler<F>(pub F);

#[async_trait]
impl<F, Fut> NotificationHandler for FnNotificationHandler<F>
where
    F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, params: Option<Value>) {
        (self.0)(params).await
    }
}

/// The built-in `ping` handler (§4.H): always succeeds with an empty object.
pub(crate) struct PingHandler;

#[async_trait]
impl RequestHandler for PingHandler {
    async fn handle(&self, _params: Option<Value>, _cancel: CancellationToken) -> Result<Value, RpcError> {
        Ok(serde_json::json!({}))
    }
}
