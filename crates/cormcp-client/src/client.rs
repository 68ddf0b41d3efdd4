//! The MCP client role engine (§4.I): owns a [`Dispatcher`], drives the
//! `initialize` handshake, and exposes typed convenience calls gated by the
//! server's advertised capabilities.

use crate::capability::assert_remote_capability;
use cormcp_dispatcher::{Dispatcher, DispatcherConfig, DispatcherState, RequestHandler, RequestOptions};
use cormcp_protocol::{
    is_supported_protocol_version, ClientCapabilities, Error, Implementation, InitializeParams,
    InitializeResult, Method, Result, ServerCapabilities, LATEST_PROTOCOL_VERSION,
};
use cormcp_transport::Transport;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// A connected (or connecting) MCP client.
pub struct Client {
    dispatcher: Arc<Dispatcher>,
    local_info: Implementation,
    local_capabilities: ClientCapabilities,
    remote_info: RwLock<Option<Implementation>>,
    remote_capabilities: RwLock<Option<ServerCapabilities>>,
}

impl Client {
    /// An unconnected client identifying itself as `local_info` with
    /// `local_capabilities`.
    pub fn new(local_info: Implementation, local_capabilities: ClientCapabilities, config: DispatcherConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(config),
            local_info,
            local_capabilities,
            remote_info: RwLock::new(None),
            remote_capabilities: RwLock::new(None),
        }
    }

    /// The underlying dispatcher, for registering raw handlers or reading
    /// lifecycle state.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The server's identity, once the handshake has completed.
    pub fn remote_info(&self) -> Option<Implementation> {
        self.remote_info.read().clone()
    }

    /// The server's advertised capabilities, once the handshake has completed.
    pub fn remote_capabilities(&self) -> Option<ServerCapabilities> {
        self.remote_capabilities.read().clone()
    }

    /// Attach `transport`, send `initialize`, and on a supported protocol
    /// version emit `notifications/initialized`. Closes the transport and
    /// returns [`Error::ProtocolVersionUnsupported`] if the server names a
    /// version outside the supported set (P10, S3).
    pub async fn connect(&self, transport: Box<dyn Transport>) -> Result<()> {
        self.dispatcher.connect(transport).await?;

        let params = InitializeParams {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: self.local_capabilities.clone(),
            client_info: self.local_info.clone(),
        };
        let response = self
            .dispatcher
            .send_request(
                Method::Initialize.as_str(),
                Some(serde_json::to_value(&params).expect("InitializeParams always serializes")),
                RequestOptions {
                    cancellable: false,
                    ..RequestOptions::default()
                },
            )
            .await?;
        let result: InitializeResult = serde_json::from_value(response).map_err(|e| Error::Transport(e.to_string()))?;

        if !is_supported_protocol_version(&result.protocol_version) {
            let _ = self.dispatcher.close().await;
            return Err(Error::ProtocolVersionUnsupported {
                offered: result.protocol_version,
            });
        }

        *self.remote_info.write() = Some(result.server_info);
        *self.remote_capabilities.write() = Some(result.capabilities);

        self.dispatcher
            .send_notification(Method::NotificationInitialized.as_str(), None)
            .await?;
        self.dispatcher.set_state(DispatcherState::Ready);
        Ok(())
    }

    /// Close the underlying transport. Idempotent.
    pub async fn close(&self) -> Result<()> {
        self.dispatcher.close().await
    }

    fn assert_remote(&self, method: &str) -> Result<()> {
        if !self.dispatcher.config().enforce_strict_capabilities {
            return Ok(());
        }
        assert_remote_capability(self.remote_capabilities.read().as_ref(), method)
    }

    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.assert_remote(method)?;
        self.dispatcher.send_request(method, params, RequestOptions::default()).await
    }

    /// Liveness check. Requires no capability.
    pub async fn ping(&self) -> Result<()> {
        self.dispatcher.send_request(Method::Ping.as_str(), None, RequestOptions::default()).await?;
        Ok(())
    }

    pub async fn list_tools(&self) -> Result<Value> {
        self.call(Method::ToolsList.as_str(), None).await
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        self.call(
            Method::ToolsCall.as_str(),
            Some(serde_json::json!({"name": name, "arguments": arguments})),
        )
        .await
    }

    pub async fn list_resources(&self) -> Result<Value> {
        self.call(Method::ResourcesList.as_str(), None).await
    }

    pub async fn list_resource_templates(&self) -> Result<Value> {
        self.call(Method::ResourcesTemplatesList.as_str(), None).await
    }

    pub async fn read_resource(&self, uri: &str) -> Result<Value> {
        self.call(Method::ResourcesRead.as_str(), Some(serde_json::json!({"uri": uri}))).await
    }

    pub async fn subscribe_resource(&self, uri: &str) -> Result<Value> {
        self.call(Method::ResourcesSubscribe.as_str(), Some(serde_json::json!({"uri": uri}))).await
    }

    pub async fn unsubscribe_resource(&self, uri: &str) -> Result<Value> {
        self.call(Method::ResourcesUnsubscribe.as_str(), Some(serde_json::json!({"uri": uri}))).await
    }

    pub async fn list_prompts(&self) -> Result<Value> {
        self.call(Method::PromptsList.as_str(), None).await
    }

    pub async fn get_prompt(&self, name: &str, arguments: Option<Value>) -> Result<Value> {
        let mut params = serde_json::json!({"name": name});
        if let Some(arguments) = arguments {
            params["arguments"] = arguments;
        }
        self.call(Method::PromptsGet.as_str(), Some(params)).await
    }

    pub async fn set_logging_level(&self, level: &str) -> Result<Value> {
        self.call(Method::LoggingSetLevel.as_str(), Some(serde_json::json!({"level": level}))).await
    }

    pub async fn complete(&self, params: Value) -> Result<Value> {
        self.call(Method::CompletionComplete.as_str(), Some(params)).await
    }

    /// Register the handler for server-initiated `sampling/createMessage`
    /// calls. Fails if local `sampling` capability was not advertised.
    pub fn register_sampling_handler(&self, handler: Arc<dyn RequestHandler>) -> Result<()> {
        if self.local_capabilities.sampling.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "sampling".to_string(),
                method: Method::SamplingCreateMessage.as_str().to_string(),
            });
        }
        self.dispatcher.register_request_handler(Method::SamplingCreateMessage.as_str(), handler);
        Ok(())
    }

    /// Register the handler for server-initiated `roots/list` calls. Fails
    /// if local `roots` capability was not advertised.
    pub fn register_roots_list_handler(&self, handler: Arc<dyn RequestHandler>) -> Result<()> {
        if self.local_capabilities.roots.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "roots".to_string(),
                method: Method::RootsList.as_str().to_string(),
            });
        }
        self.dispatcher.register_request_handler(Method::RootsList.as_str(), handler);
        Ok(())
    }

    /// Emit `notifications/roots/list_changed`. Fails if local
    /// `roots.listChanged` was not advertised as `true`.
    pub async fn notify_roots_list_changed(&self) -> Result<()> {
        if !self.local_capabilities.supports_roots_list_changed() {
            return Err(Error::CapabilityMissing {
                capability: "roots.listChanged".to_string(),
                method: Method::NotificationRootsListChanged.as_str().to_string(),
            });
        }
        self.dispatcher
            .send_notification(Method::NotificationRootsListChanged.as_str(), None)
            .await
    }
}
