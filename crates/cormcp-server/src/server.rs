//! The MCP server role engine (§4.I).

use crate::capability::{
    assert_local_notification_capability, assert_local_prompts_capability, assert_local_resources_capability,
    assert_local_tools_capability, assert_remote_capability,
};
use crate::catalog::{Prompt, Resource, Tool};
use crate::handlers::{
    InitializeHandler, InitializedHandler, PromptsGetHandler, PromptsListHandler, ResourcesListHandler,
    ResourcesReadHandler, ResourcesTemplatesListHandler, ToolsCallHandler, ToolsListHandler,
};
use crate::state::ServerState;
use cormcp_dispatcher::{Dispatcher, DispatcherConfig, DispatcherState, RequestHandler, RequestOptions};
use cormcp_protocol::{ClientCapabilities, Error, Implementation, Method, Result, ServerCapabilities};
use cormcp_transport::Transport;
use serde_json::Value;
use std::sync::Arc;

/// A server-role MCP endpoint. Construct once per connection (or reuse
/// across connections if the catalogues are meant to be shared — this type
/// does not assume either way).
pub struct Server {
    dispatcher: Arc<Dispatcher>,
    state: Arc<ServerState>,
}

impl Server {
    /// A server identifying itself as `local_info` with `local_capabilities`,
    /// with the standard handler set already registered.
    pub fn new(local_info: Implementation, local_capabilities: ServerCapabilities, config: DispatcherConfig) -> Arc<Self> {
        let dispatcher = Dispatcher::new(config);
        let state = Arc::new(ServerState {
            local_info,
            local_capabilities,
            tools: Default::default(),
            prompts: Default::default(),
            resources: Default::default(),
            remote_info: Default::default(),
            remote_capabilities: Default::default(),
            on_initialized: Default::default(),
        });

        dispatcher.register_request_handler(
            Method::Initialize.as_str(),
            Arc::new(InitializeHandler { state: Arc::clone(&state) }),
        );
        dispatcher.register_notification_handler(
            Method::NotificationInitialized.as_str(),
            Arc::new(InitializedHandler { state: Arc::clone(&state) }),
        );
        dispatcher.register_request_handler(
            Method::ToolsList.as_str(),
            Arc::new(ToolsListHandler { state: Arc::clone(&state) }),
        );
        dispatcher.register_request_handler(
            Method::ToolsCall.as_str(),
            Arc::new(ToolsCallHandler { state: Arc::clone(&state) }),
        );
        dispatcher.register_request_handler(
            Method::PromptsList.as_str(),
            Arc::new(PromptsListHandler { state: Arc::clone(&state) }),
        );
        dispatcher.register_request_handler(
            Method::PromptsGet.as_str(),
            Arc::new(PromptsGetHandler { state: Arc::clone(&state) }),
        );
        dispatcher.register_request_handler(
            Method::ResourcesList.as_str(),
            Arc::new(ResourcesListHandler { state: Arc::clone(&state) }),
        );
        dispatcher.register_request_handler(
            Method::ResourcesRead.as_str(),
            Arc::new(ResourcesReadHandler { state: Arc::clone(&state) }),
        );
        dispatcher.register_request_handler(Method::ResourcesTemplatesList.as_str(), Arc::new(ResourcesTemplatesListHandler));

        Arc::new(Self { dispatcher, state })
    }

    /// The underlying dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The client's identity, once `initialize` has been handled.
    pub fn remote_info(&self) -> Option<Implementation> {
        self.state.remote_info.read().clone()
    }

    /// The client's advertised capabilities, once `initialize` has been handled.
    pub fn remote_capabilities(&self) -> Option<ClientCapabilities> {
        self.state.remote_capabilities.read().clone()
    }

    /// Fires once the client's `notifications/initialized` has been handled.
    pub fn set_on_initialized(&self, hook: Arc<dyn Fn() + Send + Sync>) {
        *self.state.on_initialized.write() = Some(hook);
    }

    /// Start the transport. The server is immediately `Ready` to answer
    /// `initialize` (§4.J) — no handshake is driven from this side.
    pub async fn connect(&self, transport: Box<dyn Transport>) -> Result<()> {
        self.dispatcher.connect(transport).await?;
        self.dispatcher.set_state(DispatcherState::Ready);
        Ok(())
    }

    /// Close the underlying transport. Idempotent.
    pub async fn close(&self) -> Result<()> {
        self.dispatcher.close().await
    }

    /// Add a tool to the catalogue. Fails if local `tools` capability was
    /// not advertised.
    pub fn register_tool(&self, tool: Tool) -> Result<()> {
        assert_local_tools_capability(&self.state.local_capabilities)?;
        self.state.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    /// Add a prompt to the catalogue. Fails if local `prompts` capability
    /// was not advertised.
    pub fn register_prompt(&self, prompt: Prompt) -> Result<()> {
        assert_local_prompts_capability(&self.state.local_capabilities)?;
        self.state.prompts.insert(prompt.name.clone(), prompt);
        Ok(())
    }

    /// Add a resource to the catalogue. Fails if local `resources`
    /// capability was not advertised.
    pub fn register_resource(&self, resource: Resource) -> Result<()> {
        assert_local_resources_capability(&self.state.local_capabilities)?;
        self.state.resources.insert(resource.uri.clone(), resource);
        Ok(())
    }

    fn assert_remote(&self, method: &str) -> Result<()> {
        if !self.dispatcher.config().enforce_strict_capabilities {
            return Ok(());
        }
        assert_remote_capability(self.state.remote_capabilities.read().as_ref(), method)
    }

    /// Server-initiated `sampling/createMessage`. Requires the client to
    /// have advertised local `sampling`.
    pub async fn create_message(&self, params: Value) -> Result<Value> {
        self.assert_remote(Method::SamplingCreateMessage.as_str())?;
        self.dispatcher
            .send_request(Method::SamplingCreateMessage.as_str(), Some(params), RequestOptions::default())
            .await
    }

    /// Server-initiated `roots/list`. Requires the client to have
    /// advertised local `roots`.
    pub async fn list_roots(&self) -> Result<Value> {
        self.assert_remote(Method::RootsList.as_str())?;
        self.dispatcher
            .send_request(Method::RootsList.as_str(), None, RequestOptions::default())
            .await
    }

    /// Register an additional inbound request handler (for a custom method,
    /// or to override one of the standard ones).
    pub fn register_request_handler(&self, method: impl Into<String>, handler: Arc<dyn RequestHandler>) {
        self.dispatcher.register_request_handler(method, handler);
    }

    async fn emit_notification(&self, method: &str, params: Option<Value>) -> Result<()> {
        assert_local_notification_capability(&self.state.local_capabilities, method)?;
        self.dispatcher.send_notification(method.to_string(), params).await
    }

    pub async fn notify_tools_list_changed(&self) -> Result<()> {
        self.emit_notification(Method::NotificationToolsListChanged.as_str(), None).await
    }

    pub async fn notify_prompts_list_changed(&self) -> Result<()> {
        self.emit_notification(Method::NotificationPromptsListChanged.as_str(), None).await
    }

    pub async fn notify_resources_list_changed(&self) -> Result<()> {
        self.emit_notification(Method::NotificationResourcesListChanged.as_str(), None).await
    }

    pub async fn notify_resource_updated(&self, uri: &str) -> Result<()> {
        self.emit_notification(
            Method::NotificationResourcesUpdated.as_str(),
            Some(serde_json::json!({"uri": uri})),
        )
        .await
    }

    pub async fn notify_logging_message(&self, level: &str, data: Value) -> Result<()> {
        self.emit_notification(
            Method::NotificationLoggingMessage.as_str(),
            Some(serde_json::json!({"level": level, "data": data})),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cormcp_loopback::pair;
    use cormcp_protocol::jsonrpc::RpcError;
    use crate::catalog::ToolHandler;

    fn server_info() -> Implementation {
        Implementation { name: "test".into(), version: "1.0".into() }
    }

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        async fn call(&self, arguments: Value) -> Result<Value, RpcError> {
            Ok(arguments)
        }
    }

    #[tokio::test]
    async fn registering_a_tool_requires_the_capability() {
        let server = Server::new(server_info(), ServerCapabilities::default(), DispatcherConfig::default());
        let err = server
            .register_tool(Tool {
                name: "echo".into(),
                description: None,
                input_schema: serde_json::json!({}),
                handler: Arc::new(EchoTool),
            })
            .unwrap_err();
        assert!(matches!(err, Error::CapabilityMissing { .. }));
    }

    #[tokio::test]
    async fn tool_call_round_trips_through_loopback() {
        let caps = ServerCapabilities {
            tools: Some(Default::default()),
            ..Default::default()
        };
        let server = Server::new(server_info(), caps, DispatcherConfig::default());
        server
            .register_tool(Tool {
                name: "echo".into(),
                description: Some("echoes its arguments".into()),
                input_schema: serde_json::json!({"type": "object"}),
                handler: Arc::new(EchoTool),
            })
            .unwrap();

        let (client_transport, server_transport) = pair();
        server.connect(Box::new(server_transport)).await.unwrap();

        let client_dispatcher = Dispatcher::new(DispatcherConfig::default());
        client_dispatcher.connect(Box::new(client_transport)).await.unwrap();

        let result = client_dispatcher
            .send_request(
                Method::ToolsCall.as_str(),
                Some(serde_json::json!({"name": "echo", "arguments": {"hello": "world"}})),
                RequestOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"hello": "world"}));
    }
}
