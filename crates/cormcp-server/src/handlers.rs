//! Pre-registered handlers for the methods §4.I says a server always
//! answers: `initialize`, `notifications/initialized`, and the
//! tools/prompts/resources catalogue operations.

use crate::state::ServerState;
use async_trait::async_trait;
use cormcp_dispatcher::{NotificationHandler, RequestHandler};
use cormcp_protocol::jsonrpc::{ErrorCode, RpcError};
use cormcp_protocol::{is_supported_protocol_version, InitializeParams, InitializeResult, LATEST_PROTOCOL_VERSION};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub(crate) struct InitializeHandler {
    pub(crate) state: Arc<ServerState>,
}

#[async_trait]
impl RequestHandler for InitializeHandler {
    async fn handle(&self, params: Option<Value>, _cancel: CancellationToken) -> Result<Value, RpcError> {
        let params: InitializeParams = match params {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| RpcError::new(ErrorCode::InvalidParams, e.to_string()))?,
            None => return Err(RpcError::new(ErrorCode::InvalidParams, "initialize requires params")),
        };

        let protocol_version = if is_supported_protocol_version(&params.protocol_version) {
            params.protocol_version.clone()
        } else {
            LATEST_PROTOCOL_VERSION.to_string()
        };

        *self.state.remote_info.write() = Some(params.client_info);
        *self.state.remote_capabilities.write() = Some(params.capabilities);

        let result = InitializeResult {
            protocol_version,
            capabilities: self.state.local_capabilities.clone(),
            server_info: self.state.local_info.clone(),
        };
        Ok(serde_json::to_value(result).expect("InitializeResult always serializes"))
    }
}

pub(crate) struct InitializedHandler {
    pub(crate) state: Arc<ServerState>,
}

#[async_trait]
impl NotificationHandler for InitializedHandler {
    async fn handle(&self, _params: Option<Value>) {
        if let Some(hook) = self.state.on_initialized.read().clone() {
            hook();
        }
    }
}

pub(crate) struct ToolsListHandler {
    pub(crate) state: Arc<ServerState>,
}

#[async_trait]
impl RequestHandler for ToolsListHandler {
    async fn handle(&self, _params: Option<Value>, _cancel: CancellationToken) -> Result<Value, RpcError> {
        let tools: Vec<Value> = self
            .state
            .tools
            .iter()
            .map(|entry| {
                let tool = entry.value();
                serde_json::json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema,
                })
            })
            .collect();
        Ok(serde_json::json!({"tools": tools}))
    }
}

pub(crate) struct ToolsCallHandler {
    pub(crate) state: Arc<ServerState>,
}

#[async_trait]
impl RequestHandler for ToolsCallHandler {
    async fn handle(&self, params: Option<Value>, _cancel: CancellationToken) -> Result<Value, RpcError> {
        let params = params.ok_or_else(|| RpcError::new(ErrorCode::InvalidParams, "tools/call requires params"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::new(ErrorCode::InvalidParams, "tools/call requires `name`"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
        let tool = self
            .state
            .tools
            .get(name)
            .map(|entry| Arc::clone(&entry.value().handler))
            .ok_or_else(|| RpcError::new(ErrorCode::InvalidParams, format!("unknown tool `{name}`")))?;
        tool.call(arguments).await
    }
}

pub(crate) struct PromptsListHandler {
    pub(crate) state: Arc<ServerState>,
}

#[async_trait]
impl RequestHandler for PromptsListHandler {
    async fn handle(&self, _params: Option<Value>, _cancel: CancellationToken) -> Result<Value, RpcError> {
        let prompts: Vec<Value> = self
            .state
            .prompts
            .iter()
            .map(|entry| {
                let prompt = entry.value();
                serde_json::json!({"name": prompt.name, "description": prompt.description})
            })
            .collect();
        Ok(serde_json::json!({"prompts": prompts}))
    }
}

pub(crate) struct PromptsGetHandler {
    pub(crate) state: Arc<ServerState>,
}

#[async_trait]
impl RequestHandler for PromptsGetHandler {
    async fn handle(&self, params: Option<Value>, _cancel: CancellationToken) -> Result<Value, RpcError> {
        let params = params.ok_or_else(|| RpcError::new(ErrorCode::InvalidParams, "prompts/get requires params"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::new(ErrorCode::InvalidParams, "prompts/get requires `name`"))?;
        let arguments = params.get("arguments").cloned();
        let prompt = self
            .state
            .prompts
            .get(name)
            .map(|entry| Arc::clone(&entry.value().handler))
            .ok_or_else(|| RpcError::new(ErrorCode::InvalidParams, format!("unknown prompt `{name}`")))?;
        prompt.get(arguments).await
    }
}

pub(crate) struct ResourcesListHandler {
    pub(crate) state: Arc<ServerState>,
}

#[async_trait]
impl RequestHandler for ResourcesListHandler {
    async fn handle(&self, _params: Option<Value>, _cancel: CancellationToken) -> Result<Value, RpcError> {
        let resources: Vec<Value> = self
            .state
            .resources
            .iter()
            .map(|entry| {
                let resource = entry.value();
                serde_json::json!({
                    "uri": resource.uri,
                    "name": resource.name,
                    "description": resource.description,
                    "mimeType": resource.mime_type,
                })
            })
            .collect();
        Ok(serde_json::json!({"resources": resources}))
    }
}

pub(crate) struct ResourcesReadHandler {
    pub(crate) state: Arc<ServerState>,
}

#[async_trait]
impl RequestHandler for ResourcesReadHandler {
    async fn handle(&self, params: Option<Value>, _cancel: CancellationToken) -> Result<Value, RpcError> {
        let params = params.ok_or_else(|| RpcError::new(ErrorCode::InvalidParams, "resources/read requires params"))?;
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::new(ErrorCode::InvalidParams, "resources/read requires `uri`"))?;
        let resource = self
            .state
            .resources
            .get(uri)
            .map(|entry| Arc::clone(&entry.value().handler))
            .ok_or_else(|| RpcError::new(ErrorCode::InvalidParams, format!("unknown resource `{uri}`")))?;
        resource.read(uri).await
    }
}

/// Resource templates are out of the catalogue's detailed scope (§1); this
/// always answers with an empty list.
pub(crate) struct ResourcesTemplatesListHandler;

#[async_trait]
impl RequestHandler for ResourcesTemplatesListHandler {
    async fn handle(&self, _params: Option<Value>, _cancel: CancellationToken) -> Result<Value, RpcError> {
        Ok(serde_json::json!({"resourceTemplates": []}))
    }
}
