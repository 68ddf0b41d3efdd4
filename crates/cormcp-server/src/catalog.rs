//! In-process catalogues of tools, prompts, and resources (§4.I), each
//! keyed by a stable string name or URI.

use async_trait::async_trait;
use cormcp_protocol::jsonrpc::RpcError;
use serde_json::Value;
use std::sync::Arc;

/// Executes one registered tool's business logic.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> Result<Value, RpcError>;
}

/// One entry in the tool catalogue.
pub struct Tool {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
    pub handler: Arc<dyn ToolHandler>,
}

/// Produces one registered prompt's rendered messages.
#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn get(&self, arguments: Option<Value>) -> Result<Value, RpcError>;
}

/// One entry in the prompt catalogue.
pub struct Prompt {
    pub name: String,
    pub description: Option<String>,
    pub handler: Arc<dyn PromptHandler>,
}

/// Reads one registered resource's contents.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(&self, uri: &str) -> Result<Value, RpcError>;
}

/// One entry in the resource catalogue.
pub struct Resource {
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    pub handler: Arc<dyn ResourceHandler>,
}
