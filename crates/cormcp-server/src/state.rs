//! Shared state behind every pre-registered handler (§4.I).

use crate::catalog::{Prompt, Resource, Tool};
use cormcp_protocol::{ClientCapabilities, Implementation, ServerCapabilities};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

pub(crate) struct ServerState {
    pub(crate) local_info: Implementation,
    pub(crate) local_capabilities: ServerCapabilities,
    pub(crate) tools: DashMap<String, Tool>,
    pub(crate) prompts: DashMap<String, Prompt>,
    pub(crate) resources: DashMap<String, Resource>,
    pub(crate) remote_info: RwLock<Option<Implementation>>,
    pub(crate) remote_capabilities: RwLock<Option<ClientCapabilities>>,
    pub(crate) on_initialized: RwLock<Option<Arc<dyn Fn() + Send + Sync>>>,
}
