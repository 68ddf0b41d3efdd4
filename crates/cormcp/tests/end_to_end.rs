//! Cross-crate scenarios that exercise the client and server role engines
//! together over a loopback pair, rather than any one crate in isolation.

use async_trait::async_trait;
use cormcp::{Client, ClientCapabilities, DispatcherConfig, Error, Implementation, Server, ServerCapabilities};
use cormcp_loopback::pair;
use cormcp_protocol::jsonrpc::RpcError;
use cormcp_server::{Tool, ToolHandler};
use std::sync::Arc;

fn client_info() -> Implementation {
    Implementation { name: "e2e-client".into(), version: "1.0".into() }
}

fn server_info() -> Implementation {
    Implementation { name: "e2e-server".into(), version: "1.0".into() }
}

/// S1: a fresh client and server complete `initialize` /
/// `notifications/initialized` over loopback and each record the other's
/// identity.
#[tokio::test]
async fn handshake_exchanges_identity_and_capabilities() {
    let (client_transport, server_transport) = pair();
    let client = Client::new(client_info(), ClientCapabilities::default(), DispatcherConfig::default());
    let caps = ServerCapabilities { tools: Some(Default::default()), ..Default::default() };
    let server = Server::new(server_info(), caps, DispatcherConfig::default());

    let (server_result, client_result) =
        tokio::join!(server.connect(Box::new(server_transport)), client.connect(Box::new(client_transport)));
    server_result.unwrap();
    client_result.unwrap();

    assert_eq!(client.remote_info(), Some(server_info()));
    assert!(client.remote_capabilities().unwrap().tools.is_some());
    assert_eq!(server.remote_info(), Some(client_info()));
}

/// S2: a server that names the legacy protocol version is still accepted,
/// since it remains in the supported set.
#[tokio::test]
async fn legacy_protocol_version_is_accepted() {
    use cormcp_dispatcher::{Dispatcher, FnRequestHandler};
    use cormcp_protocol::Method;

    let (client_transport, server_transport) = pair();
    let client = Client::new(client_info(), ClientCapabilities::default(), DispatcherConfig::default());

    let stub = Dispatcher::new(DispatcherConfig::default());
    stub.connect(Box::new(server_transport)).await.unwrap();
    stub.register_request_handler(
        Method::Initialize.as_str(),
        Arc::new(FnRequestHandler(|_params, _cancel| async move {
            Ok(serde_json::json!({
                "protocolVersion": "2024-10-07",
                "capabilities": {},
                "serverInfo": {"name": "legacy-server", "version": "0.1"}
            }))
        })),
    );

    client.connect(Box::new(client_transport)).await.unwrap();
    assert_eq!(
        client.remote_info(),
        Some(Implementation { name: "legacy-server".into(), version: "0.1".into() })
    );
}

struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value, RpcError> {
        Ok(arguments)
    }
}

/// A full `tools/call` round trip through the role engines, gated by the
/// server's advertised `tools` capability.
#[tokio::test]
async fn tool_call_round_trips_after_handshake() {
    let (client_transport, server_transport) = pair();
    let client = Client::new(client_info(), ClientCapabilities::default(), DispatcherConfig::default());
    let caps = ServerCapabilities { tools: Some(Default::default()), ..Default::default() };
    let server = Server::new(server_info(), caps, DispatcherConfig::default());
    server
        .register_tool(Tool {
            name: "echo".into(),
            description: Some("echoes its arguments".into()),
            input_schema: serde_json::json!({"type": "object"}),
            handler: Arc::new(EchoTool),
        })
        .unwrap();

    let (server_result, client_result) =
        tokio::join!(server.connect(Box::new(server_transport)), client.connect(Box::new(client_transport)));
    server_result.unwrap();
    client_result.unwrap();

    let result = client.call_tool("echo", serde_json::json!({"n": 1})).await.unwrap();
    assert_eq!(result, serde_json::json!({"n": 1}));
}

/// S4: a method that passes local capability gating but has no registered
/// handler surfaces as a `PeerError` carrying the method-not-found code.
/// The server advertises `prompts`, which is what `completion/complete`
/// requires client-side (§4.I), but `Server::new` never registers a
/// `completion/complete` handler, so the request reaches the wire and
/// comes back as a peer-side rejection rather than a local one.
#[tokio::test]
async fn unhandled_well_known_method_is_a_peer_error() {
    let (client_transport, server_transport) = pair();
    let client = Client::new(client_info(), ClientCapabilities::default(), DispatcherConfig::default());
    let caps = ServerCapabilities { prompts: Some(Default::default()), ..Default::default() };
    let server = Server::new(server_info(), caps, DispatcherConfig::default());

    let (server_result, client_result) =
        tokio::join!(server.connect(Box::new(server_transport)), client.connect(Box::new(client_transport)));
    server_result.unwrap();
    client_result.unwrap();

    let err = client.complete(serde_json::json!({"ref": {"type": "ref/prompt", "name": "x"}})).await.unwrap_err();
    assert!(matches!(err, Error::PeerError { code, .. } if code == cormcp_protocol::ErrorCode::MethodNotFound.code()));
}
