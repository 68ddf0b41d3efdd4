//! `initialize` request/response payloads (§4.A, §4.I).

use crate::capabilities::{ClientCapabilities, ServerCapabilities};
use crate::types::Implementation;
use serde::{Deserialize, Serialize};

/// Params of the client's `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    #[serde(rename = "clientInfo")]
    pub client_info: Implementation,
}

/// Result of the server's reply to `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: Implementation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn initialize_params_round_trip() {
        let params = InitializeParams {
            protocol_version: "2024-11-05".into(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "test-client".into(),
                version: "1.0".into(),
            },
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["protocolVersion"], json!("2024-11-05"));
        let back: InitializeParams = serde_json::from_value(value).unwrap();
        assert_eq!(back, params);
    }
}
