//! JSON-RPC 2.0 envelope types and the codec that discriminates between them.
//!
//! Discrimination follows the presence of fields rather than an explicit
//! tag: `method` + `id` is a [`Message::Request`], `method` alone is a
//! [`Message::Notification`], `result` is a [`Message::Response`], and
//! `error` is a [`Message::ErrorResponse`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Fixed JSON-RPC version string carried on every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request identifier. Allocated monotonically per dispatcher instance.
pub type RequestId = u64;

/// One fully decoded JSON-RPC message, in any of the four envelope shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// An outbound/inbound call expecting a matching response.
    Request(Request),
    /// A fire-and-forget call with no response.
    Notification(Notification),
    /// A successful reply to a prior request.
    Response(Response),
    /// A failed reply to a prior request.
    ErrorResponse(ErrorResponse),
}

/// A JSON-RPC request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: Version,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC notification envelope (no `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: Version,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC success response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: Version,
    pub id: RequestId,
    pub result: Value,
}

/// A JSON-RPC error response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub jsonrpc: Version,
    pub id: RequestId,
    pub error: RpcError,
}

/// The `error` object of an [`ErrorResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Marker type that serializes to `"2.0"` and rejects anything else on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Version;

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == JSONRPC_VERSION {
            Ok(Version)
        } else {
            Err(serde::de::Error::custom(format!(
                "unsupported jsonrpc version `{s}`, expected `{JSONRPC_VERSION}`"
            )))
        }
    }
}

/// Well-known JSON-RPC and MCP error codes (§4.A).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ConnectionClosed,
    RequestTimeout,
    Other(i32),
}

impl ErrorCode {
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ConnectionClosed => -1,
            Self::RequestTimeout => -2,
            Self::Other(code) => code,
        }
    }

    pub const fn from_code(code: i32) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            -1 => Self::ConnectionClosed,
            -2 => Self::RequestTimeout,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotFound,
            format!("Method not found: {method}"),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

/// Error surfaced while decoding a byte or JSON blob into a [`Message`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("envelope has neither `result`, `error`, nor `method`")]
    Unrecognized,
}

/// Encode a [`Message`] to a single JSON line (no trailing newline).
pub fn encode(message: &Message) -> serde_json::Result<String> {
    match message {
        Message::Request(r) => serde_json::to_string(r),
        Message::Notification(n) => serde_json::to_string(n),
        Message::Response(r) => serde_json::to_string(r),
        Message::ErrorResponse(e) => serde_json::to_string(e),
    }
}

/// Decode one JSON value into a [`Message`], discriminating on field presence
/// per §4.A rather than a tag field.
pub fn decode(raw: &str) -> Result<Message, CodecError> {
    let value: Value = serde_json::from_str(raw)?;
    decode_value(value)
}

/// As [`decode`], but from an already-parsed [`Value`].
pub fn decode_value(value: Value) -> Result<Message, CodecError> {
    let obj = value.as_object().ok_or(CodecError::Unrecognized)?;

    if obj.contains_key("result") {
        return Ok(Message::Response(serde_json::from_value(value)?));
    }
    if obj.contains_key("error") {
        return Ok(Message::ErrorResponse(serde_json::from_value(value)?));
    }
    if obj.contains_key("method") {
        if obj.contains_key("id") {
            return Ok(Message::Request(serde_json::from_value(value)?));
        }
        return Ok(Message::Notification(serde_json::from_value(value)?));
    }
    Err(CodecError::Unrecognized)
}

impl Message {
    /// The request/response correlation id, if this variant carries one.
    pub fn id(&self) -> Option<RequestId> {
        match self {
            Message::Request(r) => Some(r.id),
            Message::Response(r) => Some(r.id),
            Message::ErrorResponse(e) => Some(e.id),
            Message::Notification(_) => None,
        }
    }
}
