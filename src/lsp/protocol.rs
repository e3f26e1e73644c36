//! JSON-RPC 2.0 message shapes exchanged with the language server.
//!
//! Serialization follows the LSP convention: optional members are omitted
//! entirely rather than serialized as `null`, and a request with no id is a
//! notification.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version stamped on every outgoing request.
pub const JSONRPC_VERSION: &str = "2.0";

/// An outgoing JSON-RPC request.
///
/// An empty `id` marks the request as a notification: the id is omitted from
/// the serialized form and the server will not answer it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    /// Build a request expecting a response.
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    /// Build a notification (no id, no response expected).
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self::new("", method, params)
    }
}

/// A response received from the language server.
///
/// `headers` carries the frame headers the response arrived with and
/// `notification` marks the synthetic placeholder returned for notification
/// sends; neither appears in the JSON form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    #[serde(skip)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
    #[serde(skip)]
    pub notification: bool,
}

/// The error member of a failed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
