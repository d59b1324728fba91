//! JSON-RPC 2.0 wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use streamgate_core::RemoteError;

/// JSON-RPC request ID: string, number, or null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(u64),
    String(String),
    Null,
}

/// A JSON-RPC 2.0 request. `params` is positional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: RpcId,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id: RpcId::Number(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<JsonRpcError> for RemoteError {
    fn from(e: JsonRpcError) -> Self {
        RemoteError::Rpc {
            code: e.code,
            message: e.message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RpcId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// The result value, or the node's error. A missing result is `null`.
    pub fn into_result(self) -> Result<Value, RemoteError> {
        match self.error {
            Some(err) => Err(err.into()),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A server push: `{"method": "...", "params": {"subscription", "result"}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    pub method: String,
    pub params: NotificationParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationParams {
    pub subscription: String,
    #[serde(default)]
    pub result: Value,
}
