//! JSON-RPC 2.0 Types
//!
//! Envelopes exchanged over a session: inbound messages (requests or
//! notifications) and outbound responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ErrorData;

/// JSON-RPC version marker - always "2.0" on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str("2.0")
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == "2.0" {
            Ok(JsonRpcVersion)
        } else {
            Err(serde::de::Error::custom(format!(
                "expected JSON-RPC version '2.0', got '{}'",
                s
            )))
        }
    }
}

/// Request ID - a string or an integer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// An inbound JSON-RPC message: a request (has id) or a notification (no id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcMessage {
    pub jsonrpc: JsonRpcVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcMessage {
    /// Create a request.
    pub fn request(id: impl Into<RequestId>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id: Some(id.into()),
            method: method.into(),
            params: Some(params),
        }
    }

    /// Create a notification (no id).
    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id: None,
            method: method.into(),
            params: Some(params),
        }
    }

    /// Decode raw bytes into a message.
    ///
    /// Anything that is not a JSON-RPC 2.0 request or notification is
    /// rejected, including client responses (no `method`).
    pub fn decode(bytes: &[u8]) -> Result<Self, String> {
        serde_json::from_slice(bytes).map_err(|e| format!("Invalid JSON-RPC: {}", e))
    }

    /// Returns true if this is a notification (no id).
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Outcome half of a response: exactly one of `result` or `error`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(ErrorData),
}

/// An outbound JSON-RPC response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: JsonRpcVersion,
    pub id: RequestId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl JsonRpcResponse {
    /// Create a successful response.
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            outcome: Outcome::Result(result),
        }
    }

    /// Create an error response.
    pub fn error(id: RequestId, error: ErrorData) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            outcome: Outcome::Error(error),
        }
    }

    /// Build from a dispatch result.
    pub fn from_result(id: RequestId, result: Result<Value, ErrorData>) -> Self {
        match result {
            Ok(value) => Self::success(id, value),
            Err(error) => Self::error(id, error),
        }
    }

    /// Returns the error, if this is an error response.
    pub fn as_error(&self) -> Option<&ErrorData> {
        match &self.outcome {
            Outcome::Error(e) => Some(e),
            Outcome::Result(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_forms() {
        let parsed: RequestId = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, RequestId::Number(42));

        let parsed: RequestId = serde_json::from_str("\"abc-123\"").unwrap();
        assert_eq!(parsed, RequestId::String("abc-123".to_string()));
    }

    #[test]
    fn test_decode_request_and_notification() {
        let req = JsonRpcMessage::decode(
            br#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"get_order"}}"#,
        )
        .unwrap();
        assert!(!req.is_notification());
        assert_eq!(req.method, "tools/call");

        let note =
            JsonRpcMessage::decode(br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .unwrap();
        assert!(note.is_notification());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(JsonRpcMessage::decode(b"not json").is_err());
        assert!(JsonRpcMessage::decode(br#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#).is_err());
        // a client response carries no method
        assert!(JsonRpcMessage::decode(br#"{"jsonrpc":"2.0","id":1,"result":{}}"#).is_err());
    }

    #[test]
    fn test_response_shapes() {
        let ok = JsonRpcResponse::success(RequestId::Number(7), json!({ "tools": [] }));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 7);
        assert!(json["result"]["tools"].is_array());
        assert!(json.get("error").is_none());

        let err = JsonRpcResponse::error(
            RequestId::from("r1"),
            ErrorData::method_not_found("nope"),
        );
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["id"], "r1");
        assert_eq!(json["error"]["code"], -32601);
        assert!(json.get("result").is_none());
    }
}
