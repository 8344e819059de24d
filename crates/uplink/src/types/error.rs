//! JSON-RPC Error Objects
//!
//! Error data structures and standard error codes per JSON-RPC 2.0.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional error data (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorData {
    // https://www.jsonrpc.org/specification#error_object

    /// Parse error - Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;

    /// Invalid Request - The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;

    /// Method not found - The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid params - Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;

    /// Internal error - Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;

    /// Create a new error with code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach additional data.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Create a method not found error.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(Self::METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    /// Create an invalid params error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, message)
    }

    /// Create an internal error.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL_ERROR, message)
    }

    /// Short label for the error code, used on tracing spans.
    pub fn code_label(&self) -> &'static str {
        match self.code {
            Self::PARSE_ERROR => "parse_error",
            Self::INVALID_REQUEST => "invalid_request",
            Self::METHOD_NOT_FOUND => "method_not_found",
            Self::INVALID_PARAMS => "invalid_params",
            Self::INTERNAL_ERROR => "internal_error",
            _ => "application_error",
        }
    }
}

impl std::fmt::Display for ErrorData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorData {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_serialization() {
        let error = ErrorData::method_not_found("resources/list");
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(json["code"], -32601);
        assert_eq!(json["message"], "Method not found: resources/list");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_error_with_data() {
        let error = ErrorData::invalid_params("Unknown tool: teleport")
            .with_data(json!({ "kind": "UnknownTool" }));

        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], -32602);
        assert_eq!(json["data"]["kind"], "UnknownTool");
    }

    #[test]
    fn test_code_labels() {
        assert_eq!(ErrorData::new(ErrorData::PARSE_ERROR, "x").code_label(), "parse_error");
        assert_eq!(ErrorData::new(-32000, "x").code_label(), "application_error");
    }
}
