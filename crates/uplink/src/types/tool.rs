//! Tool Types
//!
//! Tool definitions, call parameters and call results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::content::Content;

/// A tool definition as advertised by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Programmatic name of the tool. Dispatch matches on this exactly.
    pub name: String,

    /// Description for the LLM.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for input parameters.
    pub input_schema: Value,

    /// Additional tool annotations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

impl Tool {
    /// Create a tool that takes no arguments.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            input_schema: serde_json::json!({ "type": "object" }),
            annotations: None,
        }
    }

    /// Derive the input schema from an argument type.
    pub fn with_input_schema<T: JsonSchema>(mut self) -> Self {
        self.input_schema = crate::schema_helpers::schema_for::<T>();
        self
    }

    /// Mark this tool as read-only (doesn't modify upstream state).
    pub fn read_only(mut self) -> Self {
        let annotations = self.annotations.take().unwrap_or_default();
        self.annotations = Some(ToolAnnotations {
            read_only_hint: Some(true),
            ..annotations
        });
        self
    }

    /// Mark this tool as destructive (deletes or spends money).
    pub fn destructive(mut self) -> Self {
        let annotations = self.annotations.take().unwrap_or_default();
        self.annotations = Some(ToolAnnotations {
            destructive_hint: Some(true),
            ..annotations
        });
        self
    }
}

/// Tool behavior hints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
}

/// Parameters for a `tools/call` request: the tool invocation envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Name of the tool to call.
    pub name: String,

    /// Arguments to pass to the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
}

impl CallToolParams {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            _ => None,
        };
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Arguments as a JSON object, empty when none were sent.
    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone().unwrap_or_default())
    }
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Content blocks representing the result.
    pub content: Vec<Content>,

    /// Whether the tool call resulted in an error.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,

    /// Machine-readable result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl CallToolResult {
    /// Create a successful result with content.
    pub fn success(content: Vec<Content>) -> Self {
        Self {
            content,
            is_error: false,
            structured_content: None,
        }
    }

    /// Create a successful result with a single text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self::success(vec![Content::text(text)])
    }

    /// Create a successful result from JSON: pretty text plus structured content.
    pub fn json(value: Value) -> Self {
        Self {
            content: vec![Content::json(&value)],
            is_error: false,
            structured_content: Some(value),
        }
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: true,
            structured_content: None,
        }
    }

    /// Add structured content.
    pub fn with_structured(mut self, value: Value) -> Self {
        self.structured_content = Some(value);
        self
    }
}

/// Result of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl ListToolsResult {
    /// All tools in one page.
    pub fn all(tools: Vec<Tool>) -> Self {
        Self {
            tools,
            next_cursor: None,
        }
    }
}
