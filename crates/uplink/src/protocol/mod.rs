//! MCP Protocol Dispatch
//!
//! Routes JSON-RPC methods to their handlers, and tool calls to the tool
//! registered under the requested name. Nothing here knows about HTTP.
//!
//! Implements OpenTelemetry JSON-RPC semantic conventions for observability.
//! See: https://opentelemetry.io/docs/specs/semconv/rpc/json-rpc/

mod handler;

pub use handler::{tool_fn, BoxError, FailureKind, FnHandler, ToolContext, ToolFailure, ToolHandler};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;

use crate::config::ServerConfig;
use crate::types::error::ErrorData;
use crate::types::jsonrpc::{JsonRpcMessage, JsonRpcResponse};
use crate::types::protocol::{
    negotiate_version, Implementation, InitializeParams, InitializeResult, ServerCapabilities,
};
use crate::types::tool::{CallToolParams, CallToolResult, ListToolsResult, Tool};

struct RegisteredTool {
    tool: Tool,
    handler: Arc<dyn ToolHandler>,
}

/// Tool table plus the MCP method layer over it.
pub struct ProtocolServer {
    info: Implementation,
    instructions: Option<String>,
    tools: DashMap<String, RegisteredTool>,
}

impl ProtocolServer {
    pub fn new(info: Implementation) -> Self {
        Self {
            info,
            instructions: None,
            tools: DashMap::new(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let mut server = Self::new(Implementation::new(&config.name, &config.version));
        server.instructions = config.instructions.clone();
        server
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn info(&self) -> &Implementation {
        &self.info
    }

    /// Register a tool. A second registration under the same name replaces
    /// the first.
    pub fn register_tool(&self, tool: Tool, handler: Arc<dyn ToolHandler>) {
        let name = tool.name.clone();
        if self
            .tools
            .insert(name.clone(), RegisteredTool { tool, handler })
            .is_some()
        {
            tracing::warn!(tool = %name, "Replaced existing tool registration");
        } else {
            tracing::debug!(tool = %name, "Registered tool");
        }
    }

    /// Registered tools, sorted by name.
    pub fn tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.tools.iter().map(|e| e.value().tool.clone()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Invoke the tool named in `params`.
    pub async fn dispatch(
        &self,
        params: &CallToolParams,
        ctx: ToolContext,
    ) -> Result<CallToolResult, ToolFailure> {
        // clone the handler out so no map guard is held across the await
        let handler = self
            .tools
            .get(&params.name)
            .map(|entry| entry.value().handler.clone())
            .ok_or_else(|| ToolFailure::unknown_tool(&params.name))?;

        let span = tracing::info_span!(
            "mcp.tool.call",
            mcp.tool.name = %params.name,
            mcp.session_id = %ctx.session_id,
            error.type = tracing::field::Empty,
        );

        async {
            match handler.call(params.arguments_value(), ctx).await {
                Ok(result) => Ok(result),
                Err(e) => {
                    tracing::Span::current().record("error.type", "tool_execution");
                    tracing::warn!(error = %e, "Tool call failed");
                    Err(ToolFailure::execution(e.as_ref()))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Handle one inbound message. Notifications produce no response.
    ///
    /// Creates a span following JSON-RPC semantic conventions:
    /// - `rpc.system` = "jsonrpc"
    /// - `rpc.method` = the JSON-RPC method name
    /// - `rpc.jsonrpc.request_id` = the request ID (if present)
    /// - `mcp.session_id` = the MCP session identifier
    pub async fn handle_message(
        &self,
        message: &JsonRpcMessage,
        ctx: ToolContext,
    ) -> Option<JsonRpcResponse> {
        let request_id = message
            .id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default();

        let span = tracing::info_span!(
            "mcp.dispatch",
            rpc.system = "jsonrpc",
            rpc.method = %message.method,
            rpc.jsonrpc.version = "2.0",
            rpc.jsonrpc.request_id = %request_id,
            mcp.session_id = %ctx.session_id,
            error.type = tracing::field::Empty,
            rpc.jsonrpc.error_code = tracing::field::Empty,
        );

        async {
            let Some(id) = message.id.clone() else {
                tracing::debug!("Notification received");
                return None;
            };

            let result = self.route(message, ctx).await;
            if let Err(ref error) = result {
                let span = tracing::Span::current();
                span.record("error.type", error.code_label());
                span.record("rpc.jsonrpc.error_code", error.code);
            }
            Some(JsonRpcResponse::from_result(id, result))
        }
        .instrument(span)
        .await
    }

    async fn route(&self, message: &JsonRpcMessage, ctx: ToolContext) -> Result<Value, ErrorData> {
        match message.method.as_str() {
            "initialize" => self.initialize(message),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => to_value(&ListToolsResult::all(self.tools())),
            "tools/call" => {
                let params: CallToolParams = parse_params(message, "call")?;
                match self.dispatch(&params, ctx).await {
                    Ok(result) => to_value(&result),
                    Err(failure) => match failure.kind {
                        FailureKind::UnknownTool => Err(failure.to_error_data()),
                        FailureKind::ToolExecution => to_value(&failure.to_call_result()),
                    },
                }
            }
            _ => Err(ErrorData::method_not_found(&message.method)),
        }
    }

    fn initialize(&self, message: &JsonRpcMessage) -> Result<Value, ErrorData> {
        let params: InitializeParams = parse_params(message, "initialize")?;
        tracing::info!(
            client_name = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol_version = %params.protocol_version,
            "Client initialized"
        );

        let mut result = InitializeResult::new(
            negotiate_version(&params.protocol_version),
            self.info.clone(),
            ServerCapabilities::with_tools(),
        );
        if let Some(ref instructions) = self.instructions {
            result = result.with_instructions(instructions.clone());
        }
        to_value(&result)
    }
}

fn parse_params<T: DeserializeOwned>(message: &JsonRpcMessage, what: &str) -> Result<T, ErrorData> {
    message
        .params
        .as_ref()
        .map(|p| serde_json::from_value(p.clone()))
        .transpose()
        .map_err(|e| ErrorData::invalid_params(format!("Invalid {} params: {}", what, e)))?
        .ok_or_else(|| ErrorData::invalid_params(format!("Missing {} params", what)))
}

fn to_value<T: Serialize>(result: &T) -> Result<Value, ErrorData> {
    serde_json::to_value(result)
        .map_err(|e| ErrorData::internal_error(format!("Failed to serialize result: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::jsonrpc::Outcome;
    use serde_json::json;

    fn server() -> ProtocolServer {
        let server = ProtocolServer::new(Implementation::new("test-server", "1.0.0"));
        server.register_tool(
            Tool::new("echo", "Echo arguments back"),
            Arc::new(tool_fn(|args, _ctx| async move { Ok::<_, BoxError>(CallToolResult::json(args)) })),
        );
        server.register_tool(
            Tool::new("explode", "Always fails"),
            Arc::new(tool_fn(|_args, _ctx| async move {
                Err::<CallToolResult, BoxError>("quota exceeded".into())
            })),
        );
        server
    }

    fn result_of(response: JsonRpcResponse) -> Value {
        match response.outcome {
            Outcome::Result(value) => value,
            Outcome::Error(e) => panic!("unexpected error: {}", e),
        }
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_exact_name() {
        let server = server();
        let params = CallToolParams::new("echo", json!({ "aoi": "POINT(1 2)" }));
        let result = server.dispatch(&params, ToolContext::detached()).await.unwrap();
        assert_eq!(result.structured_content.unwrap()["aoi"], "POINT(1 2)");

        let params = CallToolParams::new("ECHO", json!({}));
        let failure = server.dispatch(&params, ToolContext::detached()).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::UnknownTool);
    }

    #[tokio::test]
    async fn test_handler_error_preserves_message() {
        let server = server();
        let params = CallToolParams::new("explode", json!({}));
        let failure = server.dispatch(&params, ToolContext::detached()).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::ToolExecution);
        assert_eq!(failure.message, "quota exceeded");
    }

    #[tokio::test]
    async fn test_reregistration_replaces() {
        let server = server();
        server.register_tool(
            Tool::new("echo", "Shout instead"),
            Arc::new(tool_fn(|_args, _ctx| async move { Ok::<_, BoxError>(CallToolResult::text("LOUD")) })),
        );
        assert_eq!(server.tools().len(), 2);

        let params = CallToolParams::new("echo", json!({}));
        let result = server.dispatch(&params, ToolContext::detached()).await.unwrap();
        assert_eq!(result.content[0].as_text(), Some("LOUD"));
    }

    #[tokio::test]
    async fn test_initialize_and_list() {
        let server = server();
        let init = JsonRpcMessage::request(
            1,
            "initialize",
            json!({
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": { "name": "agent", "version": "0.1" }
            }),
        );
        let value = result_of(server.handle_message(&init, ToolContext::detached()).await.unwrap());
        assert_eq!(value["protocolVersion"], "2025-03-26");
        assert_eq!(value["serverInfo"]["name"], "test-server");
        assert!(value["capabilities"]["tools"].is_object());

        let list = JsonRpcMessage::request(2, "tools/list", json!({}));
        let value = result_of(server.handle_message(&list, ToolContext::detached()).await.unwrap());
        let names: Vec<_> = value["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["echo", "explode"]);
    }

    #[tokio::test]
    async fn test_tools_call_failure_envelopes() {
        let server = server();

        let call = JsonRpcMessage::request(3, "tools/call", json!({ "name": "explode" }));
        let value = result_of(server.handle_message(&call, ToolContext::detached()).await.unwrap());
        assert_eq!(value["isError"], true);
        assert_eq!(value["structuredContent"]["kind"], "ToolExecutionError");

        let call = JsonRpcMessage::request(4, "tools/call", json!({ "name": "nope" }));
        let response = server.handle_message(&call, ToolContext::detached()).await.unwrap();
        let error = response.as_error().unwrap();
        assert_eq!(error.code, ErrorData::INVALID_PARAMS);
        assert_eq!(error.data.as_ref().unwrap()["kind"], "UnknownTool");
    }

    #[tokio::test]
    async fn test_notifications_and_unknown_methods() {
        let server = server();
        let note = JsonRpcMessage::notification("notifications/initialized", json!({}));
        assert!(server.handle_message(&note, ToolContext::detached()).await.is_none());

        let unknown = JsonRpcMessage::request(5, "resources/list", json!({}));
        let response = server.handle_message(&unknown, ToolContext::detached()).await.unwrap();
        assert_eq!(response.as_error().unwrap().code, ErrorData::METHOD_NOT_FOUND);

        let ping = JsonRpcMessage::request(6, "ping", json!({}));
        assert_eq!(
            result_of(server.handle_message(&ping, ToolContext::detached()).await.unwrap()),
            json!({})
        );
    }
}
