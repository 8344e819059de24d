//! Tool handler seam and the failure type handlers are shaped into.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::future::Future;
use std::marker::PhantomData;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::types::error::ErrorData;
use crate::types::tool::CallToolResult;

/// Error type handlers may return. Only its `Display` text reaches clients.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Context passed to every tool call.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Session the call arrived on.
    pub session_id: String,

    /// Cancelled once the session closes. Handlers may watch it to give up
    /// early; the result of a handler that doesn't is discarded.
    pub closed: CancellationToken,
}

impl ToolContext {
    pub fn new(session_id: impl Into<String>, closed: CancellationToken) -> Self {
        Self {
            session_id: session_id.into(),
            closed,
        }
    }

    /// A context not tied to any session, for direct dispatch.
    pub fn detached() -> Self {
        Self::new("detached", CancellationToken::new())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// A callable tool.
///
/// Handlers own argument validation: the protocol server passes the
/// `arguments` object through untouched.
#[async_trait]
pub trait ToolHandler: Send + Sync + 'static {
    async fn call(&self, arguments: Value, ctx: ToolContext) -> Result<CallToolResult, BoxError>;
}

/// Adapter that lets an async closure act as a [`ToolHandler`].
pub struct FnHandler<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

/// Wrap an async closure as a tool handler.
pub fn tool_fn<F, Fut>(f: F) -> FnHandler<F, Fut>
where
    F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallToolResult, BoxError>> + Send + 'static,
{
    FnHandler {
        f,
        _fut: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F, Fut>
where
    F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallToolResult, BoxError>> + Send + 'static,
{
    async fn call(&self, arguments: Value, ctx: ToolContext) -> Result<CallToolResult, BoxError> {
        (self.f)(arguments, ctx).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No handler is registered under the requested name.
    UnknownTool,
    /// The handler ran and returned an error.
    ToolExecution,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::UnknownTool => "UnknownTool",
            FailureKind::ToolExecution => "ToolExecutionError",
        }
    }
}

/// Why a tool invocation produced no result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ToolFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ToolFailure {
    pub fn unknown_tool(name: &str) -> Self {
        Self {
            kind: FailureKind::UnknownTool,
            message: format!("Unknown tool: {}", name),
        }
    }

    pub fn execution(err: &(dyn std::error::Error + Send + Sync)) -> Self {
        Self {
            kind: FailureKind::ToolExecution,
            message: err.to_string(),
        }
    }

    fn detail(&self) -> Value {
        json!({ "kind": self.kind.as_str(), "message": self.message })
    }

    /// Shape as a protocol-level error (unknown tools).
    pub fn to_error_data(&self) -> ErrorData {
        ErrorData::invalid_params(self.message.clone()).with_data(self.detail())
    }

    /// Shape as an in-band tool error result (handler failures).
    pub fn to_call_result(&self) -> CallToolResult {
        CallToolResult::error(self.message.clone()).with_structured(self.detail())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tool_shape() {
        let failure = ToolFailure::unknown_tool("launch_rocket");
        let data = failure.to_error_data();
        assert_eq!(data.code, ErrorData::INVALID_PARAMS);
        assert_eq!(data.message, "Unknown tool: launch_rocket");
        assert_eq!(data.data.as_ref().unwrap()["kind"], "UnknownTool");
    }

    #[test]
    fn test_execution_shape_keeps_message() {
        let err: BoxError = "upstream returned 503".into();
        let failure = ToolFailure::execution(err.as_ref());
        let result = serde_json::to_value(failure.to_call_result()).unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "upstream returned 503");
        assert_eq!(result["structuredContent"]["kind"], "ToolExecutionError");
        assert_eq!(result["structuredContent"]["message"], "upstream returned 503");
    }

    #[tokio::test]
    async fn test_tool_fn_adapter() {
        let handler = tool_fn(|args: Value, ctx: ToolContext| async move {
            Ok::<_, BoxError>(CallToolResult::text(format!("{}:{}", ctx.session_id, args["n"])))
        });
        let result = handler
            .call(json!({ "n": 3 }), ToolContext::detached())
            .await
            .unwrap();
        assert_eq!(result.content[0].as_text(), Some("detached:3"));
    }
}
