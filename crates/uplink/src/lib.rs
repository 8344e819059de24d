//! uplink - MCP (Model Context Protocol) session server over HTTP+SSE
//!
//! Accepts client connections, keeps one long-lived SSE stream per session,
//! routes inbound JSON-RPC tool calls to registered handlers and tears
//! sessions down cleanly on disconnect or shutdown.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use uplink::{tool_fn, CallToolResult, McpServer, ServerConfig, Tool};
//!
//! let server = McpServer::new(ServerConfig::new("my-server", "0.1.0").with_port(8080));
//! server.register_tool(
//!     Tool::new("hello", "Say hello"),
//!     Arc::new(tool_fn(|_args, _ctx| async move {
//!         Ok::<_, uplink::BoxError>(CallToolResult::text("Hello!"))
//!     })),
//! );
//!
//! let addr = server.start().await?;
//! // ...
//! let report = server.stop().await;
//! ```

pub mod config;
pub mod error;
pub mod health;
pub mod protocol;
pub mod router;
pub mod schema_helpers;
pub mod server;
pub mod session;
pub mod transport;
pub mod types;

// Re-export commonly used types at crate root
pub use types::content::Content;
pub use types::error::ErrorData;
pub use types::jsonrpc::{JsonRpcMessage, JsonRpcResponse, RequestId};
pub use types::protocol::{Implementation, ServerCapabilities};
pub use types::tool::{CallToolParams, CallToolResult, Tool, ToolAnnotations};

pub use config::{ApiKey, ServerConfig};
pub use error::{LifecycleError, SessionError, ShutdownIssue};
pub use health::HealthSnapshot;
pub use protocol::{
    tool_fn, BoxError, FailureKind, ProtocolServer, ToolContext, ToolFailure, ToolHandler,
};
pub use router::router;
pub use server::{LifecycleState, McpServer, ShutdownReport};
pub use session::{
    reap_idle, spawn_reaper, InMemorySessionRegistry, Session, SessionList, SessionRegistry,
    SessionSummary,
};
pub use transport::{McpState, SessionStream, SessionTransport, SseFrame};

pub use schema_helpers::schema_for;
