//! MCP HTTP+SSE Transport
//!
//! - GET `<sse path>` - open a session; the first event names the POST URL
//! - POST `<message path>?sessionId=<id>` - deliver one JSON-RPC message
//!
//! Responses travel back on the session's SSE stream as `message` events.

mod message;
mod session;
mod sse;

pub use message::{message_handler, MessageParams};
pub use session::{SessionStream, SessionTransport, SseFrame};
pub use sse::sse_handler;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::health::HealthSnapshot;
use crate::protocol::ProtocolServer;
use crate::session::{InMemorySessionRegistry, Session, SessionRegistry};
use crate::types::jsonrpc::JsonRpcMessage;

/// Shared state for the HTTP handlers.
pub struct McpState {
    pub config: Arc<ServerConfig>,

    /// Session registry.
    pub registry: Arc<dyn SessionRegistry>,

    /// Tool table and method dispatch.
    pub protocol: Arc<ProtocolServer>,

    /// Cancelled when the server stops; every session token is a child.
    shutdown: CancellationToken,
}

impl McpState {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, InMemorySessionRegistry::new_shared())
    }

    /// Create state with a custom session registry.
    pub fn with_registry(config: ServerConfig, registry: Arc<dyn SessionRegistry>) -> Self {
        let protocol = Arc::new(ProtocolServer::from_config(&config));
        Self {
            config: Arc::new(config),
            registry,
            protocol,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Open a new session and start its worker.
    ///
    /// Dropping the returned stream closes the session.
    pub fn open(&self) -> Result<SessionStream, SessionError> {
        if self.is_shutting_down() {
            return Err(SessionError::TransportInit("server is shutting down".into()));
        }

        let id = Uuid::new_v4().to_string();
        let _span = tracing::info_span!("mcp.session.create", mcp.session_id = %id).entered();

        let (transport, channels) = SessionTransport::new(&id, &self.registry, &self.shutdown);
        self.registry.register(Session::new(transport.clone()))?;

        transport.announce(self.config.endpoint_uri(&id));
        transport.spawn_worker(self.protocol.clone(), channels.inbox);
        tracing::info!("Session opened");

        Ok(SessionStream::new(transport, channels.frames))
    }

    /// Decode `payload` and queue it on session `session_id`.
    pub async fn deliver(&self, session_id: &str, payload: &[u8]) -> Result<(), SessionError> {
        let session = self
            .registry
            .get(session_id)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;

        let message = JsonRpcMessage::decode(payload).map_err(SessionError::MalformedPayload)?;
        tracing::debug!(
            session_id = %session_id,
            method = %message.method,
            request_id = ?message.id,
            "Queued MCP message"
        );

        let transport = session.transport();
        transport.touch();
        transport.enqueue(message).await
    }

    /// Close a session by id. Returns false if no such session was open.
    pub fn close_session(&self, session_id: &str) -> bool {
        match self.registry.get(session_id) {
            Some(session) => session.transport().close(),
            None => false,
        }
    }

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot::new(&self.config, &self.registry.list())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{tool_fn, BoxError};
    use crate::types::tool::{CallToolResult, Tool};
    use serde_json::{json, Value};
    use std::collections::HashSet;

    fn state() -> McpState {
        let state = McpState::new(ServerConfig::new("test-server", "1.0.0"));
        state.protocol.register_tool(
            Tool::new("echo", "Echo"),
            Arc::new(tool_fn(|args, _ctx| async move { Ok::<_, BoxError>(CallToolResult::json(args)) })),
        );
        state
    }

    #[tokio::test]
    async fn test_open_announces_endpoint() {
        let state = state();
        let mut stream = state.open().unwrap();
        let id = stream.id().to_string();

        assert_eq!(
            stream.recv().await,
            Some(SseFrame::Endpoint(format!("/message?sessionId={}", id)))
        );
        assert_eq!(state.registry.len(), 1);
    }

    #[tokio::test]
    async fn test_open_ids_are_distinct() {
        let state = state();
        let streams: Vec<_> = (0..50).map(|_| state.open().unwrap()).collect();
        let ids: HashSet<_> = streams.iter().map(|s| s.id().to_string()).collect();
        assert_eq!(ids.len(), 50);
        assert_eq!(state.registry.len(), 50);
    }

    #[tokio::test]
    async fn test_open_refused_while_shutting_down() {
        let state = state();
        state.shutdown_token().cancel();
        let err = state.open().err().unwrap();
        assert!(matches!(err, SessionError::TransportInit(_)));
    }

    #[tokio::test]
    async fn test_deliver_round_trip_in_order() {
        let state = state();
        let mut stream = state.open().unwrap();
        let id = stream.id().to_string();
        let _endpoint = stream.recv().await;

        for n in 1..=3 {
            let body = json!({
                "jsonrpc": "2.0",
                "id": n,
                "method": "tools/call",
                "params": { "name": "echo", "arguments": { "n": n } }
            });
            state.deliver(&id, body.to_string().as_bytes()).await.unwrap();
        }

        for n in 1..=3 {
            let Some(SseFrame::Message(data)) = stream.recv().await else {
                panic!("expected message frame");
            };
            let response: Value = serde_json::from_str(&data).unwrap();
            assert_eq!(response["id"], n);
            assert_eq!(response["result"]["structuredContent"]["n"], n);
        }
    }

    #[tokio::test]
    async fn test_deliver_errors() {
        let state = state();
        let stream = state.open().unwrap();
        let id = stream.id().to_string();

        let err = state.deliver("nonexistent-id", b"{}").await.unwrap_err();
        assert_eq!(err, SessionError::UnknownSession("nonexistent-id".into()));

        let err = state.deliver(&id, b"not json").await.unwrap_err();
        assert!(matches!(err, SessionError::MalformedPayload(_)));

        assert!(state.close_session(&id));
        assert!(!state.close_session(&id));
        let ping = br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
        let err = state.deliver(&id, ping).await.unwrap_err();
        assert_eq!(err, SessionError::UnknownSession(id));
    }

    #[tokio::test]
    async fn test_health_counts_sessions() {
        let state = state();
        let a = state.open().unwrap();
        let _b = state.open().unwrap();

        let health = state.health();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.transports.count, 2);
        assert!(health.transports.ids.contains(&a.id().to_string()));

        drop(a);
        assert_eq!(state.health().transports.count, 1);
    }
}
