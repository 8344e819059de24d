//! Server configuration.
//!
//! A `ServerConfig` is built once, handed to [`McpServer::new`](crate::McpServer::new)
//! and never mutated afterwards. Builder methods consume and return `self`.

use std::time::Duration;

/// Upstream API credential. Debug output never shows the value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw secret, for building upstream request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            f.write_str("ApiKey(<unset>)")
        } else {
            f.write_str("ApiKey(<redacted>)")
        }
    }
}

/// Immutable configuration for one server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server name reported by `initialize` and `/health`.
    pub name: String,

    /// Server version reported by `initialize` and `/health`.
    pub version: String,

    /// Interface to bind. Default: 0.0.0.0
    pub host: String,

    /// Port to bind; 0 lets the OS choose.
    pub port: u16,

    /// Path that opens an SSE session. Default: /sse
    pub sse_path: String,

    /// Path that receives client messages. Default: /message
    pub message_path: String,

    /// Health check path. Default: /health
    pub health_path: String,

    /// Credential for the upstream provider, handed to tool handlers.
    pub upstream_api_key: ApiKey,

    /// Value of `Access-Control-Allow-Origin` on every response.
    ///
    /// Defaults to `*`: the server backs tool-calling agents, not browsers
    /// holding user cookies. Narrow it when exposing the port publicly.
    pub cors_allow_origin: String,

    /// Interval between SSE keep-alive comments.
    pub keep_alive: Duration,

    /// Sessions idle longer than this are closed. `None` disables reaping.
    pub session_idle_timeout: Option<Duration>,

    /// How long `stop()` waits for workers and the server task.
    pub shutdown_grace: Duration,

    /// Optional instructions returned by `initialize`.
    pub instructions: Option<String>,
}

impl ServerConfig {
    /// Create a configuration with defaults for everything but identity.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            host: "0.0.0.0".to_string(),
            port: 0,
            sse_path: "/sse".to_string(),
            message_path: "/message".to_string(),
            health_path: "/health".to_string(),
            upstream_api_key: ApiKey::default(),
            cors_allow_origin: "*".to_string(),
            keep_alive: Duration::from_secs(30),
            session_idle_timeout: None,
            shutdown_grace: Duration::from_secs(5),
            instructions: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_sse_path(mut self, path: impl Into<String>) -> Self {
        self.sse_path = normalize_path(path.into());
        self
    }

    pub fn with_message_path(mut self, path: impl Into<String>) -> Self {
        self.message_path = normalize_path(path.into());
        self
    }

    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = normalize_path(path.into());
        self
    }

    pub fn with_upstream_api_key(mut self, key: ApiKey) -> Self {
        self.upstream_api_key = key;
        self
    }

    pub fn with_cors_allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_allow_origin = origin.into();
        self
    }

    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    pub fn with_session_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.session_idle_timeout = timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// `host:port` as given to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Data of the SSE `endpoint` event for a session.
    pub fn endpoint_uri(&self, session_id: &str) -> String {
        format!("{}?sessionId={}", self.message_path, session_id)
    }
}

fn normalize_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::new("test-server", "1.0.0");
        assert_eq!(config.port, 0);
        assert_eq!(config.sse_path, "/sse");
        assert_eq!(config.message_path, "/message");
        assert_eq!(config.health_path, "/health");
        assert_eq!(config.cors_allow_origin, "*");
        assert!(config.session_idle_timeout.is_none());
    }

    #[test]
    fn test_paths_are_normalized() {
        let config = ServerConfig::new("s", "1")
            .with_sse_path("events")
            .with_message_path("/rpc");
        assert_eq!(config.sse_path, "/events");
        assert_eq!(config.endpoint_uri("abc"), "/rpc?sessionId=abc");
    }

    #[test]
    fn test_api_key_is_redacted() {
        let config = ServerConfig::new("s", "1").with_upstream_api_key(ApiKey::new("sk-live-123"));
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-live-123"));
        assert!(debug.contains("<redacted>"));
        assert_eq!(config.upstream_api_key.expose(), "sk-live-123");
    }
}
