//! Lifecycle Controller
//!
//! `McpServer` owns the listener and walks the state machine
//! `Created → Starting → Running → Stopping → Stopped`. A failed start
//! returns to `Created`.

use futures::future::join_all;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::error::{LifecycleError, ShutdownIssue};
use crate::health::HealthSnapshot;
use crate::protocol::{ProtocolServer, ToolHandler};
use crate::router::router;
use crate::session::{spawn_reaper, SessionRegistry};
use crate::transport::McpState;
use crate::types::tool::Tool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Created => "created",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// What `stop()` did. Partial failures are listed, never raised.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShutdownReport {
    pub sessions_closed: usize,
    pub issues: Vec<ShutdownIssue>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Default)]
struct Running {
    local_addr: Option<SocketAddr>,
    serve_task: Option<JoinHandle<std::io::Result<()>>>,
    reaper: Option<JoinHandle<()>>,
}

/// One MCP server instance.
pub struct McpServer {
    state: Arc<McpState>,
    phase: watch::Sender<LifecycleState>,
    running: Mutex<Running>,
}

impl McpServer {
    pub fn new(config: ServerConfig) -> Self {
        Self::from_state(McpState::new(config))
    }

    /// Use a custom session registry.
    pub fn with_registry(config: ServerConfig, registry: Arc<dyn SessionRegistry>) -> Self {
        Self::from_state(McpState::with_registry(config, registry))
    }

    fn from_state(state: McpState) -> Self {
        let (phase, _) = watch::channel(LifecycleState::Created);
        Self {
            state: Arc::new(state),
            phase,
            running: Mutex::new(Running::default()),
        }
    }

    /// Register a tool handler. Allowed in any state.
    pub fn register_tool(&self, tool: Tool, handler: Arc<dyn ToolHandler>) {
        self.state.protocol.register_tool(tool, handler);
    }

    pub fn protocol(&self) -> &Arc<ProtocolServer> {
        &self.state.protocol
    }

    pub fn state(&self) -> LifecycleState {
        *self.phase.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.phase.subscribe()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn registry(&self) -> &Arc<dyn SessionRegistry> {
        &self.state.registry
    }

    pub fn health(&self) -> HealthSnapshot {
        self.state.health()
    }

    /// Bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.local_addr
    }

    /// Bind the listener and start serving.
    ///
    /// Returns the bound address; with port 0 the OS picks the port.
    pub async fn start(&self) -> Result<SocketAddr, LifecycleError> {
        let mut running = self.running.lock().await;

        let current = self.state();
        if current != LifecycleState::Created {
            return Err(LifecycleError::InvalidState {
                op: "start",
                state: current,
            });
        }
        validate(&self.state.config)?;
        let app = router(self.state.clone())?;
        self.phase.send_replace(LifecycleState::Starting);

        let addr = self.state.config.bind_addr();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.phase.send_replace(LifecycleState::Created);
                tracing::error!(addr = %addr, error = %e, "Failed to bind");
                return Err(bind_error(addr, e));
            }
        };
        let local_addr = listener.local_addr().map_err(|e| {
            self.phase.send_replace(LifecycleState::Created);
            bind_error(addr.clone(), e)
        })?;

        let shutdown = self.state.shutdown_token().clone();
        running.serve_task = Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
        }));

        if let Some(max_idle) = self.state.config.session_idle_timeout {
            let interval = (max_idle / 2).clamp(Duration::from_millis(100), Duration::from_secs(60));
            running.reaper = Some(spawn_reaper(
                self.state.registry.clone(),
                interval,
                max_idle,
                self.state.shutdown_token().clone(),
            ));
        }

        running.local_addr = Some(local_addr);
        self.phase.send_replace(LifecycleState::Running);

        tracing::info!(
            addr = %local_addr,
            name = %self.state.config.name,
            version = %self.state.config.version,
            "MCP server listening"
        );
        Ok(local_addr)
    }

    /// Stop accepting, close every session and release the socket.
    ///
    /// Never fails: problems are collected into the report. Calling it on a
    /// server that is not running is a no-op.
    pub async fn stop(&self) -> ShutdownReport {
        let mut running = self.running.lock().await;
        let mut report = ShutdownReport::default();

        match self.state() {
            LifecycleState::Starting | LifecycleState::Running => {}
            _ => return report,
        }
        self.phase.send_replace(LifecycleState::Stopping);
        tracing::info!("MCP server stopping");

        // refuse new sessions and stop accepting connections
        self.state.shutdown_token().cancel();

        // close all first so every worker shares one grace window
        let grace = self.state.config.shutdown_grace;
        let sessions = self.state.registry.list();
        for session in sessions.sessions() {
            session.transport().close();
        }
        let results = join_all(
            sessions
                .sessions()
                .iter()
                .map(|s| s.transport().shutdown(grace)),
        )
        .await;
        report.sessions_closed = sessions.len();
        for issue in results.into_iter().filter_map(Result::err) {
            tracing::warn!(issue = %issue, "Session did not shut down cleanly");
            report.issues.push(issue);
        }

        if let Some(reaper) = running.reaper.take() {
            let _ = reaper.await;
        }

        if let Some(mut task) = running.serve_task.take() {
            match tokio::time::timeout(grace, &mut task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => report.issues.push(ShutdownIssue::ServerTask(e.to_string())),
                Ok(Err(e)) => report.issues.push(ShutdownIssue::ServerTask(e.to_string())),
                Err(_) => {
                    task.abort();
                    report.issues.push(ShutdownIssue::ServerDrainTimedOut {
                        grace_ms: grace.as_millis() as u64,
                    });
                }
            }
        }

        running.local_addr = None;
        self.phase.send_replace(LifecycleState::Stopped);
        tracing::info!(
            sessions_closed = report.sessions_closed,
            issues = report.issues.len(),
            "MCP server stopped"
        );
        report
    }
}

impl Drop for McpServer {
    fn drop(&mut self) {
        self.state.shutdown_token().cancel();
    }
}

fn bind_error(addr: String, e: std::io::Error) -> LifecycleError {
    if e.kind() == std::io::ErrorKind::AddrInUse {
        LifecycleError::PortUnavailable(addr)
    } else {
        LifecycleError::Bind { addr, source: e }
    }
}

fn validate(config: &ServerConfig) -> Result<(), LifecycleError> {
    let paths = [
        ("health_path", &config.health_path),
        ("sse_path", &config.sse_path),
        ("message_path", &config.message_path),
    ];
    for (field, path) in paths {
        if !path.starts_with('/') {
            return Err(LifecycleError::InvalidConfig(format!(
                "{} must start with '/': {:?}",
                field, path
            )));
        }
    }
    for (field, path) in paths {
        if path.contains(['*', '{', '}']) {
            return Err(LifecycleError::InvalidConfig(format!(
                "{} must be a literal path without '*', '{{' or '}}': {:?}",
                field, path
            )));
        }
    }
    if config.health_path == config.sse_path
        || config.health_path == config.message_path
        || config.sse_path == config.message_path
    {
        return Err(LifecycleError::InvalidConfig(
            "health, sse and message paths must be distinct".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig::new("test-server", "1.0.0").with_host("127.0.0.1")
    }

    #[test]
    fn test_validate_rejects_colliding_paths() {
        let config = config().with_sse_path("/mcp").with_message_path("/mcp");
        assert!(matches!(validate(&config), Err(LifecycleError::InvalidConfig(_))));

        let mut config = self::config();
        config.health_path = "health".into();
        assert!(matches!(validate(&config), Err(LifecycleError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_route_patterns() {
        for path in ["/*events", "/{session}", "/sse/{*rest}"] {
            let config = config().with_sse_path(path);
            assert!(
                matches!(validate(&config), Err(LifecycleError::InvalidConfig(_))),
                "{path} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_start_stop_transitions() {
        let server = McpServer::new(config());
        assert_eq!(server.state(), LifecycleState::Created);

        let addr = server.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.state(), LifecycleState::Running);
        assert_eq!(server.local_addr().await, Some(addr));

        let err = server.start().await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState { op: "start", .. }));

        let report = server.stop().await;
        assert!(report.is_clean());
        assert_eq!(server.state(), LifecycleState::Stopped);
        assert_eq!(server.local_addr().await, None);
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let server = McpServer::new(config());
        let report = server.stop().await;
        assert_eq!(report.sessions_closed, 0);
        assert_eq!(server.state(), LifecycleState::Created);
    }

    #[tokio::test]
    async fn test_invalid_config_leaves_created() {
        let server = McpServer::new(config().with_sse_path("/x").with_message_path("/x"));
        assert!(server.start().await.is_err());
        assert_eq!(server.state(), LifecycleState::Created);
    }

    #[tokio::test]
    async fn test_route_pattern_fails_start_cleanly() {
        let server = McpServer::new(config().with_sse_path("/*events"));
        let err = server.start().await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidConfig(_)));
        assert_eq!(server.state(), LifecycleState::Created);
        assert_eq!(server.local_addr().await, None);
    }

    #[tokio::test]
    async fn test_invalid_cors_origin_fails_start() {
        let server =
            McpServer::new(config().with_cors_allow_origin("https://app.example.com\n"));
        let err = server.start().await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidConfig(_)));
        assert_eq!(server.state(), LifecycleState::Created);
    }
}
