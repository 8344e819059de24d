//! Error taxonomy for the session server.
//!
//! Each enum belongs to one boundary: `LifecycleError` is returned by
//! [`McpServer::start`](crate::McpServer::start), `SessionError` is mapped to
//! HTTP statuses by the router, and [`ToolFailure`](crate::ToolFailure) is
//! shaped into protocol envelopes by the protocol server. `ShutdownIssue`s are
//! only ever collected into a [`ShutdownReport`](crate::ShutdownReport).

use axum::http::StatusCode;
use thiserror::Error;

use crate::server::LifecycleState;

/// Errors raised while starting the listener.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The port is already bound by another socket. Never retried here.
    #[error("port unavailable: {0} is already in use")]
    PortUnavailable(String),

    /// Any other bind failure (permission denied, bad address, ...).
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Paths collide or a header value cannot be encoded.
    #[error("invalid server configuration: {0}")]
    InvalidConfig(String),

    /// The operation is not valid in the current lifecycle state.
    #[error("cannot {op} while server is {state}")]
    InvalidState {
        op: &'static str,
        state: LifecycleState,
    },
}

/// Errors raised by session establishment and message delivery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session already registered: {0}")]
    DuplicateSession(String),

    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("transport could not be started: {0}")]
    TransportInit(String),

    #[error("missing sessionId query parameter")]
    MissingSessionId,
}

impl SessionError {
    /// Machine-readable kind, used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::DuplicateSession(_) => "DuplicateSessionError",
            SessionError::UnknownSession(_) => "UnknownSessionError",
            SessionError::MalformedPayload(_) => "MalformedPayloadError",
            SessionError::TransportInit(_) => "TransportInitError",
            SessionError::MissingSessionId => "MissingSessionIdError",
        }
    }

    /// HTTP status used when this error reaches the router.
    pub fn status(&self) -> StatusCode {
        match self {
            SessionError::DuplicateSession(_) => StatusCode::CONFLICT,
            SessionError::UnknownSession(_)
            | SessionError::MalformedPayload(_)
            | SessionError::MissingSessionId => StatusCode::BAD_REQUEST,
            SessionError::TransportInit(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// A partial failure observed while stopping. Collected, never raised.
#[derive(Debug, Error, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShutdownIssue {
    #[error("worker for session {session_id} panicked")]
    WorkerPanicked { session_id: String },

    #[error("worker for session {session_id} still busy after {grace_ms}ms, aborted")]
    WorkerTimedOut { session_id: String, grace_ms: u64 },

    #[error("server task still draining after {grace_ms}ms, aborted")]
    ServerDrainTimedOut { grace_ms: u64 },

    #[error("server task failed: {0}")]
    ServerTask(String),
}
