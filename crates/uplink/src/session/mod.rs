//! Session Management
//!
//! A [`Session`] is the registry's record of one live client conversation. The
//! registry owns the record; the record points at the transport that carries
//! the session's bytes.

mod registry;

pub use registry::{reap_idle, spawn_reaper, InMemorySessionRegistry, SessionRegistry};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::transport::SessionTransport;

/// One registered session. Cheap to clone.
#[derive(Clone)]
pub struct Session {
    transport: Arc<SessionTransport>,
}

impl Session {
    pub fn new(transport: Arc<SessionTransport>) -> Self {
        Self { transport }
    }

    pub fn id(&self) -> &str {
        self.transport.id()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.transport.created_at()
    }

    /// Time since the last inbound message (or since open).
    pub fn idle_duration(&self) -> Duration {
        self.transport.idle_duration()
    }

    pub fn transport(&self) -> &Arc<SessionTransport> {
        &self.transport
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id().to_string(),
            created_at: self.created_at(),
            idle_secs: self.idle_duration().as_secs(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("created_at", &self.created_at())
            .field("closed", &self.transport.is_closed())
            .finish()
    }
}

/// What health reporting needs to know about a session.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub idle_secs: u64,
}

/// Snapshot of the registry at one instant.
///
/// Finite, and iterable as many times as needed; summaries are built lazily
/// on each pass.
#[derive(Debug, Clone, Default)]
pub struct SessionList {
    sessions: Vec<Session>,
}

impl SessionList {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self { sessions }
    }

    pub fn iter(&self) -> impl Iterator<Item = SessionSummary> + '_ {
        self.sessions.iter().map(Session::summary)
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.id().to_string()).collect()
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl IntoIterator for SessionList {
    type Item = Session;
    type IntoIter = std::vec::IntoIter<Session>;

    fn into_iter(self) -> Self::IntoIter {
        self.sessions.into_iter()
    }
}
