//! Session Registry
//!
//! Trait and in-memory implementation for the table of live sessions.
//!
//! Spans:
//! - `mcp.session.register` - a session becomes reachable by id
//! - `mcp.session.unregister` - a session is removed (close, disconnect, stop)
//! - `mcp.session.reap` - idle sessions closed by the reaper

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{Session, SessionList};
use crate::error::SessionError;

/// Registry trait for pluggable storage backends.
pub trait SessionRegistry: Send + Sync {
    /// Make a session reachable by its id. Collisions are rejected, never
    /// overwritten.
    fn register(&self, session: Session) -> Result<(), SessionError>;

    /// Remove a session. Idempotent; returns the removed session if any.
    fn unregister(&self, id: &str) -> Option<Session>;

    /// Look up a session by id.
    fn get(&self, id: &str) -> Option<Session>;

    /// Snapshot of all sessions.
    fn list(&self) -> SessionList;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory registry using DashMap.
#[derive(Debug, Default)]
pub struct InMemorySessionRegistry {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new registry wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl SessionRegistry for InMemorySessionRegistry {
    fn register(&self, session: Session) -> Result<(), SessionError> {
        use dashmap::mapref::entry::Entry;

        let id = session.id().to_string();
        let _span = tracing::info_span!("mcp.session.register", mcp.session_id = %id).entered();

        match self.sessions.entry(id.clone()) {
            Entry::Occupied(_) => {
                tracing::warn!("Rejected duplicate session id");
                Err(SessionError::DuplicateSession(id))
            }
            Entry::Vacant(slot) => {
                slot.insert(session);
                tracing::info!(active = self.sessions.len(), "Session registered");
                Ok(())
            }
        }
    }

    fn unregister(&self, id: &str) -> Option<Session> {
        let removed = self.sessions.remove(id).map(|(_, session)| session);
        if removed.is_some() {
            let _span = tracing::info_span!("mcp.session.unregister", mcp.session_id = %id).entered();
            tracing::info!(active = self.sessions.len(), "Session unregistered");
        }
        removed
    }

    fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    fn list(&self) -> SessionList {
        SessionList::new(self.sessions.iter().map(|e| e.value().clone()).collect())
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}

/// Close every session idle longer than `max_idle`.
/// Returns the number of sessions closed.
pub fn reap_idle(registry: &dyn SessionRegistry, max_idle: Duration) -> usize {
    let stale: Vec<Session> = registry
        .list()
        .into_iter()
        .filter(|s| s.idle_duration() > max_idle)
        .collect();

    let mut closed = 0;
    for session in stale {
        let _span = tracing::info_span!(
            "mcp.session.reap",
            mcp.session_id = %session.id(),
            idle_secs = session.idle_duration().as_secs(),
        )
        .entered();
        if session.transport().close() {
            closed += 1;
        }
    }

    if closed > 0 {
        tracing::info!(
            closed = closed,
            remaining = registry.len(),
            "Idle session reaping completed"
        );
    }

    closed
}

/// Spawn a background task that periodically reaps idle sessions.
pub fn spawn_reaper(
    registry: Arc<dyn SessionRegistry>,
    interval: Duration,
    max_idle: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Session reaper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    reap_idle(registry.as_ref(), max_idle);
                }
            }
        }
    })
}
