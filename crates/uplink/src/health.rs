//! Health snapshot served on the health path.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::config::ServerConfig;
use crate::session::SessionList;

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub name: String,
    pub version: String,
    /// RFC 3339, millisecond precision, UTC.
    pub timestamp: String,
    pub transports: TransportSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransportSummary {
    pub count: usize,
    pub ids: Vec<String>,
}

impl HealthSnapshot {
    pub fn new(config: &ServerConfig, sessions: &SessionList) -> Self {
        let mut ids = sessions.ids();
        ids.sort();
        Self {
            status: "healthy",
            name: config.name.clone(),
            version: config.version.clone(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            transports: TransportSummary {
                count: ids.len(),
                ids,
            },
        }
    }
}
