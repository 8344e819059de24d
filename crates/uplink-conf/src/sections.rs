//! Config sections. Every field has a serde default so any subset of a file
//! is a valid config.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Listener and session behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Name reported by `initialize` and `/health`.
    /// Default: skydesk
    pub name: String,

    /// Default: 0.0.0.0
    pub host: String,

    /// Default: 8090. 0 lets the OS choose.
    pub port: u16,

    pub sse_path: String,
    pub message_path: String,
    pub health_path: String,

    /// Default: *
    pub cors_allow_origin: String,

    /// Seconds between SSE keep-alive comments. Default: 30
    pub keep_alive_secs: u64,

    /// Close sessions idle this long. 0 disables. Default: 1800
    pub session_idle_timeout_secs: u64,

    /// Seconds `stop()` waits for workers and in-flight connections. Default: 5
    pub shutdown_grace_secs: u64,

    /// Extra guidance returned to clients by `initialize`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl ServerSection {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs.max(1))
    }

    pub fn session_idle_timeout(&self) -> Option<Duration> {
        (self.session_idle_timeout_secs > 0)
            .then(|| Duration::from_secs(self.session_idle_timeout_secs))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: "skydesk".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8090,
            sse_path: "/sse".to_string(),
            message_path: "/message".to_string(),
            health_path: "/health".to_string(),
            cors_allow_origin: "*".to_string(),
            keep_alive_secs: 30,
            session_idle_timeout_secs: 1800,
            shutdown_grace_secs: 5,
            instructions: None,
        }
    }
}

/// The imagery provider's HTTP API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSection {
    /// Default: https://app.skyfi.com/platform-api
    pub base_url: String,

    /// Secret. Usually supplied through `SKYDESK_API_KEY` rather than a file.
    pub api_key: String,

    /// Header the key is sent in. Default: X-Skyfi-Api-Key
    pub api_key_header: String,

    /// Per-request timeout in seconds. Default: 30
    pub timeout_secs: u64,
}

impl UpstreamSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            base_url: "https://app.skyfi.com/platform-api".to_string(),
            api_key: String::new(),
            api_key_header: "X-Skyfi-Api-Key".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Telemetry and observability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySection {
    /// OTLP gRPC endpoint. Empty disables export; logs still go to stderr.
    pub otlp_endpoint: String,

    /// EnvFilter directive. Default: info
    pub log_level: String,
}

impl TelemetrySection {
    pub fn otlp_enabled(&self) -> bool {
        !self.otlp_endpoint.trim().is_empty()
    }
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            otlp_endpoint: String::new(),
            log_level: "info".to_string(),
        }
    }
}
