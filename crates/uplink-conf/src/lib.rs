//! Layered configuration loading for the skydesk gateway.
//!
//! # Usage
//!
//! ```rust,no_run
//! use uplink_conf::SkydeskConfig;
//!
//! let config = SkydeskConfig::load().expect("Failed to load config");
//! println!("Listening on {}:{}", config.server.host, config.server.port);
//! println!("Upstream: {}", config.upstream.base_url);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, key by key):
//! 1. `/etc/skydesk/config.toml` (system)
//! 2. `~/.config/skydesk/config.toml` (user)
//! 3. `./skydesk.toml`, or the `--config` path when given
//! 4. Environment variables (`SKYDESK_*`)
//!
//! # Example Config
//!
//! ```toml
//! [server]
//! port = 8090
//! cors_allow_origin = "*"
//! session_idle_timeout_secs = 1800
//!
//! [upstream]
//! base_url = "https://app.skyfi.com/platform-api"
//! api_key_header = "X-Skyfi-Api-Key"
//! timeout_secs = 30
//!
//! [telemetry]
//! otlp_endpoint = "127.0.0.1:4317"
//! log_level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{ServerSection, TelemetrySection, UpstreamSection};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkydeskConfig {
    pub server: ServerSection,
    pub upstream: UpstreamSection,
    pub telemetry: TelemetrySection,
}

impl SkydeskConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with an explicit file in place of `./skydesk.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report which sources contributed.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        let files = discover_config_files_with_override(config_path);
        for path in &files {
            loader::merge_tables(&mut merged, loader::load_table(path)?);
            sources.files.push(path.clone());
        }

        let origin = files
            .last()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("<defaults>"));
        let mut config = loader::from_table(merged, &origin)?;

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to a TOML string with the API key redacted.
    pub fn to_toml(&self) -> String {
        let mut redacted = self.clone();
        if !redacted.upstream.api_key.is_empty() {
            redacted.upstream.api_key = "<redacted>".to_string();
        }

        let mut output = String::from("# skydesk configuration\n\n");
        match toml::to_string_pretty(&redacted) {
            Ok(body) => output.push_str(&body),
            Err(e) => output.push_str(&format!("# failed to render config: {}\n", e)),
        }
        output
    }
}
