//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, SkydeskConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided it replaces the local override. Unlike the
/// standard locations, a missing CLI path is still returned so loading it
/// fails loudly.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/skydesk/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("skydesk/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        files.push(path.to_path_buf());
        return files;
    }

    let local = PathBuf::from("skydesk.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file as a raw table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Merge `overlay` into `base`. Tables merge key by key; anything else in
/// the overlay replaces the base value.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Turn the merged table into typed config.
pub fn from_table(table: toml::Table, origin: &Path) -> Result<SkydeskConfig, ConfigError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut SkydeskConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |name| env::var(name).ok());
}

/// Apply overrides using `lookup` in place of the process environment.
pub fn apply_overrides_from<F>(config: &mut SkydeskConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut string = |name: &str, target: &mut String| {
        if let Some(v) = lookup(name) {
            *target = v;
            sources.env_overrides.push(name.to_string());
        }
    };

    // Server
    string("SKYDESK_NAME", &mut config.server.name);
    string("SKYDESK_HOST", &mut config.server.host);
    string("SKYDESK_CORS_ALLOW_ORIGIN", &mut config.server.cors_allow_origin);

    // Upstream
    string("SKYDESK_BASE_URL", &mut config.upstream.base_url);
    string("SKYDESK_API_KEY", &mut config.upstream.api_key);
    string("SKYDESK_API_KEY_HEADER", &mut config.upstream.api_key_header);

    // Telemetry; also support the standard OTEL variable and RUST_LOG
    string("SKYDESK_OTLP_ENDPOINT", &mut config.telemetry.otlp_endpoint);
    string("OTEL_EXPORTER_OTLP_ENDPOINT", &mut config.telemetry.otlp_endpoint);
    string("SKYDESK_LOG_LEVEL", &mut config.telemetry.log_level);
    string("RUST_LOG", &mut config.telemetry.log_level);

    let mut number = |name: &str, apply: &mut dyn FnMut(&str) -> bool| {
        if let Some(v) = lookup(name) {
            if apply(&v) {
                sources.env_overrides.push(name.to_string());
            }
        }
    };

    number("SKYDESK_PORT", &mut |v| {
        v.parse::<u16>().map(|port| config.server.port = port).is_ok()
    });
    number("SKYDESK_SESSION_IDLE_TIMEOUT_SECS", &mut |v| {
        v.parse::<u64>()
            .map(|secs| config.server.session_idle_timeout_secs = secs)
            .is_ok()
    });
    number("SKYDESK_UPSTREAM_TIMEOUT_SECS", &mut |v| {
        v.parse::<u64>().map(|secs| config.upstream.timeout_secs = secs).is_ok()
    });
}

/// Expand a leading `~/` in a path.
pub fn expand_path(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(stripped) => directories::BaseDirs::new()
            .map(|d| d.home_dir().join(stripped))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
