//! TOML configuration for the server and client applications.
//!
//! The file is read once at startup from an explicit `--config` path or the
//! first existing standard location (`config.toml`,
//! `~/.config/tx2tx/config.toml`, `/etc/tx2tx/config.toml`). Every field
//! has a default so a partial file (or no file at all) still yields a
//! working configuration; an explicitly named file that is missing or
//! malformed is a startup error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::geometry::ScreenContext;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A file system error occurred while reading the file.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema ─────────────────────────────────────────────────────────────

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub clients: Vec<ClientEntry>,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-side settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the TCP listener to.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Display name override (e.g. `:0`); `None` uses the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Near-edge telemetry band in pixels. Transitions always require
    /// strict edge contact regardless of this value.
    #[serde(default)]
    pub edge_threshold: i32,
    /// Minimum pointer velocity (px/s) to cross a boundary.
    #[serde(default = "default_velocity_threshold")]
    pub velocity_threshold: f64,
    /// Poll loop delay in milliseconds (clamped to at least 5 at runtime).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum concurrent client connections; also the listen backlog.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    /// Server name used in logs.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Whether the hint overlay protocol is driven on transitions.
    #[serde(default)]
    pub overlay_enabled: bool,
    #[serde(default)]
    pub panic_key: PanicKeyConfig,
    #[serde(default)]
    pub jump_hotkey: JumpHotkeyConfig,
}

/// Panic key: forces an immediate revert to CENTER.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanicKeyConfig {
    /// Key name (keysym table name, single character, or `0x…` literal).
    #[serde(default = "default_panic_key")]
    pub key: String,
    /// Modifier names that must be held (empty = none required).
    #[serde(default)]
    pub modifiers: Vec<String>,
}

/// Jump hotkey: prefix + action sequence teleporting between contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpHotkeyConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Prefix key name.
    #[serde(default = "default_jump_prefix_key")]
    pub prefix_key: String,
    /// Modifier names required with the prefix.
    #[serde(default = "default_jump_prefix_modifiers")]
    pub prefix_modifiers: Vec<String>,
    /// How long the armed window stays open after the prefix.
    #[serde(default = "default_jump_timeout_ms")]
    pub timeout_ms: u64,
    /// Action key jumping to the WEST context.
    #[serde(default = "default_jump_west_key")]
    pub west_key: String,
    /// Action key jumping to the EAST context.
    #[serde(default = "default_jump_east_key")]
    pub east_key: String,
    /// Action key returning to CENTER.
    #[serde(default = "default_jump_center_key")]
    pub center_key: String,
}

/// One configured client position: maps a context to a client name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEntry {
    /// Client name as announced in its HELLO (matched lowercased).
    pub name: String,
    /// Position relative to the server: west, east, north, or south.
    pub position: String,
}

/// Client-side settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server address as `host:port`.
    #[serde(default = "default_server_address")]
    pub server_address: String,
    /// Display name override; `None` uses the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Client reconnection policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_reconnect_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_reconnect_delay")]
    pub delay_seconds: f64,
}

/// Wire protocol settings shared by both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Protocol version string carried in HELLO messages.
    #[serde(default = "default_protocol_version")]
    pub version: String,
    /// Per-peer line buffer cap in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Seconds between client keepalives.
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval: u64,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level name: debug, info, warning, error, or critical.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Formatter: `full` or `compact`.
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Optional log file path (in addition to stderr).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    24800
}
fn default_velocity_threshold() -> f64 {
    100.0
}
fn default_poll_interval_ms() -> u64 {
    10
}
fn default_max_clients() -> usize {
    4
}
fn default_server_name() -> String {
    "tx2tx".to_string()
}
fn default_panic_key() -> String {
    "Scroll_Lock".to_string()
}
fn default_jump_prefix_key() -> String {
    "slash".to_string()
}
fn default_jump_prefix_modifiers() -> Vec<String> {
    vec!["Ctrl".to_string()]
}
fn default_jump_timeout_ms() -> u64 {
    800
}
fn default_jump_west_key() -> String {
    "1".to_string()
}
fn default_jump_east_key() -> String {
    "2".to_string()
}
fn default_jump_center_key() -> String {
    "0".to_string()
}
fn default_server_address() -> String {
    "127.0.0.1:24800".to_string()
}
fn default_true() -> bool {
    true
}
fn default_reconnect_attempts() -> u32 {
    5
}
fn default_reconnect_delay() -> f64 {
    2.0
}
fn default_protocol_version() -> String {
    "2.1".to_string()
}
fn default_buffer_size() -> usize {
    1024 * 1024
}
fn default_keepalive_interval() -> u64 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "full".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            display: None,
            edge_threshold: 0,
            velocity_threshold: default_velocity_threshold(),
            poll_interval_ms: default_poll_interval_ms(),
            max_clients: default_max_clients(),
            name: default_server_name(),
            overlay_enabled: false,
            panic_key: PanicKeyConfig::default(),
            jump_hotkey: JumpHotkeyConfig::default(),
        }
    }
}

impl Default for PanicKeyConfig {
    fn default() -> Self {
        Self {
            key: default_panic_key(),
            modifiers: Vec::new(),
        }
    }
}

impl Default for JumpHotkeyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            prefix_key: default_jump_prefix_key(),
            prefix_modifiers: default_jump_prefix_modifiers(),
            timeout_ms: default_jump_timeout_ms(),
            west_key: default_jump_west_key(),
            east_key: default_jump_east_key(),
            center_key: default_jump_center_key(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: default_server_address(),
            display: None,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_attempts: default_reconnect_attempts(),
            delay_seconds: default_reconnect_delay(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            version: default_protocol_version(),
            buffer_size: default_buffer_size(),
            keepalive_interval: default_keepalive_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl Config {
    /// Loads configuration.
    ///
    /// With an explicit `path`, the file must exist and parse. Without one,
    /// the standard locations are searched and a miss falls back to
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an explicit path that is missing, for
    /// I/O failures, and for malformed TOML.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(explicit) => {
                if !explicit.is_file() {
                    return Err(ConfigError::NotFound(explicit.to_path_buf()));
                }
                Self::from_file(explicit)
            }
            None => match Self::find_config_file() {
                Some(found) => Self::from_file(&found),
                None => Ok(Config::default()),
            },
        }
    }

    /// Parses one TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Returns the first existing standard config location, if any.
    pub fn find_config_file() -> Option<PathBuf> {
        let mut candidates = vec![PathBuf::from("config.toml")];
        if let Some(base) = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        {
            candidates.push(base.join("tx2tx").join("config.toml"));
        }
        candidates.push(PathBuf::from("/etc/tx2tx/config.toml"));
        candidates.into_iter().find(|p| p.is_file())
    }

    /// Builds the context→client routing map from the `clients` list.
    ///
    /// Names are lowercased to match HELLO registration. Entries with an
    /// unparseable or `center` position are skipped with a warning; a later
    /// entry for the same position wins.
    pub fn context_to_client_map(&self) -> HashMap<ScreenContext, String> {
        let mut map = HashMap::new();
        for entry in &self.clients {
            match entry.position.parse::<ScreenContext>() {
                Ok(context) if context.is_remote() => {
                    map.insert(context, entry.name.to_lowercase());
                }
                _ => {
                    tracing::warn!(
                        "client {:?} has invalid position {:?}, skipping",
                        entry.name,
                        entry.position
                    );
                }
            }
        }
        map
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_expected_network_settings() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 24800);
        assert_eq!(cfg.server.max_clients, 4);
        assert_eq!(cfg.client.server_address, "127.0.0.1:24800");
    }

    #[test]
    fn test_default_thresholds() {
        let cfg = Config::default();
        assert_eq!(cfg.server.edge_threshold, 0);
        assert_eq!(cfg.server.velocity_threshold, 100.0);
        assert_eq!(cfg.server.poll_interval_ms, 10);
    }

    #[test]
    fn test_default_panic_key_is_scroll_lock_without_modifiers() {
        let cfg = Config::default();
        assert_eq!(cfg.server.panic_key.key, "Scroll_Lock");
        assert!(cfg.server.panic_key.modifiers.is_empty());
    }

    #[test]
    fn test_default_jump_hotkey_is_disabled_ctrl_slash() {
        let cfg = Config::default();
        assert!(!cfg.server.jump_hotkey.enabled);
        assert_eq!(cfg.server.jump_hotkey.prefix_key, "slash");
        assert_eq!(cfg.server.jump_hotkey.prefix_modifiers, vec!["Ctrl".to_string()]);
        assert_eq!(cfg.server.jump_hotkey.timeout_ms, 800);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut cfg = Config::default();
        cfg.server.port = 9000;
        cfg.clients.push(ClientEntry {
            name: "Penguin".to_string(),
            position: "west".to_string(),
        });
        let text = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: Config = toml::from_str(&text).expect("deserialize");
        assert_eq!(restored, cfg);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let cfg: Config = toml::from_str("[server]\nport = 9999\n").expect("parse");
        assert_eq!(cfg.server.port, 9999);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.protocol.buffer_size, 1024 * 1024);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let result: Result<Config, _> = toml::from_str("[[[ nope");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_with_missing_explicit_path_fails() {
        let result = Config::load(Some(Path::new("/nonexistent/tx2tx/config.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_context_map_lowercases_names_and_skips_bad_positions() {
        let mut cfg = Config::default();
        cfg.clients = vec![
            ClientEntry {
                name: "Penguin".to_string(),
                position: "WEST".to_string(),
            },
            ClientEntry {
                name: "other".to_string(),
                position: "upstairs".to_string(),
            },
            ClientEntry {
                name: "selfish".to_string(),
                position: "center".to_string(),
            },
        ];
        let map = cfg.context_to_client_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&ScreenContext::West), Some(&"penguin".to_string()));
    }

    #[test]
    fn test_later_entry_for_same_position_wins() {
        let mut cfg = Config::default();
        cfg.clients = vec![
            ClientEntry {
                name: "first".to_string(),
                position: "east".to_string(),
            },
            ClientEntry {
                name: "second".to_string(),
                position: "east".to_string(),
            },
        ];
        let map = cfg.context_to_client_map();
        assert_eq!(map.get(&ScreenContext::East), Some(&"second".to_string()));
    }
}
