// Client configuration: `~/.festa/config.toml`.
//
// Missing or partial files fall back to defaults; every endpoint and topic
// prefix is configuration, never a literal at a call site.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use festa_common::protocol::topics::Destinations;

/// Root directory for festa state: `~/.festa/`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".festa"))
}

/// Path to the config file: `~/.festa/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// REST API base URL.
    pub api_base_url: String,
    /// Realtime transport endpoint.
    pub ws_url: String,
    /// Identity used for chat (set after login).
    pub username: Option<String>,
    /// Fixed delay before a reconnect attempt, in seconds.
    pub reconnect_delay_secs: u64,
    /// Number of historical messages fetched when opening a room.
    pub history_page_size: u32,
    /// Topic/destination naming (a backend deployment detail).
    pub destinations: Destinations,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".into(),
            ws_url: "ws://localhost:8080/ws/chat".into(),
            username: None,
            reconnect_delay_secs: 5,
            history_page_size: 50,
            destinations: Destinations::default(),
        }
    }
}

impl ClientConfig {
    /// Load from `~/.festa/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save to `~/.festa/config.toml`.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_path().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine home directory",
            ))
        })?;
        self.save_to(&path)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject non-TLS endpoints except on loopback.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_scheme(&self.api_base_url, "https", "http")?;
        validate_scheme(&self.ws_url, "wss", "ws")?;
        Ok(())
    }
}

fn validate_scheme(value: &str, secure: &str, insecure: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(value).map_err(|error| ConfigError::InvalidUrl {
        url: value.to_string(),
        reason: error.to_string(),
    })?;
    if parsed.scheme() == secure {
        return Ok(());
    }
    if parsed.scheme() == insecure && is_loopback_host(parsed.host_str()) {
        return Ok(());
    }
    Err(ConfigError::InsecureUrl { url: value.to_string() })
}

fn is_loopback_host(host: Option<&str>) -> bool {
    let Some(host) = host else {
        return false;
    };
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<IpAddr>().is_ok_and(|addr| addr.is_loopback())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("`{url}` must use TLS (plain http/ws is allowed only for localhost)")]
    InsecureUrl { url: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_point_at_localhost() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.reconnect_delay_secs, 5);
        assert_eq!(config.history_page_size, 50);
        assert!(config.username.is_none());
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = ClientConfig {
            api_base_url: "https://api.festa.example".into(),
            ws_url: "wss://api.festa.example/ws/chat".into(),
            username: Some("alice".into()),
            reconnect_delay_secs: 8,
            history_page_size: 100,
            destinations: Destinations::default(),
        };
        config.save_to(&path).unwrap();
        let loaded = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
api_base_url = "https://api.festa.example"
username = "bob"
"#,
        )
        .unwrap();
        assert_eq!(config.api_base_url, "https://api.festa.example");
        assert_eq!(config.username.as_deref(), Some("bob"));
        assert_eq!(config.reconnect_delay_secs, 5); // default
        assert_eq!(config.destinations, Destinations::default());
    }

    #[test]
    fn topic_prefixes_are_configurable_from_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
[destinations]
room_topic_prefix = "/topic/rooms/"
"#,
        )
        .unwrap();
        assert_eq!(config.destinations.room_topic("7"), "/topic/rooms/7");
        assert_eq!(config.destinations.lobby_topic, "/sub/chat/lobby"); // default
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn validate_accepts_tls_endpoints() {
        let config = ClientConfig {
            api_base_url: "https://api.festa.example".into(),
            ws_url: "wss://api.festa.example/ws/chat".into(),
            ..ClientConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn validate_accepts_loopback_without_tls() {
        ClientConfig::default().validate().unwrap();

        let config = ClientConfig {
            api_base_url: "http://127.0.0.1:8080".into(),
            ws_url: "ws://127.0.0.1:8080/ws/chat".into(),
            ..ClientConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_plain_http_off_loopback() {
        let config = ClientConfig {
            api_base_url: "http://api.festa.example".into(),
            ..ClientConfig::default()
        };
        let error = config.validate().expect_err("must reject");
        assert!(matches!(error, ConfigError::InsecureUrl { .. }));
    }

    #[test]
    fn validate_rejects_plain_ws_off_loopback() {
        let config = ClientConfig {
            api_base_url: "https://api.festa.example".into(),
            ws_url: "ws://api.festa.example/ws/chat".into(),
            ..ClientConfig::default()
        };
        let error = config.validate().expect_err("must reject");
        assert!(matches!(error, ConfigError::InsecureUrl { .. }));
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = ClientConfig::load_from(&dir.path().join("missing.toml"));
        assert!(result.is_err());
    }
}
