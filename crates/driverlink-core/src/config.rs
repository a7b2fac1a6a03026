//! Configuration system for DriverLink.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $DRIVERLINK_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/driverlink/config.toml
//!   3. ~/.config/driverlink/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::location::WatchOptions;
use crate::retry::RetryPolicy;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverLinkConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub location: LocationConfig,
    pub credentials: CredentialsConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// WebSocket endpoint. The access token is appended as `?token=`.
    pub socket_url: String,
    /// Token refresh endpoint, POSTed `{ "refresh": .. }`.
    pub refresh_url: String,
    /// Request timeout for the refresh exchange.
    pub refresh_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub retry_base_ms: u64,
    pub retry_multiplier: u32,
    pub retry_max_ms: u64,
    /// Cadence for re-sending the cached location while connected.
    pub republish_interval_secs: u64,
    /// Pause between forced logout and the redirect to the login route.
    pub logout_redirect_delay_ms: u64,
    pub login_route: String,
    /// Handshake timeout. 0 = wait for the transport to fail on its own.
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub min_interval_secs: u64,
    pub min_distance_m: f64,
    /// Fixed position reported by the daemon's static provider.
    /// Telemetry is disabled when either coordinate is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// JSON file holding the access and refresh tokens.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Local HTTP API port (bound to 127.0.0.1).
    pub port: u16,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for DriverLinkConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            session: SessionConfig::default(),
            location: LocationConfig::default(),
            credentials: CredentialsConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_url: "ws://127.0.0.1:8000/ws/driver/".to_string(),
            refresh_url: "http://127.0.0.1:8000/api/token/refresh/".to_string(),
            refresh_timeout_secs: 15,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retry_base_ms: 1_000,
            retry_multiplier: 2,
            retry_max_ms: 30_000,
            republish_interval_secs: 5,
            logout_redirect_delay_ms: 300,
            login_route: "Login".to_string(),
            connect_timeout_secs: 0,
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 5,
            min_distance_m: 50.0,
            lat: None,
            long: None,
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("credentials.json"),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 9011 }
    }
}

// ── Derived settings ──────────────────────────────────────────────────────────

impl SessionConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base: Duration::from_millis(self.retry_base_ms),
            multiplier: self.retry_multiplier,
            max: Duration::from_millis(self.retry_max_ms),
        }
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }
}

impl LocationConfig {
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            min_interval: Duration::from_secs(self.min_interval_secs),
            min_distance_m: self.min_distance_m,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("driverlink")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("driverlink")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl DriverLinkConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path, falling back to defaults when it is absent.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            DriverLinkConfig::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the session cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let session = &self.session;
        if session.republish_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "session.republish_interval_secs",
                reason: "must be at least 1",
            });
        }
        if session.retry_base_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "session.retry_base_ms",
                reason: "must be greater than 0",
            });
        }
        if session.retry_multiplier == 0 {
            return Err(ConfigError::Invalid {
                field: "session.retry_multiplier",
                reason: "must be at least 1",
            });
        }
        if session.retry_max_ms < session.retry_base_ms {
            return Err(ConfigError::Invalid {
                field: "session.retry_max_ms",
                reason: "must not be below session.retry_base_ms",
            });
        }
        Ok(())
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("DRIVERLINK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&DriverLinkConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply DRIVERLINK_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DRIVERLINK_SERVER__SOCKET_URL") {
            self.server.socket_url = v;
        }
        if let Ok(v) = std::env::var("DRIVERLINK_SERVER__REFRESH_URL") {
            self.server.refresh_url = v;
        }
        if let Ok(v) = std::env::var("DRIVERLINK_SESSION__LOGIN_ROUTE") {
            self.session.login_route = v;
        }
        if let Ok(v) = std::env::var("DRIVERLINK_LOCATION__LAT") {
            if let Ok(lat) = v.parse() {
                self.location.lat = Some(lat);
            }
        }
        if let Ok(v) = std::env::var("DRIVERLINK_LOCATION__LONG") {
            if let Ok(long) = v.parse() {
                self.location.long = Some(long);
            }
        }
        if let Ok(v) = std::env::var("DRIVERLINK_CREDENTIALS__PATH") {
            self.credentials.path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("DRIVERLINK_API__PORT") {
            if let Ok(p) = v.parse() {
                self.api.port = p;
            }
        }
    }
}
