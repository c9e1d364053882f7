//! Configuration system for Trickle.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $TRICKLE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/trickle/config.toml
//!   3. ~/.config/trickle/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration. One file serves both the tracker daemon and
/// the peer; each reads only its own section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TrickleConfig {
    pub tracker: TrackerConfig,
    pub peer: PeerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// UDP port the tracker listens on.
    pub port: u16,
    /// Seconds without a heartbeat before a session is evicted.
    /// The sweep runs at half this interval.
    pub heartbeat_timeout_secs: u64,
    /// Path to the credentials file (`username password` per line).
    pub credentials_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    /// Tracker address, host:port.
    pub tracker_addr: String,
    /// Seconds to wait for any tracker response before giving up.
    /// Lost responses are a user-visible failure — no retries.
    pub request_timeout_secs: u64,
    /// Seconds between heartbeat datagrams.
    pub heartbeat_interval_secs: u64,
    /// Directory served to other peers and where downloads land.
    pub share_dir: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            port: 51000,
            heartbeat_timeout_secs: 3,
            credentials_path: PathBuf::from("./credentials.txt"),
        }
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            tracker_addr: "127.0.0.1:51000".to_string(),
            request_timeout_secs: 5,
            heartbeat_interval_secs: 1,
            share_dir: PathBuf::from("."),
        }
    }
}

impl TrackerConfig {
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
}

impl PeerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_or_tmp().join(".config"))
        .join("trickle")
}

fn home_or_tmp() -> PathBuf {
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
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl TrickleConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            TrickleConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("TRICKLE_CONFIG")
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
            let text = toml::to_string_pretty(&TrickleConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply TRICKLE_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TRICKLE_TRACKER__PORT") {
            if let Ok(p) = v.parse() {
                self.tracker.port = p;
            }
        }
        if let Ok(v) = std::env::var("TRICKLE_TRACKER__HEARTBEAT_TIMEOUT_SECS") {
            if let Ok(t) = v.parse() {
                self.tracker.heartbeat_timeout_secs = t;
            }
        }
        if let Ok(v) = std::env::var("TRICKLE_TRACKER__CREDENTIALS_PATH") {
            self.tracker.credentials_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TRICKLE_PEER__TRACKER_ADDR") {
            self.peer.tracker_addr = v;
        }
        if let Ok(v) = std::env::var("TRICKLE_PEER__REQUEST_TIMEOUT_SECS") {
            if let Ok(t) = v.parse() {
                self.peer.request_timeout_secs = t;
            }
        }
        if let Ok(v) = std::env::var("TRICKLE_PEER__SHARE_DIR") {
            self.peer.share_dir = PathBuf::from(v);
        }
    }
}
