//! Server configuration from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default listen address.
const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default pause between replayed frames.
const DEFAULT_FRAME_INTERVAL_MS: u64 = 1000;

/// Errors reading the server configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Configuration of the dispatch server binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Directory of JSON frames to replay
    pub feed_dir: PathBuf,
    /// Address the HTTP server listens on
    pub bind: SocketAddr,
    /// Pause between two replayed frames
    pub frame_interval: Duration,
}

impl ServerConfig {
    /// Create a config with default address and interval.
    pub fn new(feed_dir: impl Into<PathBuf>) -> Self {
        Self {
            feed_dir: feed_dir.into(),
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
        }
    }

    /// Set the listen address.
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Set the pause between frames.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Read `DISPO_FEED_DIR`, `DISPO_BIND` and `DISPO_FRAME_INTERVAL_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from a variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let feed_dir = lookup("DISPO_FEED_DIR").ok_or(ConfigError::Missing("DISPO_FEED_DIR"))?;

        let bind = lookup("DISPO_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind.parse().map_err(|_| ConfigError::Invalid {
            name: "DISPO_BIND",
            value: bind.clone(),
        })?;

        let interval: u64 = match lookup("DISPO_FRAME_INTERVAL_MS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "DISPO_FRAME_INTERVAL_MS",
                value: raw.clone(),
            })?,
            None => DEFAULT_FRAME_INTERVAL_MS,
        };

        Ok(Self::new(feed_dir)
            .with_bind(bind)
            .with_frame_interval(Duration::from_millis(interval)))
    }
}
