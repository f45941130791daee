//! Configuration management for the labelserve service.
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. User-specified configuration file (`--config` / `LABELSERVE_CONFIG`)
//! 3. Environment variables (`LABELSERVE__<FIELD>`, e.g. `LABELSERVE__LINGER_MS`)
//! 4. Command-line arguments
//!
//! The bind address and model path are positional CLI arguments and are not
//! part of the file/env layers.

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::protocol::DEFAULT_PING_REPLY;
use crate::transport::zmq::DEFAULT_CALL_TIMEOUT;

/// Idle timeout used when none (or an unusable one) is given: 30 minutes.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 30 * 60 * 1000;

/// Largest receive timeout the transport accepts.
pub const MAX_IDLE_TIMEOUT_MS: u64 = i32::MAX as u64;

fn default_idle_timeout_ms() -> u64 {
    DEFAULT_IDLE_TIMEOUT_MS
}
fn default_linger_ms() -> u64 {
    2_000
}
fn default_io_threads() -> i32 {
    1
}
fn default_ping_reply() -> String {
    DEFAULT_PING_REPLY.to_string()
}
fn default_client_timeout_ms() -> u64 {
    DEFAULT_CALL_TIMEOUT.as_millis() as u64
}

/// How long the service waits for a request before shutting itself down.
///
/// Always non-zero: zero and unparseable inputs fall back to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleTimeout(Duration);

impl IdleTimeout {
    /// Build from milliseconds. Zero or more than the transport can express
    /// logs a warning and yields the default.
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 || ms > MAX_IDLE_TIMEOUT_MS {
            warn!(
                "Invalid idle timeout {} ms, using default of {} ms",
                ms, DEFAULT_IDLE_TIMEOUT_MS
            );
            return Self::default();
        }
        Self(Duration::from_millis(ms))
    }

    /// Parse a command-line value. Non-numeric input logs a warning and
    /// yields the default instead of failing.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().parse::<u64>() {
            Ok(ms) => Self::from_millis(ms),
            Err(_) => {
                warn!(
                    "Idle timeout {:?} is not a number of milliseconds, using default of {} ms",
                    raw, DEFAULT_IDLE_TIMEOUT_MS
                );
                Self::default()
            }
        }
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn as_millis(&self) -> u64 {
        self.0.as_millis() as u64
    }
}

impl Default for IdleTimeout {
    fn default() -> Self {
        Self(Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS))
    }
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Receive timeout after which an idle service exits
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Grace period for the last reply to leave the socket on shutdown
    #[serde(default = "default_linger_ms")]
    pub linger_ms: u64,

    /// ZMQ context IO threads
    #[serde(default = "default_io_threads")]
    pub io_threads: i32,

    /// Reply to `[CMD:PING]`
    #[serde(default = "default_ping_reply")]
    pub ping_reply: String,

    /// Client-side wait for each reply
    #[serde(default = "default_client_timeout_ms")]
    pub client_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: default_idle_timeout_ms(),
            linger_ms: default_linger_ms(),
            io_threads: default_io_threads(),
            ping_reply: default_ping_reply(),
            client_timeout_ms: default_client_timeout_ms(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&ServiceConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(Environment::with_prefix("LABELSERVE").separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Apply the optional positional idle timeout from the command line.
    pub fn with_idle_timeout_arg(mut self, raw: Option<&str>) -> Self {
        if let Some(raw) = raw {
            self.idle_timeout_ms = IdleTimeout::parse_lenient(raw).as_millis();
        }
        self
    }

    pub fn idle_timeout(&self) -> IdleTimeout {
        IdleTimeout::from_millis(self.idle_timeout_ms)
    }

    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.client_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_timeout_parse() {
        assert_eq!(IdleTimeout::parse_lenient("5000").as_millis(), 5000);
        assert_eq!(IdleTimeout::parse_lenient(" 250 ").as_millis(), 250);
    }

    #[test]
    fn test_idle_timeout_fallbacks() {
        let default = IdleTimeout::default();
        assert_eq!(default.as_millis(), DEFAULT_IDLE_TIMEOUT_MS);
        assert_eq!(default.as_duration(), Duration::from_secs(1800));

        for raw in ["0", "abc", "-5", "", "12ms", "99999999999"] {
            assert_eq!(IdleTimeout::parse_lenient(raw), default, "{:?}", raw);
        }
        assert_eq!(IdleTimeout::from_millis(0), default);
        assert_eq!(IdleTimeout::from_millis(MAX_IDLE_TIMEOUT_MS).as_millis(), MAX_IDLE_TIMEOUT_MS);
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.idle_timeout().as_millis(), DEFAULT_IDLE_TIMEOUT_MS);
        assert_eq!(config.linger(), Duration::from_secs(2));
        assert_eq!(config.ping_reply, "PONG");
        assert_eq!(config.io_threads, 1);
    }

    #[test]
    fn test_cli_timeout_overrides() {
        let config = ServiceConfig::default().with_idle_timeout_arg(Some("750"));
        assert_eq!(config.idle_timeout().as_millis(), 750);

        let config = ServiceConfig::default().with_idle_timeout_arg(Some("zero"));
        assert_eq!(config.idle_timeout().as_millis(), DEFAULT_IDLE_TIMEOUT_MS);

        let config = ServiceConfig::default().with_idle_timeout_arg(None);
        assert_eq!(config.idle_timeout_ms, DEFAULT_IDLE_TIMEOUT_MS);
    }

    #[test]
    fn test_zero_in_config_falls_back() {
        let config = ServiceConfig {
            idle_timeout_ms: 0,
            ..ServiceConfig::default()
        };
        assert_eq!(config.idle_timeout(), IdleTimeout::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labelserve.toml");
        std::fs::write(&path, "linger_ms = 500\nping_reply = \"ALIVE\"\n").unwrap();

        let config = ServiceConfig::load(Some(&path)).unwrap();
        assert_eq!(config.linger_ms, 500);
        assert_eq!(config.ping_reply, "ALIVE");
        assert_eq!(config.idle_timeout_ms, DEFAULT_IDLE_TIMEOUT_MS);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let path = Path::new("/nonexistent/labelserve.toml");
        assert!(ServiceConfig::load(Some(path)).is_err());
    }
}
