//! Configuration for coap-heartbeat
//!
//! Settings are resolved in three layers: built-in defaults, an optional JSON
//! file, then `COAP_HEARTBEAT_*` environment variables (a `.env` file in the
//! working directory is loaded by the binary before this runs). Command-line
//! arguments are applied on top by the caller.
//!
//! The transport section only bounds how long the CoAP client may spend on
//! one request. The exchange coordinator never imposes a timeout of its own.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HeartbeatSimError, Result};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "COAP_HEARTBEAT_";

/// RFC 7252 MAX_TRANSMIT_WAIT.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 93_000;

pub const DEFAULT_DEVICE_ID: i64 = 1001;
pub const DEFAULT_CURRENT_FIRMWARE: i64 = 100;

// ============================================================================
// Transport
// ============================================================================

/// CoAP-over-UDP transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Upper bound on one request, covering the client's retransmissions,
    /// a separate response and any block-wise continuation.
    pub response_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
        }
    }
}

impl TransportConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

// ============================================================================
// Device defaults
// ============================================================================

/// Identity used when the command line does not supply one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceDefaults {
    pub device_id: i64,
    pub current_firmware: i64,
}

impl Default for DeviceDefaults {
    fn default() -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID,
            current_firmware: DEFAULT_CURRENT_FIRMWARE,
        }
    }
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: TransportConfig,
    pub defaults: DeviceDefaults,
}

impl Config {
    /// Directory holding the config file (`~/.config/coap-heartbeat` on Linux).
    pub fn dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coap-heartbeat")
    }

    /// Default config file location.
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from the default location (if present) and apply env overrides.
    pub fn load() -> Result<Self> {
        let path = Self::path();
        let mut config = if path.exists() {
            Self::read_file(&path)?
        } else {
            debug!("No config file at {:?}, using defaults", path);
            Self::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file, which must exist, and apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HeartbeatSimError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = serde_json::from_str(&content)?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Apply `COAP_HEARTBEAT_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));

        if let Some(v) = get("RESPONSE_TIMEOUT_MS") {
            self.transport.response_timeout_ms = parse_env("RESPONSE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("DEVICE_ID") {
            self.defaults.device_id = parse_env("DEVICE_ID", &v)?;
        }
        if let Some(v) = get("CURRENT_FIRMWARE") {
            self.defaults.current_firmware = parse_env("CURRENT_FIRMWARE", &v)?;
        }
        Ok(())
    }

    /// Reject settings the transport cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.transport.response_timeout_ms == 0 {
            return Err(HeartbeatSimError::Config(
                "transport.response_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T>(suffix: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| {
        HeartbeatSimError::Config(format!("invalid {}{}={:?}: {}", ENV_PREFIX, suffix, raw, e))
    })
}
