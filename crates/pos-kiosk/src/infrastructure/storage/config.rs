//! TOML configuration for the kiosk application.
//!
//! Looked up at `--config`, or else in the platform config directory as
//! `kiosk.toml` (`~/.config/pos-system/kiosk.toml` on Linux).
//!
//! ```toml
//! [kiosk]
//! kiosk_id = 2
//! log_level = "info"
//!
//! [discovery]
//! target = "255.255.255.255:5001"
//! timeout_ms = 5000
//! app_port = 5000
//! fallback = "127.0.0.1:5000"
//!
//! [api]
//! request_timeout_ms = 5000
//!
//! [reader]
//! device = "/dev/ttyUSB0"
//! read_timeout_ms = 10000
//! ```
//!
//! A missing file, section, or key falls back to the defaults above (no
//! reader device by default, so token entry is manual).

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::time::Duration;

use pos_core::{APP_PORT, DISCOVERY_PORT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::ServerEndpoint;
use crate::infrastructure::discovery::DiscoveryConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KioskConfig {
    #[serde(default)]
    pub kiosk: KioskSection,
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub reader: ReaderSection,
}

/// Identity and logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KioskSection {
    /// Id of this terminal's record on the server (`/api/kiosks`).
    #[serde(default = "default_kiosk_id")]
    pub kiosk_id: u32,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoverySection {
    #[serde(default = "default_target")]
    pub target: SocketAddr,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_app_port")]
    pub app_port: u16,
    #[serde(default = "default_fallback")]
    pub fallback: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiSection {
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// RFID reader.  Without `device`, tokens are always typed in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReaderSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<PathBuf>,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_kiosk_id() -> u32 {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_target() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, DISCOVERY_PORT))
}
fn default_timeout_ms() -> u64 {
    5_000
}
fn default_app_port() -> u16 {
    APP_PORT
}
fn default_fallback() -> SocketAddr {
    ServerEndpoint::fallback().addr()
}
fn default_read_timeout_ms() -> u64 {
    10_000
}

impl Default for KioskSection {
    fn default() -> Self {
        Self {
            kiosk_id: default_kiosk_id(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            target: default_target(),
            timeout_ms: default_timeout_ms(),
            app_port: default_app_port(),
            fallback: default_fallback(),
        }
    }
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for ReaderSection {
    fn default() -> Self {
        Self {
            device: None,
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl DiscoverySection {
    pub fn to_discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            target: self.target,
            timeout: Duration::from_millis(self.timeout_ms),
            app_port: self.app_port,
            fallback: ServerEndpoint::new(self.fallback),
        }
    }
}

impl ApiSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl ReaderSection {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Default path of `kiosk.toml`.
///
/// # Errors
///
/// [`ConfigError::NoPlatformConfigDir`] if the base directory is unknown.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    pos_core::paths::config_file("kiosk.toml").ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads `path`, or [`config_file_path`] when `None`.  A missing file is
/// the default config.
///
/// # Errors
///
/// [`ConfigError::Io`] for read failures other than "not found", and
/// [`ConfigError::Parse`] for malformed TOML.
pub fn load_config(path: Option<&Path>) -> Result<KioskConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(KioskConfig::default()),
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
