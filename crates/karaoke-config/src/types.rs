//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [server]     # bind address, request logging, CORS
//! [storage]    # scratch root and output root
//! [tools]      # external tool binaries
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default max body size for JSON requests (64 KiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

/// Environment variable that overrides `storage.output_dir`.
pub const OUTPUT_DIR_ENV: &str = "OUTPUT_DIR";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged section by section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KaraokeConfig {
    /// HTTP server settings.
    pub server: Option<ServerSection>,
    /// Filesystem locations.
    pub storage: Option<StorageSection>,
    /// External tool binaries.
    pub tools: Option<ToolsSection>,
}

impl KaraokeConfig {
    /// Create an empty config (all defaults).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config layer on top of this one.
    ///
    /// Sections present in `other` replace the corresponding section here.
    pub fn merge(&mut self, other: KaraokeConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.storage.is_some() {
            self.storage = other.storage;
        }
        if other.tools.is_some() {
            self.tools = other.tools;
        }
    }

    /// Server section, or defaults.
    pub fn server(&self) -> ServerSection {
        self.server.clone().unwrap_or_default()
    }

    /// Storage section, or defaults.
    pub fn storage(&self) -> StorageSection {
        self.storage.clone().unwrap_or_default()
    }

    /// Tools section, or defaults.
    pub fn tools(&self) -> ToolsSection {
        self.tools.clone().unwrap_or_default()
    }

    /// Replace the output root when `value` is a non-empty path.
    pub fn override_output_dir(&mut self, value: Option<String>) {
        if let Some(dir) = value.filter(|d| !d.trim().is_empty()) {
            self.storage.get_or_insert_with(StorageSection::default).output_dir =
                Some(PathBuf::from(dir));
        }
    }

    /// Apply the `OUTPUT_DIR` environment variable, if set.
    pub fn apply_env_overrides(&mut self) {
        self.override_output_dir(std::env::var(OUTPUT_DIR_ENV).ok());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address to bind to.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
    /// Log every request with method, path, status and duration.
    pub request_logging: bool,
    /// CORS allowed origins (empty = no CORS layer).
    pub cors_origins: Vec<String>,
    /// Maximum JSON request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            request_logging: true,
            cors_origins: Vec::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ServerSection {
    /// Resolve `bind` and `port` into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                field: "server.bind".to_string(),
                reason: e.to_string(),
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage
// ─────────────────────────────────────────────────────────────────────────────

/// `[storage]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Root under which per-job working directories are created.
    /// Defaults to the system temp directory.
    pub work_dir: Option<PathBuf>,
    /// Root for the save-to-destination operation. Saving is rejected when unset.
    pub output_dir: Option<PathBuf>,
}

impl StorageSection {
    /// Effective scratch root.
    pub fn work_root(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────────────────────────────────────

/// `[tools]` section: binaries invoked by the pipeline stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// Video downloader.
    pub yt_dlp: PathBuf,
    /// Audio/video encoder.
    pub ffmpeg: PathBuf,
    /// Vocal separator.
    pub demucs: PathBuf,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            yt_dlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("ffmpeg"),
            demucs: PathBuf::from("demucs"),
        }
    }
}
