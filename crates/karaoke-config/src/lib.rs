//! Configuration system for the karaoke job service.
//!
//! Provides TOML-based configuration with:
//! - `[server]` bind address, request logging, CORS and body limits
//! - `[storage]` per-job scratch root and the save-to-destination root
//! - `[tools]` paths of the external media tools (yt-dlp, ffmpeg, demucs)
//! - Config file layering (XDG user config + project-local overrides)
//! - `OUTPUT_DIR` environment override for the output root

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
