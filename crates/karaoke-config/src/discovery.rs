//! Finds the user and project `karaoke.toml` layers and folds them together.
//!
//! The user file (`<config dir>/karaoke/config.toml`) is read first, then
//! `./karaoke.toml`, then `OUTPUT_DIR` from the environment. Command-line
//! flags are applied by the binary on top of the result.

use std::path::{Path, PathBuf};

use crate::{ConfigError, KaraokeConfig, Result};

const PROJECT_CONFIG_FILE: &str = "karaoke.toml";
const USER_CONFIG_FILE: &str = "config.toml";
const APP_NAME: &str = "karaoke";

/// Points the user layer somewhere other than the platform config dir.
const CONFIG_DIR_ENV: &str = "KARAOKE_CONFIG_DIR";

/// One candidate config file and whether it contributed.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub loaded: bool,
}

/// Merged configuration plus a record of how it was assembled.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: KaraokeConfig,
    /// Every file considered, user layer first.
    pub sources: Vec<ConfigSource>,
    /// One entry per file that existed but could not be parsed.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Discover and merge layers using the default user config directory.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Like [`load_config`], with `config_dir` taking precedence over
/// `KARAOKE_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut config = KaraokeConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    config.apply_env_overrides();

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Parse a single file, as used by `--config`.
pub fn load_config_file(path: &Path) -> Result<KaraokeConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    KaraokeConfig::from_toml(&contents)
}

pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// `KARAOKE_CONFIG_DIR` when set and non-empty, else `<config dir>/karaoke`.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Merge `path` into `config` if it exists. A parse failure leaves `config`
/// untouched and is reported through `warnings` so startup can continue.
fn load_layer(config: &mut KaraokeConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}
