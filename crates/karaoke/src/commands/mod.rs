//! CLI command handlers.

pub mod run;
pub mod search;
pub mod start;
pub mod status;
pub mod submit;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use karaoke_config::KaraokeConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Server URL to connect to.
    pub server_url: String,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

/// Load configuration from an explicit file, or by discovery.
///
/// `OUTPUT_DIR` is applied either way.
pub fn load_config(path: Option<&Path>, ctx: &Context) -> Result<KaraokeConfig> {
    if let Some(path) = path {
        let mut config = karaoke_config::load_config_file(path)?;
        config.apply_env_overrides();
        if ctx.verbose {
            eprintln!("Loaded config: {}", path.display());
        }
        return Ok(config);
    }

    let loaded = karaoke_config::load_config(None)?;
    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }
    if ctx.verbose {
        let sources = loaded.loaded_from();
        if sources.is_empty() {
            eprintln!("No config files found, using defaults + CLI args");
        } else {
            for source in sources {
                eprintln!("Loaded config: {}", source.display());
            }
        }
    }
    Ok(loaded.config)
}

/// Spinner for job progress. Hidden in JSON mode.
pub fn spinner(ctx: &Context, message: &str) -> ProgressBar {
    if ctx.json_output {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✔"])
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
