//! Start command - launches the karaoke HTTP server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use karaoke_config::{KaraokeConfig, StorageSection};
use karaoke_jobs::{ExternalTools, JobService, JobStore, VideoSearch};
use karaoke_server::{Server, ServerConfig};
use tracing::info;

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Root directory for saved artifacts (overrides config and OUTPUT_DIR)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Root directory for per-job scratch space (overrides config)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    let mut config = super::load_config(args.config.as_deref(), ctx)?;
    apply_overrides(&mut config, &args);

    let server_section = config.server();
    let storage = config.storage();
    let tools = config.tools();

    let addr = server_section.socket_addr()?;
    let server_config = ServerConfig::new()
        .with_bind_address(addr)
        .with_request_logging(server_section.request_logging)
        .with_cors_origins(server_section.cors_origins)
        .with_max_body_size(server_section.max_body_size);

    let work_root = storage.work_root();
    std::fs::create_dir_all(&work_root)?;

    let search = VideoSearch::new(tools.yt_dlp.clone());
    let toolkit = ExternalTools::new(tools.yt_dlp, tools.ffmpeg, tools.demucs);
    let service = JobService::new(JobStore::new(), Arc::new(toolkit), work_root.clone())
        .with_output_root(storage.output_dir.clone());

    info!(
        work_dir = %work_root.display(),
        output_dir = ?storage.output_dir,
        "Job service ready"
    );
    if !ctx.json_output {
        println!("Karaoke server listening on http://{}", addr);
    }

    Server::new(service, search, server_config)
        .run_with_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

fn apply_overrides(config: &mut KaraokeConfig, args: &StartArgs) {
    if args.bind.is_some() || args.port.is_some() {
        let mut server = config.server();
        if let Some(ref bind) = args.bind {
            server.bind = bind.clone();
        }
        if let Some(port) = args.port {
            server.port = port;
        }
        config.server = Some(server);
    }

    if args.output_dir.is_some() || args.work_dir.is_some() {
        let storage = config.storage.get_or_insert_with(StorageSection::default);
        if let Some(ref dir) = args.output_dir {
            storage.output_dir = Some(dir.clone());
        }
        if let Some(ref dir) = args.work_dir {
            storage.work_dir = Some(dir.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> StartArgs {
        StartArgs {
            port: None,
            bind: None,
            output_dir: None,
            work_dir: None,
            config: None,
        }
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = KaraokeConfig::from_toml(
            r#"
[server]
bind = "0.0.0.0"
port = 9000

[storage]
output_dir = "/srv/music"
"#,
        )
        .unwrap();

        let args = StartArgs {
            port: Some(8123),
            output_dir: Some(PathBuf::from("/tmp/out")),
            ..args()
        };
        apply_overrides(&mut config, &args);

        let server = config.server();
        assert_eq!(server.bind, "0.0.0.0");
        assert_eq!(server.port, 8123);
        assert_eq!(
            config.storage().output_dir,
            Some(PathBuf::from("/tmp/out"))
        );
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = KaraokeConfig::new();
        apply_overrides(&mut config, &args());
        assert_eq!(config, KaraokeConfig::new());
    }
}
