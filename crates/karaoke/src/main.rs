//! Karaoke - turn a video URL into a karaoke-ready track.
//!
//! Main entry point for the karaoke CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod client;
mod commands;

use commands::{run, search, start, status, submit};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Karaoke - strip the vocals from a video and keep the music
#[derive(Parser)]
#[command(name = "karaoke")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Server URL (default: http://localhost:8000)
    #[arg(long, global = true, env = "KARAOKE_SERVER_URL")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the karaoke HTTP server
    Start(start::StartArgs),

    /// Build a karaoke track locally, without a server
    Run(run::RunArgs),

    /// Submit a job to a running server
    Submit(submit::SubmitArgs),

    /// Show a job's status, or the server's when no job is given
    Status(status::StatusArgs),

    /// Search for source videos
    Search(search::SearchArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "karaoke=debug,karaoke_jobs=debug,karaoke_server=debug,karaoke_config=debug,info"
    } else {
        "karaoke=info,karaoke_jobs=info,karaoke_server=info,warn"
    };

    let log_dir = karaoke_config::xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "karaoke.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "karaoke=trace,karaoke_jobs=trace,karaoke_server=trace,karaoke_config=trace,info",
                )),
        )
        .init();

    let server_url = cli
        .server
        .unwrap_or_else(|| "http://localhost:8000".to_string());

    let ctx = commands::Context {
        server_url,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Run(args) => run::run(args, &ctx).await,
        Commands::Submit(args) => submit::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Search(args) => search::run(args, &ctx).await,
    }
}
