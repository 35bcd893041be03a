//! Run command - build a karaoke track in-process and move it to a destination.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;
use karaoke_jobs::{
    ExternalTools, JobRecord, JobService, JobStatus, JobStore, KaraokeRequest, OutputFormat,
};
use serde::Serialize;

use super::Context;

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source video URL
    #[arg(long, alias = "youtube-link")]
    pub url: String,

    /// Produce an mp4 music video instead of an mp3
    #[arg(long, alias = "music-video")]
    pub video: bool,

    /// Title for the output file (looked up from the source when omitted)
    #[arg(long)]
    pub title: Option<String>,

    /// Directory the finished file is moved into
    #[arg(long)]
    pub destination: PathBuf,

    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RunOutput {
    job_id: String,
    output: String,
}

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let config = super::load_config(args.config.as_deref(), ctx)?;
    let tools = config.tools();
    let work_root = config.storage().work_root();

    let toolkit = ExternalTools::new(tools.yt_dlp, tools.ffmpeg, tools.demucs);
    let service = JobService::new(JobStore::new(), Arc::new(toolkit), work_root);

    let format = if args.video {
        OutputFormat::Mp4
    } else {
        OutputFormat::Mp3
    };
    let job_id = service
        .submit(KaraokeRequest {
            video_url: args.url,
            title: args.title,
            format,
        })
        .await?;

    let job = follow(&service, &job_id, ctx).await?;

    if job.status == JobStatus::Error {
        anyhow::bail!(
            "Processing failed: {}",
            job.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    let output = job
        .output_path
        .context("job finished without an output file")?;

    let dest = move_into(&output, &args.destination).await?;

    if ctx.json_output {
        let out = RunOutput {
            job_id,
            output: dest.display().to_string(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{} {}", style("Saved").green().bold(), dest.display());
    }
    Ok(())
}

/// Poll the job until it is terminal, mirroring its progress on a spinner.
async fn follow(service: &JobService, job_id: &str, ctx: &Context) -> Result<JobRecord> {
    let pb = super::spinner(ctx, "Job queued");
    loop {
        let job = service.status(job_id)?;
        pb.set_message(job.progress_message.clone());
        if job.status.is_terminal() {
            pb.finish_with_message(job.progress_message.clone());
            return Ok(job);
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

/// Move `file` into `dir`, copying when a rename crosses filesystems.
async fn move_into(file: &Path, dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;
    let name = file
        .file_name()
        .context("output path has no file name")?;
    let dest = dir.join(name);

    if tokio::fs::rename(file, &dest).await.is_err() {
        tokio::fs::copy(file, &dest)
            .await
            .with_context(|| format!("copying to {}", dest.display()))?;
        tokio::fs::remove_file(file).await?;
    }
    Ok(dest)
}
