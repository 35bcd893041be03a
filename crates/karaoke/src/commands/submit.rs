//! Submit command - queue a job on a running server.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use console::style;
use serde::Serialize;

use super::Context;
use crate::client::{Client, DownloadRequest, JobStatus, SubmitRequest};

/// Arguments for the submit command.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Source video URL
    pub url: String,

    /// Produce an mp4 music video instead of an mp3
    #[arg(long, conflicts_with = "audio")]
    pub video: bool,

    /// Only download the audio as mp3 (no vocal removal)
    #[arg(long)]
    pub audio: bool,

    /// Title for the output file
    #[arg(long)]
    pub title: Option<String>,

    /// Wait for the job to finish, showing progress
    #[arg(short, long)]
    pub wait: bool,
}

#[derive(Debug, Serialize)]
struct SubmitOutput<'a> {
    job_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a JobStatus>,
}

/// Run the submit command.
pub async fn run(args: SubmitArgs, ctx: &Context) -> Result<()> {
    let client = Client::new(&ctx.server_url)?;

    let job_id = if args.audio {
        client
            .download(&DownloadRequest {
                video_url: args.url,
                video_title: args.title.unwrap_or_default(),
            })
            .await?
    } else {
        let format = if args.video { "mp4" } else { "mp3" };
        client
            .submit(&SubmitRequest {
                video_url: args.url,
                title: args.title,
                format: format.to_string(),
            })
            .await?
    };

    let status = if args.wait {
        Some(wait_for(&client, &job_id, ctx).await?)
    } else {
        None
    };

    if ctx.json_output {
        let out = SubmitOutput {
            job_id: &job_id,
            status: status.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} {}", style("Job:").dim(), job_id);
    if let Some(status) = status {
        match status.error {
            Some(ref error) => {
                println!("{} {}", style("Failed:").red().bold(), error);
            }
            None => {
                println!(
                    "{} {}/result/{}",
                    style("Ready:").green().bold(),
                    ctx.server_url.trim_end_matches('/'),
                    job_id
                );
            }
        }
    } else {
        println!(
            "{}",
            style(format!("Check progress with: karaoke status {}", job_id)).dim()
        );
    }
    Ok(())
}

async fn wait_for(client: &Client, job_id: &str, ctx: &Context) -> Result<JobStatus> {
    let pb = super::spinner(ctx, "Job queued");
    loop {
        let status = client.status(job_id).await?;
        pb.set_message(status.progress_message.clone());
        if status.is_terminal() {
            pb.finish_with_message(status.progress_message.clone());
            return Ok(status);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
