//! Status command - shows a job's progress, or whether the server is up.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use super::Context;
use crate::client::Client;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Job ID to inspect (omit for server status)
    pub job_id: Option<String>,
}

/// Server status for JSON output.
#[derive(Debug, Serialize)]
struct ServerStatusOutput {
    running: bool,
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    jobs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    save_enabled: Option<bool>,
    server_url: String,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let client = Client::new(&ctx.server_url)?;

    match args.job_id {
        Some(job_id) => job_status(&client, &job_id, ctx).await,
        None => server_status(&client, ctx).await,
    }
}

async fn job_status(client: &Client, job_id: &str, ctx: &Context) -> Result<()> {
    let status = client.status(job_id).await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let state = match status.status.as_str() {
        "done" => style(status.status.as_str()).green(),
        "error" => style(status.status.as_str()).red(),
        _ => style(status.status.as_str()).yellow(),
    };

    println!();
    println!("  {} {}", dim.apply_to("Job:"), status.job_id);
    println!("  {} {}", dim.apply_to("Status:"), state);
    println!("  {} {}", dim.apply_to("Progress:"), status.progress_message);
    if let Some(ref error) = status.error {
        println!("  {} {}", dim.apply_to("Error:"), style(error).red());
    }
    println!();
    Ok(())
}

async fn server_status(client: &Client, ctx: &Context) -> Result<()> {
    match client.health().await {
        Ok(health) => {
            if ctx.json_output {
                let output = ServerStatusOutput {
                    running: true,
                    version: Some(health.version.clone()),
                    jobs: Some(health.jobs),
                    save_enabled: Some(health.save_enabled),
                    server_url: ctx.server_url.clone(),
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                let green = Style::new().green();
                let dim = Style::new().dim();

                println!();
                println!("{}", style("Karaoke Server Status").bold());
                println!("{}", dim.apply_to("─".repeat(40)));
                println!();
                println!(
                    "  {} {}",
                    dim.apply_to("Status:"),
                    green.apply_to("● running")
                );
                println!("  {} {}", dim.apply_to("Version:"), health.version);
                println!("  {} {}", dim.apply_to("Jobs:"), health.jobs);
                let save = if health.save_enabled { "enabled" } else { "disabled" };
                println!("  {} {}", dim.apply_to("Save:"), save);
                println!("  {} {}", dim.apply_to("Server:"), ctx.server_url);
                println!();
            }
        }
        Err(e) => {
            if ctx.json_output {
                let output = ServerStatusOutput {
                    running: false,
                    version: None,
                    jobs: None,
                    save_enabled: None,
                    server_url: ctx.server_url.clone(),
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                let red = Style::new().red();
                let dim = Style::new().dim();

                println!();
                println!("{}", style("Karaoke Server Status").bold());
                println!("{}", dim.apply_to("─".repeat(40)));
                println!();
                println!(
                    "  {} {}",
                    dim.apply_to("Status:"),
                    red.apply_to("● not running")
                );
                println!("  {} {}", dim.apply_to("Server:"), ctx.server_url);

                if ctx.verbose {
                    println!();
                    println!("  {} {}", dim.apply_to("Error:"), e);
                }

                println!();
                println!("  {}", dim.apply_to("Start the server with: karaoke start"));
                println!();
            }
        }
    }

    Ok(())
}
