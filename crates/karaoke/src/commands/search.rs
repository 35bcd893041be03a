//! Search command - find source videos through the server.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::Context;
use crate::client::Client;

/// Arguments for the search command.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search terms
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,
}

/// Run the search command.
pub async fn run(args: SearchArgs, ctx: &Context) -> Result<()> {
    let client = Client::new(&ctx.server_url)?;
    let query = args.query.join(" ");
    let results = client.search(&query).await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results for \"{}\"", query);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    for (i, hit) in results.iter().enumerate() {
        println!("{:>3}. {}", i + 1, style(&hit.title).bold());
        let mut meta = vec![hit.channel.as_str()];
        if !hit.duration.is_empty() {
            meta.push(hit.duration.as_str());
        }
        let views = format!("{} views", hit.view_count_short);
        if !hit.view_count_short.is_empty() {
            meta.push(views.as_str());
        }
        meta.retain(|m| !m.is_empty());
        println!("     {}", dim.apply_to(meta.join(" · ")));
        println!("     {}", hit.link);
    }
    println!();
    Ok(())
}
