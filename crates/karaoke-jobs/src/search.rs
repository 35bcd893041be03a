//! Video search through yt-dlp's flat playlist extraction.

use std::ffi::OsStr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{JobError, Result};
use crate::stage::Stage;
use crate::tools::{check_status, run_tool};

/// Number of results requested per search.
pub const SEARCH_LIMIT: usize = 20;

/// One search hit, shaped for the web client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub link: String,
    pub thumbnail: String,
    pub channel: String,
    /// Abbreviated view count (`1.2M`, `3.4K`, `512`, or empty).
    pub view_count_short: String,
    pub duration: String,
}

/// Fields read from each line of `yt-dlp --dump-json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FlatEntry {
    id: String,
    title: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    view_count: Option<u64>,
    duration_string: Option<String>,
    thumbnails: Option<Vec<Thumbnail>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Thumbnail {
    url: String,
}

/// Searches for source videos.
#[derive(Debug, Clone)]
pub struct VideoSearch {
    yt_dlp: PathBuf,
}

impl VideoSearch {
    pub fn new(yt_dlp: impl Into<PathBuf>) -> Self {
        Self {
            yt_dlp: yt_dlp.into(),
        }
    }

    /// Return up to [`SEARCH_LIMIT`] results for `query`.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(JobError::Validation("query must not be empty".to_string()));
        }

        let target = format!("ytsearch{SEARCH_LIMIT}:{query}");
        let args = [
            OsStr::new("--flat-playlist"),
            OsStr::new("--dump-json"),
            OsStr::new("--no-warnings"),
            OsStr::new(&target),
        ];
        let output = run_tool(Stage::Search, &self.yt_dlp, &args).await?;
        check_status(Stage::Search, "yt-dlp search", &output)?;

        let results = parse_search_output(&String::from_utf8_lossy(&output.stdout));
        debug!(query, count = results.len(), "Search complete");
        Ok(results)
    }
}

/// Parse newline-delimited JSON entries, skipping blank or malformed lines.
pub fn parse_search_output(stdout: &str) -> Vec<SearchResult> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<FlatEntry>(line).ok())
        .filter(|entry| !entry.id.is_empty())
        .take(SEARCH_LIMIT)
        .map(|entry| {
            let thumbnail = entry
                .thumbnails
                .as_ref()
                .and_then(|t| t.last())
                .map(|t| t.url.clone())
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", entry.id));
            SearchResult {
                link: format!("https://www.youtube.com/watch?v={}", entry.id),
                thumbnail,
                channel: entry.channel.or(entry.uploader).unwrap_or_default(),
                view_count_short: entry.view_count.map(format_view_count).unwrap_or_default(),
                duration: entry.duration_string.unwrap_or_default(),
                id: entry.id,
                title: entry.title.unwrap_or_default(),
            }
        })
        .collect()
}

/// Abbreviate a view count: `1234567` → `1.2M`, `4321` → `4.3K`.
pub fn format_view_count(views: u64) -> String {
    if views >= 1_000_000 {
        format!("{:.1}M", views as f64 / 1_000_000.0)
    } else if views >= 1_000 {
        format!("{:.1}K", views as f64 / 1_000.0)
    } else {
        views.to_string()
    }
}
