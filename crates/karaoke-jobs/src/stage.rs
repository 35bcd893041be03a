//! Stage contract between the pipeline executor and the media tools.
//!
//! Each stage either leaves its documented artifact in the working
//! directory and returns its path, or fails with a bounded diagnostic.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Maximum number of characters kept from a tool's output.
///
/// Tool output is noisy; only the trailing slice carries the actual error.
pub const MAX_DIAGNOSTIC_CHARS: usize = 500;

/// Downloaded source media.
pub const SOURCE_VIDEO: &str = "source.mp4";
/// Audio track isolated from the source media.
pub const ORIGINAL_AUDIO: &str = "original.mp3";
/// Instrumental track produced by vocal separation.
pub const ACCOMPANIMENT: &str = "accompaniment.wav";
/// Encoded instrumental track.
pub const FINAL_AUDIO: &str = "final.mp3";
/// Instrumental track muxed over the source video.
pub const FINAL_VIDEO: &str = "final.mp4";

/// Pipeline step that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Title,
    Download,
    Extract,
    Separate,
    Encode,
    Search,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Title => "title",
            Stage::Download => "download",
            Stage::Extract => "extract",
            Stage::Separate => "separate",
            Stage::Encode => "encode",
            Stage::Search => "search",
        })
    }
}

/// A failed external tool invocation.
///
/// Displays as the bare diagnostic, which is what the job records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{diagnostic}")]
pub struct StageError {
    pub stage: Stage,
    pub diagnostic: String,
}

impl StageError {
    /// Build an error, keeping only the tail of the diagnostic.
    pub fn new(stage: Stage, diagnostic: impl AsRef<str>) -> Self {
        Self {
            stage,
            diagnostic: bounded_diagnostic(diagnostic.as_ref()),
        }
    }
}

/// Outcome of a stage: the artifact it produced, or why it failed.
pub type StageOutcome = std::result::Result<PathBuf, StageError>;

/// The external collaborators a pipeline drives.
///
/// [`ExternalTools`](crate::ExternalTools) shells out to yt-dlp, ffmpeg and
/// demucs; tests substitute deterministic stubs.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Look up the human-readable title of the source.
    async fn fetch_title(&self, url: &str) -> std::result::Result<String, StageError>;

    /// Fetch the source media into `work_dir/source.mp4`.
    async fn download(&self, url: &str, work_dir: &Path) -> StageOutcome;

    /// Fetch only the audio track as `work_dir/<file_stem>.mp3`.
    async fn download_audio(&self, url: &str, work_dir: &Path, file_stem: &str) -> StageOutcome;

    /// Isolate the audio track into `work_dir/original.mp3`.
    async fn extract_audio(&self, work_dir: &Path) -> StageOutcome;

    /// Remove vocals, leaving `work_dir/accompaniment.wav`.
    async fn separate(&self, work_dir: &Path) -> StageOutcome;

    /// Encode `final.mp3`, plus `final.mp4` when `video` is set.
    /// Returns the final artifact.
    async fn encode(&self, work_dir: &Path, video: bool) -> StageOutcome;
}

/// Shared handle to a toolkit.
pub type SharedToolkit = Arc<dyn MediaToolkit>;

/// Trim `text` and keep at most the last [`MAX_DIAGNOSTIC_CHARS`] characters.
pub fn bounded_diagnostic(text: &str) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= MAX_DIAGNOSTIC_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - MAX_DIAGNOSTIC_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_diagnostic_kept() {
        let err = StageError::new(Stage::Separate, "  model unavailable\n");
        assert_eq!(err.diagnostic, "model unavailable");
        assert_eq!(err.to_string(), "model unavailable");
    }

    #[test]
    fn test_long_diagnostic_keeps_tail() {
        let noisy = format!("{}FATAL: disk full", "progress 10%\n".repeat(200));
        let bounded = bounded_diagnostic(&noisy);
        assert_eq!(bounded.chars().count(), MAX_DIAGNOSTIC_CHARS);
        assert!(bounded.ends_with("FATAL: disk full"));
    }

    #[test]
    fn test_bounding_respects_char_boundaries() {
        let text = "é".repeat(MAX_DIAGNOSTIC_CHARS + 10);
        let bounded = bounded_diagnostic(&text);
        assert_eq!(bounded.chars().count(), MAX_DIAGNOSTIC_CHARS);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Download.to_string(), "download");
        assert_eq!(Stage::Encode.to_string(), "encode");
    }
}
