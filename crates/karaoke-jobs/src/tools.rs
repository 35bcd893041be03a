//! Stage implementations backed by yt-dlp, ffmpeg and demucs.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::stage::{
    ACCOMPANIMENT, FINAL_AUDIO, FINAL_VIDEO, MediaToolkit, ORIGINAL_AUDIO, SOURCE_VIDEO, Stage,
    StageError, StageOutcome,
};

/// Directory demucs writes its stems into, relative to the working dir.
const STEMS_DIR: &str = "stems";

/// Binaries used by the stages.
#[derive(Debug, Clone)]
pub struct ExternalTools {
    yt_dlp: PathBuf,
    ffmpeg: PathBuf,
    demucs: PathBuf,
}

impl Default for ExternalTools {
    fn default() -> Self {
        Self::new("yt-dlp", "ffmpeg", "demucs")
    }
}

impl ExternalTools {
    pub fn new(
        yt_dlp: impl Into<PathBuf>,
        ffmpeg: impl Into<PathBuf>,
        demucs: impl Into<PathBuf>,
    ) -> Self {
        Self {
            yt_dlp: yt_dlp.into(),
            ffmpeg: ffmpeg.into(),
            demucs: demucs.into(),
        }
    }

    /// yt-dlp binary, shared with [`VideoSearch`](crate::VideoSearch).
    pub fn yt_dlp(&self) -> &Path {
        &self.yt_dlp
    }

    async fn ffmpeg(&self, stage: Stage, args: &[&OsStr]) -> Result<(), StageError> {
        let output = run_tool(stage, &self.ffmpeg, args).await?;
        check_status(stage, "ffmpeg", &output)
    }
}

#[async_trait]
impl MediaToolkit for ExternalTools {
    async fn fetch_title(&self, url: &str) -> Result<String, StageError> {
        let args = [
            OsStr::new("--print"),
            OsStr::new("%(title)s"),
            OsStr::new("--no-playlist"),
            OsStr::new(url),
        ];
        let output = run_tool(Stage::Title, &self.yt_dlp, &args).await?;
        check_status(Stage::Title, "yt-dlp", &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn download(&self, url: &str, work_dir: &Path) -> StageOutcome {
        let target = work_dir.join(SOURCE_VIDEO);
        let args = [
            OsStr::new("-f"),
            OsStr::new("bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best"),
            OsStr::new("--merge-output-format"),
            OsStr::new("mp4"),
            OsStr::new("--no-playlist"),
            OsStr::new("-o"),
            target.as_os_str(),
            OsStr::new(url),
        ];
        let output = run_tool(Stage::Download, &self.yt_dlp, &args).await?;
        check_status(Stage::Download, "yt-dlp download", &output)?;
        info!(path = %target.display(), "Downloaded source video");
        expect_artifact(Stage::Download, target)
    }

    async fn download_audio(&self, url: &str, work_dir: &Path, file_stem: &str) -> StageOutcome {
        // yt-dlp appends the extension itself after conversion
        let template = work_dir.join(file_stem);
        let args = [
            OsStr::new("-f"),
            OsStr::new("bestaudio/best"),
            OsStr::new("-x"),
            OsStr::new("--audio-format"),
            OsStr::new("mp3"),
            OsStr::new("--audio-quality"),
            OsStr::new("0"),
            OsStr::new("--embed-thumbnail"),
            OsStr::new("--convert-thumbnails"),
            OsStr::new("jpg"),
            OsStr::new("--embed-metadata"),
            OsStr::new("--no-playlist"),
            OsStr::new("-o"),
            template.as_os_str(),
            OsStr::new(url),
        ];
        let output = run_tool(Stage::Download, &self.yt_dlp, &args).await?;
        check_status(Stage::Download, "yt-dlp audio download", &output)?;
        let target = work_dir.join(format!("{file_stem}.mp3"));
        info!(path = %target.display(), "Downloaded audio");
        expect_artifact(Stage::Download, target)
    }

    async fn extract_audio(&self, work_dir: &Path) -> StageOutcome {
        let source = work_dir.join(SOURCE_VIDEO);
        let target = work_dir.join(ORIGINAL_AUDIO);
        self.ffmpeg(
            Stage::Extract,
            &[
                OsStr::new("-y"),
                OsStr::new("-i"),
                source.as_os_str(),
                OsStr::new("-vn"),
                OsStr::new("-acodec"),
                OsStr::new("libmp3lame"),
                OsStr::new("-q:a"),
                OsStr::new("0"),
                target.as_os_str(),
            ],
        )
        .await?;
        info!(path = %target.display(), "Extracted audio track");
        expect_artifact(Stage::Extract, target)
    }

    async fn separate(&self, work_dir: &Path) -> StageOutcome {
        let input = work_dir.join(ORIGINAL_AUDIO);
        let stems = work_dir.join(STEMS_DIR);
        let args = [
            OsStr::new("--two-stems=vocals"),
            OsStr::new("-o"),
            stems.as_os_str(),
            input.as_os_str(),
        ];
        let output = run_tool(Stage::Separate, &self.demucs, &args).await?;
        check_status(Stage::Separate, "demucs", &output)?;

        // demucs writes stems/<model>/<input stem>/no_vocals.wav
        let Some(no_vocals) = find_no_vocals(&stems).await else {
            return Err(StageError::new(
                Stage::Separate,
                format!(
                    "demucs: no_vocals.wav not found under {}. Contents: {:?}",
                    stems.display(),
                    list_wavs(&stems).await
                ),
            ));
        };

        let target = work_dir.join(ACCOMPANIMENT);
        tokio::fs::copy(&no_vocals, &target).await.map_err(|e| {
            StageError::new(Stage::Separate, format!("failed to copy accompaniment: {e}"))
        })?;
        info!(path = %target.display(), "Vocal separation complete");
        expect_artifact(Stage::Separate, target)
    }

    async fn encode(&self, work_dir: &Path, video: bool) -> StageOutcome {
        let accompaniment = work_dir.join(ACCOMPANIMENT);
        let audio = work_dir.join(FINAL_AUDIO);
        self.ffmpeg(
            Stage::Encode,
            &[
                OsStr::new("-y"),
                OsStr::new("-i"),
                accompaniment.as_os_str(),
                OsStr::new("-vn"),
                OsStr::new("-ar"),
                OsStr::new("44100"),
                OsStr::new("-ac"),
                OsStr::new("2"),
                OsStr::new("-b:a"),
                OsStr::new("192k"),
                audio.as_os_str(),
            ],
        )
        .await?;
        debug!(path = %audio.display(), "Converted accompaniment to mp3");

        if !video {
            return expect_artifact(Stage::Encode, audio);
        }

        let source = work_dir.join(SOURCE_VIDEO);
        let target = work_dir.join(FINAL_VIDEO);
        self.ffmpeg(
            Stage::Encode,
            &[
                OsStr::new("-y"),
                OsStr::new("-i"),
                source.as_os_str(),
                OsStr::new("-i"),
                audio.as_os_str(),
                OsStr::new("-map"),
                OsStr::new("0:v:0"),
                OsStr::new("-map"),
                OsStr::new("1:a:0"),
                OsStr::new("-c:v"),
                OsStr::new("copy"),
                OsStr::new("-c:a"),
                OsStr::new("aac"),
                OsStr::new("-b:a"),
                OsStr::new("192k"),
                OsStr::new("-shortest"),
                target.as_os_str(),
            ],
        )
        .await?;
        info!(path = %target.display(), "Karaoke video written");
        expect_artifact(Stage::Encode, target)
    }
}

/// Spawn `program` and wait for it, capturing stdout and stderr.
pub(crate) async fn run_tool(
    stage: Stage,
    program: &Path,
    args: &[&OsStr],
) -> Result<Output, StageError> {
    debug!(%stage, program = %program.display(), ?args, "Invoking external tool");
    Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            StageError::new(
                stage,
                format!("failed to invoke {}: {e}", program.display()),
            )
        })
}

/// Turn a non-zero exit into a stage failure carrying the output tail.
pub(crate) fn check_status(stage: Stage, tool: &str, output: &Output) -> Result<(), StageError> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let detail = if !stderr.trim().is_empty() {
        stderr
    } else if !stdout.trim().is_empty() {
        stdout
    } else {
        format!("exited with {}", output.status).into()
    };
    let err = StageError::new(stage, format!("{tool} failed: {}", tail(&detail)));
    error!(%stage, tool, diagnostic = %err.diagnostic, "External tool failed");
    Err(err)
}

/// The tail of tool output, without cutting a UTF-8 sequence.
fn tail(text: &str) -> &str {
    let text = text.trim_end();
    let limit = crate::stage::MAX_DIAGNOSTIC_CHARS;
    match text.char_indices().rev().nth(limit - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

fn expect_artifact(stage: Stage, path: PathBuf) -> StageOutcome {
    if path.is_file() {
        Ok(path)
    } else {
        Err(StageError::new(
            stage,
            format!("expected output missing: {}", path.display()),
        ))
    }
}

async fn find_no_vocals(stems: &Path) -> Option<PathBuf> {
    let input_stem = Path::new(ORIGINAL_AUDIO).file_stem()?;
    let mut models = tokio::fs::read_dir(stems).await.ok()?;
    while let Ok(Some(model)) = models.next_entry().await {
        let candidate = model.path().join(input_stem).join("no_vocals.wav");
        if tokio::fs::metadata(&candidate)
            .await
            .is_ok_and(|meta| meta.is_file())
        {
            return Some(candidate);
        }
    }
    None
}

/// Every `.wav` below `dir`, for diagnostics when separation output is missing.
async fn list_wavs(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&current).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            match entry.file_type().await {
                Ok(kind) if kind.is_dir() => pending.push(path),
                Ok(_) if path.extension().is_some_and(|ext| ext == "wav") => found.push(path),
                _ => {}
            }
        }
    }
    found.sort();
    found
}
