//! Submission and query surface.
//!
//! `submit` creates the job record and spawns its pipeline on a tokio task
//! before returning, so callers never wait on a stage. Queries only read
//! store snapshots and never block on an in-progress job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{JobError, Result};
use crate::job::{JobKind, JobRecord, JobStatus, OutputFormat};
use crate::paths::{ensure_contained, ensure_creatable_within, media_type_for, resolve_within};
use crate::pipeline::{Pipeline, PipelineJob};
use crate::stage::{FINAL_AUDIO, SharedToolkit};
use crate::store::JobStore;

/// Request to build a karaoke artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KaraokeRequest {
    /// Source reference (a video URL).
    pub video_url: String,
    /// Title for the output file; looked up from the source when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub format: OutputFormat,
}

/// Request to download a source's audio as mp3.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioRequest {
    pub video_url: String,
    #[serde(default)]
    pub video_title: String,
}

/// Request to copy a finished artifact under the output root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveRequest {
    /// Destination directory, relative to the output root.
    pub sub_path: String,
    /// `"mp3"` selects the mp3 track; anything else the primary artifact.
    #[serde(default)]
    pub file_type: Option<String>,
}

impl SaveRequest {
    pub fn artifact_kind(&self) -> ArtifactKind {
        match self.file_type.as_deref() {
            Some(t) if t.eq_ignore_ascii_case("mp3") => ArtifactKind::Mp3,
            _ => ArtifactKind::Primary,
        }
    }
}

/// Which file of a finished job to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The job's recorded output.
    Primary,
    /// The instrumental mp3 (the sibling `final.mp3` of a karaoke video).
    Mp3,
}

/// A finished artifact ready to stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFile {
    pub path: PathBuf,
    /// Download name offered to clients.
    pub filename: String,
    pub media_type: &'static str,
}

/// Creates jobs, schedules their pipelines and answers queries.
#[derive(Clone)]
pub struct JobService {
    store: JobStore,
    pipeline: Arc<Pipeline>,
    work_root: PathBuf,
    output_root: Option<PathBuf>,
}

impl JobService {
    /// Create a service over `store`, running stages with `toolkit` and
    /// placing job working directories under `work_root`.
    pub fn new(store: JobStore, toolkit: SharedToolkit, work_root: impl Into<PathBuf>) -> Self {
        Self {
            pipeline: Arc::new(Pipeline::new(store.clone(), toolkit)),
            store,
            work_root: work_root.into(),
            output_root: None,
        }
    }

    /// Set the root for [`save`](Self::save). Saving is rejected without one.
    pub fn with_output_root(mut self, root: Option<PathBuf>) -> Self {
        self.output_root = root;
        self
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn output_root(&self) -> Option<&Path> {
        self.output_root.as_deref()
    }

    /// Submit a karaoke job. Returns its identifier immediately.
    pub async fn submit(&self, request: KaraokeRequest) -> Result<String> {
        let video_url = validate_url(&request.video_url)?;
        self.schedule(JobKind::Karaoke, "karaoke", video_url, request.title, request.format)
            .await
    }

    /// Submit an audio-only download job. Returns its identifier immediately.
    pub async fn submit_audio(&self, request: AudioRequest) -> Result<String> {
        let video_url = validate_url(&request.video_url)?;
        let title = Some(request.video_title).filter(|t| !t.trim().is_empty());
        self.schedule(JobKind::Audio, "mp3", video_url, title, OutputFormat::Mp3)
            .await
    }

    async fn schedule(
        &self,
        kind: JobKind,
        dir_prefix: &str,
        video_url: String,
        title: Option<String>,
        format: OutputFormat,
    ) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        let work_dir = std::path::absolute(self.work_root.join(format!("{dir_prefix}_{id}")))?;
        tokio::fs::create_dir_all(&work_dir).await?;

        self.store.create(&id, kind)?;

        let job = PipelineJob {
            id: id.clone(),
            kind,
            video_url,
            work_dir,
            title,
            format,
        };
        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(async move { pipeline.run(job).await });

        info!(job_id = %id, ?kind, "Job submitted");
        Ok(id)
    }

    /// Current snapshot of a job.
    pub fn status(&self, id: &str) -> Result<JobRecord> {
        self.store
            .get(id)
            .ok_or_else(|| JobError::NotFound("Job not found".to_string()))
    }

    /// Locate a finished artifact.
    ///
    /// Unknown jobs and files missing from disk are `NotFound`, errored jobs
    /// surface their recorded error as `Failed`, unfinished jobs are `Conflict`.
    pub async fn result(&self, id: &str, kind: ArtifactKind) -> Result<ResultFile> {
        let job = self.status(id)?;
        if job.status == JobStatus::Error {
            return Err(JobError::Failed(job.error.unwrap_or_default()));
        }
        let output = match (job.status, job.output_path) {
            (JobStatus::Done, Some(path)) => path,
            _ => return Err(JobError::Conflict("File not ready yet".to_string())),
        };

        let is_mp3 = output.extension().is_some_and(|e| e == "mp3");
        let (path, filename) = match kind {
            ArtifactKind::Mp3 if !is_mp3 => {
                let sibling = output.with_file_name(FINAL_AUDIO);
                let name = output.with_extension("mp3");
                (sibling, file_name(&name))
            }
            _ => {
                let name = file_name(&output);
                (output, name)
            }
        };

        if !tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            return Err(JobError::NotFound("Output file missing on disk".to_string()));
        }

        Ok(ResultFile {
            media_type: media_type_for(&path),
            path,
            filename,
        })
    }

    /// Copy a finished artifact under the configured output root.
    ///
    /// Returns the destination file.
    pub async fn save(&self, id: &str, request: SaveRequest) -> Result<PathBuf> {
        let root = self.output_root.as_deref().ok_or_else(|| {
            JobError::Configuration("OUTPUT_DIR not configured on server".to_string())
        })?;

        let file = self.result(id, request.artifact_kind()).await?;
        let dest_dir = resolve_within(root, &request.sub_path)?;
        tokio::fs::create_dir_all(root).await?;
        ensure_creatable_within(root, &dest_dir).await?;
        tokio::fs::create_dir_all(&dest_dir).await?;
        let dest_dir = ensure_contained(root, &dest_dir).await?;

        let dest = dest_dir.join(&file.filename);
        tokio::fs::copy(&file.path, &dest).await?;
        info!(job_id = %id, dest = %dest.display(), "Saved artifact");
        Ok(dest)
    }
}

fn validate_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(JobError::Validation("video_url must not be empty".to_string()));
    }
    Ok(url.to_string())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
