//! Pipeline executor.
//!
//! Drives one job through `queued → downloading → extracting → separating →
//! encoding → done`. Stages run strictly in order; the first failure halts
//! the job and is recorded as its error. Nothing is retried: partial
//! artifacts are not safely resumable.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use futures::FutureExt;
use tracing::{error, info, warn};

use crate::error::JobError;
use crate::job::{JobKind, JobStatus, JobUpdate, OutputFormat};
use crate::paths::safe_filename;
use crate::stage::{SharedToolkit, Stage, StageError};
use crate::store::JobStore;

/// Fallback filename stem when a title sanitises to nothing.
const FALLBACK_STEM: &str = "karaoke_output";

/// Everything the executor needs to run one job.
#[derive(Debug, Clone)]
pub struct PipelineJob {
    pub id: String,
    pub kind: JobKind,
    pub video_url: String,
    /// Exclusive scratch directory for this job.
    pub work_dir: PathBuf,
    /// Caller-supplied title; looked up from the source when absent.
    pub title: Option<String>,
    pub format: OutputFormat,
}

/// Why a run stopped early.
enum Halt {
    Stage(StageError),
    Store(JobError),
}

impl From<StageError> for Halt {
    fn from(e: StageError) -> Self {
        Halt::Stage(e)
    }
}

impl From<JobError> for Halt {
    fn from(e: JobError) -> Self {
        Halt::Store(e)
    }
}

/// Runs jobs against a toolkit, reporting through the store.
#[derive(Clone)]
pub struct Pipeline {
    store: JobStore,
    toolkit: SharedToolkit,
}

impl Pipeline {
    pub fn new(store: JobStore, toolkit: SharedToolkit) -> Self {
        Self { store, toolkit }
    }

    /// Run a job to a terminal state.
    ///
    /// Never returns an error: stage failures and panics become the job's
    /// `error` record.
    pub async fn run(&self, job: PipelineJob) {
        info!(job_id = %job.id, kind = ?job.kind, url = %job.video_url, "Pipeline started");

        let outcome = AssertUnwindSafe(self.execute(&job)).catch_unwind().await;

        match outcome {
            Ok(Ok(output_path)) => match self.store.set_done(&job.id, output_path.clone()) {
                Ok(_) => info!(job_id = %job.id, output = %output_path.display(), "Job complete"),
                Err(e) => warn!(job_id = %job.id, error = %e, "Failed to record completion"),
            },
            Ok(Err(Halt::Stage(e))) => {
                error!(job_id = %job.id, stage = %e.stage, error = %e.diagnostic, "Job failed");
                self.record_failure(&job.id, e.diagnostic);
            }
            Ok(Err(Halt::Store(e))) => {
                warn!(job_id = %job.id, error = %e, "Job store rejected progress update");
                self.record_failure(&job.id, e.to_string());
            }
            Err(_) => {
                error!(job_id = %job.id, "Pipeline panicked");
                self.record_failure(&job.id, "internal error: pipeline panicked".to_string());
            }
        }
    }

    fn record_failure(&self, id: &str, diagnostic: String) {
        if let Err(e) = self.store.set_error(id, diagnostic) {
            warn!(job_id = %id, error = %e, "Failed to record job failure");
        }
    }

    async fn execute(&self, job: &PipelineJob) -> Result<PathBuf, Halt> {
        match job.kind {
            JobKind::Karaoke => self.execute_karaoke(job).await,
            JobKind::Audio => self.execute_audio(job).await,
        }
    }

    async fn execute_karaoke(&self, job: &PipelineJob) -> Result<PathBuf, Halt> {
        let dir = job.work_dir.as_path();
        let toolkit = &self.toolkit;

        self.advance(&job.id, JobStatus::Downloading, "Downloading video…")?;
        let title = match job.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => title.to_string(),
            None => toolkit.fetch_title(&job.video_url).await?,
        };
        toolkit.download(&job.video_url, dir).await?;

        self.advance(&job.id, JobStatus::Extracting, "Extracting audio…")?;
        toolkit.extract_audio(dir).await?;

        self.advance(
            &job.id,
            JobStatus::Separating,
            "Removing vocals (this takes a while)…",
        )?;
        toolkit.separate(dir).await?;

        let message = match job.format {
            OutputFormat::Mp4 => "Encoding karaoke video…",
            OutputFormat::Mp3 => "Encoding karaoke track…",
        };
        self.advance(&job.id, JobStatus::Encoding, message)?;
        let artifact = toolkit.encode(dir, job.format.wants_video()).await?;

        let stem = non_empty_or(safe_filename(&title), FALLBACK_STEM);
        Ok(finalize(&artifact, dir, &stem, job.format.extension()).await?)
    }

    async fn execute_audio(&self, job: &PipelineJob) -> Result<PathBuf, Halt> {
        self.advance(&job.id, JobStatus::Downloading, "Downloading audio…")?;
        let stem = non_empty_or(
            job.title.as_deref().map(safe_filename).unwrap_or_default(),
            &job.id,
        );
        let artifact = self
            .toolkit
            .download_audio(&job.video_url, &job.work_dir, &stem)
            .await?;
        if !artifact.is_file() {
            return Err(StageError::new(
                Stage::Download,
                format!("expected output missing: {}", artifact.display()),
            )
            .into());
        }
        Ok(artifact)
    }

    fn advance(&self, id: &str, status: JobStatus, message: &str) -> Result<(), Halt> {
        self.store
            .update(id, JobUpdate::transition(status, message))?;
        info!(job_id = %id, %status, "{message}");
        Ok(())
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

/// Move the encoder's output to `<stem>.<ext>` inside the working directory.
async fn finalize(artifact: &Path, dir: &Path, stem: &str, ext: &str) -> Result<PathBuf, StageError> {
    if !artifact.is_file() {
        return Err(StageError::new(
            Stage::Encode,
            format!("expected output missing: {}", artifact.display()),
        ));
    }
    let target = dir.join(format!("{stem}.{ext}"));
    if target != artifact {
        tokio::fs::rename(artifact, &target).await.map_err(|e| {
            StageError::new(Stage::Encode, format!("failed to finalize artifact: {e}"))
        })?;
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_finalize_renames_to_title() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("final.mp4");
        std::fs::write(&artifact, b"video").unwrap();

        let out = finalize(&artifact, dir.path(), "Bohemian Rhapsody", "mp4")
            .await
            .unwrap();
        assert_eq!(out, dir.path().join("Bohemian Rhapsody.mp4"));
        assert!(out.is_file());
        assert!(!artifact.exists());
    }

    #[tokio::test]
    async fn test_finalize_missing_artifact_fails() {
        let dir = TempDir::new().unwrap();
        let err = finalize(&dir.path().join("final.mp3"), dir.path(), "x", "mp3")
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::Encode);
    }

    #[test]
    fn test_non_empty_or() {
        assert_eq!(non_empty_or(String::new(), FALLBACK_STEM), FALLBACK_STEM);
        assert_eq!(non_empty_or("Song".to_string(), FALLBACK_STEM), "Song");
    }
}
