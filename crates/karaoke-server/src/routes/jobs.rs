//! Job endpoints.
//!
//! Submission returns as soon as the job is recorded; the pipeline runs in
//! the background and clients poll `/status/{job_id}` until the job is
//! terminal, then fetch the artifact from `/result/{job_id}`.

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use karaoke_jobs::{
    ArtifactKind, AudioRequest, JobRecord, JobStatus, KaraokeRequest, OutputFormat, ResultFile,
    SaveRequest,
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use utoipa::ToSchema;

use crate::error::{Result, ServerError};
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Request to build a karaoke artifact.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitRequest {
    /// Source video URL.
    pub video_url: String,
    /// Title used for the output filename. Looked up from the source when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// `mp4` (instrumental muxed over the source video) or `mp3`.
    #[serde(default)]
    #[schema(value_type = String)]
    pub format: OutputFormat,
}

impl From<SubmitRequest> for KaraokeRequest {
    fn from(req: SubmitRequest) -> Self {
        KaraokeRequest {
            video_url: req.video_url,
            title: req.title,
            format: req.format,
        }
    }
}

/// Request to download a source's audio as mp3.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DownloadRequest {
    pub video_url: String,
    #[serde(default)]
    pub video_title: String,
}

/// Response carrying a newly created job's identifier.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    pub job_id: String,
}

/// Job status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub job_id: String,
    #[schema(value_type = String)]
    pub status: JobStatus,
    pub progress_message: String,
    /// Failure diagnostic, present only when `status` is `error`.
    pub error: Option<String>,
}

impl From<JobRecord> for StatusResponse {
    fn from(job: JobRecord) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            progress_message: job.progress_message,
            error: job.error,
        }
    }
}

/// Request to copy a finished artifact under the server's output directory.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaveFileRequest {
    /// Destination directory relative to the output directory.
    pub sub_path: String,
    /// `mp3` saves the instrumental track; anything else the primary artifact.
    #[serde(default)]
    pub file_type: Option<String>,
}

/// Response for a completed save.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaveResponse {
    pub saved_to: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /submit - Submit a karaoke job.
#[utoipa::path(
    post,
    path = "/submit",
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Job accepted", body = SubmitResponse),
        (status = 400, description = "Invalid request"),
    ),
    tag = "jobs"
)]
pub async fn submit_handler(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>> {
    let job_id = state.service.submit(request.into()).await?;
    Ok(Json(SubmitResponse { job_id }))
}

/// POST /download - Submit an audio-only download job.
#[utoipa::path(
    post,
    path = "/download",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Job accepted", body = SubmitResponse),
        (status = 400, description = "Invalid request"),
    ),
    tag = "jobs"
)]
pub async fn download_handler(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Result<Json<SubmitResponse>> {
    let job_id = state
        .service
        .submit_audio(AudioRequest {
            video_url: request.video_url,
            video_title: request.video_title,
        })
        .await?;
    Ok(Json(SubmitResponse { job_id }))
}

/// GET /status/{job_id} - Current job snapshot.
#[utoipa::path(
    get,
    path = "/status/{job_id}",
    params(("job_id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job status", body = StatusResponse),
        (status = 404, description = "Job not found"),
    ),
    tag = "jobs"
)]
pub async fn status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<StatusResponse>> {
    let job = state.service.status(&job_id)?;
    Ok(Json(job.into()))
}

/// GET /result/{job_id} - Stream the finished artifact.
#[utoipa::path(
    get,
    path = "/result/{job_id}",
    params(("job_id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Artifact bytes"),
        (status = 404, description = "Job or file not found"),
        (status = 409, description = "Job not finished"),
        (status = 500, description = "Job failed"),
    ),
    tag = "jobs"
)]
pub async fn result_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response> {
    let file = state.service.result(&job_id, ArtifactKind::Primary).await?;
    stream_file(file).await
}

/// GET /mp3/{job_id} - Stream the instrumental mp3 of a finished job.
#[utoipa::path(
    get,
    path = "/mp3/{job_id}",
    params(("job_id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "MP3 bytes"),
        (status = 404, description = "Job or file not found"),
        (status = 409, description = "Job not finished"),
        (status = 500, description = "Job failed"),
    ),
    tag = "jobs"
)]
pub async fn mp3_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response> {
    let file = state.service.result(&job_id, ArtifactKind::Mp3).await?;
    stream_file(file).await
}

/// POST /save/{job_id} - Copy the artifact under the output directory.
#[utoipa::path(
    post,
    path = "/save/{job_id}",
    params(("job_id" = String, Path, description = "Job ID")),
    request_body = SaveFileRequest,
    responses(
        (status = 200, description = "Artifact saved", body = SaveResponse),
        (status = 400, description = "Output directory unset or path escapes it"),
        (status = 404, description = "Job or file not found"),
        (status = 409, description = "Job not finished"),
    ),
    tag = "jobs"
)]
pub async fn save_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(request): Json<SaveFileRequest>,
) -> Result<Json<SaveResponse>> {
    let dest = state
        .service
        .save(
            &job_id,
            SaveRequest {
                sub_path: request.sub_path,
                file_type: request.file_type,
            },
        )
        .await?;
    Ok(Json(SaveResponse {
        saved_to: dest.display().to_string(),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

async fn stream_file(file: ResultFile) -> Result<Response> {
    let handle = tokio::fs::File::open(&file.path)
        .await
        .map_err(|e| ServerError::Internal(format!("Failed to open artifact: {}", e)))?;
    let len = handle
        .metadata()
        .await
        .map_err(|e| ServerError::Internal(format!("Failed to stat artifact: {}", e)))?
        .len();

    let body = Body::from_stream(ReaderStream::new(handle));
    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(file.media_type),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&file.filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}
