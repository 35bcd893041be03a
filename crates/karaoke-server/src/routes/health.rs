//! Liveness endpoint.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

/// Liveness report.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `ok` while the process is serving.
    pub status: String,
    /// Server crate version.
    pub version: String,
    /// Jobs tracked since startup, in any state.
    pub jobs: usize,
    /// Whether `/save` has an output root to copy into.
    pub save_enabled: bool,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        jobs: state.service.store().len(),
        save_enabled: state.service.output_root().is_some(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use karaoke_jobs::{
        JobKind, JobService, JobStore, MediaToolkit, Stage, StageError, StageOutcome, VideoSearch,
    };
    use tower::ServiceExt;

    use crate::{Server, ServerConfig};

    struct Idle;

    #[async_trait]
    impl MediaToolkit for Idle {
        async fn fetch_title(&self, _url: &str) -> std::result::Result<String, StageError> {
            Err(StageError::new(Stage::Title, "idle"))
        }
        async fn download(&self, _url: &str, _dir: &Path) -> StageOutcome {
            Err(StageError::new(Stage::Download, "idle"))
        }
        async fn download_audio(&self, _url: &str, _dir: &Path, _stem: &str) -> StageOutcome {
            Err(StageError::new(Stage::Download, "idle"))
        }
        async fn extract_audio(&self, _dir: &Path) -> StageOutcome {
            Err(StageError::new(Stage::Extract, "idle"))
        }
        async fn separate(&self, _dir: &Path) -> StageOutcome {
            Err(StageError::new(Stage::Separate, "idle"))
        }
        async fn encode(&self, _dir: &Path, _video: bool) -> StageOutcome {
            Err(StageError::new(Stage::Encode, "idle"))
        }
    }

    async fn get_health(service: JobService) -> (StatusCode, Option<String>, HealthResponse) {
        let server = Server::new(service, VideoSearch::new("/nonexistent/yt-dlp"), ServerConfig::new());
        let response = server
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_version_and_job_count() {
        let work = tempfile::tempdir().unwrap();
        let store = JobStore::new();
        store.create("one", JobKind::Karaoke).unwrap();
        store.create("two", JobKind::Audio).unwrap();
        let service = JobService::new(store, Arc::new(Idle), work.path());

        let (status, content_type, health) = get_health(service).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(health.status, "ok");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(health.jobs, 2);
        assert!(!health.save_enabled);
    }

    #[tokio::test]
    async fn test_health_reports_save_enabled_with_output_root() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let service = JobService::new(JobStore::new(), Arc::new(Idle), work.path())
            .with_output_root(Some(out.path().to_path_buf()));

        let (_, _, health) = get_health(service).await;

        assert_eq!(health.jobs, 0);
        assert!(health.save_enabled);
    }
}
