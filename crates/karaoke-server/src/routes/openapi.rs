//! OpenAPI documentation configuration.

use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

use super::{health, jobs, search};
use crate::state::AppState;

/// OpenAPI documentation for the karaoke API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Karaoke API",
        description = "Turn a video URL into a karaoke-ready artifact",
        version = "1.0.0",
        license(name = "MIT"),
    ),
    servers(
        (url = "/", description = "Local server"),
    ),
    paths(
        health::health,
        jobs::submit_handler,
        jobs::download_handler,
        jobs::status_handler,
        jobs::result_handler,
        jobs::mp3_handler,
        jobs::save_handler,
        search::search_handler,
    ),
    components(
        schemas(
            health::HealthResponse,
            jobs::SubmitRequest,
            jobs::DownloadRequest,
            jobs::SubmitResponse,
            jobs::StatusResponse,
            jobs::SaveFileRequest,
            jobs::SaveResponse,
            search::SearchHit,
            search::SearchResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "jobs", description = "Karaoke and audio jobs"),
        (name = "search", description = "Source video search"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Serve the generated document at `/api/openapi.json`.
pub fn openapi_routes() -> Router<AppState> {
    Router::new().route("/api/openapi.json", get(openapi_json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_job_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/health", "/submit", "/status/{job_id}", "/result/{job_id}", "/search"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
