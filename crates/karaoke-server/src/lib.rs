//! HTTP API for the karaoke job service.
//!
//! Exposes job submission, status polling, artifact download and video
//! search over axum. All work is delegated to [`karaoke_jobs::JobService`];
//! this crate only maps requests onto it and job errors onto HTTP statuses.
//!
//! # Example
//!
//! ```ignore
//! use karaoke_jobs::{ExternalTools, JobService, JobStore, VideoSearch};
//! use karaoke_server::{Server, ServerConfig};
//!
//! let tools = ExternalTools::default();
//! let search = VideoSearch::new(tools.yt_dlp());
//! let service = JobService::new(JobStore::new(), Arc::new(tools), std::env::temp_dir());
//! let config = ServerConfig::new().with_bind_address("0.0.0.0:8000".parse()?);
//!
//! Server::new(service, search, config).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ErrorResponse, Result, ServerError};
pub use logging::request_logging_middleware;
pub use routes::{StatusResponse, SubmitRequest, SubmitResponse};
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::{Router, extract::DefaultBodyLimit, http::HeaderValue, middleware};
use karaoke_jobs::{JobService, VideoSearch};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// The karaoke HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a new server over the given service.
    pub fn new(service: JobService, search: VideoSearch, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(service, search, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        use axum::routing::{get, post};

        let mut router = Router::new()
            .merge(routes::health_routes())
            .merge(routes::openapi_routes())
            .route("/submit", post(routes::submit_handler))
            // Legacy path used by existing web clients
            .route("/karaoke", post(routes::submit_handler))
            .route("/download", post(routes::download_handler))
            .route("/status/{job_id}", get(routes::status_handler))
            .route("/result/{job_id}", get(routes::result_handler))
            .route("/file/{job_id}", get(routes::result_handler))
            .route("/mp3/{job_id}", get(routes::mp3_handler))
            .route("/save/{job_id}", post(routes::save_handler))
            .route("/search", get(routes::search_handler))
            .layer(DefaultBodyLimit::max(self.state.config.max_body_size))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ));

        if let Some(cors) = self.cors_layer() {
            router = router.layer(cors);
        }

        router
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    fn cors_layer(&self) -> Option<CorsLayer> {
        let origins = &self.state.config.cors_origins;
        if origins.is_empty() {
            return None;
        }

        let allow_origin = if origins.iter().any(|o| o == "*") {
            AllowOrigin::from(Any)
        } else {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %o, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(parsed)
        };

        Some(
            CorsLayer::new()
                .allow_origin(allow_origin)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        self.run_with_shutdown(addr, std::future::pending()).await
    }

    /// Run until `signal` resolves, then drain in-flight requests.
    pub async fn run_with_shutdown<F>(self, addr: SocketAddr, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;
        let local = listener.local_addr().unwrap_or(addr);

        info!("Starting server on {}", local);

        axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}
