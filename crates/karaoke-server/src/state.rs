//! Application state shared across handlers.

use std::sync::Arc;

use karaoke_jobs::{JobService, VideoSearch};

use crate::config::ServerConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Job submission and queries.
    pub service: JobService,

    /// Source video search.
    pub search: Arc<VideoSearch>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(service: JobService, search: VideoSearch, config: ServerConfig) -> Self {
        Self {
            service,
            search: Arc::new(search),
            config: Arc::new(config),
        }
    }
}
