//! API routes.

pub mod health;
pub mod jobs;
pub mod openapi;
pub mod search;

pub use health::health_routes;
pub use jobs::{
    DownloadRequest, SaveFileRequest, SaveResponse, StatusResponse, SubmitRequest,
    SubmitResponse, download_handler, mp3_handler, result_handler, save_handler, status_handler,
    submit_handler,
};
pub use openapi::{ApiDoc, openapi_routes};
pub use search::{SearchHit, SearchQuery, SearchResponse, search_handler};
