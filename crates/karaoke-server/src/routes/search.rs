//! Source video search endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use karaoke_jobs::SearchResult;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::Result;
use crate::state::AppState;

/// Query params for search.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Free-text search terms.
    #[serde(default)]
    pub query: String,
}

/// A single search hit.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub link: String,
    pub thumbnail: String,
    pub channel: String,
    /// Abbreviated view count such as `1.2M`.
    pub view_count_short: String,
    pub duration: String,
}

impl From<SearchResult> for SearchHit {
    fn from(r: SearchResult) -> Self {
        Self {
            id: r.id,
            title: r.title,
            link: r.link,
            thumbnail: r.thumbnail,
            channel: r.channel,
            view_count_short: r.view_count_short,
            duration: r.duration,
        }
    }
}

/// Search response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

/// GET /search - Find source videos.
#[utoipa::path(
    get,
    path = "/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 400, description = "Empty query"),
        (status = 500, description = "Search tool failed"),
    ),
    tag = "search"
)]
pub async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let results = state.search.search(&query.query).await?;
    Ok(Json(SearchResponse {
        results: results.into_iter().map(SearchHit::from).collect(),
    }))
}
