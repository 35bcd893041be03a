//! HTTP client for communicating with the karaoke server.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use url::Url;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Health check response from the server.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(default)]
    pub jobs: usize,
    #[serde(default)]
    pub save_enabled: bool,
}

/// Karaoke job submission.
#[derive(Debug, Serialize)]
pub struct SubmitRequest {
    pub video_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub format: String,
}

/// Audio-only job submission.
#[derive(Debug, Serialize)]
pub struct DownloadRequest {
    pub video_url: String,
    pub video_title: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

/// Job status snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: String,
    pub status: String,
    pub progress_message: String,
    pub error: Option<String>,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        self.status == "done" || self.status == "error"
    }
}

/// One search hit.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub view_count_short: String,
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

/// Error body returned by the server.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Client for the karaoke server API.
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    /// Create a new client for the given server URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;

        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    /// Check server health.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("/health")?;
        let response = self.http.get(url).send().await?;
        Self::parse(response).await
    }

    /// Submit a karaoke job.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<String> {
        let url = self.base_url.join("/submit")?;
        let response = self.http.post(url).json(request).send().await?;
        let body: SubmitResponse = Self::parse(response).await?;
        Ok(body.job_id)
    }

    /// Submit an audio-only download job.
    pub async fn download(&self, request: &DownloadRequest) -> Result<String> {
        let url = self.base_url.join("/download")?;
        let response = self.http.post(url).json(request).send().await?;
        let body: SubmitResponse = Self::parse(response).await?;
        Ok(body.job_id)
    }

    /// Get a job's status.
    pub async fn status(&self, job_id: &str) -> Result<JobStatus> {
        let url = self.base_url.join(&format!("/status/{}", job_id))?;
        let response = self.http.get(url).send().await?;
        Self::parse(response).await
    }

    /// Search for source videos.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let mut url = self.base_url.join("/search")?;
        url.query_pairs_mut().append_pair("query", query);
        let response = self.http.get(url).send().await?;
        let body: SearchResponse = Self::parse(response).await?;
        Ok(body.results)
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.message,
                Err(_) => status.to_string(),
            };
            anyhow::bail!("Server returned error ({}): {}", status.as_u16(), message);
        }
        Ok(response.json().await?)
    }
}
