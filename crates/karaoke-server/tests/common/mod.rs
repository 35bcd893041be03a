//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use karaoke_jobs::stage::{ACCOMPANIMENT, FINAL_AUDIO, FINAL_VIDEO, ORIGINAL_AUDIO, SOURCE_VIDEO};
use karaoke_jobs::{
    JobService, JobStore, MediaToolkit, Stage, StageError, StageOutcome, VideoSearch,
};
use karaoke_server::{Server, ServerConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Stub media tools
// ─────────────────────────────────────────────────────────────────────────────

/// Media tools that write placeholder artifacts instead of running binaries.
#[derive(Default)]
pub struct StubTools {
    fail: Option<(Stage, String)>,
    gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<Stage>>,
}

impl StubTools {
    pub fn failing_at(stage: Stage, diagnostic: &str) -> Self {
        Self {
            fail: Some((stage, diagnostic.to_string())),
            ..Default::default()
        }
    }

    /// Hold every download until a permit is added to the returned semaphore.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let tools = Self {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        };
        (tools, gate)
    }

    fn enter(&self, stage: Stage) -> std::result::Result<(), StageError> {
        self.calls.lock().push(stage);
        match &self.fail {
            Some((failing, diagnostic)) if *failing == stage => {
                Err(StageError::new(stage, diagnostic))
            }
            _ => Ok(()),
        }
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
    }
}

fn write(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("stub {name}")).expect("write stub artifact");
    path
}

#[async_trait]
impl MediaToolkit for StubTools {
    async fn fetch_title(&self, _url: &str) -> std::result::Result<String, StageError> {
        self.enter(Stage::Title)?;
        Ok("Bohemian Rhapsody".to_string())
    }

    async fn download(&self, _url: &str, work_dir: &Path) -> StageOutcome {
        self.wait_gate().await;
        self.enter(Stage::Download)?;
        Ok(write(work_dir, SOURCE_VIDEO))
    }

    async fn download_audio(&self, _url: &str, work_dir: &Path, file_stem: &str) -> StageOutcome {
        self.wait_gate().await;
        self.enter(Stage::Download)?;
        Ok(write(work_dir, &format!("{file_stem}.mp3")))
    }

    async fn extract_audio(&self, work_dir: &Path) -> StageOutcome {
        self.enter(Stage::Extract)?;
        Ok(write(work_dir, ORIGINAL_AUDIO))
    }

    async fn separate(&self, work_dir: &Path) -> StageOutcome {
        self.enter(Stage::Separate)?;
        Ok(write(work_dir, ACCOMPANIMENT))
    }

    async fn encode(&self, work_dir: &Path, video: bool) -> StageOutcome {
        self.enter(Stage::Encode)?;
        let audio = write(work_dir, FINAL_AUDIO);
        if video {
            Ok(write(work_dir, FINAL_VIDEO))
        } else {
            Ok(audio)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test server
// ─────────────────────────────────────────────────────────────────────────────

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client configured for this server.
    pub client: Client,
    /// Output root for `/save`, when configured.
    pub output_dir: Option<PathBuf>,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
    /// Temporary directory holding job working directories and saved files.
    pub temp_dir: TempDir,
}

impl TestServer {
    /// Start a server whose stages all succeed.
    pub async fn start() -> Result<Self> {
        Self::start_with(StubTools::default(), false).await
    }

    /// Start a server with the given tools, optionally configuring an output root.
    pub async fn start_with(tools: StubTools, with_output_dir: bool) -> Result<Self> {
        let temp_dir = TempDir::new()?;

        // Find an available port
        let addr = find_available_port().await?;

        let output_dir = if with_output_dir {
            let dir = temp_dir.path().join("library");
            std::fs::create_dir_all(&dir)?;
            Some(dir)
        } else {
            None
        };

        let service = JobService::new(
            JobStore::new(),
            Arc::new(tools),
            temp_dir.path().join("work"),
        )
        .with_output_root(output_dir.clone());

        let config = ServerConfig::new()
            .with_bind_address(addr)
            .with_request_logging(false);

        let server = Server::new(service, VideoSearch::new("/nonexistent/yt-dlp"), config);
        let handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        // Wait for server to be ready
        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            output_dir,
            _handle: handle,
            temp_dir,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url(), path))
    }

    /// Submit a karaoke job and return its id.
    pub async fn submit(&self, body: serde_json::Value) -> Result<String> {
        let resp = self.post("/submit").json(&body).send().await?;
        anyhow::ensure!(resp.status().is_success(), "submit failed: {}", resp.status());
        let json: serde_json::Value = resp.json().await?;
        json["job_id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("missing job_id"))
    }

    /// Poll `/status/{id}` until the job is `done` or `error`.
    pub async fn wait_for_terminal(&self, id: &str) -> Result<serde_json::Value> {
        let result = timeout(Duration::from_secs(5), async {
            loop {
                let json: serde_json::Value =
                    self.get(&format!("/status/{id}")).send().await?.json().await?;
                if json["status"] == "done" || json["status"] == "error" {
                    return Ok::<_, anyhow::Error>(json);
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => anyhow::bail!("Timeout waiting for job {id}"),
        }
    }
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
