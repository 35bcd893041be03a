//! Common test utilities: a deterministic stand-in for the media tools.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use karaoke_jobs::stage::{ACCOMPANIMENT, FINAL_AUDIO, FINAL_VIDEO, ORIGINAL_AUDIO, SOURCE_VIDEO};
use karaoke_jobs::{JobRecord, JobStore, MediaToolkit, Stage, StageError, StageOutcome};

/// Toolkit that writes placeholder artifacts and records every call.
#[derive(Default)]
pub struct StubToolkit {
    /// Stage that fails, with its diagnostic.
    fail: Option<(Stage, String)>,
    /// When set, `download` waits for a permit before doing anything.
    gate: Option<Arc<Semaphore>>,
    title: String,
    calls: Mutex<Vec<Stage>>,
}

impl StubToolkit {
    pub fn succeeding() -> Self {
        Self {
            title: "Test Song".to_string(),
            ..Default::default()
        }
    }

    pub fn failing_at(stage: Stage, diagnostic: &str) -> Self {
        Self {
            fail: Some((stage, diagnostic.to_string())),
            ..Self::succeeding()
        }
    }

    /// Block downloads until permits are added to the returned semaphore.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let toolkit = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::succeeding()
        };
        (toolkit, gate)
    }

    pub fn calls(&self) -> Vec<Stage> {
        self.calls.lock().clone()
    }

    fn enter(&self, stage: Stage) -> Result<(), StageError> {
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
    std::fs::write(&path, name.as_bytes()).expect("write stub artifact");
    path
}

#[async_trait]
impl MediaToolkit for StubToolkit {
    async fn fetch_title(&self, _url: &str) -> Result<String, StageError> {
        self.enter(Stage::Title)?;
        Ok(self.title.clone())
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

/// Poll the store until the job reaches a terminal state.
pub async fn wait_for_terminal(store: &JobStore, id: &str) -> JobRecord {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(job) = store.get(id)
                && job.status.is_terminal()
            {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job did not reach a terminal state in time")
}
