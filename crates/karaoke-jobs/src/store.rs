//! Concurrency-safe job table.
//!
//! Every operation holds the lock for its whole read-modify-write, so a
//! reader observes either the fully-old or the fully-new record. The lock
//! is never held across an `.await`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{JobError, Result};
use crate::job::{FAILED_MESSAGE, JobKind, JobRecord, JobStatus, JobUpdate};

/// Shared handle to the job table. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<String, JobRecord>>>,
}

impl JobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new `queued` record. Fails if the identifier is taken.
    pub fn create(&self, id: &str, kind: JobKind) -> Result<JobRecord> {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(id) {
            return Err(JobError::AlreadyExists(id.to_string()));
        }
        let record = JobRecord::new(id, kind);
        jobs.insert(id.to_string(), record.clone());
        debug!(job_id = %id, ?kind, "Job created");
        Ok(record)
    }

    /// Snapshot of a record.
    pub fn get(&self, id: &str) -> Option<JobRecord> {
        self.jobs.read().get(id).cloned()
    }

    /// Merge the supplied fields into an existing record.
    ///
    /// Fails with `NotFound` for unknown ids and with `InvalidTransition`
    /// when the job is terminal or the status would not move forward.
    /// Terminal states are only reachable through [`set_done`](Self::set_done)
    /// and [`set_error`](Self::set_error).
    pub fn update(&self, id: &str, update: JobUpdate) -> Result<JobRecord> {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(id).ok_or_else(|| not_found(id))?;

        let target = update.status.unwrap_or(job.status);
        if job.status.is_terminal()
            || target.is_terminal()
            || (update.status.is_some() && !job.status.can_advance_to(target))
        {
            return Err(JobError::InvalidTransition {
                id: id.to_string(),
                from: job.status,
                to: target,
            });
        }

        job.status = target;
        if let Some(message) = update.progress_message {
            job.progress_message = message;
        }
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    /// Mark a job `done` with its artifact path. Clears any error.
    pub fn set_done(&self, id: &str, output_path: PathBuf) -> Result<JobRecord> {
        self.finish(id, JobStatus::Done, |job| {
            job.progress_message = job.kind.done_message().to_string();
            job.output_path = Some(output_path);
            job.error = None;
        })
    }

    /// Mark a job `error` with a diagnostic. Clears any output path.
    pub fn set_error(&self, id: &str, error: impl Into<String>) -> Result<JobRecord> {
        let error = error.into();
        self.finish(id, JobStatus::Error, |job| {
            job.progress_message = FAILED_MESSAGE.to_string();
            job.output_path = None;
            job.error = Some(error);
        })
    }

    /// Number of tracked jobs.
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    fn finish(
        &self,
        id: &str,
        status: JobStatus,
        apply: impl FnOnce(&mut JobRecord),
    ) -> Result<JobRecord> {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(id).ok_or_else(|| not_found(id))?;
        if !job.status.can_advance_to(status) {
            return Err(JobError::InvalidTransition {
                id: id.to_string(),
                from: job.status,
                to: status,
            });
        }
        job.status = status;
        apply(job);
        job.updated_at = Utc::now();
        Ok(job.clone())
    }
}

fn not_found(id: &str) -> JobError {
    JobError::NotFound(format!("Job not found: {id}"))
}
