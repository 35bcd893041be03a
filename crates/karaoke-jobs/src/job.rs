//! Job record types.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress message for a freshly created job.
pub const QUEUED_MESSAGE: &str = "Job queued";

/// Progress message once a job has failed.
pub const FAILED_MESSAGE: &str = "Processing failed";

/// Lifecycle state of a job.
///
/// Variants are declared in pipeline order; `Error` is the absorbing
/// failure state reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Downloading,
    Extracting,
    Separating,
    Encoding,
    Done,
    Error,
}

impl JobStatus {
    /// Position along the pipeline order.
    fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Downloading => 1,
            JobStatus::Extracting => 2,
            JobStatus::Separating => 3,
            JobStatus::Encoding => 4,
            JobStatus::Done => 5,
            JobStatus::Error => 6,
        }
    }

    /// `done` or `error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// Whether a job in this state may move to `next`.
    ///
    /// Forward moves may skip stages; nothing leaves a terminal state.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobStatus::Error => true,
            _ => next.rank() > self.rank(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Extracting => "extracting",
            JobStatus::Separating => "separating",
            JobStatus::Encoding => "encoding",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pipeline a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Download, extract, separate, encode.
    Karaoke,
    /// Download the audio track as mp3 only.
    Audio,
}

impl JobKind {
    /// Progress message recorded when the job completes.
    pub fn done_message(self) -> &'static str {
        match self {
            JobKind::Karaoke => "Karaoke video ready",
            JobKind::Audio => "MP3 ready",
        }
    }
}

/// Container requested for a karaoke job's final artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Instrumental track muxed over the source video.
    #[default]
    Mp4,
    /// Instrumental track only.
    Mp3,
}

impl OutputFormat {
    pub fn wants_video(self) -> bool {
        matches!(self, OutputFormat::Mp4)
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Mp3 => "mp3",
        }
    }
}

/// A unit of work tracked by the [`JobStore`](crate::JobStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub progress_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a queued record.
    pub fn new(id: impl Into<String>, kind: JobKind) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind,
            status: JobStatus::Queued,
            progress_message: QUEUED_MESSAGE.to_string(),
            output_path: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update merged into a record by [`JobStore::update`](crate::JobStore::update).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress_message: Option<String>,
}

impl JobUpdate {
    /// Move to `status` with a new progress message.
    pub fn transition(status: JobStatus, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            progress_message: Some(message.into()),
        }
    }

    /// Replace only the progress message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: None,
            progress_message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_queued() {
        let record = JobRecord::new("abc", JobKind::Karaoke);
        assert_eq!(record.status, JobStatus::Queued);
        assert_eq!(record.progress_message, QUEUED_MESSAGE);
        assert!(record.output_path.is_none());
        assert!(record.error.is_none());
    }

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(JobStatus::Queued.can_advance_to(JobStatus::Downloading));
        assert!(JobStatus::Downloading.can_advance_to(JobStatus::Extracting));
        assert!(JobStatus::Encoding.can_advance_to(JobStatus::Done));
        // Skipping forward is still monotonic
        assert!(JobStatus::Downloading.can_advance_to(JobStatus::Done));
    }

    #[test]
    fn test_backward_and_repeated_transitions_rejected() {
        assert!(!JobStatus::Separating.can_advance_to(JobStatus::Downloading));
        assert!(!JobStatus::Extracting.can_advance_to(JobStatus::Extracting));
        assert!(!JobStatus::Downloading.can_advance_to(JobStatus::Queued));
    }

    #[test]
    fn test_error_reachable_from_every_non_terminal_state() {
        for status in [
            JobStatus::Queued,
            JobStatus::Downloading,
            JobStatus::Extracting,
            JobStatus::Separating,
            JobStatus::Encoding,
        ] {
            assert!(status.can_advance_to(JobStatus::Error), "{status}");
        }
    }

    #[test]
    fn test_terminal_states_absorb() {
        for terminal in [JobStatus::Done, JobStatus::Error] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_advance_to(JobStatus::Error));
            assert!(!terminal.can_advance_to(JobStatus::Done));
        }
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::Separating).unwrap();
        assert_eq!(json, "\"separating\"");
        assert_eq!(JobStatus::Done.to_string(), "done");
    }

    #[test]
    fn test_output_format_parsing() {
        let format: OutputFormat = serde_json::from_str("\"mp3\"").unwrap();
        assert_eq!(format, OutputFormat::Mp3);
        assert!(!format.wants_video());
        assert_eq!(OutputFormat::default(), OutputFormat::Mp4);
    }
}
