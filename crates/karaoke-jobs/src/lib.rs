//! Job orchestration core for the karaoke service.
//!
//! Turns a video URL into a karaoke artifact by chaining external media
//! tools. Each submission becomes a job whose pipeline runs on its own
//! tokio task while clients poll the shared [`JobStore`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  submit   ┌──────────────┐  spawn   ┌──────────────┐
//! │  JobService  │ ────────▶ │   JobStore   │ ◀─────── │   Pipeline   │
//! │  (query/save)│ ◀──────── │ (snapshots)  │  update  │  (executor)  │
//! └──────────────┘           └──────────────┘          └──────┬───────┘
//!                                                             │ stages
//!                                                      ┌──────▼───────┐
//!                                                      │ MediaToolkit │
//!                                                      │ yt-dlp/ffmpeg│
//!                                                      │ /demucs      │
//!                                                      └──────────────┘
//! ```
//!
//! The per-job working directory is the channel between stages: each stage
//! leaves a fixed-named artifact that the next one consumes.

pub mod error;
pub mod job;
pub mod paths;
pub mod pipeline;
pub mod search;
pub mod service;
pub mod stage;
pub mod store;
pub mod tools;

pub use error::{JobError, Result};
pub use job::{JobKind, JobRecord, JobStatus, JobUpdate, OutputFormat};
pub use paths::{resolve_within, safe_filename};
pub use pipeline::{Pipeline, PipelineJob};
pub use search::{SearchResult, VideoSearch};
pub use service::{
    ArtifactKind, AudioRequest, JobService, KaraokeRequest, ResultFile, SaveRequest,
};
pub use stage::{MAX_DIAGNOSTIC_CHARS, MediaToolkit, SharedToolkit, Stage, StageError, StageOutcome};
pub use store::JobStore;
pub use tools::ExternalTools;
