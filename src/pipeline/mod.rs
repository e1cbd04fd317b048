// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis Pipeline
//!
//! The heart of the node: a multi-stage, partially ordered task graph per
//! submitted video, executed on a bounded worker pool behind an async queue.
//!
//! ## Ordering guarantees
//!
//! - `extract_audio` strictly precedes `speech_to_text` and every
//!   audio-derived stage
//! - `speech_to_text` strictly precedes `analyze_audio` and
//!   `generate_report`, which run concurrently with each other
//! - `analyze_video` only needs the downloaded video and runs concurrently
//!   with the whole audio chain
//! - aggregation joins exactly the three terminal branches
//!
//! ## Failure model
//!
//! Stage errors, timeouts, cancellations, and panics are captured into the
//! owning branch's result slot; siblings already in flight are not
//! cancelled, so partial results survive. The job is `Failed` if any
//! required branch is missing output. Working directories are removed on
//! the terminal transition on every path.

pub mod dispatcher;
pub mod download;
pub mod job;
pub mod runner;

pub use dispatcher::{
    DispatchError, Dispatcher, DispatcherConfig, JobCompletion, NullCompletion,
};
pub use download::VideoDownloader;
pub use job::{JobId, JobReport, JobRequest, JobState, JobTracker, Stage, StageFailure};
pub use runner::{AnalysisPipeline, PipelineConfig};
