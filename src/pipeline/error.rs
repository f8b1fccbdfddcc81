//! Stage errors and failure reporting for pipeline runs.

use crate::pipeline::types::Stage;
use std::time::Duration;
use thiserror::Error;

/// Why a stage could not produce its result.
///
/// Every variant ends the run; none is retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("job {job_name} failed in {stage}: {message}")]
    JobFailed {
        stage: Stage,
        job_name: String,
        message: String,
    },

    #[error("job {job_name} still running in {stage} after {elapsed:?}")]
    JobTimeout {
        stage: Stage,
        job_name: String,
        elapsed: Duration,
    },

    #[error("transcription produced no text")]
    EmptyTranscript,

    #[error("transcript unreadable: {message}")]
    TranscriptUnreadable { message: String },

    #[error("translation failed: {message}")]
    TranslationError { message: String },

    #[error("speech synthesis failed: {message}")]
    SynthesisError { message: String },

    #[error("persisting result failed: {message}")]
    PersistError { message: String },

    #[error("run deadline exceeded during {stage}")]
    DeadlineExceeded { stage: Stage },
}

impl StageError {
    /// Stable name of the error kind, for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::InvalidInput { .. } => "InvalidInput",
            StageError::JobFailed { .. } => "JobFailed",
            StageError::JobTimeout { .. } => "JobTimeout",
            StageError::EmptyTranscript => "EmptyTranscript",
            StageError::TranscriptUnreadable { .. } => "TranscriptUnreadable",
            StageError::TranslationError { .. } => "TranslationError",
            StageError::SynthesisError { .. } => "SynthesisError",
            StageError::PersistError { .. } => "PersistError",
            StageError::DeadlineExceeded { .. } => "DeadlineExceeded",
        }
    }

    /// True for the two ways a run can run out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            StageError::JobTimeout { .. } | StageError::DeadlineExceeded { .. }
        )
    }
}

/// Trait for reporting failed runs.
pub trait ErrorReporter: Send + Sync {
    /// Reports the failure that ended a run.
    fn report(&self, run_id: &str, stage: Stage, error: &StageError);
}

/// Reporter that logs failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, run_id: &str, stage: Stage, error: &StageError) {
        tracing::error!(run_id, stage = %stage, kind = error.kind(), "{}", error);
    }
}
