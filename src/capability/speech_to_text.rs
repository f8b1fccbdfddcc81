use crate::error::{DubflowError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Status of an asynchronous transcription job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// COMPLETED and FAILED are terminal: no further transition is observed.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

/// Snapshot of a transcription job as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub job_name: String,
    pub status: JobStatus,
    /// Where the transcript document can be fetched once COMPLETED
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_locator: Option<String>,
    /// Provider explanation once FAILED
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl JobHandle {
    pub fn new(job_name: &str, status: JobStatus) -> Self {
        Self {
            job_name: job_name.to_string(),
            status,
            result_locator: None,
            failure_reason: None,
        }
    }
}

/// Parameters for submitting a transcription job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub job_name: String,
    pub media_uri: String,
    pub media_format: String,
    pub language_code: String,
}

/// Asynchronous speech-to-text service.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Submit a transcription job.
    async fn start_job(&self, request: &JobRequest) -> Result<JobHandle>;

    /// Query the current state of a job.
    async fn job_status(&self, job_name: &str) -> Result<JobHandle>;
}

/// Speech-to-text test double that replays a fixed sequence of statuses.
///
/// Each `job_status` call consumes the next status; once the script is
/// exhausted the last status repeats.
#[derive(Debug)]
pub struct ScriptedSpeechToText {
    statuses: Vec<JobStatus>,
    result_locator: String,
    failure_reason: String,
    fail_start: bool,
    start_calls: AtomicUsize,
    status_calls: AtomicUsize,
    last_request: Mutex<Option<JobRequest>>,
}

impl ScriptedSpeechToText {
    pub fn new(statuses: Vec<JobStatus>) -> Self {
        Self {
            statuses,
            result_locator: "transcripts/result.json".to_string(),
            failure_reason: "mock transcription failure".to_string(),
            fail_start: false,
            start_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Job completes on the first status query
    pub fn completing() -> Self {
        Self::new(vec![JobStatus::Completed])
    }

    /// Job never leaves IN_PROGRESS
    pub fn never_finishing() -> Self {
        Self::new(vec![JobStatus::InProgress])
    }

    /// Configure where the transcript is reported to live
    pub fn with_result_locator(mut self, locator: &str) -> Self {
        self.result_locator = locator.to_string();
        self
    }

    /// Configure the provider message reported for FAILED jobs
    pub fn with_failure_reason(mut self, reason: &str) -> Self {
        self.failure_reason = reason.to_string();
        self
    }

    /// Configure the mock to reject job submission
    pub fn with_start_failure(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<JobRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn snapshot(&self, job_name: &str, status: JobStatus) -> JobHandle {
        let mut handle = JobHandle::new(job_name, status);
        match status {
            JobStatus::Completed => handle.result_locator = Some(self.result_locator.clone()),
            JobStatus::Failed => handle.failure_reason = Some(self.failure_reason.clone()),
            _ => {}
        }
        handle
    }
}

#[async_trait]
impl SpeechToText for ScriptedSpeechToText {
    async fn start_job(&self, request: &JobRequest) -> Result<JobHandle> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request.clone());
        if self.fail_start {
            return Err(DubflowError::service("speech-to-text", "mock start failure"));
        }
        Ok(JobHandle::new(&request.job_name, JobStatus::Queued))
    }

    async fn job_status(&self, job_name: &str) -> Result<JobHandle> {
        let index = self.status_calls.fetch_add(1, Ordering::SeqCst);
        let status = self
            .statuses
            .get(index)
            .or_else(|| self.statuses.last())
            .copied()
            .unwrap_or(JobStatus::InProgress);
        Ok(self.snapshot(job_name, status))
    }
}
