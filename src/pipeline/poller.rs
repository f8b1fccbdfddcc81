//! Bounded polling of asynchronous external jobs.
//!
//! The provider offers no completion callback, so the job is queried at a
//! fixed spacing until it reports a terminal status or the run's shared
//! deadline passes.

use crate::capability::speech_to_text::{JobHandle, JobStatus};
use crate::error::Result;
use crate::pipeline::error::StageError;
use crate::pipeline::types::{PipelineEvent, Stage};
use crossbeam_channel::Sender;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep_until, timeout_at};

/// Watches one job until it terminates or the deadline passes.
#[derive(Debug, Clone)]
pub struct JobPoller {
    interval: Duration,
    stage: Stage,
    run_id: String,
    event_tx: Option<Sender<PipelineEvent>>,
}

impl JobPoller {
    pub fn new(interval: Duration, stage: Stage) -> Self {
        Self {
            interval,
            stage,
            run_id: String::new(),
            event_tx: None,
        }
    }

    /// Tag progress observations with the owning run.
    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = run_id.to_string();
        self
    }

    /// Stream a `JobPolled` event for every status query.
    pub fn with_event_sender(mut self, tx: Option<Sender<PipelineEvent>>) -> Self {
        self.event_tx = tx;
        self
    }

    /// Poll `query` until the job reaches a terminal status.
    ///
    /// Returns the result locator of a COMPLETED job. A FAILED job yields
    /// `JobFailed`; a job still running at `deadline` yields `JobTimeout`.
    /// A status query that itself errors ends the wait as `JobFailed`.
    pub async fn await_completion<F, Fut>(
        &self,
        job: &JobHandle,
        deadline: Instant,
        mut query: F,
    ) -> std::result::Result<String, StageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<JobHandle>>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            if Instant::now() >= deadline {
                return Err(self.timeout(job, started));
            }

            attempt += 1;
            let snapshot = match timeout_at(deadline, query()).await {
                Ok(Ok(snapshot)) => snapshot,
                Ok(Err(e)) => {
                    return Err(StageError::JobFailed {
                        stage: self.stage,
                        job_name: job.job_name.clone(),
                        message: format!("status query failed: {e}"),
                    });
                }
                Err(_) => return Err(self.timeout(job, started)),
            };

            self.observe(&job.job_name, attempt, snapshot.status);

            match snapshot.status {
                JobStatus::Completed => {
                    return snapshot.result_locator.ok_or_else(|| StageError::JobFailed {
                        stage: self.stage,
                        job_name: job.job_name.clone(),
                        message: "completed without a result locator".to_string(),
                    });
                }
                JobStatus::Failed => {
                    return Err(StageError::JobFailed {
                        stage: self.stage,
                        job_name: job.job_name.clone(),
                        message: snapshot
                            .failure_reason
                            .unwrap_or_else(|| "no reason given".to_string()),
                    });
                }
                JobStatus::Queued | JobStatus::InProgress => {}
            }

            let next = Instant::now() + self.interval;
            sleep_until(next.min(deadline)).await;
        }
    }

    fn timeout(&self, job: &JobHandle, started: Instant) -> StageError {
        StageError::JobTimeout {
            stage: self.stage,
            job_name: job.job_name.clone(),
            elapsed: started.elapsed(),
        }
    }

    fn observe(&self, job_name: &str, attempt: u32, status: JobStatus) {
        tracing::debug!(
            run_id = %self.run_id,
            job = job_name,
            attempt,
            status = %status,
            "polled job status"
        );
        if let Some(tx) = &self.event_tx
            && tx
                .try_send(PipelineEvent::JobPolled {
                    run_id: self.run_id.clone(),
                    job_name: job_name.to_string(),
                    attempt,
                    status,
                })
                .is_err()
        {
            // Channel full or closed - the run never waits on observers
        }
    }
}
