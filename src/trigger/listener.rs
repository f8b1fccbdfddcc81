//! Turns object-created notifications into pipeline runs.

use crate::config::Config;
use crate::pipeline::orchestrator::{Orchestrator, RunReport};
use crate::pipeline::types::RunContext;
use crate::trigger::dedup::DedupWindow;
use crate::trigger::notification::Notification;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;

/// How notifications become run contexts.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerConfig {
    pub transcribe_language: String,
    pub translation_source_language: String,
    pub target_language: String,
    /// Used when the key extension names no known format
    pub default_media_format: String,
    pub run_timeout: Duration,
    pub dedup_window: Duration,
    pub max_concurrent_runs: usize,
    /// Keys under this prefix are pipeline outputs and never start a run.
    /// Empty disables the check.
    pub output_prefix: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ListenerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            transcribe_language: config.pipeline.transcribe_language.clone(),
            translation_source_language: config.pipeline.translate_source(),
            target_language: config.pipeline.target_language.clone(),
            default_media_format: config.pipeline.media_format.clone(),
            run_timeout: config.pipeline.run_timeout(),
            dedup_window: Duration::from_secs(config.trigger.dedup_window_secs),
            max_concurrent_runs: config.trigger.max_concurrent_runs,
            output_prefix: config.pipeline.output_prefix.clone(),
        }
    }

    /// Whether the notification is for an object this pipeline wrote.
    pub fn is_output(&self, notification: &Notification) -> bool {
        let prefix = self.output_prefix.trim_matches('/');
        !prefix.is_empty()
            && notification
                .key
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Run context for a notification, with the deadline starting now.
    pub fn context_for(&self, notification: &Notification) -> RunContext {
        let media_format = notification
            .media_format()
            .unwrap_or_else(|| self.default_media_format.clone());
        RunContext {
            run_id: notification.run_id(),
            source_bucket: notification.bucket.clone(),
            source_key: notification.key.clone(),
            media_format,
            source_language: self.transcribe_language.clone(),
            translation_source_language: self.translation_source_language.clone(),
            target_language: self.target_language.clone(),
            deadline: Instant::now() + self.run_timeout,
        }
    }
}

/// Totals for one `listen` session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenSummary {
    pub runs: usize,
    pub failed: usize,
}

/// Starts exactly one run per distinct notification.
///
/// Each run is its own tokio task; a semaphore bounds how many execute at
/// once. Notifications whose run id was already admitted within the dedup
/// window are dropped.
pub struct TriggerListener {
    orchestrator: Arc<Orchestrator>,
    config: Arc<ListenerConfig>,
    dedup: DedupWindow,
    permits: Arc<Semaphore>,
}

impl TriggerListener {
    pub fn new(orchestrator: Arc<Orchestrator>, config: ListenerConfig) -> Self {
        let permits = config.max_concurrent_runs.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            orchestrator,
            dedup: DedupWindow::new(config.dedup_window),
            config: Arc::new(config),
            permits: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Dispatch one notification.
    ///
    /// Returns the handle of the spawned run, or `None` for a redelivery or
    /// a pipeline output.
    pub fn handle(&mut self, notification: Notification) -> Option<JoinHandle<RunReport>> {
        self.admit(&notification)
            .then(|| tokio::spawn(self.run_for(notification)))
    }

    /// Consume notifications until the channel closes, then wait for every
    /// dispatched run.
    ///
    /// Each report is sent on `reports` as soon as its run finishes. A closed
    /// report channel does not stop the listener.
    pub async fn listen(
        mut self,
        mut rx: mpsc::Receiver<Notification>,
        reports: mpsc::Sender<RunReport>,
    ) -> ListenSummary {
        let mut runs = JoinSet::new();
        let mut summary = ListenSummary::default();

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(notification) => {
                        if self.admit(&notification) {
                            runs.spawn(self.run_for(notification));
                        }
                    }
                    None => break,
                },
                Some(joined) = runs.join_next(), if !runs.is_empty() => {
                    forward(joined, &reports, &mut summary).await;
                }
            }
        }

        while let Some(joined) = runs.join_next().await {
            forward(joined, &reports, &mut summary).await;
        }
        tracing::info!(
            runs = summary.runs,
            failed = summary.failed,
            "trigger channel closed"
        );
        summary
    }

    fn admit(&mut self, notification: &Notification) -> bool {
        if self.config.is_output(notification) {
            tracing::info!(
                bucket = %notification.bucket,
                key = %notification.key,
                "output object ignored"
            );
            return false;
        }
        let run_id = notification.run_id();
        let admitted = self.dedup.admit(&run_id);
        if admitted {
            tracing::info!(
                run_id = %run_id,
                bucket = %notification.bucket,
                key = %notification.key,
                "notification accepted"
            );
        } else {
            tracing::info!(run_id = %run_id, "duplicate notification ignored");
        }
        admitted
    }

    /// The run's deadline starts once it holds a concurrency permit, so
    /// waiting behind other runs does not eat into its budget.
    fn run_for(
        &self,
        notification: Notification,
    ) -> impl Future<Output = RunReport> + Send + 'static {
        let orchestrator = Arc::clone(&self.orchestrator);
        let permits = Arc::clone(&self.permits);
        let config = Arc::clone(&self.config);
        async move {
            // The semaphore is never closed, so acquisition only waits
            let _permit = permits.acquire_owned().await.ok();
            orchestrator.run(config.context_for(&notification)).await
        }
    }
}

async fn forward(
    joined: Result<RunReport, JoinError>,
    reports: &mpsc::Sender<RunReport>,
    summary: &mut ListenSummary,
) {
    summary.runs += 1;
    let report = match joined {
        Ok(report) => report,
        Err(e) => {
            // No report to send, but the run still counts as failed
            summary.failed += 1;
            tracing::error!(error = %e, "run task aborted");
            return;
        }
    };
    if !report.is_success() {
        summary.failed += 1;
    }
    if reports.send(report).await.is_err() {
        tracing::debug!("report receiver dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_defaults() {
        let config = ListenerConfig::default();
        assert_eq!(config.transcribe_language, "es-US");
        assert_eq!(config.translation_source_language, "es");
        assert_eq!(config.target_language, "en");
        assert_eq!(config.run_timeout, Duration::from_secs(300));
        assert_eq!(config.dedup_window, Duration::from_secs(600));
        assert_eq!(config.output_prefix, "translations");
    }

    #[test]
    fn test_output_keys_are_recognised() {
        let config = ListenerConfig::default();
        let output = Notification::new("media", "translations/audio/greeting.mp3_en.mp3");
        assert!(config.is_output(&output));
        assert!(!config.is_output(&Notification::new("media", "audio/greeting.mp3")));
        // A sibling directory sharing the prefix text is still an upload
        assert!(!config.is_output(&Notification::new("media", "translations-raw/a.mp3")));
    }

    #[test]
    fn test_empty_output_prefix_matches_nothing() {
        let config = ListenerConfig {
            output_prefix: "/".to_string(),
            ..ListenerConfig::default()
        };
        assert!(!config.is_output(&Notification::new("media", "translations/a.mp3_en.mp3")));
        assert!(!config.is_output(&Notification::new("media", "/a.mp3")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_for_notification() {
        let config = ListenerConfig::default();
        let notification = Notification::new("media", "clips/interview.wav");

        let ctx = config.context_for(&notification);

        assert_eq!(ctx.run_id, notification.run_id());
        assert_eq!(ctx.source_bucket, "media");
        assert_eq!(ctx.source_key, "clips/interview.wav");
        assert_eq!(ctx.media_format, "wav");
        assert_eq!(ctx.source_language, "es-US");
        assert_eq!(ctx.translation_source_language, "es");
        assert_eq!(ctx.deadline, Instant::now() + Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_extension_uses_default_format() {
        let config = ListenerConfig {
            default_media_format: "flac".to_string(),
            ..ListenerConfig::default()
        };
        let ctx = config.context_for(&Notification::new("media", "upload"));
        assert_eq!(ctx.media_format, "flac");
    }
}
