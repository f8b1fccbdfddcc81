//! Orchestrates one run: Transcribe → Translate → Synthesize → Persist.

use crate::capability::blob_store::BlobStore;
use crate::capability::speech_to_text::{JobRequest, SpeechToText};
use crate::capability::synthesize::Synthesizer;
use crate::capability::translate::Translator;
use crate::config::PipelineSection;
use crate::defaults;
use crate::error::{DubflowError, Result};
use crate::pipeline::error::{ErrorReporter, LogReporter, StageError};
use crate::pipeline::latency::{RunTimer, StageTiming};
use crate::pipeline::poller::JobPoller;
use crate::pipeline::result_store::ResultStore;
use crate::pipeline::transcript::{first_transcript, resolve_locator};
use crate::pipeline::types::{
    PipelineEvent, PipelineOutcome, PipelineState, RunContext, Stage, StageResult,
    SynthesizeResult, TranscribeResult, TranslateResult,
};
use crossbeam_channel::Sender;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Spacing between transcription job status queries
    pub poll_interval: Duration,
    /// Voice used for speech synthesis
    pub voice_id: String,
    /// Audio format requested from synthesis; also picks the output extension
    pub output_format: String,
    /// Key prefix for synthesized audio
    pub output_prefix: String,
    /// Optional event sender for progress streaming (crossbeam, non-blocking)
    pub event_tx: Option<Sender<PipelineEvent>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
            voice_id: defaults::VOICE_ID.to_string(),
            output_format: defaults::OUTPUT_FORMAT.to_string(),
            output_prefix: defaults::OUTPUT_PREFIX.to_string(),
            event_tx: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_section(section: &PipelineSection) -> Self {
        Self {
            poll_interval: section.poll_interval(),
            voice_id: section.voice_id.clone(),
            output_format: section.output_format.clone(),
            output_prefix: section.output_prefix.clone(),
            event_tx: None,
        }
    }

    pub fn with_event_sender(mut self, tx: Sender<PipelineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }
}

/// The external services a run depends on.
#[derive(Clone)]
pub struct Capabilities {
    pub blob_store: Arc<dyn BlobStore>,
    pub speech_to_text: Arc<dyn SpeechToText>,
    pub translator: Arc<dyn Translator>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

/// Everything observable about a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: String,
    pub source_bucket: String,
    pub source_key: String,
    pub outcome: PipelineOutcome,
    /// Every state entered, in order, ending in DONE or FAILED
    pub states: Vec<PipelineState>,
    pub timings: Vec<StageTiming>,
    pub total: Duration,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let timings: serde_json::Map<String, serde_json::Value> = self
            .timings
            .iter()
            .map(|t| (t.stage.to_string(), json!(t.elapsed.as_millis() as u64)))
            .collect();
        let states: Vec<String> = self.states.iter().map(|s| s.to_string()).collect();

        let mut value = json!({
            "runId": self.run_id,
            "bucket": self.source_bucket,
            "key": self.source_key,
            "states": states,
            "timingsMs": timings,
            "totalMs": self.total.as_millis() as u64,
        });
        match &self.outcome {
            PipelineOutcome::Success { output_key } => {
                value["status"] = json!("success");
                value["outputKey"] = json!(output_key);
            }
            PipelineOutcome::Failure { stage, cause } => {
                value["status"] = json!("failure");
                value["stage"] = json!(stage.to_string());
                value["errorKind"] = json!(cause.kind());
                value["error"] = json!(cause.to_string());
            }
        }
        value
    }
}

/// Result of executing the current state.
enum Step {
    Advance {
        next: PipelineState,
        result: Option<StageResult>,
    },
    Finished {
        output_key: String,
    },
}

/// Per-run bookkeeping: state history, timings and event emission.
struct RunTracker<'a> {
    ctx: &'a RunContext,
    states: Vec<PipelineState>,
    timer: RunTimer,
    event_tx: Option<Sender<PipelineEvent>>,
}

impl<'a> RunTracker<'a> {
    fn new(ctx: &'a RunContext, event_tx: Option<Sender<PipelineEvent>>) -> Self {
        Self {
            ctx,
            states: Vec::new(),
            timer: RunTimer::start(),
            event_tx,
        }
    }

    fn enter(&mut self, state: PipelineState) {
        match state.stage() {
            Some(stage) => self.timer.begin(stage),
            None => self.timer.end(),
        }
        tracing::debug!(run_id = %self.ctx.run_id, state = %state, "entering state");
        self.states.push(state);
        self.emit(PipelineEvent::StateEntered {
            run_id: self.ctx.run_id.clone(),
            state,
        });
    }

    fn completed(&self, stage: Stage, result: &StageResult) {
        let summary = result.summary();
        tracing::debug!(run_id = %self.ctx.run_id, stage = %stage, %summary, "stage completed");
        self.emit(PipelineEvent::StageCompleted {
            run_id: self.ctx.run_id.clone(),
            stage,
            summary,
        });
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.event_tx
            && tx.try_send(event).is_err()
        {
            // Channel full or closed - the run never waits on observers
        }
    }

    fn finish(self, outcome: PipelineOutcome) -> RunReport {
        self.emit(PipelineEvent::RunFinished {
            run_id: self.ctx.run_id.clone(),
            outcome: outcome.clone(),
        });
        let (timings, total) = self.timer.finish();
        RunReport {
            run_id: self.ctx.run_id.clone(),
            source_bucket: self.ctx.source_bucket.clone(),
            source_key: self.ctx.source_key.clone(),
            outcome,
            states: self.states,
            timings,
            total,
        }
    }
}

/// Drives runs through the stage state machine.
///
/// Holds no per-run state, so one orchestrator can serve many concurrent runs.
pub struct Orchestrator {
    config: PipelineConfig,
    speech_to_text: Arc<dyn SpeechToText>,
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn Synthesizer>,
    results: ResultStore,
    error_reporter: Arc<dyn ErrorReporter>,
}

impl Orchestrator {
    /// Creates an orchestrator with the default error reporter.
    pub fn new(config: PipelineConfig, capabilities: Capabilities) -> Self {
        let results = ResultStore::new(
            capabilities.blob_store,
            &config.output_prefix,
            &config.output_format,
        );
        Self {
            config,
            speech_to_text: capabilities.speech_to_text,
            translator: capabilities.translator,
            synthesizer: capabilities.synthesizer,
            results,
            error_reporter: Arc::new(LogReporter),
        }
    }

    /// Sets a custom error reporter.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = reporter;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Key a successful run of `ctx` writes its audio to.
    pub fn output_key(&self, ctx: &RunContext) -> String {
        self.results.output_key(ctx)
    }

    /// Execute one run to its terminal state.
    ///
    /// Never fails: every stage error becomes a `Failure` outcome.
    pub async fn run(&self, ctx: RunContext) -> RunReport {
        tracing::info!(
            run_id = %ctx.run_id,
            bucket = %ctx.source_bucket,
            key = %ctx.source_key,
            "run started"
        );

        let mut tracker = RunTracker::new(&ctx, self.config.event_tx.clone());
        let outcome = match self.drive(&ctx, &mut tracker).await {
            Ok(output_key) => {
                tracker.enter(PipelineState::Done);
                PipelineOutcome::Success { output_key }
            }
            Err((stage, cause)) => {
                tracker.enter(PipelineState::Failed);
                self.error_reporter.report(&ctx.run_id, stage, &cause);
                PipelineOutcome::Failure { stage, cause }
            }
        };

        let report = tracker.finish(outcome);
        tracing::info!(
            run_id = %report.run_id,
            outcome = %report.outcome,
            total_ms = report.total.as_millis() as u64,
            "run finished"
        );
        report
    }

    async fn drive(
        &self,
        ctx: &RunContext,
        tracker: &mut RunTracker<'_>,
    ) -> std::result::Result<String, (Stage, StageError)> {
        let mut state = PipelineState::Init;
        let mut carried: Option<StageResult> = None;

        loop {
            let stage = state.stage().ok_or_else(|| {
                (
                    Stage::Init,
                    StageError::InvalidInput {
                        message: format!("cannot execute terminal state {state}"),
                    },
                )
            })?;
            tracker.enter(state);

            if stage != Stage::Init && Instant::now() >= ctx.deadline {
                return Err((stage, StageError::DeadlineExceeded { stage }));
            }

            match self
                .step(ctx, state, carried.take())
                .await
                .map_err(|e| (stage, e))?
            {
                Step::Advance { next, result } => {
                    if let Some(result) = &result {
                        tracker.completed(stage, result);
                    }
                    state = next;
                    carried = result;
                }
                Step::Finished { output_key } => return Ok(output_key),
            }
        }
    }

    /// Execute `state`, consuming the previous stage's result.
    async fn step(
        &self,
        ctx: &RunContext,
        state: PipelineState,
        carried: Option<StageResult>,
    ) -> std::result::Result<Step, StageError> {
        match (state, carried) {
            (PipelineState::Init, None) => {
                validate(ctx)?;
                Ok(Step::Advance {
                    next: PipelineState::Transcribing,
                    result: None,
                })
            }
            (PipelineState::Transcribing, None) => {
                let transcribed = self.transcribe(ctx).await?;
                Ok(Step::Advance {
                    next: PipelineState::Translating,
                    result: Some(StageResult::Transcribe(transcribed)),
                })
            }
            (PipelineState::Translating, Some(StageResult::Transcribe(transcribed))) => {
                let translated = self.translate(ctx, transcribed).await?;
                Ok(Step::Advance {
                    next: PipelineState::Synthesizing,
                    result: Some(StageResult::Translate(translated)),
                })
            }
            (PipelineState::Synthesizing, Some(StageResult::Translate(translated))) => {
                let synthesized = self.synthesize(ctx, translated).await?;
                Ok(Step::Advance {
                    next: PipelineState::Persisting,
                    result: Some(StageResult::Synthesize(synthesized)),
                })
            }
            (PipelineState::Persisting, Some(StageResult::Synthesize(synthesized))) => {
                let output_key = self.persist(ctx, synthesized).await?;
                Ok(Step::Finished { output_key })
            }
            (state, carried) => Err(StageError::InvalidInput {
                message: format!(
                    "{state} cannot start with {}",
                    carried
                        .map(|c| c.summary())
                        .unwrap_or_else(|| "no previous result".to_string())
                ),
            }),
        }
    }

    async fn transcribe(
        &self,
        ctx: &RunContext,
    ) -> std::result::Result<TranscribeResult, StageError> {
        let stage = Stage::Transcribing;
        let request = JobRequest {
            job_name: ctx.run_id.clone(),
            media_uri: self.results.media_uri(ctx),
            media_format: ctx.media_format.clone(),
            language_code: ctx.source_language.clone(),
        };

        let job = within(ctx.deadline, stage, self.speech_to_text.start_job(&request), |e| {
            StageError::JobFailed {
                stage,
                job_name: request.job_name.clone(),
                message: format!("submission failed: {e}"),
            }
        })
        .await?;
        tracing::info!(run_id = %ctx.run_id, job = %job.job_name, "transcription job submitted");

        // The job keeps running on the provider side if we give up; nothing cancels it
        let poller = JobPoller::new(self.config.poll_interval, stage)
            .with_run_id(&ctx.run_id)
            .with_event_sender(self.config.event_tx.clone());
        let speech_to_text = self.speech_to_text.as_ref();
        let job_name = job.job_name.as_str();
        let locator = poller
            .await_completion(&job, ctx.deadline, || speech_to_text.job_status(job_name))
            .await?;

        let location = resolve_locator(&locator, &ctx.source_bucket)?;
        let document = within(
            ctx.deadline,
            stage,
            self.results.get(&location.bucket, &location.key),
            |e| StageError::TranscriptUnreadable {
                message: e.to_string(),
            },
        )
        .await?;

        let transcript_text = first_transcript(&document)?;
        Ok(TranscribeResult { transcript_text })
    }

    async fn translate(
        &self,
        ctx: &RunContext,
        transcribed: TranscribeResult,
    ) -> std::result::Result<TranslateResult, StageError> {
        let translated_text = within(
            ctx.deadline,
            Stage::Translating,
            self.translator.translate(
                &transcribed.transcript_text,
                &ctx.translation_source_language,
                &ctx.target_language,
            ),
            |e| StageError::TranslationError {
                message: e.to_string(),
            },
        )
        .await?;

        if translated_text.trim().is_empty() {
            return Err(StageError::TranslationError {
                message: "translator returned no text".to_string(),
            });
        }
        Ok(TranslateResult { translated_text })
    }

    async fn synthesize(
        &self,
        ctx: &RunContext,
        translated: TranslateResult,
    ) -> std::result::Result<SynthesizeResult, StageError> {
        let audio_bytes = within(
            ctx.deadline,
            Stage::Synthesizing,
            self.synthesizer.synthesize(
                &translated.translated_text,
                &self.config.voice_id,
                &self.config.output_format,
            ),
            |e| StageError::SynthesisError {
                message: e.to_string(),
            },
        )
        .await?;

        if audio_bytes.is_empty() {
            return Err(StageError::SynthesisError {
                message: "synthesizer returned no audio".to_string(),
            });
        }
        Ok(SynthesizeResult { audio_bytes })
    }

    async fn persist(
        &self,
        ctx: &RunContext,
        synthesized: SynthesizeResult,
    ) -> std::result::Result<String, StageError> {
        within(
            ctx.deadline,
            Stage::Persisting,
            self.results.persist(ctx, synthesized.audio_bytes),
            |e| StageError::PersistError {
                message: e.to_string(),
            },
        )
        .await
    }
}

/// Await `call` no later than `deadline`, mapping its error into a stage error.
async fn within<T, F, M>(
    deadline: Instant,
    stage: Stage,
    call: F,
    map_err: M,
) -> std::result::Result<T, StageError>
where
    F: Future<Output = Result<T>>,
    M: FnOnce(DubflowError) -> StageError,
{
    match timeout_at(deadline, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(map_err(e)),
        Err(_) => Err(StageError::DeadlineExceeded { stage }),
    }
}

/// Checks performed in INIT.
fn validate(ctx: &RunContext) -> std::result::Result<(), StageError> {
    let required = [
        ("run id", &ctx.run_id),
        ("source bucket", &ctx.source_bucket),
        ("source key", &ctx.source_key),
        ("media format", &ctx.media_format),
        ("source language", &ctx.source_language),
        ("translation source language", &ctx.translation_source_language),
        ("target language", &ctx.target_language),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(StageError::InvalidInput {
                message: format!("{name} is empty"),
            });
        }
    }
    if ctx.deadline <= Instant::now() {
        return Err(StageError::InvalidInput {
            message: "deadline is not in the future".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::blob_store::MemoryBlobStore;
    use crate::capability::speech_to_text::{JobStatus, ScriptedSpeechToText};
    use crate::capability::synthesize::MockSynthesizer;
    use crate::capability::translate::MockTranslator;
    use std::sync::Mutex;

    const TRANSCRIPT: &[u8] = br#"{"results":{"transcripts":[{"transcript":"hola mundo"}]}}"#;

    struct Harness {
        blobs: Arc<MemoryBlobStore>,
        stt: Arc<ScriptedSpeechToText>,
        translator: Arc<MockTranslator>,
        synth: Arc<MockSynthesizer>,
    }

    impl Harness {
        fn new(stt: ScriptedSpeechToText) -> Self {
            Self {
                blobs: Arc::new(MemoryBlobStore::new().with_object(
                    "media",
                    "transcripts/greeting.json",
                    TRANSCRIPT,
                )),
                stt: Arc::new(stt.with_result_locator("transcripts/greeting.json")),
                translator: Arc::new(MockTranslator::new().with_response("hello world")),
                synth: Arc::new(MockSynthesizer::new().with_audio(b"MP3DATA")),
            }
        }

        fn orchestrator(&self) -> Orchestrator {
            Orchestrator::new(
                PipelineConfig::default(),
                Capabilities {
                    blob_store: self.blobs.clone(),
                    speech_to_text: self.stt.clone(),
                    translator: self.translator.clone(),
                    synthesizer: self.synth.clone(),
                },
            )
        }
    }

    fn context(timeout: Duration) -> RunContext {
        RunContext {
            run_id: "audio-greeting.mp3-0123456789ab".to_string(),
            source_bucket: "media".to_string(),
            source_key: "audio/greeting.mp3".to_string(),
            media_format: "mp3".to_string(),
            source_language: "es-US".to_string(),
            translation_source_language: "es".to_string(),
            target_language: "en".to_string(),
            deadline: Instant::now() + timeout,
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        reports: Mutex<Vec<(String, Stage, String)>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, run_id: &str, stage: Stage, error: &StageError) {
            self.reports
                .lock()
                .unwrap()
                .push((run_id.to_string(), stage, error.kind().to_string()));
        }
    }

    #[test]
    fn test_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.voice_id, "Joanna");
        assert_eq!(config.output_format, "mp3");
        assert_eq!(config.output_prefix, "translations");
        assert!(config.event_tx.is_none());
    }

    #[test]
    fn test_config_from_section() {
        let section = PipelineSection {
            voice_id: "Lea".to_string(),
            poll_interval_ms: 500,
            ..PipelineSection::default()
        };
        let config = PipelineConfig::from_section(&section);
        assert_eq!(config.voice_id, "Lea");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_run_walks_every_state() {
        let harness = Harness::new(ScriptedSpeechToText::new(vec![
            JobStatus::InProgress,
            JobStatus::Completed,
        ]));
        let report = harness.orchestrator().run(context(Duration::from_secs(300))).await;

        assert_eq!(
            report.outcome,
            PipelineOutcome::Success {
                output_key: "translations/audio/greeting.mp3_en.mp3".to_string()
            }
        );
        assert_eq!(
            report.states,
            vec![
                PipelineState::Init,
                PipelineState::Transcribing,
                PipelineState::Translating,
                PipelineState::Synthesizing,
                PipelineState::Persisting,
                PipelineState::Done,
            ]
        );
        assert_eq!(
            harness.translator.last_input(),
            Some(("hola mundo".to_string(), "es".to_string(), "en".to_string()))
        );
        assert_eq!(
            harness.synth.last_input(),
            Some((
                "hello world".to_string(),
                "Joanna".to_string(),
                "mp3".to_string()
            ))
        );
        let request = harness.stt.last_request().unwrap();
        assert_eq!(request.job_name, "audio-greeting.mp3-0123456789ab");
        assert_eq!(request.media_uri, "s3://media/audio/greeting.mp3");
        assert_eq!(request.language_code, "es-US");
        assert_eq!(report.total, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_context_fails_in_init() {
        let harness = Harness::new(ScriptedSpeechToText::completing());
        let mut ctx = context(Duration::from_secs(300));
        ctx.source_key = String::new();

        let report = harness.orchestrator().run(ctx).await;

        match report.outcome {
            PipelineOutcome::Failure {
                stage: Stage::Init,
                cause: StageError::InvalidInput { message },
            } => assert!(message.contains("source key")),
            other => panic!("Expected InvalidInput in INIT, got {:?}", other),
        }
        assert_eq!(harness.stt.start_calls(), 0);
        assert_eq!(
            report.states,
            vec![PipelineState::Init, PipelineState::Failed]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_deadline_is_invalid_input() {
        let harness = Harness::new(ScriptedSpeechToText::completing());
        let ctx = context(Duration::ZERO);

        let report = harness.orchestrator().run(ctx).await;

        assert!(matches!(
            report.outcome,
            PipelineOutcome::Failure {
                stage: Stage::Init,
                cause: StageError::InvalidInput { .. }
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_failure_is_job_failed() {
        let harness = Harness::new(ScriptedSpeechToText::completing().with_start_failure());
        let report = harness.orchestrator().run(context(Duration::from_secs(300))).await;

        match report.outcome {
            PipelineOutcome::Failure {
                stage: Stage::Transcribing,
                cause: StageError::JobFailed { message, .. },
            } => assert!(message.starts_with("submission failed")),
            other => panic!("Expected JobFailed, got {:?}", other),
        }
        assert_eq!(harness.stt.status_calls(), 0);
        assert_eq!(harness.translator.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_transcript_object_is_unreadable() {
        let harness = Harness::new(ScriptedSpeechToText::completing());
        let stt = Arc::new(
            ScriptedSpeechToText::completing().with_result_locator("s3://media/missing.json"),
        );
        let orchestrator = Orchestrator::new(
            PipelineConfig::default(),
            Capabilities {
                blob_store: harness.blobs.clone(),
                speech_to_text: stt,
                translator: harness.translator.clone(),
                synthesizer: harness.synth.clone(),
            },
        );

        let report = orchestrator.run(context(Duration::from_secs(300))).await;

        assert!(matches!(
            report.outcome,
            PipelineOutcome::Failure {
                stage: Stage::Transcribing,
                cause: StageError::TranscriptUnreadable { .. }
            }
        ));
        assert_eq!(harness.translator.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthesis_failure_writes_nothing() {
        let harness = Harness::new(ScriptedSpeechToText::completing());
        let synth = Arc::new(MockSynthesizer::new().with_failure());
        let orchestrator = Orchestrator::new(
            PipelineConfig::default(),
            Capabilities {
                blob_store: harness.blobs.clone(),
                speech_to_text: harness.stt.clone(),
                translator: harness.translator.clone(),
                synthesizer: synth.clone(),
            },
        );

        let report = orchestrator.run(context(Duration::from_secs(300))).await;

        assert!(matches!(
            report.outcome,
            PipelineOutcome::Failure {
                stage: Stage::Synthesizing,
                cause: StageError::SynthesisError { .. }
            }
        ));
        assert_eq!(synth.calls(), 1);
        assert_eq!(harness.blobs.put_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persist_failure_fails_run_after_upstream_success() {
        let harness = Harness::new(ScriptedSpeechToText::completing());
        let blobs = Arc::new(
            MemoryBlobStore::new()
                .with_object("media", "transcripts/greeting.json", TRANSCRIPT)
                .with_put_failure(),
        );
        let orchestrator = Orchestrator::new(
            PipelineConfig::default(),
            Capabilities {
                blob_store: blobs.clone(),
                speech_to_text: harness.stt.clone(),
                translator: harness.translator.clone(),
                synthesizer: harness.synth.clone(),
            },
        );

        let report = orchestrator.run(context(Duration::from_secs(300))).await;

        assert!(matches!(
            report.outcome,
            PipelineOutcome::Failure {
                stage: Stage::Persisting,
                cause: StageError::PersistError { .. }
            }
        ));
        assert_eq!(harness.synth.calls(), 1);
        assert_eq!(blobs.object("media", "translations/audio/greeting.mp3_en.mp3"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_reported_once() {
        let harness = Harness::new(ScriptedSpeechToText::new(vec![JobStatus::Failed]));
        let reporter = Arc::new(RecordingReporter::default());
        let orchestrator = harness.orchestrator().with_error_reporter(reporter.clone());

        orchestrator.run(context(Duration::from_secs(300))).await;

        let reports = reporter.reports.lock().unwrap();
        assert_eq!(
            *reports,
            vec![(
                "audio-greeting.mp3-0123456789ab".to_string(),
                Stage::Transcribing,
                "JobFailed".to_string()
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_stream_state_changes() {
        let harness = Harness::new(ScriptedSpeechToText::completing());
        let (tx, rx) = crossbeam_channel::unbounded();
        let orchestrator = Orchestrator::new(
            PipelineConfig::default().with_event_sender(tx),
            Capabilities {
                blob_store: harness.blobs.clone(),
                speech_to_text: harness.stt.clone(),
                translator: harness.translator.clone(),
                synthesizer: harness.synth.clone(),
            },
        );

        orchestrator.run(context(Duration::from_secs(300))).await;

        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        let completed: Vec<Stage> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::StageCompleted { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            completed,
            vec![Stage::Transcribing, Stage::Translating, Stage::Synthesizing]
        );
        assert!(matches!(
            events.last(),
            Some(PipelineEvent::RunFinished { outcome, .. }) if outcome.is_success()
        ));
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::JobPolled {
                status: JobStatus::Completed,
                ..
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_json() {
        let harness = Harness::new(ScriptedSpeechToText::completing());
        let report = harness.orchestrator().run(context(Duration::from_secs(300))).await;
        let json = report.to_json();

        assert_eq!(json["status"], "success");
        assert_eq!(json["outputKey"], "translations/audio/greeting.mp3_en.mp3");
        assert_eq!(json["states"][5], "DONE");
        assert!(json.get("error").is_none());
    }
}
