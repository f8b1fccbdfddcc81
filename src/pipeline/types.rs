//! Data types that flow through one pipeline run.

use crate::capability::speech_to_text::JobStatus;
use crate::pipeline::error::StageError;
use std::fmt;
use tokio::time::Instant;

/// A processing step of a run. Failures are attributed to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    Transcribing,
    Translating,
    Synthesizing,
    Persisting,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Init => "INIT",
            Stage::Transcribing => "TRANSCRIBING",
            Stage::Translating => "TRANSLATING",
            Stage::Synthesizing => "SYNTHESIZING",
            Stage::Persisting => "PERSISTING",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// State of the orchestrator state machine.
///
/// `Done` and `Failed` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Transcribing,
    Translating,
    Synthesizing,
    Persisting,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// The stage this state executes; `None` for terminal states.
    pub fn stage(self) -> Option<Stage> {
        match self {
            PipelineState::Init => Some(Stage::Init),
            PipelineState::Transcribing => Some(Stage::Transcribing),
            PipelineState::Translating => Some(Stage::Translating),
            PipelineState::Synthesizing => Some(Stage::Synthesizing),
            PipelineState::Persisting => Some(Stage::Persisting),
            PipelineState::Done | PipelineState::Failed => None,
        }
    }
}

impl From<Stage> for PipelineState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Init => PipelineState::Init,
            Stage::Transcribing => PipelineState::Transcribing,
            Stage::Translating => PipelineState::Translating,
            Stage::Synthesizing => PipelineState::Synthesizing,
            Stage::Persisting => PipelineState::Persisting,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineState::Done => "DONE",
            PipelineState::Failed => "FAILED",
            PipelineState::Init => Stage::Init.label(),
            PipelineState::Transcribing => Stage::Transcribing.label(),
            PipelineState::Translating => Stage::Translating.label(),
            PipelineState::Synthesizing => Stage::Synthesizing.label(),
            PipelineState::Persisting => Stage::Persisting.label(),
        };
        f.write_str(label)
    }
}

/// Everything one run needs to know about its input.
///
/// Owned by exactly one run and dropped when the run ends.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    /// Unique per run; also used as the transcription job name
    pub run_id: String,
    pub source_bucket: String,
    pub source_key: String,
    pub media_format: String,
    /// Language code for speech recognition (e.g. "es-US")
    pub source_language: String,
    /// Language code the translator reads (e.g. "es")
    pub translation_source_language: String,
    pub target_language: String,
    /// Absolute deadline shared by every stage
    pub deadline: Instant,
}

/// Output of the transcription stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscribeResult {
    pub transcript_text: String,
}

/// Output of the translation stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateResult {
    pub translated_text: String,
}

/// Output of the synthesis stage.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizeResult {
    pub audio_bytes: Vec<u8>,
}

/// The value a stage hands to its successor.
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult {
    Transcribe(TranscribeResult),
    Translate(TranslateResult),
    Synthesize(SynthesizeResult),
}

impl StageResult {
    /// Short description for logs and events; never the payload itself.
    pub fn summary(&self) -> String {
        match self {
            StageResult::Transcribe(r) => format!("transcript {} chars", r.transcript_text.len()),
            StageResult::Translate(r) => format!("translation {} chars", r.translated_text.len()),
            StageResult::Synthesize(r) => format!("audio {} bytes", r.audio_bytes.len()),
        }
    }
}

/// Terminal value of a run. Exactly one per run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Success { output_key: String },
    Failure { stage: Stage, cause: StageError },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success { .. })
    }

    pub fn output_key(&self) -> Option<&str> {
        match self {
            PipelineOutcome::Success { output_key } => Some(output_key),
            PipelineOutcome::Failure { .. } => None,
        }
    }
}

impl fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineOutcome::Success { output_key } => write!(f, "success: {}", output_key),
            PipelineOutcome::Failure { stage, cause } => {
                write!(f, "failed in {}: {}", stage, cause)
            }
        }
    }
}

/// Progress notifications streamed while a run executes.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StateEntered {
        run_id: String,
        state: PipelineState,
    },
    JobPolled {
        run_id: String,
        job_name: String,
        attempt: u32,
        status: JobStatus,
    },
    StageCompleted {
        run_id: String,
        stage: Stage,
        summary: String,
    },
    RunFinished {
        run_id: String,
        outcome: PipelineOutcome,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        assert_eq!(Stage::Transcribing.to_string(), "TRANSCRIBING");
        assert_eq!(Stage::Persisting.to_string(), "PERSISTING");
    }

    #[test]
    fn test_state_from_stage() {
        assert_eq!(
            PipelineState::from(Stage::Translating),
            PipelineState::Translating
        );
        assert_eq!(PipelineState::from(Stage::Init).to_string(), "INIT");
    }

    #[test]
    fn test_terminal_states() {
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
        assert!(!PipelineState::Persisting.is_terminal());
        assert_eq!(PipelineState::Done.stage(), None);
        assert_eq!(
            PipelineState::Synthesizing.stage(),
            Some(Stage::Synthesizing)
        );
    }

    #[test]
    fn test_stage_result_summary_hides_payload() {
        let result = StageResult::Transcribe(TranscribeResult {
            transcript_text: "hola mundo".to_string(),
        });
        assert_eq!(result.summary(), "transcript 10 chars");

        let audio = StageResult::Synthesize(SynthesizeResult {
            audio_bytes: b"MP3DATA".to_vec(),
        });
        assert_eq!(audio.summary(), "audio 7 bytes");
    }

    #[test]
    fn test_outcome_accessors() {
        let success = PipelineOutcome::Success {
            output_key: "translations/a.mp3_en.mp3".to_string(),
        };
        assert!(success.is_success());
        assert_eq!(success.output_key(), Some("translations/a.mp3_en.mp3"));

        let failure = PipelineOutcome::Failure {
            stage: Stage::Translating,
            cause: StageError::TranslationError {
                message: "bad input".to_string(),
            },
        };
        assert!(!failure.is_success());
        assert_eq!(failure.output_key(), None);
        assert_eq!(
            failure.to_string(),
            "failed in TRANSLATING: translation failed: bad input"
        );
    }
}
