//! Media translation pipeline.
//!
//! One run moves a source media object through four stages, each backed by
//! an external capability: speech-to-text, translation, speech synthesis and
//! the blob store. Stages execute strictly in sequence under a shared deadline.

pub mod error;
pub mod latency;
pub mod orchestrator;
pub mod poller;
pub mod result_store;
pub mod transcript;
pub mod types;

pub use error::{ErrorReporter, LogReporter, StageError};
pub use latency::{RunTimer, StageTiming};
pub use orchestrator::{Capabilities, Orchestrator, PipelineConfig, RunReport};
pub use poller::JobPoller;
pub use result_store::{ResultStore, derived_key};
pub use types::{
    PipelineEvent, PipelineOutcome, PipelineState, RunContext, Stage, StageResult,
    SynthesizeResult, TranscribeResult, TranslateResult,
};
