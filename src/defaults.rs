//! Default configuration constants for dubflow.
//!
//! Shared by the config file sections and the pipeline settings so both
//! agree on the same values.

/// Language code handed to the speech-to-text job.
pub const TRANSCRIBE_LANGUAGE: &str = "es-US";

/// Language the translated text and synthesized speech are produced in.
pub const TARGET_LANGUAGE: &str = "en";

/// Media format assumed when the source key has no recognised extension.
pub const MEDIA_FORMAT: &str = "mp3";

/// Voice identity used for speech synthesis.
pub const VOICE_ID: &str = "Joanna";

/// Audio format requested from speech synthesis.
pub const OUTPUT_FORMAT: &str = "mp3";

/// Key prefix under which synthesized audio is stored.
pub const OUTPUT_PREFIX: &str = "translations";

/// Spacing between transcription job status queries.
///
/// 10 seconds keeps the number of status calls low for jobs that typically
/// take tens of seconds, at the cost of up to 10s extra completion latency.
pub const POLL_INTERVAL_MS: u64 = 10_000;

/// Overall budget for one run, shared by every stage.
pub const RUN_TIMEOUT_SECS: u64 = 300;

/// How long a delivered notification is remembered for deduplication.
pub const DEDUP_WINDOW_SECS: u64 = 600;

/// Upper bound on runs executing at the same time.
pub const MAX_CONCURRENT_RUNS: usize = 8;

/// Media formats recognised from the source key extension.
pub const KNOWN_MEDIA_FORMATS: &[&str] =
    &["mp3", "mp4", "wav", "flac", "ogg", "amr", "webm", "m4a"];

/// Directory name used under the platform data/config dirs.
pub const APP_DIR: &str = "dubflow";
