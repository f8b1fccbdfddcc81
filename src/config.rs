use crate::defaults;
use crate::error::{DubflowError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineSection,
    pub trigger: TriggerSection,
    pub storage: StorageSection,
    pub services: ServicesSection,
}

/// Languages, voice and timing of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSection {
    /// Language code for the transcription job (e.g. "es-US")
    pub transcribe_language: String,
    /// Source language for translation; derived from `transcribe_language` when unset
    pub translate_source_language: Option<String>,
    pub target_language: String,
    pub media_format: String,
    pub voice_id: String,
    pub output_format: String,
    pub output_prefix: String,
    pub poll_interval_ms: u64,
    pub run_timeout_secs: u64,
}

/// Trigger listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TriggerSection {
    pub dedup_window_secs: u64,
    pub max_concurrent_runs: usize,
}

/// Blob store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSection {
    /// Root directory of the local blob store; one subdirectory per bucket
    pub root: PathBuf,
}

/// External capability gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ServicesSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            transcribe_language: defaults::TRANSCRIBE_LANGUAGE.to_string(),
            translate_source_language: None,
            target_language: defaults::TARGET_LANGUAGE.to_string(),
            media_format: defaults::MEDIA_FORMAT.to_string(),
            voice_id: defaults::VOICE_ID.to_string(),
            output_format: defaults::OUTPUT_FORMAT.to_string(),
            output_prefix: defaults::OUTPUT_PREFIX.to_string(),
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            run_timeout_secs: defaults::RUN_TIMEOUT_SECS,
        }
    }
}

impl Default for TriggerSection {
    fn default() -> Self {
        Self {
            dedup_window_secs: defaults::DEDUP_WINDOW_SECS,
            max_concurrent_runs: defaults::MAX_CONCURRENT_RUNS,
        }
    }
}

impl Default for StorageSection {
    fn default() -> Self {
        let root = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(defaults::APP_DIR)
            .join("blobs");
        Self { root }
    }
}

impl PipelineSection {
    /// Source language code for translation.
    ///
    /// Falls back to the primary subtag of the transcription language
    /// ("es-US" → "es").
    pub fn translate_source(&self) -> String {
        match &self.translate_source_language {
            Some(lang) if !lang.is_empty() => lang.clone(),
            _ => self
                .transcribe_language
                .split('-')
                .next()
                .unwrap_or(&self.transcribe_language)
                .to_string(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DubflowError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                DubflowError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist.
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(DubflowError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - DUBFLOW_TRANSCRIBE_LANGUAGE → pipeline.transcribe_language
    /// - DUBFLOW_TARGET_LANGUAGE → pipeline.target_language
    /// - DUBFLOW_VOICE_ID → pipeline.voice_id
    /// - DUBFLOW_STORAGE_ROOT → storage.root
    /// - DUBFLOW_SERVICES_URL → services.base_url
    /// - DUBFLOW_API_KEY → services.api_key
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(lang) = std::env::var("DUBFLOW_TRANSCRIBE_LANGUAGE")
            && !lang.is_empty()
        {
            self.pipeline.transcribe_language = lang;
        }

        if let Ok(lang) = std::env::var("DUBFLOW_TARGET_LANGUAGE")
            && !lang.is_empty()
        {
            self.pipeline.target_language = lang;
        }

        if let Ok(voice) = std::env::var("DUBFLOW_VOICE_ID")
            && !voice.is_empty()
        {
            self.pipeline.voice_id = voice;
        }

        if let Ok(root) = std::env::var("DUBFLOW_STORAGE_ROOT")
            && !root.is_empty()
        {
            self.storage.root = PathBuf::from(root);
        }

        if let Ok(url) = std::env::var("DUBFLOW_SERVICES_URL")
            && !url.is_empty()
        {
            self.services.base_url = Some(url);
        }

        if let Ok(key) = std::env::var("DUBFLOW_API_KEY")
            && !key.is_empty()
        {
            self.services.api_key = Some(key);
        }

        self
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("pipeline.transcribe_language", &self.pipeline.transcribe_language),
            ("pipeline.target_language", &self.pipeline.target_language),
            ("pipeline.media_format", &self.pipeline.media_format),
            ("pipeline.voice_id", &self.pipeline.voice_id),
            ("pipeline.output_format", &self.pipeline.output_format),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(invalid(key, "must not be empty"));
            }
        }
        if self.pipeline.poll_interval_ms == 0 {
            return Err(invalid("pipeline.poll_interval_ms", "must be positive"));
        }
        if self.pipeline.run_timeout_secs == 0 {
            return Err(invalid("pipeline.run_timeout_secs", "must be positive"));
        }
        if self.trigger.max_concurrent_runs == 0 {
            return Err(invalid("trigger.max_concurrent_runs", "must be positive"));
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/dubflow/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(defaults::APP_DIR)
            .join("config.toml")
    }
}

fn invalid(key: &str, message: &str) -> DubflowError {
    DubflowError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
