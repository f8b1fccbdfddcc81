use crate::error::{DubflowError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Synchronous text-to-speech service.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Render `text` as speech audio in `output_format` using `voice_id`.
    async fn synthesize(&self, text: &str, voice_id: &str, output_format: &str)
    -> Result<Vec<u8>>;
}

/// Mock synthesizer for testing
#[derive(Debug)]
pub struct MockSynthesizer {
    audio: Vec<u8>,
    should_fail: bool,
    calls: AtomicUsize,
    last_input: Mutex<Option<(String, String, String)>>,
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            audio: b"mock audio".to_vec(),
            should_fail: false,
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        }
    }

    /// Configure the audio bytes returned
    pub fn with_audio(mut self, audio: &[u8]) -> Self {
        self.audio = audio.to_vec();
        self
    }

    /// Configure the mock to fail on synthesize
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Last `(text, voice_id, output_format)` passed in
    pub fn last_input(&self) -> Option<(String, String, String)> {
        self.last_input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        output_format: &str,
    ) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_input
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((
            text.to_string(),
            voice_id.to_string(),
            output_format.to_string(),
        ));
        if self.should_fail {
            Err(DubflowError::service("text-to-speech", "mock synthesis failure"))
        } else {
            Ok(self.audio.clone())
        }
    }
}
