use crate::error::{DubflowError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Synchronous text translation service.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source_language` to `target_language`.
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String>;
}

/// Mock translator for testing
#[derive(Debug)]
pub struct MockTranslator {
    response: String,
    should_fail: bool,
    calls: AtomicUsize,
    last_input: Mutex<Option<(String, String, String)>>,
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranslator {
    pub fn new() -> Self {
        Self {
            response: "mock translation".to_string(),
            should_fail: false,
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        }
    }

    /// Configure the mock to return a specific translation
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on translate
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Last `(text, source, target)` passed in
    pub fn last_input(&self) -> Option<(String, String, String)> {
        self.last_input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_input
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((
            text.to_string(),
            source_language.to_string(),
            target_language.to_string(),
        ));
        if self.should_fail {
            Err(DubflowError::service("translate", "mock translation failure"))
        } else {
            Ok(self.response.clone())
        }
    }
}
