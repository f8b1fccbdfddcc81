//! Capability interfaces to the external services a run talks to.
//!
//! Each trait has an in-crate test double next to it; real adapters live in
//! `local_store` (filesystem blob store) and `http` (JSON gateway).

pub mod blob_store;
#[cfg(feature = "http")]
pub mod http;
pub mod local_store;
pub mod speech_to_text;
pub mod synthesize;
pub mod translate;

pub use blob_store::{BlobStore, MemoryBlobStore};
#[cfg(feature = "http")]
pub use http::HttpGateway;
pub use local_store::LocalBlobStore;
pub use speech_to_text::{JobHandle, JobRequest, JobStatus, ScriptedSpeechToText, SpeechToText};
pub use synthesize::{MockSynthesizer, Synthesizer};
pub use translate::{MockTranslator, Translator};
