//! Blob store access on behalf of a run: fetching transcripts and
//! persisting the final audio under its derived key.

use crate::capability::blob_store::BlobStore;
use crate::error::Result;
use crate::pipeline::types::RunContext;
use std::sync::Arc;

/// File extension for a synthesis output format.
pub fn extension_for(output_format: &str) -> &str {
    match output_format {
        "ogg_vorbis" => "ogg",
        "" => "bin",
        other => other,
    }
}

/// Key the synthesized audio of a run is stored under.
///
/// `{prefix}/{source_key}_{target_language}.{ext}`; a pure function of its
/// inputs so repeated runs overwrite instead of duplicating.
pub fn derived_key(prefix: &str, source_key: &str, target_language: &str, ext: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{source_key}_{target_language}.{ext}")
    } else {
        format!("{prefix}/{source_key}_{target_language}.{ext}")
    }
}

#[derive(Clone)]
pub struct ResultStore {
    store: Arc<dyn BlobStore>,
    prefix: String,
    extension: String,
}

impl ResultStore {
    pub fn new(store: Arc<dyn BlobStore>, prefix: &str, output_format: &str) -> Self {
        Self {
            store,
            prefix: prefix.to_string(),
            extension: extension_for(output_format).to_string(),
        }
    }

    pub fn output_key(&self, ctx: &RunContext) -> String {
        derived_key(
            &self.prefix,
            &ctx.source_key,
            &ctx.target_language,
            &self.extension,
        )
    }

    /// URI the speech-to-text service reads the source media from.
    pub fn media_uri(&self, ctx: &RunContext) -> String {
        self.store.media_uri(&ctx.source_bucket, &ctx.source_key)
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.store.get(bucket, key).await
    }

    /// Write the final artifact into the source bucket and return its key.
    pub async fn persist(&self, ctx: &RunContext, audio: Vec<u8>) -> Result<String> {
        let key = self.output_key(ctx);
        self.store.put(&ctx.source_bucket, &key, audio).await?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::blob_store::MemoryBlobStore;
    use tokio::time::{Duration, Instant};

    fn context() -> RunContext {
        RunContext {
            run_id: "audio-greeting.mp3-0123456789ab".to_string(),
            source_bucket: "media".to_string(),
            source_key: "audio/greeting.mp3".to_string(),
            media_format: "mp3".to_string(),
            source_language: "es-US".to_string(),
            translation_source_language: "es".to_string(),
            target_language: "en".to_string(),
            deadline: Instant::now() + Duration::from_secs(60),
        }
    }

    #[test]
    fn test_derived_key_format() {
        assert_eq!(
            derived_key("translations", "audio/greeting.mp3", "en", "mp3"),
            "translations/audio/greeting.mp3_en.mp3"
        );
        assert_eq!(
            derived_key("translations/", "a.wav", "de", "ogg"),
            "translations/a.wav_de.ogg"
        );
        assert_eq!(derived_key("", "a.wav", "de", "mp3"), "a.wav_de.mp3");
    }

    #[test]
    fn test_extension_for_formats() {
        assert_eq!(extension_for("mp3"), "mp3");
        assert_eq!(extension_for("ogg_vorbis"), "ogg");
        assert_eq!(extension_for("pcm"), "pcm");
        assert_eq!(extension_for("json"), "json");
    }

    #[tokio::test]
    async fn test_persist_twice_overwrites_same_key() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let results = ResultStore::new(blobs.clone(), "translations", "mp3");
        let ctx = context();

        let first = results.persist(&ctx, b"MP3DATA".to_vec()).await.unwrap();
        let second = results.persist(&ctx, b"MP3DATA".to_vec()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, "translations/audio/greeting.mp3_en.mp3");
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs.object("media", &first).unwrap(), b"MP3DATA");
    }

    #[tokio::test]
    async fn test_persist_propagates_store_failure() {
        let blobs = Arc::new(MemoryBlobStore::new().with_put_failure());
        let results = ResultStore::new(blobs.clone(), "translations", "mp3");

        assert!(results.persist(&context(), b"x".to_vec()).await.is_err());
        assert!(blobs.is_empty());
    }

    #[test]
    fn test_media_uri_comes_from_store() {
        let results = ResultStore::new(Arc::new(MemoryBlobStore::new()), "translations", "mp3");
        assert_eq!(
            results.media_uri(&context()),
            "s3://media/audio/greeting.mp3"
        );
    }
}
