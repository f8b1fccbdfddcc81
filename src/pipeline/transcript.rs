//! Locating and reading the transcript document a finished job leaves behind.

use crate::pipeline::error::StageError;
use percent_encoding::percent_decode_str;
use serde::Deserialize;

/// Bucket and key of an object in the blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

/// Resolve a job result locator to a blob store location.
///
/// Accepted forms:
/// - `s3://bucket/key`
/// - `https://host/bucket/key` (first path segment is the bucket)
/// - `key` or `/key`, relative to `default_bucket`
pub fn resolve_locator(
    locator: &str,
    default_bucket: &str,
) -> Result<ObjectLocation, StageError> {
    let unreadable = |why: &str| StageError::TranscriptUnreadable {
        message: format!("{why}: {locator}"),
    };

    let locator = locator.trim();
    if locator.is_empty() {
        return Err(unreadable("empty result locator"));
    }

    let (bucket, key) = if let Some(rest) = locator.strip_prefix("s3://") {
        rest.split_once('/')
            .ok_or_else(|| unreadable("locator has no key"))?
    } else if let Some((_, rest)) = locator.split_once("://") {
        // Skip the host, the bucket is the first path segment
        let path = rest
            .split_once('/')
            .map(|(_, path)| path)
            .ok_or_else(|| unreadable("locator has no path"))?;
        let path = path.split(['?', '#']).next().unwrap_or(path);
        path.split_once('/')
            .ok_or_else(|| unreadable("locator has no key"))?
    } else {
        (default_bucket, locator.trim_start_matches('/'))
    };

    let key = percent_decode_str(key)
        .decode_utf8()
        .map_err(|_| unreadable("locator is not valid UTF-8"))?;

    if bucket.is_empty() || key.is_empty() {
        return Err(unreadable("locator has an empty bucket or key"));
    }

    Ok(ObjectLocation {
        bucket: bucket.to_string(),
        key: key.into_owned(),
    })
}

#[derive(Deserialize)]
struct TranscriptDocument {
    results: TranscriptResults,
}

#[derive(Deserialize)]
struct TranscriptResults {
    #[serde(default)]
    transcripts: Vec<TranscriptSegment>,
}

#[derive(Deserialize)]
struct TranscriptSegment {
    #[serde(default)]
    transcript: String,
}

/// Extract the first transcript segment from a transcript document.
///
/// Shape: `{"results": {"transcripts": [{"transcript": "..."}]}}`.
pub fn first_transcript(document: &[u8]) -> Result<String, StageError> {
    let parsed: TranscriptDocument =
        serde_json::from_slice(document).map_err(|e| StageError::TranscriptUnreadable {
            message: e.to_string(),
        })?;

    let text = parsed
        .results
        .transcripts
        .into_iter()
        .next()
        .map(|segment| segment.transcript.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(StageError::EmptyTranscript);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(bucket: &str, key: &str) -> ObjectLocation {
        ObjectLocation {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }

    #[test]
    fn test_resolve_s3_locator() {
        assert_eq!(
            resolve_locator("s3://transcripts/jobs/greeting.json", "media").unwrap(),
            location("transcripts", "jobs/greeting.json")
        );
    }

    #[test]
    fn test_resolve_https_locator() {
        assert_eq!(
            resolve_locator(
                "https://s3.us-east-1.amazonaws.com/media/jobs/greeting%20one.json?x=1",
                "other"
            )
            .unwrap(),
            location("media", "jobs/greeting one.json")
        );
    }

    #[test]
    fn test_resolve_bare_key_uses_default_bucket() {
        assert_eq!(
            resolve_locator("/jobs/greeting.json", "media").unwrap(),
            location("media", "jobs/greeting.json")
        );
        assert_eq!(
            resolve_locator("greeting.json", "media").unwrap(),
            location("media", "greeting.json")
        );
    }

    #[test]
    fn test_resolve_rejects_malformed() {
        for bad in ["", "s3://bucket-only", "https://host", "https://host/bucket"] {
            assert!(
                matches!(
                    resolve_locator(bad, "media"),
                    Err(StageError::TranscriptUnreadable { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_first_transcript() {
        let doc = br#"{"jobName":"j","results":{"transcripts":[{"transcript":" hola mundo "},{"transcript":"second"}],"items":[]}}"#;
        assert_eq!(first_transcript(doc).unwrap(), "hola mundo");
    }

    #[test]
    fn test_blank_transcript_is_empty() {
        let doc = br#"{"results":{"transcripts":[{"transcript":"   "}]}}"#;
        assert_eq!(first_transcript(doc), Err(StageError::EmptyTranscript));
    }

    #[test]
    fn test_no_segments_is_empty() {
        let doc = br#"{"results":{"transcripts":[]}}"#;
        assert_eq!(first_transcript(doc), Err(StageError::EmptyTranscript));

        let doc = br#"{"results":{}}"#;
        assert_eq!(first_transcript(doc), Err(StageError::EmptyTranscript));
    }

    #[test]
    fn test_garbage_is_unreadable() {
        assert!(matches!(
            first_transcript(b"not json"),
            Err(StageError::TranscriptUnreadable { .. })
        ));
        assert!(matches!(
            first_transcript(br#"{"status":"ok"}"#),
            Err(StageError::TranscriptUnreadable { .. })
        ));
    }
}
