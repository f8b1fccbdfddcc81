//! Object-created notifications and the run identity derived from them.

use crate::defaults;
use crate::error::{DubflowError, Result};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Longest sanitized key prefix kept in a run id.
const RUN_ID_KEY_CHARS: usize = 64;

/// Hex digits of the identity hash kept in a run id.
const RUN_ID_HASH_CHARS: usize = 12;

/// One "object created" event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub bucket: String,
    /// Decoded object key
    pub key: String,
    /// Delivery timestamp as reported by the store, if any
    pub event_time: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Envelope {
        #[serde(rename = "Records")]
        records: Vec<Record>,
    },
    Flat(FlatNotification),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Record {
    #[serde(default)]
    event_time: Option<String>,
    s3: RecordEntity,
}

#[derive(Deserialize)]
struct RecordEntity {
    bucket: NamedBucket,
    object: NamedObject,
}

#[derive(Deserialize)]
struct NamedBucket {
    name: String,
}

#[derive(Deserialize)]
struct NamedObject {
    key: String,
}

#[derive(Deserialize)]
struct FlatNotification {
    bucket: String,
    key: String,
    #[serde(default, alias = "eventTime")]
    event_time: Option<String>,
}

impl Notification {
    /// Build a notification from an already decoded key.
    pub fn new(bucket: &str, key: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            event_time: None,
        }
    }

    pub fn with_event_time(mut self, event_time: &str) -> Self {
        self.event_time = Some(event_time.to_string());
        self
    }

    /// Parse a notification document.
    ///
    /// Accepts the storage event envelope (`{"Records": [...]}`, one
    /// notification per record) and the flat `{bucket, key, event_time?}`
    /// form. Keys arrive URL-encoded in both. Invalid records in an envelope
    /// are skipped; the envelope fails only when none of them is usable.
    pub fn parse(document: &str) -> Result<Vec<Notification>> {
        let payload: Payload =
            serde_json::from_str(document).map_err(|e| DubflowError::Notification {
                message: format!("unrecognised document: {e}"),
            })?;

        match payload {
            Payload::Envelope { records } => {
                let total = records.len();
                let mut last_error = None;
                let mut notifications = Vec::with_capacity(total);
                for record in records {
                    match Notification::decoded(
                        record.s3.bucket.name,
                        &record.s3.object.key,
                        record.event_time,
                    ) {
                        Ok(notification) => notifications.push(notification),
                        Err(e) => {
                            tracing::warn!(error = %e, "skipping invalid record");
                            last_error = Some(e);
                        }
                    }
                }
                match last_error {
                    Some(e) if notifications.is_empty() => Err(e),
                    _ => Ok(notifications),
                }
            }
            Payload::Flat(flat) => Ok(vec![Notification::decoded(
                flat.bucket,
                &flat.key,
                flat.event_time,
            )?]),
        }
    }

    fn decoded(bucket: String, raw_key: &str, event_time: Option<String>) -> Result<Self> {
        if bucket.trim().is_empty() {
            return Err(DubflowError::Notification {
                message: "missing bucket".to_string(),
            });
        }
        let key = decode_key(raw_key)?;
        if key.is_empty() {
            return Err(DubflowError::Notification {
                message: "missing key".to_string(),
            });
        }
        Ok(Self {
            bucket,
            key,
            event_time: event_time.filter(|t| !t.is_empty()),
        })
    }

    /// Stable identity of this notification.
    ///
    /// Redelivery of the same event yields the same id. Doubles as the
    /// transcription job name, so only `[A-Za-z0-9._-]` appear in it.
    pub fn run_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.bucket.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.key.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.event_time.as_deref().unwrap_or("").as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        let readable: String = self
            .key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .take(RUN_ID_KEY_CHARS)
            .collect();

        format!("{readable}-{}", &digest[..RUN_ID_HASH_CHARS])
    }

    /// Media format implied by the key extension, if recognised.
    pub fn media_format(&self) -> Option<String> {
        let file_name = self.key.rsplit('/').next().unwrap_or(&self.key);
        let (_, ext) = file_name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        defaults::KNOWN_MEDIA_FORMATS
            .contains(&ext.as_str())
            .then_some(ext)
    }
}

/// Decode a form-encoded object key: `+` is a space, then percent escapes.
pub fn decode_key(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|key| key.into_owned())
        .map_err(|_| DubflowError::Notification {
            message: format!("key is not valid UTF-8 once decoded: {raw}"),
        })
}
