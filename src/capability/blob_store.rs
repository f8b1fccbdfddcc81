use crate::error::{DubflowError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Object storage addressed by bucket and key.
///
/// Every call is an independent round-trip; implementations must not cache.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch an object. Missing objects yield [`DubflowError::BlobNotFound`].
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Store an object, overwriting any existing object under the same key.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// URI under which external services can reach the object.
    fn media_uri(&self, bucket: &str, key: &str) -> String {
        format!("s3://{}/{}", bucket, key)
    }
}

/// In-memory blob store for testing
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    fail_puts: bool,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an object
    pub fn with_object(self, bucket: &str, key: &str, bytes: &[u8]) -> Self {
        self.insert(bucket, key, bytes.to_vec());
        self
    }

    /// Configure the store to reject every put
    pub fn with_put_failure(mut self) -> Self {
        self.fail_puts = true;
        self
    }

    /// Current contents of an object, if any
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of objects held
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    fn insert(&self, bucket: &str, key: &str, bytes: Vec<u8>) {
        self.lock()
            .insert((bucket.to_string(), key.to_string()), bytes);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Vec<u8>>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.object(bucket, key)
            .ok_or_else(|| DubflowError::BlobNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts {
            return Err(DubflowError::Storage {
                message: "mock put failure".to_string(),
            });
        }
        self.insert(bucket, key, bytes);
        Ok(())
    }
}
