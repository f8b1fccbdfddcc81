//! Filesystem-backed blob store: `<root>/<bucket>/<key>`.

use crate::capability::blob_store::BlobStore;
use crate::error::{DubflowError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct LocalBlobStore {
    root: PathBuf,
    /// Suffix source for temp files, unique per put
    next_tmp: AtomicU64,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            next_tmp: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve bucket and key to a path below the root.
    ///
    /// Rejects anything that would escape the bucket directory.
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        check_relative("bucket", bucket)?;
        check_relative("key", key)?;
        if Path::new(bucket).components().count() != 1 {
            return Err(DubflowError::Storage {
                message: format!("bucket name must be a single path segment: {bucket}"),
            });
        }
        Ok(self.root.join(bucket).join(key))
    }

    /// Sibling of `path` that no other put, in this or another process, uses.
    fn temp_path(&self, path: &Path) -> PathBuf {
        let n = self.next_tmp.fetch_add(1, Ordering::Relaxed);
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".{}.{n}.part", std::process::id()));
        PathBuf::from(name)
    }
}

async fn discard(tmp_path: &Path) {
    if let Err(e) = tokio::fs::remove_file(tmp_path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %tmp_path.display(), error = %e, "failed to remove partial object");
    }
}

fn check_relative(what: &str, value: &str) -> Result<()> {
    let path = Path::new(value);
    let valid = !value.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if valid {
        Ok(())
    } else {
        Err(DubflowError::Storage {
            message: format!("invalid {what}: {value:?}"),
        })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(DubflowError::BlobNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(DubflowError::Io(e)),
        }
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write next to the target and rename so readers never see a partial object
        let tmp_path = self.temp_path(&path);
        let written = match tokio::fs::write(&tmp_path, &bytes).await {
            Ok(()) => tokio::fs::rename(&tmp_path, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            discard(&tmp_path).await;
            return Err(DubflowError::Io(e));
        }

        tracing::debug!(bucket, key, bytes = bytes.len(), "object stored");
        Ok(())
    }

    fn media_uri(&self, bucket: &str, key: &str) -> String {
        format!("file://{}", self.root.join(bucket).join(key).display())
    }
}
