//! Persistent cache abstraction for offline warmup.
//!
//! The warmup service delegates byte storage to a host-provided cache keyed
//! by artifact path. The engine never evicts; content changes arrive under
//! new shard paths via the index version, and stale-path purging belongs to
//! the host's cache rotation.

use std::path::PathBuf;

use async_trait::async_trait;

use super::error::{DictionaryError, Result};

/// Write-only view of the host's persistent cache.
#[async_trait]
pub trait PersistentCache: Send + Sync {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()>;
}

/// Filesystem-backed cache mirroring the artifact tree under a root
/// directory.
pub struct FsCache {
    root: PathBuf,
}

impl FsCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where a given artifact path is stored.
    pub fn path_for(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl PersistentCache for FsCache {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let target = self.path_for(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DictionaryError::cache(path, e.to_string()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| DictionaryError::cache(path, e.to_string()))
    }
}
