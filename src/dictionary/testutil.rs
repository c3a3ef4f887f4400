//! In-memory fetcher and cache doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::cache::PersistentCache;
use super::error::{DictionaryError, Result};
use super::fetch::ShardFetcher;

/// Serves artifacts from an in-memory map, counting fetches per path and
/// optionally failing specific paths.
pub(crate) struct MapFetcher {
    files: Mutex<HashMap<String, Vec<u8>>>,
    counts: Mutex<HashMap<String, usize>>,
    failing: Mutex<HashSet<String>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            counts: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn insert_bytes(&self, path: &str, bytes: Vec<u8>) {
        self.files.lock().unwrap().insert(path.to_string(), bytes);
    }

    pub fn insert_json(&self, path: &str, value: serde_json::Value) {
        self.insert_bytes(path, serde_json::to_vec(&value).unwrap());
    }

    /// Make fetches of `path` fail from now on.
    pub fn fail_path(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    /// Undo [`fail_path`](Self::fail_path).
    pub fn unfail_path(&self, path: &str) {
        self.failing.lock().unwrap().remove(path);
    }

    pub fn fetch_count(&self, path: &str) -> usize {
        self.counts.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.counts.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ShardFetcher for MapFetcher {
    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>> {
        *self
            .counts
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_insert(0) += 1;

        if self.failing.lock().unwrap().contains(path) {
            return Err(DictionaryError::fetch(path, "injected failure"));
        }
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| DictionaryError::fetch(path, "not found"))
    }
}

/// Records every path written, in order.
pub(crate) struct RecordingCache {
    puts: Mutex<Vec<String>>,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self {
            puts: Mutex::new(Vec::new()),
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PersistentCache for RecordingCache {
    async fn put(&self, path: &str, _bytes: &[u8]) -> Result<()> {
        self.puts.lock().unwrap().push(path.to_string());
        Ok(())
    }
}
