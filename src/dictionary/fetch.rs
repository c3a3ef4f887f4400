//! Shard fetching abstraction.
//!
//! The loader and the warmup service only ever need "give me the bytes at
//! this index path". Behind that seam live an HTTP implementation for the
//! published artifact tree and a filesystem implementation for development
//! and tests.

use std::path::PathBuf;

use async_trait::async_trait;

use super::error::{DictionaryError, Result};

/// Fetches artifact bytes by their index path (e.g.
/// `/data/dictionary/chapters/genesis/1.json`).
#[async_trait]
pub trait ShardFetcher: Send + Sync {
    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>>;
}

/// HTTP fetcher for a published artifact origin.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    /// `base_url` is joined with index paths; a trailing slash is trimmed.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl ShardFetcher for HttpFetcher {
    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url_for(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DictionaryError::fetch(path, e.to_string()))?;

        if !response.status().is_success() {
            return Err(DictionaryError::fetch(
                path,
                format!("status {}", response.status().as_u16()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DictionaryError::fetch(path, e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Filesystem fetcher rooted at a local artifact tree, used in development
/// mode and by tests against builder output.
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ShardFetcher for FsFetcher {
    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(self.path_for(path))
            .await
            .map_err(|e| DictionaryError::fetch(path, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetcher_joins_urls() {
        let fetcher = HttpFetcher::new("https://example.com/");
        assert_eq!(
            fetcher.url_for("/data/dictionary/index.json"),
            "https://example.com/data/dictionary/index.json"
        );
        assert_eq!(
            fetcher.url_for("index.json"),
            "https://example.com/index.json"
        );
    }

    #[tokio::test]
    async fn test_fs_fetcher_reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/index.json"), b"{}").unwrap();

        let fetcher = FsFetcher::new(dir.path());
        let bytes = fetcher.fetch_bytes("/data/index.json").await.unwrap();
        assert_eq!(bytes, b"{}");

        let err = fetcher.fetch_bytes("/data/missing.json").await.unwrap_err();
        assert!(matches!(err, DictionaryError::Fetch { .. }));
    }
}
