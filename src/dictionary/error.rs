//! Error types for the dictionary engine.
//!
//! Provides a unified error type covering shard building, fetching and
//! cache persistence. Chapter loading and word lookup deliberately do not
//! surface these errors to callers; see the loader and resolver modules.

use thiserror::Error;

/// Unified error type for dictionary operations.
#[derive(Debug, Error)]
pub enum DictionaryError {
    /// Fetching a remote or local artifact failed.
    #[error("Fetch failed for {path}: {message}")]
    Fetch { path: String, message: String },

    /// Writing to the persistent cache failed.
    #[error("Cache write failed for {path}: {message}")]
    Cache { path: String, message: String },

    /// A dictionary key did not match `{book}_{chapter}_{verse}_{token}`.
    #[error("Invalid dictionary key: {0}")]
    InvalidKey(String),

    /// Shard build failure (bad input file, unwritable output directory).
    #[error("Shard build failed: {0}")]
    Build(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error for file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DictionaryError {
    /// Create a fetch error for the given path.
    pub fn fetch(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a cache-write error for the given path.
    pub fn cache(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Cache {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a build error with the given message.
    pub fn build(msg: impl Into<String>) -> Self {
        Self::Build(msg.into())
    }
}

/// Result type alias for dictionary operations.
pub type Result<T> = std::result::Result<T, DictionaryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DictionaryError::fetch("/data/dictionary/index.json", "status 404");
        assert_eq!(
            err.to_string(),
            "Fetch failed for /data/dictionary/index.json: status 404"
        );

        let err = DictionaryError::build("input file missing");
        assert_eq!(err.to_string(), "Shard build failed: input file missing");
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err: DictionaryError = json_err.into();
        assert!(matches!(err, DictionaryError::Serialization(_)));
    }
}
