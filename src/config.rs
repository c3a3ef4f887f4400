use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dictionary::warmup::DEFAULT_CONCURRENCY;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub warmup: WarmupConfig,
}

/// Where published dictionary artifacts are fetched from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Origin serving the artifact tree (`/data/dictionary/...`).
    pub base_url: String,
}

/// Warmup defaults, overridable per invocation on the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    /// Parallel shard downloads.
    pub concurrency: usize,
    /// Override the default cache directory.
    pub cache_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            warmup: WarmupConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            cache_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/dabar/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse config at {}: {e} — using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!(
                    "No config file at {} — using defaults",
                    config_path.display()
                );
                Self::default()
            }
        }
    }

    /// Resolved cache directory (override or XDG default).
    pub fn cache_dir(&self) -> PathBuf {
        self.warmup.cache_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("dabar"))
                .unwrap_or_else(|| PathBuf::from("cache"))
        })
    }

    /// Where the warmup status snapshot is persisted.
    pub fn status_path(&self) -> PathBuf {
        self.cache_dir().join("warmup-status.json")
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("dabar").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
