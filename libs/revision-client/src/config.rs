//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Default delay before a debounced progress update is sent.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, without trailing slash.
    pub base_url: String,
    /// JSON file backing the local progress cache.
    pub cache_path: PathBuf,
    pub debounce: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache_path: default_cache_path(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Read `REVISION_API_URL`, `REVISION_CACHE_PATH` and `REVISION_DEBOUNCE_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("REVISION_API_URL")
            .ok_or_else(|| ClientError::Config("REVISION_API_URL must be set".to_string()))?;

        let mut config = Self::new(base_url);
        if let Some(path) = lookup("REVISION_CACHE_PATH") {
            config.cache_path = PathBuf::from(path);
        }
        if let Some(ms) = lookup("REVISION_DEBOUNCE_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|_| ClientError::Config(format!("invalid REVISION_DEBOUNCE_MS: {ms}")))?;
            config.debounce = Duration::from_millis(ms);
        }
        Ok(config)
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

fn default_cache_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("revision")
        .join("progress-cache.json")
}
