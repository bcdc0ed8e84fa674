//! Typed cache interface for offline progress mirrors.
//!
//! Values are stored as JSON strings under the legacy key layout so a cache
//! written by an older client stays readable. A value that fails to parse is
//! logged and treated as absent.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::ProgressLevel;

/// Key of a cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Content item progress, `progress_data_{id}`.
    ProgressData(i64),
    /// Lesson aggregate, `local_lesson_progress_{id}`.
    LessonProgress(i64),
    /// Unit aggregate, `local_unit_progress_{id}`.
    UnitProgress(i64),
}

impl CacheKey {
    /// Key holding the progress of `id` at `level`.
    pub fn for_progress(level: ProgressLevel, id: i64) -> Self {
        match level {
            ProgressLevel::Content => Self::ProgressData(id),
            ProgressLevel::Lesson => Self::LessonProgress(id),
            ProgressLevel::Unit => Self::UnitProgress(id),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProgressData(id) => write!(f, "progress_data_{id}"),
            Self::LessonProgress(id) => write!(f, "local_lesson_progress_{id}"),
            Self::UnitProgress(id) => write!(f, "local_unit_progress_{id}"),
        }
    }
}

/// String-valued key/value store. Last write wins.
pub trait CacheStore: Send + Sync {
    fn get_raw(&self, key: &CacheKey) -> Option<String>;
    fn set_raw(&self, key: &CacheKey, value: String);
    fn invalidate(&self, key: &CacheKey);

    /// Typed read; malformed JSON counts as a miss.
    fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T>
    where
        Self: Sized,
    {
        let raw = self.get_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding malformed cache entry");
                None
            }
        }
    }

    /// Typed write.
    fn set<T: Serialize>(&self, key: &CacheKey, value: &T)
    where
        Self: Sized,
    {
        match serde_json::to_string(value) {
            Ok(raw) => self.set_raw(key, raw),
            Err(e) => tracing::warn!(key = %key, error = %e, "failed to encode cache entry"),
        }
    }
}

/// In-process cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get_raw(&self, key: &CacheKey) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.get(&key.to_string()).cloned()
    }

    fn set_raw(&self, key: &CacheKey, value: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value);
        }
    }

    fn invalidate(&self, key: &CacheKey) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&key.to_string());
        }
    }
}
