//! Client for the revision API.
//!
//! Wraps the REST endpoints, keeps a local progress cache for when the
//! server is unreachable, debounces progress writes and runs study sessions
//! whose review outcomes are reconciled with the server.

pub mod api;
pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod progress;
pub mod study;

pub use api::{DeckStats, RevisionClient};
pub use cache::JsonFileCache;
pub use config::{ClientConfig, DEFAULT_DEBOUNCE};
pub use debounce::Debouncer;
pub use error::{ClientError, Result};
pub use progress::{CachedProgressStore, ProgressTracker};
pub use study::{ReviewOutcome, SelectOutcome, StudyRunner};

use std::sync::Arc;

/// Build the API client and a file-cached progress tracker from `config`.
pub fn connect(config: &ClientConfig) -> Result<(Arc<RevisionClient>, ProgressTracker<JsonFileCache>)> {
    let api = Arc::new(RevisionClient::new(config.base_url.clone()));
    let cache = JsonFileCache::open(&config.cache_path)?;
    let tracker = ProgressTracker::new(Arc::clone(&api), cache, config.debounce);
    Ok((api, tracker))
}
