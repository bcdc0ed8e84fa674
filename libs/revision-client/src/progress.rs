//! Progress tracking against the API with a local cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use revision_core::{
    update_progress_cascade, CacheKey, CacheStore, CascadeReport, ProgressItem, ProgressLevel,
    ProgressStore, ProgressUpdate,
};

use crate::api::RevisionClient;
use crate::debounce::Debouncer;
use crate::error::{ClientError, Result};

/// [`ProgressStore`] that talks to the server and mirrors every item locally.
///
/// Saves land in the cache before the request is sent, so a failed write is
/// still visible to later loads.
pub struct CachedProgressStore<C> {
    api: Arc<RevisionClient>,
    cache: C,
}

impl<C: CacheStore> CachedProgressStore<C> {
    pub fn new(api: Arc<RevisionClient>, cache: C) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn cached(&self, level: ProgressLevel, id: i64) -> Option<ProgressItem> {
        self.cache.get(&CacheKey::for_progress(level, id))
    }

    /// Read one item from the server, falling back to the cache only when
    /// the server cannot be reached.
    pub async fn load(&self, level: ProgressLevel, id: i64) -> Result<Option<ProgressItem>> {
        let key = CacheKey::for_progress(level, id);
        match self.api.get_progress(level, id).await {
            Ok(Some(item)) => {
                self.cache.set(&key, &item);
                Ok(Some(item))
            }
            Ok(None) => Ok(self.cache.get(&key)),
            Err(e) if e.is_network() => {
                tracing::warn!(level = level.as_str(), id, error = %e, "serving progress from cache");
                match self.cache.get(&key) {
                    Some(item) => Ok(Some(item)),
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }
}

impl<C: CacheStore> ProgressStore for CachedProgressStore<C> {
    type Error = ClientError;

    async fn save(&self, level: ProgressLevel, item: &ProgressItem) -> Result<()> {
        self.cache.set(&CacheKey::for_progress(level, item.id), item);
        self.api.put_progress(level, item).await?;
        Ok(())
    }

    async fn children(&self, level: ProgressLevel, parent_id: i64) -> Result<Vec<ProgressItem>> {
        self.api.progress_children(level, parent_id).await
    }
}

/// Records content progress and cascades it to lessons and units.
///
/// Debounced updates are keyed by content item: a burst on one item sends
/// only its last state, while updates to different items never cancel each
/// other.
pub struct ProgressTracker<C> {
    store: Arc<CachedProgressStore<C>>,
    delay: Duration,
    pending: Mutex<HashMap<i64, Debouncer>>,
}

impl<C: CacheStore + 'static> ProgressTracker<C> {
    pub fn new(api: Arc<RevisionClient>, cache: C, debounce: Duration) -> Self {
        Self {
            store: Arc::new(CachedProgressStore::new(api, cache)),
            delay: debounce,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &CachedProgressStore<C> {
        &self.store
    }

    /// Run the cascade now.
    pub async fn record(&self, update: &ProgressUpdate) -> Result<CascadeReport> {
        let report = update_progress_cascade(self.store.as_ref(), update).await?;
        Ok(report)
    }

    /// Run the cascade after the debounce delay, superseding an update for
    /// the same content item that is still waiting.
    ///
    /// Invalid updates are rejected immediately. The content item is mirrored
    /// into the cache right away so it survives until the cascade runs.
    pub fn record_debounced(&self, update: ProgressUpdate) -> Result<()> {
        update.validate()?;

        let content = update.content_item();
        self.store
            .cache()
            .set(&CacheKey::for_progress(ProgressLevel::Content, content.id), &content);

        let store = Arc::clone(&self.store);
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|_, debouncer| debouncer.is_pending());
        pending
            .entry(update.content_id)
            .or_insert_with(|| Debouncer::new(self.delay))
            .call(async move {
                match update_progress_cascade(store.as_ref(), &update).await {
                    Ok(report) if report.error.is_some() => tracing::warn!(
                        content_id = update.content_id,
                        error = report.error.as_deref().unwrap_or_default(),
                        "debounced progress update fell back to direct writes"
                    ),
                    Ok(_) => tracing::debug!(content_id = update.content_id, "progress cascaded"),
                    Err(e) => tracing::warn!(content_id = update.content_id, error = %e, "progress update rejected"),
                }
            });
        Ok(())
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .any(Debouncer::is_pending)
    }
}
