//! PostgreSQL-backed progress store for the cascade.

use revision_core::{ProgressItem, ProgressLevel, ProgressStore};

use crate::db::Database;
use crate::error::ApiError;

/// Adapts [`Database`] to the core [`ProgressStore`] interface.
pub struct PgProgressStore<'a> {
    db: &'a Database,
}

impl<'a> PgProgressStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }
}

impl ProgressStore for PgProgressStore<'_> {
    type Error = ApiError;

    async fn save(&self, level: ProgressLevel, item: &ProgressItem) -> Result<(), ApiError> {
        self.db.upsert_progress(level, item).await?;
        Ok(())
    }

    async fn children(&self, level: ProgressLevel, parent_id: i64) -> Result<Vec<ProgressItem>, ApiError> {
        let rows = self.db.progress_children(level, parent_id).await?;
        Ok(rows.iter().map(|r| r.to_api_item()).collect())
    }
}
