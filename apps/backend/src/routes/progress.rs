//! Progress endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use revision_core::{check_completion, update_progress_cascade};

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::progress::PgProgressStore;
use crate::AppState;

fn parse_level(raw: &str) -> Result<ProgressLevel> {
    ProgressLevel::from_str(raw)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown progress level '{raw}'")))
}

/// GET /api/v1/progress/:level/?parent=ID
pub async fn children(
    State(state): State<AppState>,
    Path(level): Path<String>,
    Query(query): Query<ProgressChildrenQuery>,
) -> Result<Json<Vec<ProgressItem>>> {
    let level = parse_level(&level)?;
    let rows = state.db.progress_children(level, query.parent).await?;
    Ok(Json(rows.iter().map(DbProgress::to_api_item).collect()))
}

/// GET /api/v1/progress/:level/:id/
pub async fn get(
    State(state): State<AppState>,
    Path((level, item_id)): Path<(String, i64)>,
) -> Result<Json<ProgressItem>> {
    let level = parse_level(&level)?;
    let row = state
        .db
        .get_progress(level, item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No {} progress for {item_id}", level.as_str())))?;
    Ok(Json(row.to_api_item()))
}

/// PUT /api/v1/progress/:level/:id/
///
/// Writes one item as-is, without touching its parents.
pub async fn put(
    State(state): State<AppState>,
    Path((level, item_id)): Path<(String, i64)>,
    Json(payload): Json<ProgressWriteRequest>,
) -> Result<Json<ProgressItem>> {
    let level = parse_level(&level)?;
    check_completion(payload.completion_percentage, payload.is_completed)?;

    let item = ProgressItem::new(
        item_id,
        payload.parent_id,
        payload.completion_percentage as u8,
        payload.is_completed,
    );
    let row = state.db.upsert_progress(level, &item).await?;
    Ok(Json(row.to_api_item()))
}

/// POST /api/v1/progress/cascade/
pub async fn cascade(
    State(state): State<AppState>,
    Json(update): Json<ProgressUpdate>,
) -> Result<Json<CascadeReport>> {
    let store = PgProgressStore::new(&state.db);
    let report = update_progress_cascade(&store, &update).await?;

    if let Some(error) = &report.error {
        tracing::warn!(
            content_id = update.content_id,
            lesson_id = update.lesson_id,
            %error,
            "progress cascade fell back to direct writes"
        );
    }

    Ok(Json(report))
}
