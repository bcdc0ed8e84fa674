//! Server-side review recording.

use chrono::{DateTime, Utc};
use revision_core::{Flashcard, ReviewScheduler};

use crate::db::Database;
use crate::error::{ApiError, Result};
use crate::models::DbReview;

/// Apply one review outcome to a stored card and log it.
///
/// The card row stays locked from read to save, so concurrent reviews of the
/// same card apply one after another. The returned record is authoritative;
/// clients replace their local preview with it.
pub async fn record_review(
    db: &Database,
    scheduler: &ReviewScheduler,
    flashcard_id: i64,
    was_correct: bool,
    now: DateTime<Utc>,
) -> Result<Flashcard> {
    let mut tx = db.begin().await?;

    let current = Database::lock_flashcard(&mut tx, flashcard_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Flashcard {flashcard_id}")))?
        .to_api_flashcard();

    let scheduled = scheduler.schedule(&current, was_correct, now);
    let saved = Database::save_schedule(&mut tx, &scheduled)
        .await?
        .to_api_flashcard();
    tx.commit().await?;

    // Card is committed by now; the log row is best-effort.
    if let Err(e) = log_review(db, &current, &saved, was_correct).await {
        tracing::warn!(flashcard_id, error = %e, "failed to log review");
    }

    tracing::debug!(
        flashcard_id,
        was_correct,
        review_count = saved.review_count,
        learned = saved.learned,
        next_review = %saved.next_review,
        "review recorded"
    );

    Ok(saved)
}

async fn log_review(db: &Database, before: &Flashcard, after: &Flashcard, was_correct: bool) -> Result<()> {
    let row = DbReview::from_transition(before, after, was_correct)?;
    db.insert_review(&row).await
}
