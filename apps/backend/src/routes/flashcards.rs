//! Flashcard endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::review::record_review;
use crate::AppState;

/// GET /api/v1/revision/flashcards/?deck=&search=
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<FlashcardListQuery>,
) -> Result<Json<Vec<Flashcard>>> {
    let cards = state
        .db
        .list_flashcards(query.deck, query.search.as_deref())
        .await?;
    Ok(Json(cards.iter().map(DbFlashcard::to_api_flashcard).collect()))
}

/// POST /api/v1/revision/flashcards/
pub async fn create(
    State(state): State<AppState>,
    Json(draft): Json<FlashcardDraft>,
) -> Result<(StatusCode, Json<Flashcard>)> {
    let draft = draft.trimmed();
    draft.validate()?;

    state
        .db
        .get_deck(draft.deck_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("Deck {} does not exist", draft.deck_id)))?;

    let card = state.db.create_flashcard(&draft, Utc::now()).await?;
    tracing::info!(flashcard_id = card.id, deck_id = card.deck_id, "flashcard created");
    Ok((StatusCode::CREATED, Json(card.to_api_flashcard())))
}

/// GET /api/v1/revision/flashcards/:id/
pub async fn get(State(state): State<AppState>, Path(flashcard_id): Path<i64>) -> Result<Json<Flashcard>> {
    let card = state
        .db
        .get_flashcard(flashcard_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Flashcard {flashcard_id}")))?;
    Ok(Json(card.to_api_flashcard()))
}

/// DELETE /api/v1/revision/flashcards/:id/
pub async fn delete(State(state): State<AppState>, Path(flashcard_id): Path<i64>) -> Result<StatusCode> {
    if !state.db.delete_flashcard(flashcard_id).await? {
        return Err(ApiError::NotFound(format!("Flashcard {flashcard_id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/revision/flashcards/:id/toggle_learned/
pub async fn toggle_learned(
    State(state): State<AppState>,
    Path(flashcard_id): Path<i64>,
    Json(payload): Json<ToggleLearnedRequest>,
) -> Result<Json<Flashcard>> {
    let card = record_review(
        &state.db,
        &state.scheduler,
        flashcard_id,
        payload.success,
        Utc::now(),
    )
    .await?;
    Ok(Json(card))
}

/// GET /api/v1/revision/flashcards/due_for_review/?limit=N
pub async fn due_for_review(
    State(state): State<AppState>,
    Query(query): Query<DueQuery>,
) -> Result<Json<Vec<Flashcard>>> {
    let cards = state
        .db
        .due_flashcards(Utc::now(), query.effective_limit())
        .await?;
    Ok(Json(cards.iter().map(DbFlashcard::to_api_flashcard).collect()))
}
