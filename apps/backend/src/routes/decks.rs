//! Deck endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::AppState;

/// GET /api/v1/revision/decks/
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Deck>>> {
    let decks = state.db.list_decks().await?;
    Ok(Json(decks.iter().map(DbDeck::to_api_deck).collect()))
}

/// POST /api/v1/revision/decks/
pub async fn create(
    State(state): State<AppState>,
    Json(draft): Json<DeckDraft>,
) -> Result<(StatusCode, Json<Deck>)> {
    draft.validate()?;
    let deck = state.db.create_deck(&draft).await?;
    tracing::info!(deck_id = deck.id, "deck created");
    Ok((StatusCode::CREATED, Json(deck.to_api_deck())))
}

/// DELETE /api/v1/revision/decks/:id/
pub async fn delete(State(state): State<AppState>, Path(deck_id): Path<i64>) -> Result<StatusCode> {
    if !state.db.delete_deck(deck_id).await? {
        return Err(ApiError::NotFound(format!("Deck {deck_id}")));
    }
    tracing::info!(deck_id, "deck deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/revision/decks/:id/stats/
pub async fn stats(
    State(state): State<AppState>,
    Path(deck_id): Path<i64>,
) -> Result<Json<DeckStatsResponse>> {
    state
        .db
        .get_deck(deck_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Deck {deck_id}")))?;

    let stats = state.db.deck_stats(deck_id, Utc::now()).await?;
    Ok(Json(stats))
}
