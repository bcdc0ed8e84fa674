//! Database models and API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{ApiError, Result};

// Re-export shared types from revision-core
pub use revision_core::{
    CascadeReport, Deck, DeckDraft, Flashcard, FlashcardDraft, ProgressItem, ProgressLevel,
    ProgressUpdate,
};

// === Database Entity Types ===

/// Deck stored in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbDeck {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DbDeck {
    pub fn to_api_deck(&self) -> Deck {
        Deck {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
        }
    }
}

/// Flashcard stored in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbFlashcard {
    pub id: i64,
    pub deck_id: i64,
    pub front_text: String,
    pub back_text: String,
    pub learned: bool,
    pub review_count: i32,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl DbFlashcard {
    /// Convert to the shared flashcard type
    pub fn to_api_flashcard(&self) -> Flashcard {
        Flashcard {
            id: self.id,
            deck_id: self.deck_id,
            front_text: self.front_text.clone(),
            back_text: self.back_text.clone(),
            learned: self.learned,
            review_count: self.review_count.max(0) as u32,
            last_reviewed: self.last_reviewed,
            next_review: self.next_review,
            created_at: self.created_at,
        }
    }
}

/// One review outcome, appended on every toggle_learned call
#[derive(Debug, Clone, FromRow)]
pub struct DbReview {
    pub id: Uuid,
    pub flashcard_id: i64,
    pub reviewed_at: DateTime<Utc>,
    pub was_correct: bool,
    pub review_count_before: i32,
    pub review_count_after: i32,
    pub next_review: DateTime<Utc>,
}

impl DbReview {
    /// Log row for the transition `before` → `after`.
    pub fn from_transition(before: &Flashcard, after: &Flashcard, was_correct: bool) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            flashcard_id: after.id,
            reviewed_at: after.last_reviewed.unwrap_or(after.next_review),
            was_correct,
            review_count_before: review_count_column(before.review_count)?,
            review_count_after: review_count_column(after.review_count)?,
            next_review: after.next_review,
        })
    }
}

/// Review counts are stored as INTEGER.
pub fn review_count_column(count: u32) -> Result<i32> {
    i32::try_from(count)
        .map_err(|_| ApiError::BadRequest(format!("review count {count} is out of range")))
}

/// Progress row for any level of the hierarchy
#[derive(Debug, Clone, FromRow)]
pub struct DbProgress {
    pub level: String,
    pub item_id: i64,
    pub parent_id: Option<i64>,
    pub completion_percentage: i16,
    pub is_completed: bool,
    pub updated_at: DateTime<Utc>,
}

impl DbProgress {
    pub fn to_api_item(&self) -> ProgressItem {
        ProgressItem {
            id: self.item_id,
            parent_id: self.parent_id,
            completion_percentage: self.completion_percentage.clamp(0, 100) as u8,
            is_completed: self.is_completed,
        }
    }
}

// === API Request/Response Types ===

#[derive(Debug, Deserialize)]
pub struct FlashcardListQuery {
    pub deck: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DueQuery {
    pub limit: Option<i64>,
}

impl DueQuery {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

/// Body of PATCH toggle_learned
#[derive(Debug, Deserialize, Serialize)]
pub struct ToggleLearnedRequest {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProgressChildrenQuery {
    pub parent: i64,
}

/// Body of PUT on a single progress item
#[derive(Debug, Deserialize, Serialize)]
pub struct ProgressWriteRequest {
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub completion_percentage: u32,
    pub is_completed: bool,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct DeckStatsResponse {
    pub total_cards: i64,
    pub learned_cards: i64,
    pub due_cards: i64,
    pub reviews_today: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}
