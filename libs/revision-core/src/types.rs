//! Core types for the revision engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Longest accepted flashcard side.
pub const MAX_CARD_TEXT_LEN: usize = 1000;

/// Longest accepted deck name.
pub const MAX_DECK_NAME_LEN: usize = 200;

/// A vocabulary flashcard with its review schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: i64,
    pub deck_id: i64,
    pub front_text: String,
    pub back_text: String,
    pub learned: bool,
    pub review_count: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Flashcard {
    /// A freshly created card, due immediately.
    pub fn new(
        id: i64,
        deck_id: i64,
        front_text: impl Into<String>,
        back_text: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            deck_id,
            front_text: front_text.into(),
            back_text: back_text.into(),
            learned: false,
            review_count: 0,
            last_reviewed: None,
            next_review: now,
            created_at: now,
        }
    }
}

/// User input for a new flashcard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardDraft {
    pub deck_id: i64,
    pub front_text: String,
    pub back_text: String,
}

impl FlashcardDraft {
    /// Reject empty or oversized text.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_text("front_text", &self.front_text, MAX_CARD_TEXT_LEN)?;
        check_text("back_text", &self.back_text, MAX_CARD_TEXT_LEN)
    }

    /// Copy with surrounding whitespace removed from both sides.
    pub fn trimmed(&self) -> Self {
        Self {
            deck_id: self.deck_id,
            front_text: self.front_text.trim().to_string(),
            back_text: self.back_text.trim().to_string(),
        }
    }
}

/// A named collection of flashcards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User input for a new deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl DeckDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_text("name", &self.name, MAX_DECK_NAME_LEN)
    }
}

fn check_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Matching mode for typed answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMode {
    Exact,
    CaseInsensitive,
    Fuzzy,
}

impl Default for MatchingMode {
    fn default() -> Self {
        Self::CaseInsensitive
    }
}

/// Level of the content hierarchy a progress item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressLevel {
    Content,
    Lesson,
    Unit,
}

impl ProgressLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Lesson => "lesson",
            Self::Unit => "unit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "content" => Some(Self::Content),
            "lesson" => Some(Self::Lesson),
            "unit" => Some(Self::Unit),
            _ => None,
        }
    }
}

/// Completion state of one content item, lesson or unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressItem {
    pub id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub completion_percentage: u8,
    pub is_completed: bool,
}

impl ProgressItem {
    pub fn new(id: i64, parent_id: Option<i64>, completion_percentage: u8, is_completed: bool) -> Self {
        Self {
            id,
            parent_id,
            completion_percentage,
            is_completed,
        }
    }
}

/// Percentage in 0..=100, and exactly 100 once the item is completed.
pub fn check_completion(percentage: u32, completed: bool) -> Result<(), ValidationError> {
    if percentage > 100 {
        return Err(ValidationError::PercentageOutOfRange { value: percentage });
    }
    if completed && percentage != 100 {
        return Err(ValidationError::CompletedBelowFull { value: percentage });
    }
    Ok(())
}

/// A content-level progress change that triggers a cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub content_id: i64,
    pub lesson_id: i64,
    #[serde(default)]
    pub unit_id: Option<i64>,
    pub percentage: u32,
    pub completed: bool,
}

impl ProgressUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_completion(self.percentage, self.completed)
    }

    /// The content item this update writes directly.
    pub fn content_item(&self) -> ProgressItem {
        ProgressItem::new(
            self.content_id,
            Some(self.lesson_id),
            self.percentage.min(100) as u8,
            self.completed,
        )
    }
}
