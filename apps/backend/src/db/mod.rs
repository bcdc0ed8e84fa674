//! PostgreSQL database operations

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgConnection, PgPool, Postgres, Transaction};

use crate::error::{ApiError, Result};
use crate::models::*;

const FLASHCARD_COLUMNS: &str = "id, deck_id, front_text, back_text, learned, review_count, \
     last_reviewed, next_review, created_at";

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    // === Deck Repository ===

    pub async fn list_decks(&self) -> Result<Vec<DbDeck>> {
        let decks = sqlx::query_as::<_, DbDeck>(
            r#"
            SELECT id, name, description, created_at
            FROM decks
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(decks)
    }

    pub async fn get_deck(&self, deck_id: i64) -> Result<Option<DbDeck>> {
        let deck = sqlx::query_as::<_, DbDeck>(
            r#"
            SELECT id, name, description, created_at
            FROM decks
            WHERE id = $1
            "#,
        )
        .bind(deck_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(deck)
    }

    pub async fn create_deck(&self, draft: &DeckDraft) -> Result<DbDeck> {
        let description = draft
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let deck = sqlx::query_as::<_, DbDeck>(
            r#"
            INSERT INTO decks (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at
            "#,
        )
        .bind(draft.name.trim())
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        Ok(deck)
    }

    /// Delete a deck and, through the foreign key, its flashcards.
    /// Returns false when no deck had that id.
    pub async fn delete_deck(&self, deck_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM decks WHERE id = $1")
            .bind(deck_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Card counts and today's review count for one deck
    pub async fn deck_stats(&self, deck_id: i64, now: DateTime<Utc>) -> Result<DeckStatsResponse> {
        let stats = sqlx::query_as::<_, DeckStatsResponse>(
            r#"
            SELECT
                COUNT(f.id) AS total_cards,
                COUNT(CASE WHEN f.learned THEN 1 END) AS learned_cards,
                COUNT(CASE WHEN f.next_review <= $2 THEN 1 END) AS due_cards,
                (
                    SELECT COUNT(*)
                    FROM reviews r
                    JOIN flashcards rf ON rf.id = r.flashcard_id
                    WHERE rf.deck_id = $1
                      AND r.reviewed_at >= date_trunc('day', $2::TIMESTAMPTZ)
                ) AS reviews_today
            FROM flashcards f
            WHERE f.deck_id = $1
            "#,
        )
        .bind(deck_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    // === Flashcard Repository ===

    /// List flashcards, optionally restricted to a deck and/or a text search
    pub async fn list_flashcards(
        &self,
        deck_id: Option<i64>,
        search: Option<&str>,
    ) -> Result<Vec<DbFlashcard>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")));

        let sql = format!(
            r#"
            SELECT {FLASHCARD_COLUMNS}
            FROM flashcards
            WHERE ($1::BIGINT IS NULL OR deck_id = $1)
              AND ($2::TEXT IS NULL OR front_text ILIKE $2 OR back_text ILIKE $2)
            ORDER BY created_at, id
            "#
        );

        let cards = sqlx::query_as::<_, DbFlashcard>(&sql)
            .bind(deck_id)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;

        Ok(cards)
    }

    pub async fn get_flashcard(&self, flashcard_id: i64) -> Result<Option<DbFlashcard>> {
        let sql = format!("SELECT {FLASHCARD_COLUMNS} FROM flashcards WHERE id = $1");
        let card = sqlx::query_as::<_, DbFlashcard>(&sql)
            .bind(flashcard_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(card)
    }

    /// Insert a new card, due immediately
    pub async fn create_flashcard(&self, draft: &FlashcardDraft, now: DateTime<Utc>) -> Result<DbFlashcard> {
        let sql = format!(
            r#"
            INSERT INTO flashcards (deck_id, front_text, back_text, next_review, created_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING {FLASHCARD_COLUMNS}
            "#
        );

        let card = sqlx::query_as::<_, DbFlashcard>(&sql)
            .bind(draft.deck_id)
            .bind(&draft.front_text)
            .bind(&draft.back_text)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(card)
    }

    pub async fn delete_flashcard(&self, flashcard_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM flashcards WHERE id = $1")
            .bind(flashcard_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetch a card and hold its row lock until the transaction ends
    pub async fn lock_flashcard(conn: &mut PgConnection, flashcard_id: i64) -> Result<Option<DbFlashcard>> {
        let sql = format!("SELECT {FLASHCARD_COLUMNS} FROM flashcards WHERE id = $1 FOR UPDATE");
        let card = sqlx::query_as::<_, DbFlashcard>(&sql)
            .bind(flashcard_id)
            .fetch_optional(conn)
            .await?;

        Ok(card)
    }

    /// Persist the scheduling fields of a reviewed card
    pub async fn save_schedule(conn: &mut PgConnection, card: &Flashcard) -> Result<DbFlashcard> {
        let sql = format!(
            r#"
            UPDATE flashcards
            SET learned = $2,
                review_count = $3,
                last_reviewed = $4,
                next_review = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {FLASHCARD_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, DbFlashcard>(&sql)
            .bind(card.id)
            .bind(card.learned)
            .bind(review_count_column(card.review_count)?)
            .bind(card.last_reviewed)
            .bind(card.next_review)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Flashcard {}", card.id)))?;

        Ok(updated)
    }

    /// Cards whose next review has passed, oldest first
    pub async fn due_flashcards(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<DbFlashcard>> {
        let sql = format!(
            r#"
            SELECT {FLASHCARD_COLUMNS}
            FROM flashcards
            WHERE next_review <= $1
            ORDER BY next_review, id
            LIMIT $2
            "#
        );

        let cards = sqlx::query_as::<_, DbFlashcard>(&sql)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(cards)
    }

    // === Review Repository ===

    pub async fn insert_review(&self, review: &DbReview) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, flashcard_id, reviewed_at, was_correct,
                                 review_count_before, review_count_after, next_review)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.id)
        .bind(review.flashcard_id)
        .bind(review.reviewed_at)
        .bind(review.was_correct)
        .bind(review.review_count_before)
        .bind(review.review_count_after)
        .bind(review.next_review)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // === Progress Repository ===

    pub async fn get_progress(&self, level: ProgressLevel, item_id: i64) -> Result<Option<DbProgress>> {
        let row = sqlx::query_as::<_, DbProgress>(
            r#"
            SELECT level, item_id, parent_id, completion_percentage, is_completed, updated_at
            FROM progress
            WHERE level = $1 AND item_id = $2
            "#,
        )
        .bind(level.as_str())
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Insert or replace a progress item. A missing parent keeps the stored one.
    pub async fn upsert_progress(&self, level: ProgressLevel, item: &ProgressItem) -> Result<DbProgress> {
        let row = sqlx::query_as::<_, DbProgress>(
            r#"
            INSERT INTO progress (level, item_id, parent_id, completion_percentage, is_completed)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (level, item_id) DO UPDATE
            SET parent_id = COALESCE(EXCLUDED.parent_id, progress.parent_id),
                completion_percentage = EXCLUDED.completion_percentage,
                is_completed = EXCLUDED.is_completed,
                updated_at = NOW()
            RETURNING level, item_id, parent_id, completion_percentage, is_completed, updated_at
            "#,
        )
        .bind(level.as_str())
        .bind(item.id)
        .bind(item.parent_id)
        .bind(i16::from(item.completion_percentage))
        .bind(item.is_completed)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn progress_children(&self, level: ProgressLevel, parent_id: i64) -> Result<Vec<DbProgress>> {
        let rows = sqlx::query_as::<_, DbProgress>(
            r#"
            SELECT level, item_id, parent_id, completion_percentage, is_completed, updated_at
            FROM progress
            WHERE level = $1 AND parent_id = $2
            ORDER BY item_id
            "#,
        )
        .bind(level.as_str())
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
