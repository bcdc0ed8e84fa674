//! Common test utilities and fixtures for integration tests.
//!
//! # Requirements
//! Integration tests require a PostgreSQL database (set DATABASE_URL).

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;

use axum::http::{header::COOKIE, HeaderName, HeaderValue};
use axum::Router;
use axum_test::{TestRequest, TestServer};

use revision_backend::db::Database;
use revision_backend::models::{Deck, DeckDraft, ProgressLevel};
use revision_backend::{app, AppState};

/// Token the test client presents as both cookie and header.
pub const TEST_CSRF_TOKEN: &str = "integration-test-token";

/// Test context containing database connection and router.
pub struct TestContext {
    pub db: Arc<Database>,
    app: Router,
}

impl TestContext {
    /// Create a new test context with CSRF enforcement on.
    ///
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

        let db = Database::connect(&database_url, 5)
            .await
            .expect("Failed to connect to test database");

        db.run_migrations().await.expect("Failed to run migrations");

        let state = AppState::new(db, true);
        let db = state.db.clone();

        Self { db, app: app(state) }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.app.clone()).unwrap()
    }

    /// Insert a deck directly, bypassing the API.
    pub async fn create_deck(&self, name: &str) -> Deck {
        let draft = DeckDraft {
            name: name.to_string(),
            description: None,
        };
        self.db
            .create_deck(&draft)
            .await
            .expect("Failed to create test deck")
            .to_api_deck()
    }

    /// Delete a deck with its flashcards and review log.
    pub async fn cleanup_deck(&self, deck_id: i64) {
        let _ = self.db.delete_deck(deck_id).await;
    }

    pub async fn cleanup_progress(&self, level: ProgressLevel, ids: &[i64]) {
        let _ = sqlx::query("DELETE FROM progress WHERE level = $1 AND item_id = ANY($2)")
            .bind(level.as_str())
            .bind(ids)
            .execute(self.db.pool())
            .await;
    }
}

/// Attach the double-submit CSRF cookie and header.
pub fn with_csrf(request: TestRequest) -> TestRequest {
    request
        .add_header(
            COOKIE,
            HeaderValue::from_str(&format!("csrftoken={TEST_CSRF_TOKEN}")).unwrap(),
        )
        .add_header(
            HeaderName::from_static("x-csrftoken"),
            HeaderValue::from_static(TEST_CSRF_TOKEN),
        )
}
