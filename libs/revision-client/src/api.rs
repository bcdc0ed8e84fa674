//! HTTP client for the revision REST API.

use std::sync::Mutex;

use reqwest::{header::COOKIE, Client, Method, RequestBuilder, Response};
use revision_core::csrf::{TokenSources, CSRF_COOKIE_NAME, CSRF_HEADER_NAME};
use revision_core::{
    CascadeReport, Deck, DeckDraft, Flashcard, FlashcardDraft, ProgressItem, ProgressLevel,
    ProgressUpdate,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Counts returned by the deck stats endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckStats {
    pub total_cards: i64,
    pub learned_cards: i64,
    pub due_cards: i64,
    pub reviews_today: i64,
}

#[derive(Debug, Deserialize)]
struct CsrfTokenResponse {
    csrf_token: String,
}

#[derive(Debug, Serialize)]
struct ToggleLearnedRequest {
    success: bool,
}

#[derive(Debug, Serialize)]
struct ProgressWriteRequest {
    parent_id: Option<i64>,
    completion_percentage: u8,
    is_completed: bool,
}

/// Typed wrapper over the backend endpoints.
///
/// Unsafe requests carry the CSRF token as both cookie and header. The token
/// comes from [`TokenSources`] when the page exposed one, otherwise it is
/// fetched once from the token endpoint.
pub struct RevisionClient {
    client: Client,
    base_url: String,
    csrf_token: Mutex<Option<String>>,
}

impl RevisionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            csrf_token: Mutex::new(None),
        }
    }

    /// Seed the CSRF token from page-provided sources.
    pub fn with_token_sources(self, sources: &TokenSources) -> Self {
        if let Some(token) = sources.resolve() {
            self.set_csrf_token(token);
        }
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn cached_token(&self) -> Option<String> {
        self.csrf_token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_csrf_token(&self, token: String) {
        *self.csrf_token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token);
    }

    /// Check if backend is reachable.
    pub async fn check_connectivity(&self) -> Result<bool> {
        let resp = self.client.get(self.url("/health")).send().await?;
        Ok(resp.status().is_success())
    }

    /// The CSRF token, fetching one when none is known yet.
    pub async fn csrf_token(&self) -> Result<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let resp = self.client.get(self.url("/api/v1/csrf/")).send().await?;
        let body: CsrfTokenResponse = parse(resp).await?;
        tracing::debug!("fetched CSRF token");
        self.set_csrf_token(body.csrf_token.clone());
        Ok(body.csrf_token)
    }

    async fn unsafe_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.csrf_token().await?;
        Ok(self
            .client
            .request(method, self.url(path))
            .header(CSRF_HEADER_NAME, &token)
            .header(COOKIE, format!("{CSRF_COOKIE_NAME}={token}")))
    }

    // === Decks ===

    pub async fn list_decks(&self) -> Result<Vec<Deck>> {
        let resp = self.client.get(self.url("/api/v1/revision/decks/")).send().await?;
        parse(resp).await
    }

    pub async fn create_deck(&self, draft: &DeckDraft) -> Result<Deck> {
        draft.validate()?;
        let resp = self
            .unsafe_request(Method::POST, "/api/v1/revision/decks/")
            .await?
            .json(draft)
            .send()
            .await?;
        parse(resp).await
    }

    pub async fn delete_deck(&self, deck_id: i64) -> Result<()> {
        let resp = self
            .unsafe_request(Method::DELETE, &format!("/api/v1/revision/decks/{deck_id}/"))
            .await?
            .send()
            .await?;
        expect_success(resp).await
    }

    pub async fn deck_stats(&self, deck_id: i64) -> Result<DeckStats> {
        let resp = self
            .client
            .get(self.url(&format!("/api/v1/revision/decks/{deck_id}/stats/")))
            .send()
            .await?;
        parse(resp).await
    }

    // === Flashcards ===

    pub async fn list_flashcards(&self, deck_id: Option<i64>, search: Option<&str>) -> Result<Vec<Flashcard>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(deck_id) = deck_id {
            query.push(("deck", deck_id.to_string()));
        }
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query.push(("search", search.to_string()));
        }

        let resp = self
            .client
            .get(self.url("/api/v1/revision/flashcards/"))
            .query(&query)
            .send()
            .await?;
        parse(resp).await
    }

    pub async fn get_flashcard(&self, flashcard_id: i64) -> Result<Flashcard> {
        let resp = self
            .client
            .get(self.url(&format!("/api/v1/revision/flashcards/{flashcard_id}/")))
            .send()
            .await?;
        parse(resp).await
    }

    /// Create a card. Blank or oversized text is rejected before any request.
    pub async fn create_flashcard(&self, draft: &FlashcardDraft) -> Result<Flashcard> {
        let draft = draft.trimmed();
        draft.validate()?;
        let resp = self
            .unsafe_request(Method::POST, "/api/v1/revision/flashcards/")
            .await?
            .json(&draft)
            .send()
            .await?;
        parse(resp).await
    }

    pub async fn delete_flashcard(&self, flashcard_id: i64) -> Result<()> {
        let resp = self
            .unsafe_request(Method::DELETE, &format!("/api/v1/revision/flashcards/{flashcard_id}/"))
            .await?
            .send()
            .await?;
        expect_success(resp).await
    }

    /// Report a review outcome; returns the server's rescheduled card.
    pub async fn toggle_learned(&self, flashcard_id: i64, success: bool) -> Result<Flashcard> {
        let resp = self
            .unsafe_request(
                Method::PATCH,
                &format!("/api/v1/revision/flashcards/{flashcard_id}/toggle_learned/"),
            )
            .await?
            .json(&ToggleLearnedRequest { success })
            .send()
            .await?;
        parse(resp).await
    }

    pub async fn due_for_review(&self, limit: Option<u32>) -> Result<Vec<Flashcard>> {
        let mut request = self
            .client
            .get(self.url("/api/v1/revision/flashcards/due_for_review/"));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        parse(request.send().await?).await
    }

    // === Progress ===

    /// `None` when the server has no row for this item.
    pub async fn get_progress(&self, level: ProgressLevel, id: i64) -> Result<Option<ProgressItem>> {
        let resp = self
            .client
            .get(self.url(&format!("/api/v1/progress/{}/{id}/", level.as_str())))
            .send()
            .await?;
        match parse(resp).await {
            Ok(item) => Ok(Some(item)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn put_progress(&self, level: ProgressLevel, item: &ProgressItem) -> Result<ProgressItem> {
        let body = ProgressWriteRequest {
            parent_id: item.parent_id,
            completion_percentage: item.completion_percentage,
            is_completed: item.is_completed,
        };
        let resp = self
            .unsafe_request(
                Method::PUT,
                &format!("/api/v1/progress/{}/{}/", level.as_str(), item.id),
            )
            .await?
            .json(&body)
            .send()
            .await?;
        parse(resp).await
    }

    pub async fn progress_children(&self, level: ProgressLevel, parent_id: i64) -> Result<Vec<ProgressItem>> {
        let resp = self
            .client
            .get(self.url(&format!("/api/v1/progress/{}/", level.as_str())))
            .query(&[("parent", parent_id)])
            .send()
            .await?;
        parse(resp).await
    }

    /// Run the cascade server-side.
    pub async fn cascade(&self, update: &ProgressUpdate) -> Result<CascadeReport> {
        update.validate()?;
        let resp = self
            .unsafe_request(Method::POST, "/api/v1/progress/cascade/")
            .await?
            .json(update)
            .send()
            .await?;
        parse(resp).await
    }
}

async fn expect_success(resp: Response) -> Result<()> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        return Err(ClientError::Backend { status, message });
    }
    Ok(())
}

async fn parse<T: DeserializeOwned>(resp: Response) -> Result<T> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        return Err(ClientError::Backend { status, message });
    }

    resp.json().await.map_err(|e| ClientError::Parse(e.to_string()))
}
