//! Drives a [`StudySession`] against the server.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use revision_core::{AnsweredCard, Flashcard, MatchEvent, SessionOptions, StudySession};

use crate::api::RevisionClient;
use crate::error::Result;

/// A graded card plus what the server said about it.
#[derive(Debug)]
pub struct ReviewOutcome {
    pub answered: AnsweredCard,
    /// The server's record, already applied to the session, or the error
    /// that kept it from being saved.
    pub synced: Result<Flashcard>,
}

/// A match-board selection plus the server result for a completed pair.
#[derive(Debug)]
pub struct SelectOutcome {
    pub event: MatchEvent,
    pub synced: Option<Result<Flashcard>>,
}

/// Runs one study session, persisting each review outcome.
///
/// The local scheduler output is only a preview; whatever the server returns
/// replaces it.
pub struct StudyRunner {
    api: Arc<RevisionClient>,
    session: StudySession,
}

impl StudyRunner {
    pub fn new(api: Arc<RevisionClient>, cards: Vec<Flashcard>, options: SessionOptions) -> Self {
        Self {
            api,
            session: StudySession::new(cards, options),
        }
    }

    /// Fetch a deck's cards and build an idle session over them.
    pub async fn load(api: Arc<RevisionClient>, deck_id: i64, options: SessionOptions) -> Result<Self> {
        let cards = api.list_flashcards(Some(deck_id), None).await?;
        tracing::debug!(deck_id, cards = cards.len(), mode = ?options.mode, "study session loaded");
        Ok(Self::new(api, cards, options))
    }

    pub fn session(&self) -> &StudySession {
        &self.session
    }

    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        self.session.start(Utc::now(), rng)?;
        Ok(())
    }

    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        self.session.restart(Utc::now(), rng)?;
        Ok(())
    }

    /// Self-graded answer for the current card.
    pub async fn answer(&mut self, is_correct: bool) -> Result<ReviewOutcome> {
        let answered = self.session.answer(is_correct, Utc::now())?;
        let synced = self.sync(answered.flashcard_id, answered.is_correct).await;
        Ok(ReviewOutcome { answered, synced })
    }

    /// Typed answer for the current card (write mode).
    pub async fn submit_written(&mut self, typed: &str) -> Result<ReviewOutcome> {
        let answered = self.session.submit_written(typed, Utc::now())?;
        let synced = self.sync(answered.flashcard_id, answered.is_correct).await;
        Ok(ReviewOutcome { answered, synced })
    }

    /// Select a match tile. Only a completed pair reaches the server.
    pub async fn select(&mut self, index: usize) -> Result<SelectOutcome> {
        let event = self.session.select(index, Utc::now())?;
        let synced = match &event {
            MatchEvent::Matched { flashcard_id, .. } => Some(self.sync(*flashcard_id, true).await),
            _ => None,
        };
        Ok(SelectOutcome { event, synced })
    }

    async fn sync(&mut self, flashcard_id: i64, success: bool) -> Result<Flashcard> {
        match self.api.toggle_learned(flashcard_id, success).await {
            Ok(record) => {
                self.session.apply_server_record(record.clone());
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(flashcard_id, error = %e, "review not saved, keeping local preview");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for StudyRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudyRunner")
            .field("base_url", &self.api.base_url())
            .field("phase", &self.session.phase())
            .finish()
    }
}

