//! Study session state machine.
//!
//! `Idle → Active → Finished`, with `Finished → Active` on restart. One
//! session drives a single review, write or match run over a working set of
//! flashcards fixed at start. Review outcomes are applied to the local copy as
//! previews; callers persist them through the server and feed the returned
//! record back with [`StudySession::apply_server_record`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::matching::{check_answer, AnswerCheck, DEFAULT_FUZZY_THRESHOLD};
use crate::scheduler::{is_due, ReviewScheduler};
use crate::types::{Flashcard, MatchingMode};

/// Kind of study session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
    /// Flip the card and self-grade.
    Review,
    /// Type the back text.
    Write,
    /// Pair terms with definitions on a board.
    Match,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Active,
    Finished,
}

/// Which side of a flashcard a match card shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardRole {
    Term,
    Definition,
}

/// One tile of the match board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCard {
    pub flashcard_id: i64,
    pub role: CardRole,
    pub text: String,
}

impl MatchCard {
    /// Same flashcard, opposite side.
    pub fn pairs_with(&self, other: &MatchCard) -> bool {
        self.flashcard_id == other.flashcard_id && self.role != other.role
    }
}

/// How the working set is built.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub mode: StudyMode,
    /// Keep only cards whose next review has passed.
    pub due_only: bool,
    pub shuffle: bool,
    /// Cap on the working set size.
    pub session_size: Option<usize>,
    pub matching_mode: MatchingMode,
    pub fuzzy_threshold: f64,
}

impl SessionOptions {
    pub fn new(mode: StudyMode) -> Self {
        Self {
            mode,
            due_only: false,
            shuffle: false,
            session_size: None,
            matching_mode: MatchingMode::default(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

/// Result of answering the current card.
#[derive(Debug, Clone)]
pub struct AnsweredCard {
    pub flashcard_id: i64,
    pub is_correct: bool,
    /// Local preview of the rescheduled card.
    pub preview: Flashcard,
    /// Present in write mode.
    pub check: Option<AnswerCheck>,
}

/// Result of selecting a match card.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    Selected { index: usize },
    Deselected { index: usize },
    Matched { flashcard_id: i64, preview: Flashcard },
    Mismatched { first: usize, second: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

/// In-memory state of one study run.
#[derive(Debug, Clone)]
pub struct StudySession {
    options: SessionOptions,
    scheduler: ReviewScheduler,
    source: Vec<Flashcard>,
    items: Vec<Flashcard>,
    board: Vec<MatchCard>,
    matched_pairs: HashSet<i64>,
    selected_index: Option<usize>,
    phase: SessionPhase,
    current_index: usize,
    correct_count: usize,
    total_reviewed: usize,
}

impl StudySession {
    pub fn new(cards: Vec<Flashcard>, options: SessionOptions) -> Self {
        Self {
            options,
            scheduler: ReviewScheduler::default(),
            source: cards,
            items: Vec::new(),
            board: Vec::new(),
            matched_pairs: HashSet::new(),
            selected_index: None,
            phase: SessionPhase::Idle,
            current_index: 0,
            correct_count: 0,
            total_reviewed: 0,
        }
    }

    pub fn with_scheduler(mut self, scheduler: ReviewScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn mode(&self) -> StudyMode {
        self.options.mode
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn items(&self) -> &[Flashcard] {
        &self.items
    }

    pub fn board(&self) -> &[MatchCard] {
        &self.board
    }

    pub fn matched_pairs(&self) -> &HashSet<i64> {
        &self.matched_pairs
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    pub fn total_reviewed(&self) -> usize {
        self.total_reviewed
    }

    /// Card under the cursor in review and write modes.
    pub fn current(&self) -> Option<&Flashcard> {
        if self.phase != SessionPhase::Active || self.options.mode == StudyMode::Match {
            return None;
        }
        self.items.get(self.current_index)
    }

    pub fn progress(&self) -> SessionProgress {
        let total = self.items.len();
        let answered = self.current_index.min(total);
        SessionProgress {
            total,
            answered,
            remaining: total - answered,
            is_complete: self.phase == SessionPhase::Finished,
        }
    }

    /// `Idle → Active`.
    pub fn start<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) -> Result<(), SessionError> {
        self.expect_phase(SessionPhase::Idle)?;
        self.load_working_set(now, rng);
        Ok(())
    }

    /// `Finished → Active` with a freshly drawn working set.
    pub fn restart<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) -> Result<(), SessionError> {
        self.expect_phase(SessionPhase::Finished)?;
        self.load_working_set(now, rng);
        Ok(())
    }

    fn load_working_set<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) {
        let mut items: Vec<Flashcard> = self
            .source
            .iter()
            .filter(|card| !self.options.due_only || is_due(card, now))
            .cloned()
            .collect();

        if self.options.shuffle {
            items.shuffle(rng);
        }
        if let Some(size) = self.options.session_size {
            items.truncate(size);
        }

        self.board.clear();
        if self.options.mode == StudyMode::Match {
            for card in &items {
                self.board.push(MatchCard {
                    flashcard_id: card.id,
                    role: CardRole::Term,
                    text: card.front_text.clone(),
                });
                self.board.push(MatchCard {
                    flashcard_id: card.id,
                    role: CardRole::Definition,
                    text: card.back_text.clone(),
                });
            }
            self.board.shuffle(rng);
        }

        self.items = items;
        self.matched_pairs.clear();
        self.selected_index = None;
        self.current_index = 0;
        self.correct_count = 0;
        self.total_reviewed = 0;
        self.phase = if self.items.is_empty() {
            SessionPhase::Finished
        } else {
            SessionPhase::Active
        };
    }

    /// Grade the current card (review mode, or write mode graded externally).
    pub fn answer(&mut self, is_correct: bool, now: DateTime<Utc>) -> Result<AnsweredCard, SessionError> {
        self.expect_phase(SessionPhase::Active)?;
        if self.options.mode == StudyMode::Match {
            return Err(SessionError::WrongMode {
                mode: self.options.mode,
            });
        }
        Ok(self.record_answer(is_correct, None, now))
    }

    /// Check typed text against the current card's back and grade it.
    pub fn submit_written(&mut self, typed: &str, now: DateTime<Utc>) -> Result<AnsweredCard, SessionError> {
        self.expect_phase(SessionPhase::Active)?;
        if self.options.mode != StudyMode::Write {
            return Err(SessionError::WrongMode {
                mode: self.options.mode,
            });
        }

        let expected = &self.items[self.current_index].back_text;
        let check = check_answer(
            typed,
            expected,
            self.options.matching_mode,
            self.options.fuzzy_threshold,
        );
        Ok(self.record_answer(check.is_correct, Some(check), now))
    }

    fn record_answer(&mut self, is_correct: bool, check: Option<AnswerCheck>, now: DateTime<Utc>) -> AnsweredCard {
        let card = &mut self.items[self.current_index];
        let preview = self.scheduler.schedule(card, is_correct, now);
        *card = preview.clone();

        self.total_reviewed += 1;
        if is_correct {
            self.correct_count += 1;
        }
        self.current_index += 1;
        if self.current_index >= self.items.len() {
            self.phase = SessionPhase::Finished;
        }

        AnsweredCard {
            flashcard_id: preview.id,
            is_correct,
            preview,
            check,
        }
    }

    /// Select a tile on the match board.
    ///
    /// The first pick is remembered; picking it again deselects it without
    /// scoring. A second, different pick is scored as a match or mismatch and
    /// clears the selection.
    pub fn select(&mut self, index: usize, now: DateTime<Utc>) -> Result<MatchEvent, SessionError> {
        self.expect_phase(SessionPhase::Active)?;
        if self.options.mode != StudyMode::Match {
            return Err(SessionError::WrongMode {
                mode: self.options.mode,
            });
        }
        let card = self.board.get(index).ok_or(SessionError::IndexOutOfRange {
            index,
            len: self.board.len(),
        })?;
        if self.matched_pairs.contains(&card.flashcard_id) {
            return Err(SessionError::AlreadyMatched { index });
        }

        let first = match self.selected_index.take() {
            None => {
                self.selected_index = Some(index);
                return Ok(MatchEvent::Selected { index });
            }
            Some(first) if first == index => return Ok(MatchEvent::Deselected { index }),
            Some(first) => first,
        };

        self.total_reviewed += 1;
        if !self.board[first].pairs_with(&self.board[index]) {
            return Ok(MatchEvent::Mismatched { first, second: index });
        }

        let flashcard_id = self.board[index].flashcard_id;
        let slot = self
            .items
            .iter()
            .position(|c| c.id == flashcard_id)
            .ok_or(SessionError::IndexOutOfRange {
                index,
                len: self.board.len(),
            })?;

        self.matched_pairs.insert(flashcard_id);
        self.correct_count += 1;
        self.current_index += 1;

        let preview = self.scheduler.schedule(&self.items[slot], true, now);
        self.items[slot] = preview.clone();

        if self.matched_pairs.len() == self.items.len() {
            self.phase = SessionPhase::Finished;
        }

        Ok(MatchEvent::Matched { flashcard_id, preview })
    }

    /// Replace the local copy of a card with the server's record.
    ///
    /// Returns false when the card is not part of this session.
    pub fn apply_server_record(&mut self, record: Flashcard) -> bool {
        let mut found = false;
        for card in self.source.iter_mut().chain(self.items.iter_mut()) {
            if card.id == record.id {
                *card = record.clone();
                found = true;
            }
        }
        found
    }

    fn expect_phase(&self, expected: SessionPhase) -> Result<(), SessionError> {
        if self.phase != expected {
            return Err(SessionError::InvalidPhase {
                phase: self.phase,
                expected,
            });
        }
        Ok(())
    }
}
