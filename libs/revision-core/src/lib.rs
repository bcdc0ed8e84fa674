//! Core revision library shared by the backend and client.
//!
//! Provides:
//! - Fixed-ladder review scheduling for flashcards
//! - Content → lesson → unit progress cascade over an injected store
//! - Study / write / match session state machine
//! - Typed-answer checking (Levenshtein similarity)
//! - CSRF cookie/header conventions
//! - Typed cache interface replacing ad hoc local-storage keys

pub mod cache;
pub mod csrf;
pub mod error;
pub mod matching;
pub mod progress;
pub mod scheduler;
pub mod session;
pub mod types;

pub use cache::{CacheKey, CacheStore, MemoryCache};
pub use error::{CoreError, Result, SessionError, ValidationError};
pub use matching::{check_answer, levenshtein_distance, normalized_similarity, AnswerCheck};
pub use progress::{
    aggregate, update_progress_cascade, Aggregate, CascadeReport, LevelOutcome,
    MemoryProgressStore, ProgressStore,
};
pub use scheduler::{
    is_due, preview, schedule, ReviewScheduler, MASTERED_INTERVAL_DAYS, MASTERY_THRESHOLD,
    REVIEW_LADDER_DAYS,
};
pub use session::{
    AnsweredCard, CardRole, MatchCard, MatchEvent, SessionOptions, SessionPhase, SessionProgress,
    StudyMode, StudySession,
};
pub use types::{
    check_completion, Deck, DeckDraft, Flashcard, FlashcardDraft, MatchingMode, ProgressItem, ProgressLevel,
    ProgressUpdate,
};
