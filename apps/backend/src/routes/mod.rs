pub mod csrf;
pub mod decks;
pub mod flashcards;
pub mod progress;
