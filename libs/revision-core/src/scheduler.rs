//! Fixed-ladder review scheduler.
//!
//! A correct answer climbs one rung of a fixed delay ladder; an incorrect
//! answer drops the card back to the bottom. Reaching the mastery threshold
//! marks the card learned and parks it for a month.

use chrono::{DateTime, Duration, Utc};

use crate::types::Flashcard;

/// Review count at which a card is considered learned.
pub const MASTERY_THRESHOLD: u32 = 7;

/// Delays in days for correct reviews below mastery.
pub const REVIEW_LADDER_DAYS: [i64; 5] = [1, 3, 7, 14, 21];

/// Delay once a card is learned.
pub const MASTERED_INTERVAL_DAYS: i64 = 30;

/// Delay after an incorrect review.
pub const RELEARN_INTERVAL_DAYS: i64 = 1;

/// Scheduler with configurable ladder parameters.
#[derive(Debug, Clone)]
pub struct ReviewScheduler {
    pub mastery_threshold: u32,
    pub ladder_days: Vec<i64>,
    pub mastered_interval_days: i64,
    pub relearn_interval_days: i64,
}

impl Default for ReviewScheduler {
    fn default() -> Self {
        Self {
            mastery_threshold: MASTERY_THRESHOLD,
            ladder_days: REVIEW_LADDER_DAYS.to_vec(),
            mastered_interval_days: MASTERED_INTERVAL_DAYS,
            relearn_interval_days: RELEARN_INTERVAL_DAYS,
        }
    }
}

impl ReviewScheduler {
    /// Apply one review outcome and return the rescheduled card.
    pub fn schedule(&self, card: &Flashcard, is_correct: bool, now: DateTime<Utc>) -> Flashcard {
        let mut next = card.clone();
        next.last_reviewed = Some(now);

        if !is_correct {
            next.review_count = 0;
            next.learned = false;
            next.next_review = now + Duration::days(self.relearn_interval_days);
            return next;
        }

        let previous = card.review_count;
        next.review_count = previous.saturating_add(1);

        if next.review_count >= self.mastery_threshold {
            next.learned = true;
            next.next_review = now + Duration::days(self.mastered_interval_days);
        } else {
            next.learned = false;
            next.next_review = now + Duration::days(self.ladder_delay(previous));
        }

        next
    }

    /// Delay for a correct review given the count before the review.
    pub fn ladder_delay(&self, previous_count: u32) -> i64 {
        if self.ladder_days.is_empty() {
            return self.relearn_interval_days;
        }
        let rung = (previous_count as usize).min(self.ladder_days.len() - 1);
        self.ladder_days[rung]
    }
}

/// Schedule with the canonical ladder.
pub fn schedule(card: &Flashcard, is_correct: bool, now: DateTime<Utc>) -> Flashcard {
    ReviewScheduler::default().schedule(card, is_correct, now)
}

/// What the card would look like after the review.
///
/// Display-only: the server applies the same rule and its returned record
/// replaces this value after the round-trip.
pub fn preview(card: &Flashcard, is_correct: bool, now: DateTime<Utc>) -> Flashcard {
    schedule(card, is_correct, now)
}

/// A card is due once its next review time has passed.
pub fn is_due(card: &Flashcard, now: DateTime<Utc>) -> bool {
    card.next_review <= now
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn card_with_count(review_count: u32) -> Flashcard {
        let mut card = Flashcard::new(1, 1, "der Hund", "the dog", now());
        card.review_count = review_count;
        card
    }

    #[test]
    fn correct_review_delays_follow_ladder() {
        let expected = [(0, 1), (1, 3), (2, 7), (3, 14), (4, 21), (5, 21)];
        for (count, days) in expected {
            let result = schedule(&card_with_count(count), true, now());
            assert_eq!(result.review_count, count + 1);
            assert_eq!(result.next_review - now(), Duration::days(days), "count {count}");
            assert!(!result.learned);
        }
    }

    #[test]
    fn mastery_parks_card_for_thirty_days() {
        let result = schedule(&card_with_count(6), true, now());
        assert_eq!(result.review_count, 7);
        assert!(result.learned);
        assert_eq!(result.next_review - now(), Duration::days(30));
    }

    #[test]
    fn repeated_correct_reviews_reach_mastery_and_stay() {
        let mut card = card_with_count(0);
        for _ in 0..7 {
            card = schedule(&card, true, now());
        }
        assert!(card.learned);
        assert!(card.review_count >= MASTERY_THRESHOLD);

        card = schedule(&card, true, now());
        assert!(card.learned);
        assert_eq!(card.review_count, 8);
    }

    #[test]
    fn incorrect_review_resets_everything() {
        let mut card = card_with_count(9);
        card.learned = true;
        let result = schedule(&card, false, now());
        assert_eq!(result.review_count, 0);
        assert!(!result.learned);
        assert_eq!(result.next_review - now(), Duration::days(1));
    }

    #[test]
    fn last_reviewed_always_set() {
        let card = card_with_count(2);
        assert_eq!(schedule(&card, true, now()).last_reviewed, Some(now()));
        assert_eq!(schedule(&card, false, now()).last_reviewed, Some(now()));
    }

    #[test]
    fn learned_implies_threshold_for_any_outcome_sequence() {
        let outcomes = [true, true, false, true, true, true, true, true, true, true, false, true];
        let mut card = card_with_count(0);
        for outcome in outcomes {
            card = schedule(&card, outcome, now());
            if card.learned {
                assert!(card.review_count >= MASTERY_THRESHOLD);
            }
        }
    }

    #[test]
    fn preview_does_not_touch_input() {
        let card = card_with_count(3);
        let shown = preview(&card, true, now());
        assert_eq!(card.review_count, 3);
        assert_eq!(shown.review_count, 4);
    }

    #[test]
    fn due_check_is_inclusive() {
        let card = card_with_count(0);
        assert!(is_due(&card, now()));
        assert!(!is_due(&card, now() - Duration::seconds(1)));
    }

    #[test]
    fn custom_ladder_clamps_to_top_rung() {
        let scheduler = ReviewScheduler {
            ladder_days: vec![2, 5],
            ..Default::default()
        };
        assert_eq!(scheduler.ladder_delay(0), 2);
        assert_eq!(scheduler.ladder_delay(1), 5);
        assert_eq!(scheduler.ladder_delay(6), 5);
    }
}
