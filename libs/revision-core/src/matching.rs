//! Answer checking for write-mode sessions.

use serde::{Deserialize, Serialize};

use crate::types::MatchingMode;

/// Default similarity needed for a fuzzy match.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

/// Outcome of checking a typed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerCheck {
    pub is_correct: bool,
    /// Similarity between 0.0 and 1.0.
    pub similarity: f64,
    pub matching_mode: MatchingMode,
}

/// Check a typed answer against the expected back text.
pub fn check_answer(typed: &str, expected: &str, mode: MatchingMode, threshold: f64) -> AnswerCheck {
    let typed = collapse_whitespace(typed);
    let expected = collapse_whitespace(expected);

    let similarity = match mode {
        MatchingMode::Exact => exact_score(&typed, &expected),
        MatchingMode::CaseInsensitive => exact_score(&typed.to_lowercase(), &expected.to_lowercase()),
        MatchingMode::Fuzzy => normalized_similarity(&typed.to_lowercase(), &expected.to_lowercase()),
    };

    let is_correct = match mode {
        MatchingMode::Fuzzy => similarity >= threshold,
        _ => similarity == 1.0,
    };

    AnswerCheck {
        is_correct,
        similarity,
        matching_mode: mode,
    }
}

fn exact_score(a: &str, b: &str) -> f64 {
    if a == b {
        1.0
    } else {
        0.0
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Edit distance counted in chars.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() || b.is_empty() {
        return a.len().max(b.len());
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let substitution = diagonal + usize::from(ca != cb);
            row[j + 1] = substitution.min(above + 1).min(row[j] + 1);
            diagonal = above;
        }
    }

    row[b.len()]
}

/// 1.0 for identical strings, falling towards 0.0 with edit distance.
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(a, b) as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("haus", ""), 4);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("größe", "grösse"), 2);
    }

    #[test]
    fn exact_mode_is_case_sensitive() {
        assert!(check_answer("the dog", "the dog", MatchingMode::Exact, 0.8).is_correct);
        assert!(!check_answer("The dog", "the dog", MatchingMode::Exact, 0.8).is_correct);
    }

    #[test]
    fn case_insensitive_ignores_case_and_spacing() {
        let check = check_answer("  THE   Dog ", "the dog", MatchingMode::CaseInsensitive, 0.8);
        assert!(check.is_correct);
        assert_eq!(check.similarity, 1.0);
    }

    #[test]
    fn fuzzy_accepts_small_typos() {
        assert!(check_answer("the dgo", "the dog", MatchingMode::Fuzzy, 0.7).is_correct);
        assert!(!check_answer("a cat", "the dog", MatchingMode::Fuzzy, 0.7).is_correct);
    }

    #[test]
    fn empty_strings_are_identical() {
        assert_eq!(normalized_similarity("", ""), 1.0);
    }
}
