//! Test fixtures and factory functions for creating test data.

use serde_json::json;
use uuid::Uuid;

/// An id unlikely to collide with rows left by other tests.
pub fn unique_id() -> i64 {
    (Uuid::new_v4().as_u64_pair().0 >> 2) as i64
}

pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

pub fn flashcard_request(deck_id: i64, front: &str, back: &str) -> serde_json::Value {
    json!({ "deck_id": deck_id, "front_text": front, "back_text": back })
}

pub fn toggle_request(success: bool) -> serde_json::Value {
    json!({ "success": success })
}

pub fn cascade_request(
    content_id: i64,
    lesson_id: i64,
    unit_id: Option<i64>,
    percentage: u32,
    completed: bool,
) -> serde_json::Value {
    json!({
        "content_id": content_id,
        "lesson_id": lesson_id,
        "unit_id": unit_id,
        "percentage": percentage,
        "completed": completed,
    })
}

pub fn progress_write(parent_id: Option<i64>, percentage: u32, completed: bool) -> serde_json::Value {
    json!({
        "parent_id": parent_id,
        "completion_percentage": percentage,
        "is_completed": completed,
    })
}
