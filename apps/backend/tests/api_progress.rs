//! Progress API tests.
//!
//! These tests require a running PostgreSQL database.

mod common;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use common::{fixtures, with_csrf, TestContext};
use revision_backend::models::{CascadeReport, ProgressItem, ProgressLevel};

#[tokio::test]
#[ignore = "requires database"]
async fn test_cascade_averages_incomplete_lesson() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let lesson = fixtures::unique_id();
    let (a, b, c) = (fixtures::unique_id(), fixtures::unique_id(), fixtures::unique_id());

    for (id, pct, done) in [(a, 100, true), (b, 50, false)] {
        with_csrf(server.put(&format!("/api/v1/progress/content/{id}/")))
            .json(&fixtures::progress_write(Some(lesson), pct, done))
            .await
            .assert_status_ok();
    }

    let response = with_csrf(server.post("/api/v1/progress/cascade/"))
        .json(&fixtures::cascade_request(c, lesson, None, 0, false))
        .await;
    response.assert_status_ok();
    let report: CascadeReport = response.json();

    let lesson_item = report.lesson.item().unwrap();
    assert_eq!(lesson_item.completion_percentage, 50);
    assert!(!lesson_item.is_completed);

    let stored: ProgressItem = server
        .get(&format!("/api/v1/progress/lesson/{lesson}/"))
        .await
        .json();
    assert_eq!(stored.completion_percentage, 50);

    ctx.cleanup_progress(ProgressLevel::Content, &[a, b, c]).await;
    ctx.cleanup_progress(ProgressLevel::Lesson, &[lesson]).await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_cascade_completes_unit_when_everything_is_done() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let (unit, lesson, content) = (fixtures::unique_id(), fixtures::unique_id(), fixtures::unique_id());

    let report: CascadeReport = with_csrf(server.post("/api/v1/progress/cascade/"))
        .json(&fixtures::cascade_request(content, lesson, Some(unit), 100, true))
        .await
        .json();

    assert!(report.error.is_none());
    assert_eq!(report.lesson.item().unwrap().completion_percentage, 100);
    assert!(report.unit.item().unwrap().is_completed);

    let children: Vec<ProgressItem> = server
        .get("/api/v1/progress/content/")
        .add_query_param("parent", lesson)
        .await
        .json();
    assert_eq!(children, vec![ProgressItem::new(content, Some(lesson), 100, true)]);

    ctx.cleanup_progress(ProgressLevel::Content, &[content]).await;
    ctx.cleanup_progress(ProgressLevel::Lesson, &[lesson]).await;
    ctx.cleanup_progress(ProgressLevel::Unit, &[unit]).await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_cascade_rejects_percentage_over_100() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    with_csrf(server.post("/api/v1/progress/cascade/"))
        .json(&fixtures::cascade_request(1, 2, None, 101, false))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_unknown_level_is_not_found() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    server
        .get("/api/v1/progress/course/1/")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
