//! Study sessions reconciled with server records.

use std::sync::Arc;

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use revision_client::{RevisionClient, StudyRunner};
use revision_core::csrf::TokenSources;
use revision_core::{
    CardRole, Flashcard, MatchEvent, SessionOptions, SessionPhase, StudyMode,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(uri: &str) -> Arc<RevisionClient> {
    Arc::new(RevisionClient::new(uri).with_token_sources(&TokenSources {
        form_field: Some("tok".to_string()),
        ..Default::default()
    }))
}

fn deck() -> Vec<Flashcard> {
    let now = Utc::now() - Duration::hours(1);
    vec![
        Flashcard::new(1, 10, "la casa", "the house", now),
        Flashcard::new(2, 10, "el perro", "the dog", now),
        Flashcard::new(3, 10, "el gato", "the cat", now),
    ]
}

/// What the server answers for a correct review of `card`.
fn server_record(card: &Flashcard) -> Flashcard {
    let mut record = card.clone();
    record.review_count = card.review_count + 1;
    record.last_reviewed = Some(Utc::now());
    record.next_review = Utc::now() + Duration::days(1);
    record
}

async fn mount_toggle(server: &MockServer, card: &Flashcard, record: &Flashcard) {
    Mock::given(method("PATCH"))
        .and(path(format!("/api/v1/revision/flashcards/{}/toggle_learned/", card.id)))
        .and(body_json(json!({ "success": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(record))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn write_session_applies_server_records() {
    let server = MockServer::start().await;
    let cards = deck();
    let records: Vec<Flashcard> = cards.iter().map(server_record).collect();
    for (card, record) in cards.iter().zip(&records) {
        mount_toggle(&server, card, record).await;
    }
    Mock::given(method("GET"))
        .and(path("/api/v1/revision/flashcards/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&cards))
        .mount(&server)
        .await;

    let mut runner = StudyRunner::load(api(&server.uri()), 10, SessionOptions::new(StudyMode::Write))
        .await
        .unwrap();
    assert_eq!(runner.session().phase(), SessionPhase::Idle);

    runner.start(&mut StdRng::seed_from_u64(7)).unwrap();
    for answer in ["the house", "THE DOG", " the cat "] {
        let outcome = runner.submit_written(answer).await.unwrap();
        assert!(outcome.answered.is_correct);
        assert!(outcome.synced.is_ok());
    }

    let session = runner.session();
    assert_eq!(session.phase(), SessionPhase::Finished);
    assert_eq!(session.correct_count(), 3);
    assert_eq!(session.total_reviewed(), 3);
    assert_eq!(session.items(), records.as_slice());
}

#[tokio::test]
async fn failed_save_keeps_local_preview() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut runner = StudyRunner::new(api(&server.uri()), deck(), SessionOptions::new(StudyMode::Review));
    runner.start(&mut StdRng::seed_from_u64(1)).unwrap();

    let outcome = runner.answer(true).await.unwrap();
    assert!(outcome.synced.is_err());
    assert_eq!(runner.session().current_index(), 1);
    assert_eq!(runner.session().items()[0].review_count, 1);
}

#[tokio::test]
async fn answering_before_start_is_a_session_error() {
    let mut runner = StudyRunner::new(api("http://127.0.0.1:9"), deck(), SessionOptions::new(StudyMode::Review));
    let err = runner.answer(true).await.unwrap_err();
    assert!(matches!(err, revision_client::ClientError::Session(_)));
}

#[tokio::test]
async fn only_completed_pairs_reach_the_server() {
    let server = MockServer::start().await;
    let cards = deck();
    let record = server_record(&cards[0]);
    mount_toggle(&server, &cards[0], &record).await;
    Mock::given(method("PATCH"))
        .and(path_regex(r"^/api/v1/revision/flashcards/[23]/toggle_learned/$"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mut runner = StudyRunner::new(api(&server.uri()), cards, SessionOptions::new(StudyMode::Match));
    runner.start(&mut StdRng::seed_from_u64(42)).unwrap();

    let tile = |runner: &StudyRunner, id: i64, role: CardRole| {
        runner
            .session()
            .board()
            .iter()
            .position(|c| c.flashcard_id == id && c.role == role)
            .unwrap()
    };

    let term_one = tile(&runner, 1, CardRole::Term);
    let def_two = tile(&runner, 2, CardRole::Definition);
    runner.select(term_one).await.unwrap();
    let mismatch = runner.select(def_two).await.unwrap();
    assert!(matches!(mismatch.event, MatchEvent::Mismatched { .. }));
    assert!(mismatch.synced.is_none());

    let def_one = tile(&runner, 1, CardRole::Definition);
    runner.select(term_one).await.unwrap();
    let matched = runner.select(def_one).await.unwrap();
    assert!(matches!(matched.event, MatchEvent::Matched { flashcard_id: 1, .. }));
    assert_eq!(matched.synced.unwrap().unwrap(), record);

    let session = runner.session();
    assert_eq!(session.correct_count(), 1);
    assert_eq!(session.total_reviewed(), 2);
    assert!(session.items().contains(&record));
}
