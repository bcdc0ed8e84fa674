pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use revision_core::ReviewScheduler;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub scheduler: Arc<ReviewScheduler>,
    pub csrf_enforce: bool,
}

impl AppState {
    pub fn new(db: Database, csrf_enforce: bool) -> Self {
        Self {
            db: Arc::new(db),
            scheduler: Arc::new(ReviewScheduler::default()),
            csrf_enforce,
        }
    }
}

/// Build the full router for `state`.
pub fn app(state: AppState) -> Router {
    let revision_routes = Router::new()
        .route(
            "/decks/",
            get(routes::decks::list).post(routes::decks::create),
        )
        .route("/decks/:id/", axum::routing::delete(routes::decks::delete))
        .route("/decks/:id/stats/", get(routes::decks::stats))
        .route(
            "/flashcards/",
            get(routes::flashcards::list).post(routes::flashcards::create),
        )
        .route(
            "/flashcards/due_for_review/",
            get(routes::flashcards::due_for_review),
        )
        .route(
            "/flashcards/:id/",
            get(routes::flashcards::get).delete(routes::flashcards::delete),
        )
        .route(
            "/flashcards/:id/toggle_learned/",
            patch(routes::flashcards::toggle_learned),
        );

    let progress_routes = Router::new()
        .route("/cascade/", post(routes::progress::cascade))
        .route("/:level/", get(routes::progress::children))
        .route(
            "/:level/:id/",
            get(routes::progress::get).put(routes::progress::put),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/csrf/", get(routes::csrf::issue_token))
        .nest("/api/v1/revision", revision_routes)
        .nest("/api/v1/progress", progress_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            routes::csrf::csrf_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url, config.max_connections).await?;

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    if !config.csrf_enforce {
        tracing::warn!("CSRF enforcement disabled");
    }

    let state = AppState::new(db, config.csrf_enforce);
    let app = app(state);

    let addr = config.bind_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    /// State whose pool never connects unless a handler touches it.
    pub fn lazy_state(csrf_enforce: bool) -> AppState {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/revision_unused")
            .unwrap();
        AppState::new(Database::from_pool(pool), csrf_enforce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_is_public() {
        let response = app(test_support::lazy_state(true))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unsafe_request_without_token_is_rejected_before_the_handler() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/revision/decks/")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"Spanish"}"#))
            .unwrap();
        let response = app(test_support::lazy_state(true)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_without_database() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/revision/flashcards/")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"deck_id":1,"front_text":"  ","back_text":"house"}"#))
            .unwrap();
        let response = app(test_support::lazy_state(false)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn percentage_over_100_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/progress/cascade/")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"content_id":1,"lesson_id":2,"percentage":150,"completed":false}"#,
            ))
            .unwrap();
        let response = app(test_support::lazy_state(false)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn completed_below_100_is_rejected() {
        for (method, uri, body) in [
            (
                "POST",
                "/api/v1/progress/cascade/",
                r#"{"content_id":1,"lesson_id":2,"unit_id":3,"percentage":40,"completed":true}"#,
            ),
            (
                "PUT",
                "/api/v1/progress/content/1/",
                r#"{"parent_id":2,"completion_percentage":40,"is_completed":true}"#,
            ),
        ] {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap();
            let response = app(test_support::lazy_state(false)).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{method} {uri}");
        }
    }
}
