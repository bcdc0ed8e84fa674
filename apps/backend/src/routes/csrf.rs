//! CSRF middleware and token endpoint

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, Method, Request,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use revision_core::csrf::{cookie_value, CSRF_COOKIE_NAME, CSRF_HEADER_NAME};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::CsrfTokenResponse;
use crate::AppState;

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

fn request_cookie<'a>(headers: &'a HeaderMap) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find_map(|h| cookie_value(h, CSRF_COOKIE_NAME))
}

/// Double-submit check: unsafe methods must echo the `csrftoken` cookie
/// in the `X-CSRFToken` header.
pub async fn csrf_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response> {
    if !state.csrf_enforce || is_safe(request.method()) {
        return Ok(next.run(request).await);
    }

    let headers = request.headers();
    let cookie = request_cookie(headers)
        .ok_or_else(|| ApiError::Forbidden("CSRF cookie not set".to_string()))?;

    let header = headers
        .get(CSRF_HEADER_NAME)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ApiError::Forbidden("CSRF token missing".to_string()))?;

    if header != cookie {
        tracing::warn!(path = %request.uri().path(), "CSRF token mismatch");
        return Err(ApiError::Forbidden("CSRF token incorrect".to_string()));
    }

    Ok(next.run(request).await)
}

/// GET /api/v1/csrf/
///
/// Returns the caller's token, issuing a new cookie when none is present.
pub async fn issue_token(headers: HeaderMap) -> Result<Response> {
    if let Some(existing) = request_cookie(&headers) {
        return Ok(Json(CsrfTokenResponse {
            csrf_token: existing.to_string(),
        })
        .into_response());
    }

    let token = Uuid::new_v4().simple().to_string();
    let cookie = HeaderValue::from_str(&format!(
        "{CSRF_COOKIE_NAME}={token}; Path=/; SameSite=Lax"
    ))
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut response = Json(CsrfTokenResponse { csrf_token: token }).into_response();
    response.headers_mut().insert(SET_COOKIE, cookie);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::lazy_state;
    use axum::{
        http::StatusCode,
        middleware,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    fn app(enforce: bool) -> Router {
        let state = lazy_state(enforce);
        Router::new()
            .route("/api/v1/csrf/", get(issue_token))
            .route("/echo/", post(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(state.clone(), csrf_middleware))
            .with_state(state)
    }

    fn post_with(cookie: Option<&str>, header: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::POST).uri("/echo/");
        if let Some(c) = cookie {
            builder = builder.header(COOKIE, c);
        }
        if let Some(h) = header {
            builder = builder.header(CSRF_HEADER_NAME, h);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn matching_token_passes() {
        let response = app(true)
            .oneshot(post_with(Some("csrftoken=abc123"), Some("abc123")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_header_is_forbidden() {
        let response = app(true)
            .oneshot(post_with(Some("csrftoken=abc123"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn mismatched_token_is_forbidden() {
        let response = app(true)
            .oneshot(post_with(Some("sessionid=x; csrftoken=abc123"), Some("zzz")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn enforcement_can_be_disabled() {
        let response = app(false).oneshot(post_with(None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn safe_methods_skip_the_check() {
        let request = Request::builder()
            .uri("/api/v1/csrf/")
            .body(Body::empty())
            .unwrap();
        let response = app(true).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("csrftoken="));
    }

    #[tokio::test]
    async fn existing_cookie_is_reused() {
        let request = Request::builder()
            .uri("/api/v1/csrf/")
            .header(COOKIE, "csrftoken=keepme")
            .body(Body::empty())
            .unwrap();
        let response = app(true).oneshot(request).await.unwrap();
        assert!(response.headers().get(SET_COOKIE).is_none());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: CsrfTokenResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.csrf_token, "keepme");
    }
}
