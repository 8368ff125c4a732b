//! CSRF protection
//!
//! Each session owns one token, handed out by `GET /api/csrf-token`.
//! Mutating API requests must echo it in the `x-csrf-token` header.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower_sessions::Session;
use uuid::Uuid;

use crate::access::is_mutating;

pub const CSRF_HEADER: &str = "x-csrf-token";
pub const SESSION_CSRF_KEY: &str = "csrf_token";

/// Return the session token, creating it on first use
pub async fn issue_token(session: &Session) -> anyhow::Result<String> {
    if let Some(token) = session.get::<String>(SESSION_CSRF_KEY).await? {
        return Ok(token);
    }
    let token = Uuid::new_v4().simple().to_string();
    session.insert(SESSION_CSRF_KEY, &token).await?;
    Ok(token)
}

/// Compare without short-circuiting on the first differing byte
pub fn verify(expected: Option<&str>, provided: Option<&str>) -> bool {
    match (expected, provided) {
        (Some(expected), Some(provided)) if !expected.is_empty() => {
            expected.len() == provided.len()
                && expected
                    .bytes()
                    .zip(provided.bytes())
                    .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                    == 0
        }
        _ => false,
    }
}

/// CSRF middleware
pub async fn csrf_layer(session: Session, request: Request<Body>, next: Next) -> Response {
    if !(is_mutating(request.method()) && request.uri().path().starts_with("/api/")) {
        return next.run(request).await;
    }

    let expected: Option<String> = session.get(SESSION_CSRF_KEY).await.unwrap_or(None);
    let provided = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok());

    if verify(expected.as_deref(), provided) {
        next.run(request).await
    } else {
        tracing::warn!(
            "Rejected {} {} without a valid CSRF token",
            request.method(),
            request.uri().path()
        );
        (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "invalid_csrf_token"})),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::header,
        middleware::from_fn,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    #[test]
    fn test_verify() {
        assert!(verify(Some("abc123"), Some("abc123")));
        assert!(!verify(Some("abc123"), Some("abc124")));
        assert!(!verify(Some("abc123"), Some("abc")));
        assert!(!verify(Some("abc123"), None));
        assert!(!verify(None, Some("abc123")));
        assert!(!verify(Some(""), Some("")));
    }

    fn app() -> Router {
        Router::new()
            .route(
                "/api/csrf-token",
                get(|session: Session| async move { issue_token(&session).await.unwrap() }),
            )
            .route("/api/surat-masuk", post(|| async { "created" }).get(|| async { "list" }))
            .layer(from_fn(csrf_layer))
            .layer(SessionManagerLayer::new(MemoryStore::default()))
    }

    #[tokio::test]
    async fn test_reads_need_no_token() {
        let res = app()
            .oneshot(Request::get("/api/surat-masuk").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_mutation_requires_session_token() {
        let app = app();

        let res = app
            .clone()
            .oneshot(Request::post("/api/surat-masuk").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = app
            .clone()
            .oneshot(Request::get("/api/csrf-token").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = res.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let bytes = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        let token = String::from_utf8(bytes.to_vec()).unwrap();

        let res = app
            .clone()
            .oneshot(
                Request::post("/api/surat-masuk")
                    .header(header::COOKIE, &cookie)
                    .header(CSRF_HEADER, "wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = app
            .oneshot(
                Request::post("/api/surat-masuk")
                    .header(header::COOKIE, &cookie)
                    .header(CSRF_HEADER, &token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
