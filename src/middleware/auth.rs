//! Authentication middleware
//!
//! Resolves the session user and applies the role gate to every request

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use serde_json::json;
use tower_sessions::Session;

use crate::access::{self, Access, GateDecision, Role, DASHBOARD_PAGE, LOGIN_PAGE};
use crate::entity::user;
use crate::state::AppState;

/// Session key for storing the user id
pub const SESSION_USER_KEY: &str = "user_id";
pub const SESSION_TIMESTAMP_KEY: &str = "timestamp";

/// Extension to store current user in request
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<user::Model> for CurrentUser {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
        }
    }
}

/// Look up the user behind the session, if any
async fn session_user(db: &DatabaseConnection, session: &Session) -> Result<Option<CurrentUser>, DbErr> {
    let user_id: Option<i64> = session.get(SESSION_USER_KEY).await.unwrap_or(None);
    let Some(user_id) = user_id else {
        return Ok(None);
    };

    let found = user::Entity::find_by_id(user_id).one(db).await?;
    if found.is_none() {
        tracing::warn!("Session refers to missing user id {}", user_id);
    }
    Ok(found.map(CurrentUser::from))
}

/// Authentication middleware
pub async fn auth_layer(
    State(state): State<AppState>,
    session: Session,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let required = access::required_access(request.method(), &path);

    if required == Access::Public {
        // Known users stay identifiable on public paths; nobody is turned away
        match session_user(&state.db, &session).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(user);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session lookup failed on public path {}: {}", path, e),
        }
        return next.run(request).await;
    }

    let current = match session_user(&state.db, &session).await {
        Ok(current) => current,
        Err(e) => {
            tracing::error!("Database error during auth: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal error"})),
            )
                .into_response();
        }
    };

    match access::gate(current.as_ref().map(|u| u.role), required) {
        GateDecision::Allow => {
            if let Some(user) = current {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
        GateDecision::Login => deny(&path, StatusCode::UNAUTHORIZED, "unauthorized", LOGIN_PAGE),
        GateDecision::Dashboard => {
            tracing::debug!("Non-admin session denied: {}", path);
            deny(&path, StatusCode::FORBIDDEN, "forbidden", DASHBOARD_PAGE)
        }
    }
}

/// JSON error for the API, redirect for pages
fn deny(path: &str, status: StatusCode, error: &str, page: &str) -> Response {
    if path.starts_with("/api/") {
        (status, Json(json!({ "error": error }))).into_response()
    } else {
        Redirect::to(page).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        http::header,
        middleware::from_fn_with_state,
        routing::{get, post},
        Extension, Router,
    };
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    fn user(role: Role) -> user::Model {
        user::Model {
            id: 7,
            name: "Rina".into(),
            email: "rina@dprd.go.id".into(),
            password: String::new(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn app(db: DatabaseConnection) -> Router {
        let state = AppState::new(db, Config::default());
        Router::new()
            .route("/dashboard", get(|| async { "dashboard" }))
            .route("/users", get(|| async { "users page" }))
            .route("/api/users", get(|| async { "users" }))
            .route("/api/surat-masuk", get(|| async { "list" }))
            .route(
                "/api/csrf-token",
                get(|current: Option<Extension<CurrentUser>>| async move {
                    current.map(|Extension(u)| u.email).unwrap_or_else(|| "tamu".into())
                }),
            )
            // Page paths under /login are public; used here to open a session
            .route(
                "/login",
                post(|session: Session| async move {
                    session.insert(SESSION_USER_KEY, 7_i64).await.unwrap();
                    "ok"
                }),
            )
            .layer(from_fn_with_state(state.clone(), auth_layer))
            .layer(SessionManagerLayer::new(MemoryStore::default()))
            .with_state(state)
    }

    fn get_req(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn login(app: &Router) -> String {
        let res = app
            .clone()
            .oneshot(Request::post("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_page_without_session_redirects_to_login() {
        let app = app(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let res = app.oneshot(get_req("/dashboard", None)).await.unwrap();
        assert!(res.status().is_redirection());
        assert_eq!(res.headers()[header::LOCATION], LOGIN_PAGE);
    }

    #[tokio::test]
    async fn test_api_without_session_is_unauthorized() {
        let app = app(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let res = app.oneshot(get_req("/api/surat-masuk", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_member_is_sent_to_dashboard() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user(Role::Member)], vec![user(Role::Member)]])
            .into_connection();
        let app = app(db);
        let cookie = login(&app).await;

        let res = app.clone().oneshot(get_req("/users", Some(&cookie))).await.unwrap();
        assert!(res.status().is_redirection());
        assert_eq!(res.headers()[header::LOCATION], DASHBOARD_PAGE);

        let res = app.oneshot(get_req("/api/users", Some(&cookie))).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_passes() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user(Role::Admin)]])
            .into_connection();
        let app = app(db);
        let cookie = login(&app).await;

        let res = app.oneshot(get_req("/api/users", Some(&cookie))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    async fn body_text(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_public_path_sees_signed_in_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user(Role::Admin)]])
            .into_connection();
        let app = app(db);
        let cookie = login(&app).await;

        let res = app.clone().oneshot(get_req("/api/csrf-token", Some(&cookie))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_text(res).await, "rina@dprd.go.id");

        let res = app.oneshot(get_req("/api/csrf-token", None)).await.unwrap();
        assert_eq!(body_text(res).await, "tamu");
    }
}
