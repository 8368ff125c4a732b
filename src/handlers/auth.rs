//! Authentication handlers
//!
//! Implements login, logout, current user and CSRF token endpoints

use axum::{extract::State, response::Json, Extension};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::access::Role;
use crate::entity::log_aktivitas::{Aksi, Hasil};
use crate::entity::user;
use crate::error::{AppError, AppResult};
use crate::handlers::activity::service::{log_activity, log_success};
use crate::middleware::auth::{CurrentUser, SESSION_TIMESTAMP_KEY, SESSION_USER_KEY};
use crate::middleware::csrf;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Session user as seen by the frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<CurrentUser> for SessionUser {
    fn from(u: CurrentUser) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

fn session_error(e: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("session error: {}", e))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<SessionUser>> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("email dan password wajib diisi".into()));
    }

    let db_user = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?;

    let Some(db_user) = db_user else {
        tracing::warn!("Login failed: user not found - {}", email);
        log_activity(&email, Aksi::Login, "user tidak ditemukan", Hasil::Gagal);
        return Err(AppError::BadRequest("email atau password salah".into()));
    };

    if !bcrypt::verify(&req.password, &db_user.password).unwrap_or(false) {
        tracing::warn!("Login failed: wrong password - {}", email);
        log_activity(&email, Aksi::Login, "password salah", Hasil::Gagal);
        return Err(AppError::BadRequest("email atau password salah".into()));
    }

    session.cycle_id().await.map_err(session_error)?;
    session
        .insert(SESSION_USER_KEY, db_user.id)
        .await
        .map_err(session_error)?;
    if let Err(e) = session
        .insert(SESSION_TIMESTAMP_KEY, chrono::Utc::now().timestamp())
        .await
    {
        tracing::error!("Failed to save session timestamp: {}", e);
    }

    tracing::info!("User logged in: {}", email);
    log_success(&email, Aksi::Login, "");

    Ok(Json(SessionUser::from(CurrentUser::from(db_user))))
}

/// POST /api/logout
pub async fn logout(
    session: Session,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<()>>> {
    session.flush().await.map_err(session_error)?;
    log_success(&current_user.email, Aksi::Logout, "");
    Ok(Json(ApiResponse::success_msg("logout berhasil")))
}

/// GET /api/me
pub async fn me(Extension(user): Extension<CurrentUser>) -> Json<SessionUser> {
    Json(SessionUser::from(user))
}

/// GET /api/csrf-token
pub async fn csrf_token(session: Session) -> AppResult<Json<CsrfTokenResponse>> {
    let csrf_token = csrf::issue_token(&session).await?;
    Ok(Json(CsrfTokenResponse { csrf_token }))
}
