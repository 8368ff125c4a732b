use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tower_sessions::{MemoryStore, SessionManagerLayer};

use crate::handlers;
use crate::middleware::{auth_layer, csrf_layer};
use crate::state::AppState;

pub mod health;

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: true,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: false,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn success_msg(message: impl Into<String>) -> Self {
        Self {
            code: true,
            message: message.into(),
            data: None,
        }
    }
}

fn api_routes(state: &AppState) -> Router<AppState> {
    use handlers::*;

    Router::new()
        .route("/health", get(health::health_check))
        // Auth
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/csrf-token", get(auth::csrf_token))
        // Surat masuk
        .route("/surat-masuk", get(surat_masuk::list).post(surat_masuk::create))
        .route("/surat-masuk/export", get(export::export_surat_masuk))
        .route(
            "/surat-masuk/:id",
            get(surat_masuk::get)
                .put(surat_masuk::update)
                .delete(surat_masuk::delete),
        )
        .route("/surat-masuk/:id/copy-disposisi", post(surat_masuk::copy_disposisi))
        .route(
            "/surat-masuk/:id/file",
            get(surat_masuk::download_file)
                .post(surat_masuk::upload_file)
                .layer(DefaultBodyLimit::max(state.config.max_upload_size)),
        )
        // Disposisi
        .route("/disposisi", get(disposisi::list).post(disposisi::create))
        .route("/disposisi/export", get(export::export_disposisi))
        .route(
            "/disposisi/:id",
            get(disposisi::get).put(disposisi::update).delete(disposisi::delete),
        )
        // Surat keluar
        .route("/surat-keluar", get(surat_keluar::list).post(surat_keluar::create))
        .route("/surat-keluar/export", get(export::export_surat_keluar))
        .route(
            "/surat-keluar/:id",
            get(surat_keluar::get)
                .put(surat_keluar::update)
                .delete(surat_keluar::delete),
        )
        // Surat tamu
        .route("/surat-tamu", get(surat_tamu::list).post(surat_tamu::create))
        .route("/surat-tamu/export", get(export::export_surat_tamu))
        .route("/surat-tamu/:id", get(surat_tamu::get).delete(surat_tamu::delete))
        // Users
        .route("/users", get(user::list).post(user::create))
        .route(
            "/users/:id",
            get(user::get).put(user::update).delete(user::delete),
        )
        // Misc
        .route("/units", get(unit::list_units))
        .route("/dashboard", get(dashboard::stats))
        .route("/log-aktivitas", get(activity::query_log))
        .fallback(fallback)
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false) // Set to true in production with HTTPS
        .with_http_only(true);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Frontend build, with index.html for client-side routes
    let index_file = state.config.static_dir.join("index.html");
    let serve_dir =
        ServeDir::new(&state.config.static_dir).not_found_service(ServeFile::new(index_file));

    Router::new()
        .nest("/api", api_routes(&state))
        .fallback_service(serve_dir)
        .layer(middleware::from_fn(csrf_layer))
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Fallback handler for unknown API routes
pub async fn fallback() -> (StatusCode, Json<ApiResponse<()>>) {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error("Not Found")))
}
