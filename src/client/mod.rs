//! Typed client for the persuratan API.
//!
//! Keeps the session in a cookie store and fetches a CSRF token before
//! every mutating call.
//!
//! ```ignore
//! let client = ApiClient::new("http://localhost:8080")?;
//! client.login("admin@dprd.go.id", "rahasia").await?;
//! let page = client.list_surat_masuk(&ListQuery::default()).await?;
//! ```

use reqwest::Method;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::entity::{disposisi, surat_keluar, surat_masuk, surat_tamu};
use crate::handlers::auth::{CsrfTokenResponse, SessionUser};
use crate::handlers::dashboard::DashboardStats;
use crate::handlers::disposisi::{
    CreateDisposisiRequest, DisposisiResponse, UpdateDisposisiRequest,
};
use crate::handlers::surat_keluar::{SuratKeluarRequest, SuratKeluarResponse};
use crate::handlers::surat_masuk::{CopyDisposisiRequest, SuratMasukRequest, SuratMasukResponse};
use crate::handlers::surat_tamu::SuratTamuRequest;
use crate::middleware::csrf::CSRF_HEADER;
use crate::query::{ListEnvelope, ListQuery};
use crate::unit::Bagian;

pub mod copy_flow;
pub mod debounce;
pub mod list;

pub use copy_flow::{CopyDisposisiFlow, CopyStep, FlowError};
pub use debounce::Debouncer;
pub use list::{ListController, ListSource, ListState, ResourceList};

/// Shown for any failure that has no message from the server
pub const GENERIC_FETCH_ERROR: &str = "Gagal memuat data";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("network: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Validation(String),
}

impl ClientError {
    /// Text for the operator: the server's message when there is one,
    /// otherwise the generic fetch failure.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Http(_) => GENERIC_FETCH_ERROR.to_string(),
            ClientError::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            ClientError::Api { .. } => GENERIC_FETCH_ERROR.to_string(),
            ClientError::Validation(message) => message.clone(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            ClientError::Validation(_) => None,
        }
    }
}

/// Error bodies: `{ code, message, details? }` from handlers, `{ error }` from middleware
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    details: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed
            .details
            .or(parsed.message)
            .or(parsed.error)
            .unwrap_or_default(),
        Err(_) => body.trim().to_string(),
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

/// Export targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    SuratMasuk,
    Disposisi,
    SuratKeluar,
    SuratTamu,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Resource::SuratMasuk => "/api/surat-masuk",
            Resource::Disposisi => "/api/disposisi",
            Resource::SuratKeluar => "/api/surat-keluar",
            Resource::SuratTamu => "/api/surat-tamu",
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map non-2xx responses to `ClientError::Api`
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn parse<R: DeserializeOwned>(resp: reqwest::Response) -> Result<R, ClientError> {
        Ok(Self::check(resp).await?.json::<R>().await?)
    }

    pub async fn csrf_token(&self) -> Result<String, ClientError> {
        let resp = self.http.get(self.url("/api/csrf-token")).send().await?;
        let body: CsrfTokenResponse = Self::parse(resp).await?;
        Ok(body.csrf_token)
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        let resp = self.http.get(self.url(path)).send().await?;
        Self::parse(resp).await
    }

    /// GET a list endpoint with the canonical query string
    pub async fn list<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &ListQuery,
    ) -> Result<ListEnvelope<R>, ClientError> {
        let url = format!("{}?{}", self.url(path), query.to_query_string());
        let resp = self.http.get(url).send().await?;
        Self::parse(resp).await
    }

    /// Send a mutating request with a fresh CSRF token
    async fn mutate<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ClientError> {
        let token = self.csrf_token().await?;
        let mut req = self
            .http
            .request(method, self.url(path))
            .header(CSRF_HEADER, token);
        if let Some(body) = body {
            req = req.json(body);
        }
        Self::check(req.send().await?).await
    }

    pub async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ClientError> {
        Ok(self.mutate(Method::POST, path, Some(body)).await?.json().await?)
    }

    pub async fn put<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ClientError> {
        Ok(self.mutate(Method::PUT, path, Some(body)).await?.json().await?)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.mutate::<()>(Method::DELETE, path, None).await?;
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser, ClientError> {
        self.post("/api/login", &LoginBody { email, password }).await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.mutate::<()>(Method::POST, "/api/logout", None).await?;
        Ok(())
    }

    pub async fn me(&self) -> Result<SessionUser, ClientError> {
        self.get("/api/me").await
    }

    pub async fn units(&self) -> Result<Vec<Bagian>, ClientError> {
        self.get("/api/units").await
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, ClientError> {
        self.get("/api/dashboard").await
    }

    // Surat masuk

    pub async fn list_surat_masuk(
        &self,
        query: &ListQuery,
    ) -> Result<ListEnvelope<SuratMasukResponse>, ClientError> {
        self.list(Resource::SuratMasuk.path(), query).await
    }

    pub async fn get_surat_masuk(&self, id: i64) -> Result<SuratMasukResponse, ClientError> {
        self.get(&format!("/api/surat-masuk/{}", id)).await
    }

    pub async fn create_surat_masuk(
        &self,
        req: &SuratMasukRequest,
    ) -> Result<surat_masuk::Model, ClientError> {
        self.post("/api/surat-masuk", req).await
    }

    pub async fn update_surat_masuk(
        &self,
        id: i64,
        req: &SuratMasukRequest,
    ) -> Result<surat_masuk::Model, ClientError> {
        self.put(&format!("/api/surat-masuk/{}", id), req).await
    }

    pub async fn delete_surat_masuk(&self, id: i64) -> Result<(), ClientError> {
        self.delete(&format!("/api/surat-masuk/{}", id)).await
    }

    pub async fn copy_disposisi(
        &self,
        surat_id: i64,
        req: &CopyDisposisiRequest,
    ) -> Result<disposisi::Model, ClientError> {
        self.post(&format!("/api/surat-masuk/{}/copy-disposisi", surat_id), req)
            .await
    }

    // Disposisi

    pub async fn list_disposisi(
        &self,
        query: &ListQuery,
    ) -> Result<ListEnvelope<DisposisiResponse>, ClientError> {
        self.list(Resource::Disposisi.path(), query).await
    }

    pub async fn create_disposisi(
        &self,
        req: &CreateDisposisiRequest,
    ) -> Result<disposisi::Model, ClientError> {
        self.post("/api/disposisi", req).await
    }

    pub async fn update_disposisi(
        &self,
        id: i64,
        req: &UpdateDisposisiRequest,
    ) -> Result<disposisi::Model, ClientError> {
        self.put(&format!("/api/disposisi/{}", id), req).await
    }

    pub async fn delete_disposisi(&self, id: i64) -> Result<(), ClientError> {
        self.delete(&format!("/api/disposisi/{}", id)).await
    }

    // Surat keluar

    pub async fn list_surat_keluar(
        &self,
        query: &ListQuery,
    ) -> Result<ListEnvelope<SuratKeluarResponse>, ClientError> {
        self.list(Resource::SuratKeluar.path(), query).await
    }

    pub async fn create_surat_keluar(
        &self,
        req: &SuratKeluarRequest,
    ) -> Result<surat_keluar::Model, ClientError> {
        self.post("/api/surat-keluar", req).await
    }

    pub async fn update_surat_keluar(
        &self,
        id: i64,
        req: &SuratKeluarRequest,
    ) -> Result<surat_keluar::Model, ClientError> {
        self.put(&format!("/api/surat-keluar/{}", id), req).await
    }

    pub async fn delete_surat_keluar(&self, id: i64) -> Result<(), ClientError> {
        self.delete(&format!("/api/surat-keluar/{}", id)).await
    }

    // Surat tamu

    pub async fn list_surat_tamu(
        &self,
        query: &ListQuery,
    ) -> Result<ListEnvelope<surat_tamu::Model>, ClientError> {
        self.list(Resource::SuratTamu.path(), query).await
    }

    pub async fn create_surat_tamu(
        &self,
        req: &SuratTamuRequest,
    ) -> Result<surat_tamu::Model, ClientError> {
        self.post("/api/surat-tamu", req).await
    }

    // Users

    pub async fn list_users(
        &self,
        query: &ListQuery,
    ) -> Result<ListEnvelope<SessionUser>, ClientError> {
        self.list("/api/users", query).await
    }

    /// Spreadsheet of the filtered list, without paging
    pub async fn export(
        &self,
        resource: Resource,
        query: &ListQuery,
    ) -> Result<Vec<u8>, ClientError> {
        let mut url = format!("{}/export", self.url(resource.path()));
        let pairs = query.without_paging();
        if !pairs.is_empty() {
            url.push('?');
            url.push_str(&serde_urlencoded::to_string(pairs).unwrap_or_default());
        }
        let resp = Self::check(self.http.get(url).send().await?).await?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::routes::create_router;
    use crate::state::AppState;
    use chrono::{NaiveDate, Utc};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use tokio::net::TcpListener;

    async fn serve(db: DatabaseConnection) -> (String, tokio::task::JoinHandle<()>) {
        let app = create_router(AppState::new(db, Config::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), handle)
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(
                r#"{"code":404,"message":"Not Found","details":"surat masuk tidak ditemukan"}"#
            ),
            "surat masuk tidak ditemukan"
        );
        assert_eq!(error_message(r#"{"error":"invalid_csrf_token"}"#), "invalid_csrf_token");
        assert_eq!(error_message(r#"{"code":500,"message":"Database Error"}"#), "Database Error");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_user_message() {
        let api = ClientError::Api {
            status: 400,
            message: "Sekretaris DPRD tidak memiliki sub bagian".into(),
        };
        assert_eq!(api.user_message(), "Sekretaris DPRD tidak memiliki sub bagian");
        assert_eq!(api.status(), Some(400));

        let empty = ClientError::Api { status: 502, message: String::new() };
        assert_eq!(empty.user_message(), GENERIC_FETCH_ERROR);
    }

    #[tokio::test]
    async fn test_list_without_session_is_unauthorized() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let (base, server) = serve(db).await;
        let client = ApiClient::new(base).unwrap();

        let err = client.list_surat_masuk(&ListQuery::default()).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.user_message(), "unauthorized");
        server.abort();
    }

    #[tokio::test]
    async fn test_public_mutation_carries_csrf_token() {
        let created = surat_tamu::Model {
            id: 5,
            nama_tamu: "Budi".into(),
            instansi: "Karang Taruna".into(),
            no_hp: None,
            tanggal: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            perihal: "Audiensi".into(),
            keterangan: None,
            created_at: Utc::now(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![created.clone()]])
            .into_connection();
        let (base, server) = serve(db).await;
        let client = ApiClient::new(base).unwrap();

        let req = SuratTamuRequest {
            nama_tamu: "Budi".into(),
            instansi: "Karang Taruna".into(),
            no_hp: None,
            tanggal: Some(NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()),
            perihal: "Audiensi".into(),
            keterangan: None,
        };
        let saved = client.create_surat_tamu(&req).await.unwrap();
        assert_eq!(saved, created);
        server.abort();
    }
}
