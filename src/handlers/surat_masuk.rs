//! Incoming letter handlers
//!
//! CRUD, attachment upload/download and the copy-to-disposisi action

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, Value,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::entity::disposisi::{self, StatusDisposisi};
use crate::entity::log_aktivitas::Aksi;
use crate::entity::user::{self, UserRef};
use crate::entity::{surat_keluar, surat_masuk};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::activity::service::log_success;
use crate::handlers::{count_grouped, next_no_urut, normalize_text, require_text};
use crate::middleware::auth::CurrentUser;
use crate::query::{apply_filters, ListEnvelope, ListQuery};
use crate::routes::ApiResponse;
use crate::state::AppState;
use crate::unit::UnitCatalog;

/// Create/update request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuratMasukRequest {
    /// Assigned automatically when omitted on create
    pub no_urut: Option<i32>,
    pub nomor_surat: Option<String>,
    pub tanggal_surat: NaiveDate,
    pub tanggal_diteruskan: NaiveDate,
    pub asal_surat: String,
    pub perihal: String,
    pub keterangan: Option<String>,
}

impl SuratMasukRequest {
    fn check_no_urut(&self) -> AppResult<()> {
        match self.no_urut {
            Some(n) if n < 1 => Err(AppError::Validation("no urut harus lebih dari 0".into())),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuratMasukCount {
    pub disposisi: u64,
    pub surat_keluar: u64,
}

/// Letter with its creator and relation counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuratMasukResponse {
    #[serde(flatten)]
    pub surat: surat_masuk::Model,
    #[serde(rename = "createdBy")]
    pub created_by: Option<UserRef>,
    #[serde(rename = "_count", default)]
    pub count: SuratMasukCount,
}

/// Body of `POST /api/surat-masuk/:id/copy-disposisi`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyDisposisiRequest {
    pub tujuan_disposisi: String,
    pub tanggal_disposisi: NaiveDate,
    pub keterangan: Option<String>,
}

async fn with_relations(
    db: &DatabaseConnection,
    rows: Vec<(surat_masuk::Model, Option<user::Model>)>,
) -> AppResult<Vec<SuratMasukResponse>> {
    let ids: Vec<i64> = rows.iter().map(|(s, _)| s.id).collect();
    let disposisi_counts =
        count_grouped::<disposisi::Entity>(db, disposisi::Column::SuratMasukId, &ids).await?;
    let keluar_counts =
        count_grouped::<surat_keluar::Entity>(db, surat_keluar::Column::SuratMasukId, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|(surat, creator)| SuratMasukResponse {
            count: SuratMasukCount {
                disposisi: disposisi_counts.get(&surat.id).copied().unwrap_or(0),
                surat_keluar: keluar_counts.get(&surat.id).copied().unwrap_or(0),
            },
            created_by: creator.map(UserRef::from),
            surat,
        })
        .collect())
}

/// GET /api/surat-masuk
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListEnvelope<SuratMasukResponse>>> {
    let resolved = query.resolve()?;
    let filtered = apply_filters(surat_masuk::Entity::find(), &resolved)?;

    let total = filtered.clone().count(&state.db).await?;
    let rows = filtered
        .order_by_desc(surat_masuk::Column::NoUrut)
        .order_by_desc(surat_masuk::Column::Id)
        .offset(resolved.offset())
        .limit(resolved.limit)
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;

    let data = with_relations(&state.db, rows).await?;
    Ok(Json(ListEnvelope::new(data, total, &resolved)))
}

/// GET /api/surat-masuk/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<SuratMasukResponse>> {
    let row = surat_masuk::Entity::find_by_id(id)
        .find_also_related(user::Entity)
        .one(&state.db)
        .await?
        .ok_or_not_found("surat masuk tidak ditemukan")?;

    let mut data = with_relations(&state.db, vec![row]).await?;
    data.pop().ok_or_not_found("surat masuk tidak ditemukan").map(Json)
}

/// POST /api/surat-masuk
pub async fn create(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<SuratMasukRequest>,
) -> AppResult<(StatusCode, Json<surat_masuk::Model>)> {
    req.check_no_urut()?;
    let asal_surat = require_text(&req.asal_surat, "asal surat")?;
    let perihal = require_text(&req.perihal, "perihal")?;

    let no_urut = match req.no_urut {
        Some(n) => n,
        None => next_no_urut::<surat_masuk::Entity>(&state.db, surat_masuk::Column::NoUrut).await?,
    };

    let now = Utc::now();
    let surat = surat_masuk::ActiveModel {
        no_urut: Set(no_urut),
        nomor_surat: Set(normalize_text(req.nomor_surat)),
        tanggal_surat: Set(req.tanggal_surat),
        tanggal_diteruskan: Set(req.tanggal_diteruskan),
        asal_surat: Set(asal_surat),
        perihal: Set(perihal),
        keterangan: Set(normalize_text(req.keterangan)),
        file_path: Set(None),
        created_by_id: Set(current_user.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    log_success(
        &current_user.email,
        Aksi::TambahSuratMasuk,
        format!("No urut {}: {}", surat.no_urut, surat.perihal),
    );
    Ok((StatusCode::CREATED, Json(surat)))
}

/// PUT /api/surat-masuk/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<SuratMasukRequest>,
) -> AppResult<Json<surat_masuk::Model>> {
    req.check_no_urut()?;
    let asal_surat = require_text(&req.asal_surat, "asal surat")?;
    let perihal = require_text(&req.perihal, "perihal")?;

    let existing = surat_masuk::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found("surat masuk tidak ditemukan")?;

    let mut active: surat_masuk::ActiveModel = existing.into();
    if let Some(no_urut) = req.no_urut {
        active.no_urut = Set(no_urut);
    }
    active.nomor_surat = Set(normalize_text(req.nomor_surat));
    active.tanggal_surat = Set(req.tanggal_surat);
    active.tanggal_diteruskan = Set(req.tanggal_diteruskan);
    active.asal_surat = Set(asal_surat);
    active.perihal = Set(perihal);
    active.keterangan = Set(normalize_text(req.keterangan));
    active.updated_at = Set(Utc::now());

    let surat = active.update(&state.db).await?;
    log_success(
        &current_user.email,
        Aksi::UbahSuratMasuk,
        format!("No urut {}", surat.no_urut),
    );
    Ok(Json(surat))
}

/// Delete a letter that has no dispositions. Outgoing replies keep
/// existing without the link.
///
/// Returns the deleted row and its attachment when no other letter
/// stores the same file.
pub async fn delete_surat_masuk(
    db: &DatabaseConnection,
    id: i64,
) -> AppResult<(surat_masuk::Model, Option<String>)> {
    let surat = surat_masuk::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_not_found("surat masuk tidak ditemukan")?;

    let disposisi_count = disposisi::Entity::find()
        .filter(disposisi::Column::SuratMasukId.eq(id))
        .count(db)
        .await?;
    if disposisi_count > 0 {
        return Err(AppError::Conflict(format!(
            "surat masuk masih memiliki {} disposisi",
            disposisi_count
        )));
    }

    surat_keluar::Entity::update_many()
        .col_expr(surat_keluar::Column::SuratMasukId, Expr::value(Value::BigInt(None)))
        .filter(surat_keluar::Column::SuratMasukId.eq(id))
        .exec(db)
        .await?;

    surat_masuk::Entity::delete_by_id(id).exec(db).await?;

    let orphan = match surat.file_path.clone() {
        Some(file) if !attachment_shared(db, &file, id).await? => Some(file),
        _ => None,
    };
    Ok((surat, orphan))
}

/// DELETE /api/surat-masuk/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let (surat, orphan) = delete_surat_masuk(&state.db, id).await?;
    if let Some(file) = orphan {
        remove_attachment(&state.config.upload_dir, &file).await;
    }

    log_success(
        &current_user.email,
        Aksi::HapusSuratMasuk,
        format!("No urut {}: {}", surat.no_urut, surat.perihal),
    );
    Ok(Json(ApiResponse::success_msg("surat masuk dihapus")))
}

/// Create a disposition from an incoming letter.
///
/// The target must resolve against the unit catalog. The new record takes
/// the letter's register number and subject and is marked finished.
pub async fn copy_to_disposisi(
    db: &DatabaseConnection,
    units: &UnitCatalog,
    surat_id: i64,
    req: CopyDisposisiRequest,
    created_by_id: i64,
) -> AppResult<disposisi::Model> {
    let surat = surat_masuk::Entity::find_by_id(surat_id)
        .one(db)
        .await?
        .ok_or_not_found("surat masuk tidak ditemukan")?;

    let tujuan = units
        .resolve(&req.tujuan_disposisi)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let now = Utc::now();
    let created = disposisi::ActiveModel {
        no_urut: Set(surat.no_urut),
        tanggal_disposisi: Set(req.tanggal_disposisi),
        tujuan_disposisi: Set(tujuan.encode()),
        isi_disposisi: Set(surat.perihal),
        keterangan: Set(normalize_text(req.keterangan)),
        status: Set(StatusDisposisi::Selesai),
        surat_masuk_id: Set(surat.id),
        created_by_id: Set(created_by_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(created)
}

/// POST /api/surat-masuk/:id/copy-disposisi
pub async fn copy_disposisi(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<CopyDisposisiRequest>,
) -> AppResult<(StatusCode, Json<disposisi::Model>)> {
    let created = copy_to_disposisi(&state.db, &state.units, id, req, current_user.id).await?;

    tracing::info!(
        "Surat masuk {} copied to disposisi {} for {}",
        id,
        created.id,
        created.tujuan_disposisi
    );
    log_success(
        &current_user.email,
        Aksi::SalinDisposisi,
        format!("No urut {} ke {}", created.no_urut, created.tujuan_disposisi),
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// Content-addressed file name keeping a short alphanumeric extension
fn attachment_name(data: &[u8], original: &str) -> String {
    let digest = hex::encode(Sha256::digest(data));
    let ext = std::path::Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase());
    match ext {
        Some(ext) => format!("{}.{}", digest, ext),
        None => digest,
    }
}

/// Whether a letter other than `except_id` stores `file`
async fn attachment_shared(db: &DatabaseConnection, file: &str, except_id: i64) -> AppResult<bool> {
    let others = surat_masuk::Entity::find()
        .filter(surat_masuk::Column::FilePath.eq(file))
        .filter(surat_masuk::Column::Id.ne(except_id))
        .count(db)
        .await?;
    Ok(others > 0)
}

async fn remove_attachment(upload_dir: &std::path::Path, file: &str) {
    if let Err(e) = tokio::fs::remove_file(upload_dir.join(file)).await {
        tracing::warn!("Failed to remove attachment {}: {}", file, e);
    }
}

/// Point a letter at a newly stored attachment. Returns the updated row and
/// the previous file when nothing refers to it any more.
pub async fn replace_attachment(
    db: &DatabaseConnection,
    existing: surat_masuk::Model,
    stored: String,
) -> AppResult<(surat_masuk::Model, Option<String>)> {
    let id = existing.id;
    let previous = existing.file_path.clone();

    let mut active: surat_masuk::ActiveModel = existing.into();
    active.file_path = Set(Some(stored.clone()));
    active.updated_at = Set(Utc::now());
    let surat = active.update(db).await?;

    let orphan = match previous {
        Some(old) if old != stored && !attachment_shared(db, &old, id).await? => Some(old),
        _ => None,
    };
    Ok((surat, orphan))
}

/// POST /api/surat-masuk/:id/file
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> AppResult<Json<surat_masuk::Model>> {
    let existing = surat_masuk::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found("surat masuk tidak ditemukan")?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            upload = Some((file_name, bytes.to_vec()));
        }
    }

    let (file_name, data) = upload.ok_or_else(|| AppError::BadRequest("file wajib diunggah".into()))?;
    if data.is_empty() {
        return Err(AppError::BadRequest("file kosong".into()));
    }
    if data.len() > state.config.max_upload_size {
        return Err(AppError::PayloadTooLarge(format!(
            "ukuran file melebihi {} byte",
            state.config.max_upload_size
        )));
    }

    let stored = attachment_name(&data, &file_name);
    tokio::fs::create_dir_all(&state.config.upload_dir).await?;
    tokio::fs::write(state.config.upload_dir.join(&stored), &data).await?;

    let (surat, orphan) = replace_attachment(&state.db, existing, stored).await?;
    if let Some(old) = orphan {
        remove_attachment(&state.config.upload_dir, &old).await;
    }

    log_success(
        &current_user.email,
        Aksi::UnggahLampiran,
        format!("No urut {}: {}", surat.no_urut, file_name),
    );
    Ok(Json(surat))
}

/// GET /api/surat-masuk/:id/file
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let surat = surat_masuk::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found("surat masuk tidak ditemukan")?;
    let stored = surat
        .file_path
        .ok_or_not_found("surat masuk tidak memiliki lampiran")?;

    let data = match tokio::fs::read(state.config.upload_dir.join(&stored)).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("file lampiran tidak ditemukan".into()))
        }
        Err(e) => return Err(e.into()),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"surat-masuk-{}-{}\"", surat.no_urut, stored),
            ),
        ],
        Body::from(data),
    )
        .into_response())
}
