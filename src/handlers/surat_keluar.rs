//! Outgoing letter handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect,
    Set,
};
use serde::{Deserialize, Serialize};

use crate::entity::log_aktivitas::Aksi;
use crate::entity::surat_keluar::{self, Pengolah};
use crate::entity::surat_masuk;
use crate::entity::user::UserRef;
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::activity::service::log_success;
use crate::handlers::disposisi::SuratMasukRef;
use crate::handlers::{load_user_refs, next_no_urut, normalize_text, require_text};
use crate::middleware::auth::CurrentUser;
use crate::query::{apply_filters, ListEnvelope, ListQuery};
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuratKeluarRequest {
    pub no_urut: Option<i32>,
    pub klas: String,
    pub pengolah: Pengolah,
    pub tanggal_surat: NaiveDate,
    pub perihal_surat: String,
    pub kirim_kepada: String,
    pub keterangan: Option<String>,
    pub surat_masuk_id: Option<i64>,
}

/// Trimmed and checked request fields
struct Validated {
    klas: String,
    perihal_surat: String,
    kirim_kepada: String,
}

impl SuratKeluarRequest {
    fn validate(&self) -> AppResult<Validated> {
        if matches!(self.no_urut, Some(n) if n < 1) {
            return Err(AppError::Validation("no urut harus lebih dari 0".into()));
        }
        Ok(Validated {
            klas: require_text(&self.klas, "klas")?,
            perihal_surat: require_text(&self.perihal_surat, "perihal surat")?,
            kirim_kepada: require_text(&self.kirim_kepada, "kirim kepada")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuratKeluarResponse {
    #[serde(flatten)]
    pub surat: surat_keluar::Model,
    pub surat_masuk: Option<SuratMasukRef>,
    pub created_by: Option<UserRef>,
}

async fn with_relations(
    db: &DatabaseConnection,
    rows: Vec<(surat_keluar::Model, Option<surat_masuk::Model>)>,
) -> AppResult<Vec<SuratKeluarResponse>> {
    let users = load_user_refs(db, rows.iter().map(|(s, _)| s.created_by_id)).await?;
    Ok(rows
        .into_iter()
        .map(|(surat, masuk)| SuratKeluarResponse {
            created_by: users.get(&surat.created_by_id).cloned(),
            surat_masuk: masuk.map(SuratMasukRef::from),
            surat,
        })
        .collect())
}

/// The linked incoming letter, when given, must exist
async fn check_link(db: &DatabaseConnection, surat_masuk_id: Option<i64>) -> AppResult<()> {
    if let Some(id) = surat_masuk_id {
        surat_masuk::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::Validation(format!("surat masuk {} tidak ditemukan", id)))?;
    }
    Ok(())
}

/// GET /api/surat-keluar
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListEnvelope<SuratKeluarResponse>>> {
    let resolved = query.resolve()?;
    let filtered = apply_filters(surat_keluar::Entity::find(), &resolved)?;

    let total = filtered.clone().count(&state.db).await?;
    let rows = filtered
        .order_by_desc(surat_keluar::Column::NoUrut)
        .order_by_desc(surat_keluar::Column::Id)
        .offset(resolved.offset())
        .limit(resolved.limit)
        .find_also_related(surat_masuk::Entity)
        .all(&state.db)
        .await?;

    let data = with_relations(&state.db, rows).await?;
    Ok(Json(ListEnvelope::new(data, total, &resolved)))
}

/// GET /api/surat-keluar/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<SuratKeluarResponse>> {
    let row = surat_keluar::Entity::find_by_id(id)
        .find_also_related(surat_masuk::Entity)
        .one(&state.db)
        .await?
        .ok_or_not_found("surat keluar tidak ditemukan")?;

    let mut data = with_relations(&state.db, vec![row]).await?;
    data.pop().ok_or_not_found("surat keluar tidak ditemukan").map(Json)
}

pub async fn create_surat_keluar(
    db: &DatabaseConnection,
    req: SuratKeluarRequest,
    created_by_id: i64,
) -> AppResult<surat_keluar::Model> {
    let fields = req.validate()?;
    check_link(db, req.surat_masuk_id).await?;

    let no_urut = match req.no_urut {
        Some(n) => n,
        None => next_no_urut::<surat_keluar::Entity>(db, surat_keluar::Column::NoUrut).await?,
    };

    let now = Utc::now();
    let created = surat_keluar::ActiveModel {
        no_urut: Set(no_urut),
        klas: Set(fields.klas),
        pengolah: Set(req.pengolah),
        tanggal_surat: Set(req.tanggal_surat),
        perihal_surat: Set(fields.perihal_surat),
        kirim_kepada: Set(fields.kirim_kepada),
        keterangan: Set(normalize_text(req.keterangan)),
        surat_masuk_id: Set(req.surat_masuk_id),
        created_by_id: Set(created_by_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(created)
}

/// POST /api/surat-keluar
pub async fn create(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<SuratKeluarRequest>,
) -> AppResult<(StatusCode, Json<surat_keluar::Model>)> {
    let created = create_surat_keluar(&state.db, req, current_user.id).await?;
    log_success(
        &current_user.email,
        Aksi::TambahSuratKeluar,
        format!("No urut {} kepada {}", created.no_urut, created.kirim_kepada),
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/surat-keluar/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<SuratKeluarRequest>,
) -> AppResult<Json<surat_keluar::Model>> {
    let fields = req.validate()?;

    let existing = surat_keluar::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found("surat keluar tidak ditemukan")?;
    check_link(&state.db, req.surat_masuk_id).await?;

    let mut active: surat_keluar::ActiveModel = existing.into();
    if let Some(no_urut) = req.no_urut {
        active.no_urut = Set(no_urut);
    }
    active.klas = Set(fields.klas);
    active.pengolah = Set(req.pengolah);
    active.tanggal_surat = Set(req.tanggal_surat);
    active.perihal_surat = Set(fields.perihal_surat);
    active.kirim_kepada = Set(fields.kirim_kepada);
    active.keterangan = Set(normalize_text(req.keterangan));
    active.surat_masuk_id = Set(req.surat_masuk_id);
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;
    log_success(
        &current_user.email,
        Aksi::UbahSuratKeluar,
        format!("No urut {}", updated.no_urut),
    );
    Ok(Json(updated))
}

/// DELETE /api/surat-keluar/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let existing = surat_keluar::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found("surat keluar tidak ditemukan")?;

    surat_keluar::Entity::delete_by_id(id).exec(&state.db).await?;
    log_success(
        &current_user.email,
        Aksi::HapusSuratKeluar,
        format!("No urut {}: {}", existing.no_urut, existing.perihal_surat),
    );
    Ok(Json(ApiResponse::success_msg("surat keluar dihapus")))
}
