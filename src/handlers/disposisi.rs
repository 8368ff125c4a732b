//! Disposition handlers

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

use crate::entity::disposisi::{self, StatusDisposisi};
use crate::entity::log_aktivitas::Aksi;
use crate::entity::surat_masuk;
use crate::entity::user::UserRef;
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::activity::service::log_success;
use crate::handlers::{load_user_refs, normalize_text, require_text};
use crate::middleware::auth::CurrentUser;
use crate::query::{apply_filters, ListEnvelope, ListQuery};
use crate::routes::ApiResponse;
use crate::state::AppState;
use crate::unit::UnitCatalog;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDisposisiRequest {
    pub surat_masuk_id: i64,
    pub tanggal_disposisi: NaiveDate,
    pub tujuan_disposisi: String,
    /// Defaults to the letter's subject
    pub isi_disposisi: Option<String>,
    pub keterangan: Option<String>,
    pub status: Option<StatusDisposisi>,
}

/// Update body. The register number is fixed at creation and cannot be sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDisposisiRequest {
    pub tanggal_disposisi: NaiveDate,
    pub tujuan_disposisi: String,
    pub isi_disposisi: String,
    pub keterangan: Option<String>,
    pub status: StatusDisposisi,
}

/// Short view of the parent letter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuratMasukRef {
    pub id: i64,
    pub no_urut: i32,
    pub nomor_surat: Option<String>,
    pub asal_surat: String,
    pub perihal: String,
}

impl From<surat_masuk::Model> for SuratMasukRef {
    fn from(m: surat_masuk::Model) -> Self {
        Self {
            id: m.id,
            no_urut: m.no_urut,
            nomor_surat: m.nomor_surat,
            asal_surat: m.asal_surat,
            perihal: m.perihal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisposisiResponse {
    #[serde(flatten)]
    pub disposisi: disposisi::Model,
    pub surat_masuk: Option<SuratMasukRef>,
    pub created_by: Option<UserRef>,
}

async fn with_relations(
    db: &DatabaseConnection,
    rows: Vec<(disposisi::Model, Option<surat_masuk::Model>)>,
) -> AppResult<Vec<DisposisiResponse>> {
    let users = load_user_refs(db, rows.iter().map(|(d, _)| d.created_by_id)).await?;
    Ok(rows
        .into_iter()
        .map(|(d, surat)| DisposisiResponse {
            created_by: users.get(&d.created_by_id).cloned(),
            surat_masuk: surat.map(SuratMasukRef::from),
            disposisi: d,
        })
        .collect())
}

fn encode_tujuan(units: &UnitCatalog, raw: &str) -> AppResult<String> {
    units
        .resolve(raw)
        .map(|t| t.encode())
        .map_err(|e| AppError::Validation(e.to_string()))
}

/// GET /api/disposisi
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListEnvelope<DisposisiResponse>>> {
    let resolved = query.resolve()?;
    let filtered = apply_filters(disposisi::Entity::find(), &resolved)?;

    let total = filtered.clone().count(&state.db).await?;
    let rows = filtered
        .order_by_desc(disposisi::Column::TanggalDisposisi)
        .order_by_desc(disposisi::Column::Id)
        .offset(resolved.offset())
        .limit(resolved.limit)
        .find_also_related(surat_masuk::Entity)
        .all(&state.db)
        .await?;

    let data = with_relations(&state.db, rows).await?;
    Ok(Json(ListEnvelope::new(data, total, &resolved)))
}

/// GET /api/disposisi/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<DisposisiResponse>> {
    let row = disposisi::Entity::find_by_id(id)
        .find_also_related(surat_masuk::Entity)
        .one(&state.db)
        .await?
        .ok_or_not_found("disposisi tidak ditemukan")?;

    let mut data = with_relations(&state.db, vec![row]).await?;
    data.pop().ok_or_not_found("disposisi tidak ditemukan").map(Json)
}

/// Insert a disposition for an existing letter, copying its register number
pub async fn create_disposisi(
    db: &DatabaseConnection,
    units: &UnitCatalog,
    req: CreateDisposisiRequest,
    created_by_id: i64,
) -> AppResult<disposisi::Model> {
    let surat = surat_masuk::Entity::find_by_id(req.surat_masuk_id)
        .one(db)
        .await?
        .ok_or_not_found("surat masuk tidak ditemukan")?;

    let tujuan = encode_tujuan(units, &req.tujuan_disposisi)?;
    let isi = match normalize_text(req.isi_disposisi) {
        Some(isi) => isi,
        None => surat.perihal.clone(),
    };

    let now = Utc::now();
    let created = disposisi::ActiveModel {
        no_urut: Set(surat.no_urut),
        tanggal_disposisi: Set(req.tanggal_disposisi),
        tujuan_disposisi: Set(tujuan),
        isi_disposisi: Set(isi),
        keterangan: Set(normalize_text(req.keterangan)),
        status: Set(req.status.unwrap_or(StatusDisposisi::Proses)),
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

/// POST /api/disposisi
pub async fn create(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<CreateDisposisiRequest>,
) -> AppResult<(StatusCode, Json<disposisi::Model>)> {
    let created = create_disposisi(&state.db, &state.units, req, current_user.id).await?;
    log_success(
        &current_user.email,
        Aksi::TambahDisposisi,
        format!("No urut {} ke {}", created.no_urut, created.tujuan_disposisi),
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/disposisi/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateDisposisiRequest>,
) -> AppResult<Json<disposisi::Model>> {
    let isi = require_text(&req.isi_disposisi, "isi disposisi")?;
    let tujuan = encode_tujuan(&state.units, &req.tujuan_disposisi)?;

    let existing = disposisi::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found("disposisi tidak ditemukan")?;

    let mut active: disposisi::ActiveModel = existing.into();
    active.tanggal_disposisi = Set(req.tanggal_disposisi);
    active.tujuan_disposisi = Set(tujuan);
    active.isi_disposisi = Set(isi);
    active.keterangan = Set(normalize_text(req.keterangan));
    active.status = Set(req.status);
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;
    log_success(
        &current_user.email,
        Aksi::UbahDisposisi,
        format!("No urut {} ({})", updated.no_urut, updated.status.as_str()),
    );
    Ok(Json(updated))
}

/// DELETE /api/disposisi/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let existing = disposisi::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found("disposisi tidak ditemukan")?;

    disposisi::Entity::delete_by_id(id).exec(&state.db).await?;
    log_success(
        &current_user.email,
        Aksi::HapusDisposisi,
        format!("No urut {} ke {}", existing.no_urut, existing.tujuan_disposisi),
    );
    Ok(Json(ApiResponse::success_msg("disposisi dihapus")))
}
