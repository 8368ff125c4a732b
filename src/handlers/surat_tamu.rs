//! Guest letter handlers
//!
//! Creating a guest letter is open to visitors without a session; listing
//! and removal go through the normal gate.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect, Set};
use serde::{Deserialize, Serialize};

use crate::entity::log_aktivitas::Aksi;
use crate::entity::surat_tamu;
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::activity::service::log_success;
use crate::handlers::{normalize_text, require_text};
use crate::middleware::auth::CurrentUser;
use crate::query::{apply_filters, ListEnvelope, ListQuery};
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Log identity for submissions made without a session
const GUEST_EMAIL: &str = "tamu";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuratTamuRequest {
    pub nama_tamu: String,
    pub instansi: String,
    pub no_hp: Option<String>,
    /// Defaults to today
    pub tanggal: Option<NaiveDate>,
    pub perihal: String,
    pub keterangan: Option<String>,
}

impl SuratTamuRequest {
    fn into_active_model(self) -> AppResult<surat_tamu::ActiveModel> {
        let no_hp = normalize_text(self.no_hp);
        if let Some(no_hp) = &no_hp {
            let valid = no_hp
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' '));
            if !valid {
                return Err(AppError::Validation("no hp tidak valid".into()));
            }
        }

        let now = Utc::now();
        Ok(surat_tamu::ActiveModel {
            nama_tamu: Set(require_text(&self.nama_tamu, "nama tamu")?),
            instansi: Set(require_text(&self.instansi, "instansi")?),
            no_hp: Set(no_hp),
            tanggal: Set(self.tanggal.unwrap_or_else(|| now.date_naive())),
            perihal: Set(require_text(&self.perihal, "perihal")?),
            keterangan: Set(normalize_text(self.keterangan)),
            created_at: Set(now),
            ..Default::default()
        })
    }
}

/// GET /api/surat-tamu
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListEnvelope<surat_tamu::Model>>> {
    let resolved = query.resolve()?;
    let filtered = apply_filters(surat_tamu::Entity::find(), &resolved)?;

    let total = filtered.clone().count(&state.db).await?;
    let data = filtered
        .order_by_desc(surat_tamu::Column::Tanggal)
        .order_by_desc(surat_tamu::Column::Id)
        .offset(resolved.offset())
        .limit(resolved.limit)
        .all(&state.db)
        .await?;

    Ok(Json(ListEnvelope::new(data, total, &resolved)))
}

/// GET /api/surat-tamu/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<surat_tamu::Model>> {
    surat_tamu::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found("surat tamu tidak ditemukan")
        .map(Json)
}

/// POST /api/surat-tamu
pub async fn create(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
    Json(req): Json<SuratTamuRequest>,
) -> AppResult<(StatusCode, Json<surat_tamu::Model>)> {
    let created = req.into_active_model()?.insert(&state.db).await?;

    let email = current_user
        .as_ref()
        .map(|Extension(u)| u.email.as_str())
        .unwrap_or(GUEST_EMAIL);
    log_success(
        email,
        Aksi::TambahSuratTamu,
        format!("{} ({})", created.nama_tamu, created.instansi),
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /api/surat-tamu/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let existing = surat_tamu::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found("surat tamu tidak ditemukan")?;

    surat_tamu::Entity::delete_by_id(id).exec(&state.db).await?;
    log_success(
        &current_user.email,
        Aksi::HapusSuratTamu,
        format!("{} ({})", existing.nama_tamu, existing.instansi),
    );
    Ok(Json(ApiResponse::success_msg("surat tamu dihapus")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveValue;

    fn request() -> SuratTamuRequest {
        SuratTamuRequest {
            nama_tamu: " Budi ".into(),
            instansi: "Karang Taruna".into(),
            no_hp: Some("0812-3456 789".into()),
            tanggal: None,
            perihal: "Permohonan audiensi".into(),
            keterangan: Some(" ".into()),
        }
    }

    #[test]
    fn test_into_active_model_normalizes() {
        let model = request().into_active_model().unwrap();
        assert_eq!(model.nama_tamu, ActiveValue::Set("Budi".to_string()));
        assert_eq!(model.keterangan, ActiveValue::Set(None));
        assert_eq!(model.tanggal, ActiveValue::Set(Utc::now().date_naive()));
    }

    #[test]
    fn test_rejects_bad_phone() {
        let mut req = request();
        req.no_hp = Some("08x12".into());
        assert!(matches!(req.into_active_model(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_requires_perihal() {
        let mut req = request();
        req.perihal = String::new();
        assert!(req.into_active_model().is_err());
    }
}
