//! CSV export of filtered lists
//!
//! Takes the same query parameters as the list endpoints, ignores paging and
//! writes at most [`MAX_EXPORT_ROWS`] rows.

use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, QuerySelect, Select};

use crate::entity::log_aktivitas::Aksi;
use crate::entity::{disposisi, surat_keluar, surat_masuk, surat_tamu};
use crate::error::{AppError, AppResult};
use crate::handlers::activity::service::log_success;
use crate::handlers::load_user_refs;
use crate::middleware::auth::CurrentUser;
use crate::query::{apply_filters, ListQuery, Searchable};
use crate::state::AppState;

pub const MAX_EXPORT_ROWS: u64 = 10_000;

/// One exportable resource
pub trait Export: Searchable {
    /// File name prefix
    const RESOURCE: &'static str;
    const HEADERS: &'static [&'static str];

    fn order(select: Select<Self>) -> Select<Self>;

    fn record(model: &Self::Model, created_by: Option<&str>) -> Vec<String>;

    fn created_by_id(_model: &Self::Model) -> Option<i64> {
        None
    }
}

fn date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

impl Export for surat_masuk::Entity {
    const RESOURCE: &'static str = "surat-masuk";
    const HEADERS: &'static [&'static str] = &[
        "No Urut",
        "Nomor Surat",
        "Tanggal Surat",
        "Tanggal Diteruskan",
        "Asal Surat",
        "Perihal",
        "Keterangan",
        "Dibuat Oleh",
    ];

    fn order(select: Select<Self>) -> Select<Self> {
        select
            .order_by_desc(surat_masuk::Column::NoUrut)
            .order_by_desc(surat_masuk::Column::Id)
    }

    fn record(m: &surat_masuk::Model, created_by: Option<&str>) -> Vec<String> {
        vec![
            m.no_urut.to_string(),
            opt(&m.nomor_surat),
            date(m.tanggal_surat),
            date(m.tanggal_diteruskan),
            m.asal_surat.clone(),
            m.perihal.clone(),
            opt(&m.keterangan),
            created_by.unwrap_or_default().to_string(),
        ]
    }

    fn created_by_id(m: &surat_masuk::Model) -> Option<i64> {
        Some(m.created_by_id)
    }
}

impl Export for disposisi::Entity {
    const RESOURCE: &'static str = "disposisi";
    const HEADERS: &'static [&'static str] = &[
        "No Urut",
        "Tanggal Disposisi",
        "Tujuan Disposisi",
        "Isi Disposisi",
        "Keterangan",
        "Status",
        "Dibuat Oleh",
    ];

    fn order(select: Select<Self>) -> Select<Self> {
        select
            .order_by_desc(disposisi::Column::TanggalDisposisi)
            .order_by_desc(disposisi::Column::Id)
    }

    fn record(m: &disposisi::Model, created_by: Option<&str>) -> Vec<String> {
        vec![
            m.no_urut.to_string(),
            date(m.tanggal_disposisi),
            m.tujuan_disposisi.clone(),
            m.isi_disposisi.clone(),
            opt(&m.keterangan),
            m.status.as_str().to_string(),
            created_by.unwrap_or_default().to_string(),
        ]
    }

    fn created_by_id(m: &disposisi::Model) -> Option<i64> {
        Some(m.created_by_id)
    }
}

impl Export for surat_keluar::Entity {
    const RESOURCE: &'static str = "surat-keluar";
    const HEADERS: &'static [&'static str] = &[
        "No Urut",
        "Klas",
        "Pengolah",
        "Tanggal Surat",
        "Perihal Surat",
        "Kirim Kepada",
        "Keterangan",
        "Dibuat Oleh",
    ];

    fn order(select: Select<Self>) -> Select<Self> {
        select
            .order_by_desc(surat_keluar::Column::NoUrut)
            .order_by_desc(surat_keluar::Column::Id)
    }

    fn record(m: &surat_keluar::Model, created_by: Option<&str>) -> Vec<String> {
        vec![
            m.no_urut.to_string(),
            m.klas.clone(),
            m.pengolah.label().to_string(),
            date(m.tanggal_surat),
            m.perihal_surat.clone(),
            m.kirim_kepada.clone(),
            opt(&m.keterangan),
            created_by.unwrap_or_default().to_string(),
        ]
    }

    fn created_by_id(m: &surat_keluar::Model) -> Option<i64> {
        Some(m.created_by_id)
    }
}

impl Export for surat_tamu::Entity {
    const RESOURCE: &'static str = "surat-tamu";
    const HEADERS: &'static [&'static str] =
        &["Tanggal", "Nama Tamu", "Instansi", "No HP", "Perihal", "Keterangan"];

    fn order(select: Select<Self>) -> Select<Self> {
        select
            .order_by_desc(surat_tamu::Column::Tanggal)
            .order_by_desc(surat_tamu::Column::Id)
    }

    fn record(m: &surat_tamu::Model, _created_by: Option<&str>) -> Vec<String> {
        vec![
            date(m.tanggal),
            m.nama_tamu.clone(),
            m.instansi.clone(),
            opt(&m.no_hp),
            m.perihal.clone(),
            opt(&m.keterangan),
        ]
    }
}

/// Serialize a header row and records into CSV bytes
pub fn write_csv<I>(headers: &[&str], records: I) -> AppResult<Vec<u8>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let csv_error = |e: csv::Error| AppError::Internal(format!("csv error: {}", e));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers).map_err(csv_error)?;
    for record in records {
        writer.write_record(&record).map_err(csv_error)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("csv error: {}", e)))
}

pub fn file_name(resource: &str, today: NaiveDate) -> String {
    format!("{}-{}.csv", resource, today.format("%Y%m%d"))
}

/// Filtered rows of `E` as CSV bytes
pub async fn export_rows<E: Export>(
    db: &DatabaseConnection,
    query: &ListQuery,
) -> AppResult<Vec<u8>> {
    let resolved = query.resolve()?;
    let select = apply_filters(E::find(), &resolved)?;
    let rows = E::order(select).limit(MAX_EXPORT_ROWS).all(db).await?;

    let users = load_user_refs(db, rows.iter().filter_map(E::created_by_id)).await?;
    let records = rows.iter().map(|row| {
        let creator = E::created_by_id(row)
            .and_then(|id| users.get(&id))
            .map(|u| u.name.as_str());
        E::record(row, creator)
    });
    write_csv(E::HEADERS, records)
}

async fn export<E: Export>(
    state: AppState,
    current_user: CurrentUser,
    query: ListQuery,
) -> AppResult<Response> {
    let data = export_rows::<E>(&state.db, &query).await?;
    let name = file_name(E::RESOURCE, Utc::now().date_naive());

    tracing::info!("Export {} by {} ({} bytes)", name, current_user.email, data.len());
    log_success(&current_user.email, Aksi::Ekspor, name.clone());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        Body::from(data),
    )
        .into_response())
}

/// GET /api/surat-masuk/export
pub async fn export_surat_masuk(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> AppResult<Response> {
    export::<surat_masuk::Entity>(state, current_user, query).await
}

/// GET /api/disposisi/export
pub async fn export_disposisi(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> AppResult<Response> {
    export::<disposisi::Entity>(state, current_user, query).await
}

/// GET /api/surat-keluar/export
pub async fn export_surat_keluar(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> AppResult<Response> {
    export::<surat_keluar::Entity>(state, current_user, query).await
}

/// GET /api/surat-tamu/export
pub async fn export_surat_tamu(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> AppResult<Response> {
    export::<surat_tamu::Entity>(state, current_user, query).await
}
