//! Dashboard summary

use axum::{extract::State, response::Json};
use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::entity::disposisi::{self, StatusDisposisi};
use crate::entity::{surat_keluar, surat_masuk, surat_tamu};
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub surat_masuk: u64,
    pub surat_masuk_bulan_ini: u64,
    pub surat_keluar: u64,
    pub surat_keluar_bulan_ini: u64,
    pub disposisi: u64,
    pub disposisi_proses: u64,
    pub disposisi_selesai: u64,
    pub surat_tamu: u64,
}

/// First day of the given date's month
fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

pub async fn collect_stats(db: &DatabaseConnection, today: NaiveDate) -> AppResult<DashboardStats> {
    let start = month_start(today);

    Ok(DashboardStats {
        surat_masuk: surat_masuk::Entity::find().count(db).await?,
        surat_masuk_bulan_ini: surat_masuk::Entity::find()
            .filter(surat_masuk::Column::TanggalSurat.gte(start))
            .count(db)
            .await?,
        surat_keluar: surat_keluar::Entity::find().count(db).await?,
        surat_keluar_bulan_ini: surat_keluar::Entity::find()
            .filter(surat_keluar::Column::TanggalSurat.gte(start))
            .count(db)
            .await?,
        disposisi: disposisi::Entity::find().count(db).await?,
        disposisi_proses: disposisi::Entity::find()
            .filter(disposisi::Column::Status.eq(StatusDisposisi::Proses))
            .count(db)
            .await?,
        disposisi_selesai: disposisi::Entity::find()
            .filter(disposisi::Column::Status.eq(StatusDisposisi::Selesai))
            .count(db)
            .await?,
        surat_tamu: surat_tamu::Entity::find().count(db).await?,
    })
}

/// GET /api/dashboard
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<DashboardStats>> {
    let today = Utc::now().date_naive();
    collect_stats(&state.db, today).await.map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn count_row(n: i64) -> Vec<BTreeMap<&'static str, Value>> {
        vec![BTreeMap::from([("num_items", Value::BigInt(Some(n)))])]
    }

    #[test]
    fn test_month_start() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(month_start(day), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[tokio::test]
    async fn test_collect_stats() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                count_row(120),
                count_row(8),
                count_row(40),
                count_row(3),
                count_row(90),
                count_row(15),
                count_row(75),
                count_row(12),
            ])
            .into_connection();

        let stats = collect_stats(&db, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap())
            .await
            .unwrap();
        assert_eq!(stats.surat_masuk, 120);
        assert_eq!(stats.surat_masuk_bulan_ini, 8);
        assert_eq!(stats.disposisi_proses + stats.disposisi_selesai, stats.disposisi);
        assert_eq!(stats.surat_tamu, 12);

        let log = db.into_transaction_log();
        assert!(format!("{:?}", log[1]).contains("2024-06-01"));
    }
}
