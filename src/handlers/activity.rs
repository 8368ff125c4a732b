//! Activity log handlers
//!
//! Query endpoint for administrators plus the background writer every
//! mutating handler reports to.

use axum::{
    extract::{Query, State},
    response::Json,
};
use sea_orm::{EntityTrait, PaginatorTrait, QueryOrder, QuerySelect};
use serde::Deserialize;

use crate::entity::log_aktivitas;
use crate::error::AppResult;
use crate::query::{ListEnvelope, ListQuery, DEFAULT_LIMIT};
use crate::state::AppState;

/// Query parameters for log pagination
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

/// GET /api/log-aktivitas
pub async fn query_log(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> AppResult<Json<ListEnvelope<log_aktivitas::Model>>> {
    let resolved = ListQuery {
        page: query.page,
        limit: query.limit,
        ..ListQuery::default()
    }
    .resolve()?;

    let logs = log_aktivitas::Entity::find()
        .order_by_desc(log_aktivitas::Column::Id)
        .offset(resolved.offset())
        .limit(resolved.limit)
        .all(&state.db)
        .await?;

    let total = log_aktivitas::Entity::find().count(&state.db).await?;

    Ok(Json(ListEnvelope::new(logs, total, &resolved)))
}

/// Service for adding activity logs
pub mod service {
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, Set};
    use tokio::sync::mpsc;

    use crate::entity::log_aktivitas::{self, Aksi, Hasil};

    /// Log entry to be added
    #[derive(Debug, Clone)]
    pub struct LogEntry {
        pub user_email: String,
        pub aksi: Aksi,
        pub deskripsi: String,
        pub hasil: Hasil,
    }

    /// Global log channel
    static LOG_TX: std::sync::OnceLock<mpsc::Sender<LogEntry>> = std::sync::OnceLock::new();

    /// Start the background writer. Calling it again is a no-op.
    pub fn init(db: sea_orm::DatabaseConnection) {
        if LOG_TX.get().is_some() {
            tracing::debug!("Activity log service already initialized, skipping");
            return;
        }

        let (tx, mut rx) = mpsc::channel::<LogEntry>(200);
        if LOG_TX.set(tx).is_err() {
            tracing::debug!("Activity log service initialized by another thread");
            return;
        }

        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                let log = log_aktivitas::ActiveModel {
                    waktu: Set(Utc::now()),
                    user_email: Set(entry.user_email),
                    aksi: Set(entry.aksi.label().to_string()),
                    deskripsi: Set(entry.deskripsi),
                    hasil: Set(entry.hasil.label().to_string()),
                    ..Default::default()
                };

                if let Err(e) = log.insert(&db).await {
                    tracing::error!("Failed to write activity log: {}", e);
                }
            }
        });
    }

    /// Queue an entry; dropped with a warning when the channel is full or not started
    pub fn add_log(entry: LogEntry) {
        if let Some(tx) = LOG_TX.get() {
            if tx.try_send(entry).is_err() {
                tracing::warn!("Log channel is full, activity log dropped");
            }
        } else {
            tracing::debug!(
                "Activity log service not initialized, log dropped: {} - {}",
                entry.aksi.label(),
                entry.deskripsi
            );
        }
    }

    pub fn log_activity(user_email: &str, aksi: Aksi, deskripsi: impl Into<String>, hasil: Hasil) {
        add_log(LogEntry {
            user_email: user_email.to_string(),
            aksi,
            deskripsi: deskripsi.into(),
            hasil,
        });
    }

    /// Shorthand for a successful action
    pub fn log_success(user_email: &str, aksi: Aksi, deskripsi: impl Into<String>) {
        log_activity(user_email, aksi, deskripsi, Hasil::Berhasil);
    }
}

#[cfg(test)]
mod tests {
    use super::service::*;
    use crate::entity::log_aktivitas::{Aksi, Hasil};

    #[test]
    fn test_log_without_service_is_dropped_quietly() {
        log_activity("admin@dprd.go.id", Aksi::Login, "", Hasil::Gagal);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Aksi::SalinDisposisi.label(), "Salin ke disposisi");
        assert_eq!(Hasil::Berhasil.label(), "Berhasil");
    }
}
