//! Request handlers module

use std::collections::HashMap;

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};

use crate::entity::user::{self as user_entity, UserRef};
use crate::error::AppResult;

pub mod activity;
pub mod auth;
pub mod dashboard;
pub mod disposisi;
pub mod export;
pub mod surat_keluar;
pub mod surat_masuk;
pub mod surat_tamu;
pub mod unit;
pub mod user;

/// Number of child rows per parent id, for the `_count` blocks of list responses
pub(crate) async fn count_grouped<E: EntityTrait>(
    db: &DatabaseConnection,
    parent_col: E::Column,
    ids: &[i64],
) -> AppResult<HashMap<i64, u64>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i64, i64)> = E::find()
        .select_only()
        .column(parent_col)
        .column_as(Expr::col((E::default(), parent_col)).count(), "count")
        .filter(parent_col.is_in(ids.iter().copied()))
        .group_by(parent_col)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows.into_iter().map(|(id, n)| (id, n as u64)).collect())
}

/// `{ id, name }` of the given users, keyed by id
pub(crate) async fn load_user_refs(
    db: &DatabaseConnection,
    ids: impl IntoIterator<Item = i64>,
) -> AppResult<HashMap<i64, UserRef>> {
    let mut ids: Vec<i64> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = user_entity::Entity::find()
        .filter(user_entity::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(users.into_iter().map(|u| (u.id, UserRef::from(u))).collect())
}

/// Next register number: highest existing one plus one
pub(crate) async fn next_no_urut<E: EntityTrait>(
    db: &DatabaseConnection,
    col: E::Column,
) -> AppResult<i32> {
    let max: Option<Option<i32>> = E::find()
        .select_only()
        .column_as(Expr::col((E::default(), col)).max(), "max")
        .into_tuple()
        .one(db)
        .await?;

    max.flatten()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| crate::error::AppError::Conflict("nomor urut sudah mencapai batas".to_string()))
}

/// Trim optional free text, mapping blank to `None`
pub(crate) fn normalize_text(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Reject blank required text fields
pub(crate) fn require_text(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::error::AppError::Validation(format!("{} wajib diisi", field)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::surat_masuk;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text(Some("  ".into())), None);
        assert_eq!(normalize_text(Some(" segera ".into())), Some("segera".into()));
        assert_eq!(normalize_text(None), None);
    }

    #[test]
    fn test_require_text() {
        assert!(require_text("  ", "perihal").is_err());
        assert_eq!(require_text(" Undangan ", "perihal").unwrap(), "Undangan");
    }

    #[tokio::test]
    async fn test_next_no_urut() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![BTreeMap::from([("max", sea_orm::Value::Int(Some(41)))])]])
            .into_connection();
        let next = next_no_urut::<surat_masuk::Entity>(&db, surat_masuk::Column::NoUrut)
            .await
            .unwrap();
        assert_eq!(next, 42);
    }

    #[tokio::test]
    async fn test_next_no_urut_on_empty_table() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![BTreeMap::from([("max", sea_orm::Value::Int(None))])]])
            .into_connection();
        let next = next_no_urut::<surat_masuk::Entity>(&db, surat_masuk::Column::NoUrut)
            .await
            .unwrap();
        assert_eq!(next, 1);
    }

    #[tokio::test]
    async fn test_next_no_urut_at_limit_is_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![BTreeMap::from([("max", sea_orm::Value::Int(Some(i32::MAX)))])]])
            .into_connection();
        let result = next_no_urut::<surat_masuk::Entity>(&db, surat_masuk::Column::NoUrut).await;
        assert!(matches!(result, Err(crate::error::AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_count_grouped_skips_query_for_empty_ids() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let counts = count_grouped::<crate::entity::disposisi::Entity>(
            &db,
            crate::entity::disposisi::Column::SuratMasukId,
            &[],
        )
        .await
        .unwrap();
        assert!(counts.is_empty());
    }
}
