//! User handlers
//!
//! Implements user CRUD operations for administrators

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use crate::access::Role;
use crate::entity::log_aktivitas::Aksi;
use crate::entity::{disposisi, surat_keluar, surat_masuk, user};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::activity::service::log_success;
use crate::handlers::{count_grouped, require_text};
use crate::middleware::auth::CurrentUser;
use crate::query::{like_pattern, ListEnvelope, ListQuery};
use crate::routes::ApiResponse;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

/// Add user request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Update user request; a blank or missing password keeps the old one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCount {
    pub surat_masuk: u64,
    pub disposisi: u64,
    pub surat_keluar: u64,
}

/// User response
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: user::Model,
    #[serde(rename = "_count")]
    pub count: UserCount,
}

fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !email.contains(' '),
        None => false,
    };
    if !valid {
        return Err(AppError::Validation(format!("email tidak valid: {}", raw.trim())));
    }
    Ok(email)
}

fn hash_password(password: &str) -> AppResult<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password minimal {} karakter",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

/// Another account already using this email
async fn check_email_free(
    db: &DatabaseConnection,
    email: &str,
    except_id: Option<i64>,
) -> AppResult<()> {
    let mut select = user::Entity::find().filter(user::Column::Email.eq(email));
    if let Some(id) = except_id {
        select = select.filter(user::Column::Id.ne(id));
    }
    if select.one(db).await?.is_some() {
        return Err(AppError::Conflict(format!("email {} sudah terdaftar", email)));
    }
    Ok(())
}

async fn with_counts(
    db: &DatabaseConnection,
    users: Vec<user::Model>,
) -> AppResult<Vec<UserResponse>> {
    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
    let masuk =
        count_grouped::<surat_masuk::Entity>(db, surat_masuk::Column::CreatedById, &ids).await?;
    let disp = count_grouped::<disposisi::Entity>(db, disposisi::Column::CreatedById, &ids).await?;
    let keluar =
        count_grouped::<surat_keluar::Entity>(db, surat_keluar::Column::CreatedById, &ids).await?;

    Ok(users
        .into_iter()
        .map(|u| UserResponse {
            count: UserCount {
                surat_masuk: masuk.get(&u.id).copied().unwrap_or(0),
                disposisi: disp.get(&u.id).copied().unwrap_or(0),
                surat_keluar: keluar.get(&u.id).copied().unwrap_or(0),
            },
            user: u,
        })
        .collect())
}

/// GET /api/users
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListEnvelope<UserResponse>>> {
    let resolved = query.resolve()?;

    let mut select = user::Entity::find();
    if let Some(search) = &resolved.search {
        let pattern = like_pattern(&search.term);
        let lower = |col: user::Column| {
            Expr::expr(Func::lower(Expr::col((user::Entity, col)))).like(pattern.clone())
        };
        select = select.filter(
            Condition::any()
                .add(lower(user::Column::Name))
                .add(lower(user::Column::Email)),
        );
    }

    let total = select.clone().count(&state.db).await?;
    let users = select
        .order_by_asc(user::Column::Name)
        .offset(resolved.offset())
        .limit(resolved.limit)
        .all(&state.db)
        .await?;

    let data = with_counts(&state.db, users).await?;
    Ok(Json(ListEnvelope::new(data, total, &resolved)))
}

/// GET /api/users/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<UserResponse>> {
    let found = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found("user tidak ditemukan")?;

    let mut data = with_counts(&state.db, vec![found]).await?;
    data.pop().ok_or_not_found("user tidak ditemukan").map(Json)
}

pub async fn create_user(db: &DatabaseConnection, req: CreateUserRequest) -> AppResult<user::Model> {
    let name = require_text(&req.name, "nama")?;
    let email = normalize_email(&req.email)?;
    check_email_free(db, &email, None).await?;
    let password = hash_password(&req.password)?;

    let now = Utc::now();
    let created = user::ActiveModel {
        name: Set(name),
        email: Set(email),
        password: Set(password),
        role: Set(req.role),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(created)
}

/// POST /api/users
pub async fn create(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<user::Model>)> {
    let created = create_user(&state.db, req).await?;
    tracing::info!("User created: {} ({})", created.email, created.role.as_str());
    log_success(
        &current_user.email,
        Aksi::TambahUser,
        format!("{} ({})", created.email, created.role.as_str()),
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// Apply an update on behalf of `actor`. An admin cannot take away their
/// own admin role.
pub async fn update_user(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    id: i64,
    req: UpdateUserRequest,
) -> AppResult<user::Model> {
    let name = require_text(&req.name, "nama")?;
    let email = normalize_email(&req.email)?;

    if id == actor.id && actor.is_admin() && req.role != Role::Admin {
        return Err(AppError::BadRequest(
            "tidak dapat menurunkan peran akun sendiri".into(),
        ));
    }

    let existing = user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_not_found("user tidak ditemukan")?;
    check_email_free(db, &email, Some(id)).await?;

    let mut active: user::ActiveModel = existing.into();
    active.name = Set(name);
    active.email = Set(email);
    active.role = Set(req.role);
    if let Some(password) = req.password.as_deref().filter(|p| !p.is_empty()) {
        active.password = Set(hash_password(password)?);
    }
    active.updated_at = Set(Utc::now());

    Ok(active.update(db).await?)
}

/// PUT /api/users/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<Json<user::Model>> {
    let updated = update_user(&state.db, &current_user, id, req).await?;
    log_success(&current_user.email, Aksi::UbahUser, updated.email.clone());
    Ok(Json(updated))
}

/// Delete an account that never recorded a letter. Nobody can delete
/// their own account.
pub async fn delete_user(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    id: i64,
) -> AppResult<user::Model> {
    if id == actor.id {
        return Err(AppError::BadRequest("tidak dapat menghapus akun sendiri".into()));
    }

    let existing = user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_not_found("user tidak ditemukan")?;

    let letters = surat_masuk::Entity::find()
        .filter(surat_masuk::Column::CreatedById.eq(id))
        .count(db)
        .await?
        + disposisi::Entity::find()
            .filter(disposisi::Column::CreatedById.eq(id))
            .count(db)
            .await?
        + surat_keluar::Entity::find()
            .filter(surat_keluar::Column::CreatedById.eq(id))
            .count(db)
            .await?;
    if letters > 0 {
        return Err(AppError::Conflict(format!(
            "user masih tercatat sebagai pembuat {} data surat",
            letters
        )));
    }

    user::Entity::delete_by_id(id).exec(db).await?;
    Ok(existing)
}

/// DELETE /api/users/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let deleted = delete_user(&state.db, &current_user, id).await?;
    log_success(&current_user.email, Aksi::HapusUser, deleted.email);
    Ok(Json(ApiResponse::success_msg("user dihapus")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;

    fn admin(id: i64) -> CurrentUser {
        CurrentUser {
            id,
            name: "Admin".into(),
            email: "admin@dprd.go.id".into(),
            role: Role::Admin,
        }
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
    }

    fn model(id: i64, email: &str) -> user::Model {
        user::Model {
            id,
            name: "Rina".into(),
            email: email.into(),
            password: "$2b$04$hash".into(),
            role: Role::Member,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: "Rina".into(),
            email: email.into(),
            password: "rahasia123".into(),
            role: Role::Member,
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Rina@DPRD.go.id ").unwrap(), "rina@dprd.go.id");
        assert!(normalize_email("rina").is_err());
        assert!(normalize_email("@dprd.go.id").is_err());
        assert!(normalize_email("rina@localhost").is_err());
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(hash_password("123"), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(3, "rina@dprd.go.id")]])
            .into_connection();
        let err = create_user(&db, request("RINA@dprd.go.id")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_create_hashes_password() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([vec![model(4, "rina@dprd.go.id")]])
            .into_connection();
        let created = create_user(&db, request("rina@dprd.go.id")).await.unwrap();
        assert_eq!(created.id, 4);

        let log = db.into_transaction_log();
        let insert_sql = format!("{:?}", log[1]);
        assert!(!insert_sql.contains("rahasia123"), "{}", insert_sql);
        assert!(insert_sql.contains("$2"), "{}", insert_sql);
    }

    #[test]
    fn test_password_never_serialized() {
        let resp = UserResponse {
            user: model(1, "rina@dprd.go.id"),
            count: UserCount { surat_masuk: 3, ..Default::default() },
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "MEMBER");
        assert_eq!(json["_count"]["suratMasuk"], 3);
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let err = delete_user(&db, &admin(1), 1).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_delete_user_with_letters_is_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(5, "rina@dprd.go.id")]])
            .append_query_results([vec![count_row(2)], vec![count_row(0)], vec![count_row(1)]])
            .into_connection();
        let err = delete_user(&db, &admin(1), 5).await.unwrap_err();
        match err {
            AppError::Conflict(msg) => assert!(msg.contains("3 data surat"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_user_without_letters() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(5, "rina@dprd.go.id")]])
            .append_query_results([vec![count_row(0)], vec![count_row(0)], vec![count_row(0)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let deleted = delete_user(&db, &admin(1), 5).await.unwrap();
        assert_eq!(deleted.email, "rina@dprd.go.id");

        let log = db.into_transaction_log();
        assert!(format!("{:?}", log[4]).contains("DELETE FROM \"app_user\""), "{:?}", log[4]);
    }

    #[tokio::test]
    async fn test_admin_cannot_demote_self() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let req = UpdateUserRequest {
            name: "Admin".into(),
            email: "admin@dprd.go.id".into(),
            password: None,
            role: Role::Member,
        };
        let err = update_user(&db, &admin(1), 1, req).await.unwrap_err();
        match err {
            AppError::BadRequest(msg) => assert!(msg.contains("akun sendiri"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_admin_can_demote_other_user() {
        let mut demoted = model(5, "rina@dprd.go.id");
        demoted.role = Role::Member;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(5, "rina@dprd.go.id")]])
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([vec![demoted]])
            .into_connection();
        let req = UpdateUserRequest {
            name: "Rina".into(),
            email: "rina@dprd.go.id".into(),
            password: Some(String::new()),
            role: Role::Member,
        };
        let updated = update_user(&db, &admin(1), 5, req).await.unwrap();
        assert_eq!(updated.role, Role::Member);
    }
}
