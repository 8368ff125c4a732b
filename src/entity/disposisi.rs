//! Disposition entity
//!
//! Table: disposisi

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::query::{SearchTarget, Searchable};

/// Disposition progress
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum StatusDisposisi {
    #[sea_orm(string_value = "PROSES")]
    #[serde(rename = "PROSES")]
    Proses,
    #[sea_orm(string_value = "SELESAI")]
    #[serde(rename = "SELESAI")]
    Selesai,
}

impl StatusDisposisi {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusDisposisi::Proses => "PROSES",
            StatusDisposisi::Selesai => "SELESAI",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "disposisi")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Copied from the source letter on creation, never updated
    pub no_urut: i32,

    pub tanggal_disposisi: Date,

    /// "Bagian" or "Bagian - Sub Bagian", see `crate::tujuan`
    #[sea_orm(column_type = "String(Some(255))")]
    pub tujuan_disposisi: String,

    #[sea_orm(column_type = "Text")]
    pub isi_disposisi: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub keterangan: Option<String>,

    pub status: StatusDisposisi,

    pub surat_masuk_id: i64,

    pub created_by_id: i64,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::surat_masuk::Entity",
        from = "Column::SuratMasukId",
        to = "super::surat_masuk::Column::Id"
    )]
    SuratMasuk,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedById",
        to = "super::user::Column::Id"
    )]
    CreatedBy,
}

impl Related<super::surat_masuk::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SuratMasuk.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreatedBy.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Searchable for Entity {
    const DEFAULT_SEARCH: &'static [&'static str] = &["tujuanDisposisi", "isiDisposisi"];

    fn search_target(field: &str) -> Option<SearchTarget<Column>> {
        match field {
            "noUrut" => Some(SearchTarget::Number(Column::NoUrut)),
            "tujuanDisposisi" => Some(SearchTarget::Text(Column::TujuanDisposisi)),
            "isiDisposisi" => Some(SearchTarget::Text(Column::IsiDisposisi)),
            "keterangan" => Some(SearchTarget::Text(Column::Keterangan)),
            _ => None,
        }
    }

    fn date_column() -> Column {
        Column::TanggalDisposisi
    }
}
