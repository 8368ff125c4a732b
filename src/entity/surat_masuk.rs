//! Incoming letter entity
//!
//! Table: surat_masuk

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::query::{SearchTarget, Searchable};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "surat_masuk")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Register sequence number
    pub no_urut: i32,

    #[sea_orm(column_type = "String(Some(128))", nullable)]
    pub nomor_surat: Option<String>,

    pub tanggal_surat: Date,

    /// Date the letter was forwarded inside the secretariat
    pub tanggal_diteruskan: Date,

    #[sea_orm(column_type = "String(Some(255))")]
    pub asal_surat: String,

    #[sea_orm(column_type = "Text")]
    pub perihal: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub keterangan: Option<String>,

    /// Stored attachment name under the upload directory
    #[sea_orm(column_type = "String(Some(255))", nullable)]
    pub file_path: Option<String>,

    pub created_by_id: i64,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedById",
        to = "super::user::Column::Id"
    )]
    CreatedBy,
    #[sea_orm(has_many = "super::disposisi::Entity")]
    Disposisi,
    #[sea_orm(has_many = "super::surat_keluar::Entity")]
    SuratKeluar,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreatedBy.def()
    }
}

impl Related<super::disposisi::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Disposisi.def()
    }
}

impl Related<super::surat_keluar::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SuratKeluar.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Searchable for Entity {
    const DEFAULT_SEARCH: &'static [&'static str] = &["nomorSurat", "asalSurat", "perihal"];

    fn search_target(field: &str) -> Option<SearchTarget<Column>> {
        match field {
            "noUrut" => Some(SearchTarget::Number(Column::NoUrut)),
            "nomorSurat" => Some(SearchTarget::Text(Column::NomorSurat)),
            "asalSurat" => Some(SearchTarget::Text(Column::AsalSurat)),
            "perihal" => Some(SearchTarget::Text(Column::Perihal)),
            "keterangan" => Some(SearchTarget::Text(Column::Keterangan)),
            _ => None,
        }
    }

    fn date_column() -> Column {
        Column::TanggalSurat
    }
}
