//! Guest letter entity
//!
//! Table: surat_tamu

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::query::{SearchTarget, Searchable};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "surat_tamu")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "String(Some(128))")]
    pub nama_tamu: String,

    #[sea_orm(column_type = "String(Some(255))")]
    pub instansi: String,

    #[sea_orm(column_type = "String(Some(32))", nullable)]
    pub no_hp: Option<String>,

    /// Visit date
    pub tanggal: Date,

    #[sea_orm(column_type = "Text")]
    pub perihal: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub keterangan: Option<String>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Searchable for Entity {
    const DEFAULT_SEARCH: &'static [&'static str] = &["namaTamu", "instansi", "perihal"];

    fn search_target(field: &str) -> Option<SearchTarget<Column>> {
        match field {
            "namaTamu" => Some(SearchTarget::Text(Column::NamaTamu)),
            "instansi" => Some(SearchTarget::Text(Column::Instansi)),
            "perihal" => Some(SearchTarget::Text(Column::Perihal)),
            _ => None,
        }
    }

    fn date_column() -> Column {
        Column::Tanggal
    }
}
