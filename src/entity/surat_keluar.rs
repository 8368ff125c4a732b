//! Outgoing letter entity
//!
//! Table: surat_keluar

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::query::{SearchTarget, Searchable};

/// Official who handles the outgoing letter
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum Pengolah {
    #[sea_orm(string_value = "KETUA_DPRD")]
    #[serde(rename = "KETUA_DPRD")]
    KetuaDprd,
    #[sea_orm(string_value = "WAKIL_KETUA_I")]
    #[serde(rename = "WAKIL_KETUA_I")]
    WakilKetuaI,
    #[sea_orm(string_value = "WAKIL_KETUA_II")]
    #[serde(rename = "WAKIL_KETUA_II")]
    WakilKetuaII,
    #[sea_orm(string_value = "WAKIL_KETUA_III")]
    #[serde(rename = "WAKIL_KETUA_III")]
    WakilKetuaIII,
    #[sea_orm(string_value = "SEKRETARIS_DPRD")]
    #[serde(rename = "SEKRETARIS_DPRD")]
    SekretarisDprd,
}

impl Pengolah {
    pub fn label(&self) -> &'static str {
        match self {
            Pengolah::KetuaDprd => "Ketua DPRD",
            Pengolah::WakilKetuaI => "Wakil Ketua I",
            Pengolah::WakilKetuaII => "Wakil Ketua II",
            Pengolah::WakilKetuaIII => "Wakil Ketua III",
            Pengolah::SekretarisDprd => "Sekretaris DPRD",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "surat_keluar")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub no_urut: i32,

    /// Classification code
    #[sea_orm(column_type = "String(Some(32))")]
    pub klas: String,

    pub pengolah: Pengolah,

    pub tanggal_surat: Date,

    #[sea_orm(column_type = "Text")]
    pub perihal_surat: String,

    #[sea_orm(column_type = "String(Some(255))")]
    pub kirim_kepada: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub keterangan: Option<String>,

    /// Incoming letter this one answers, if any
    #[sea_orm(nullable)]
    pub surat_masuk_id: Option<i64>,

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
    const DEFAULT_SEARCH: &'static [&'static str] = &["klas", "perihalSurat", "kirimKepada"];

    fn search_target(field: &str) -> Option<SearchTarget<Column>> {
        match field {
            "noUrut" => Some(SearchTarget::Number(Column::NoUrut)),
            "klas" => Some(SearchTarget::Text(Column::Klas)),
            "perihalSurat" => Some(SearchTarget::Text(Column::PerihalSurat)),
            "kirimKepada" => Some(SearchTarget::Text(Column::KirimKepada)),
            "keterangan" => Some(SearchTarget::Text(Column::Keterangan)),
            _ => None,
        }
    }

    fn date_column() -> Column {
        Column::TanggalSurat
    }
}
