//! Activity log entity
//!
//! Table: log_aktivitas

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Logged action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aksi {
    Login,
    Logout,
    TambahSuratMasuk,
    UbahSuratMasuk,
    HapusSuratMasuk,
    UnggahLampiran,
    SalinDisposisi,
    TambahDisposisi,
    UbahDisposisi,
    HapusDisposisi,
    TambahSuratKeluar,
    UbahSuratKeluar,
    HapusSuratKeluar,
    TambahSuratTamu,
    HapusSuratTamu,
    TambahUser,
    UbahUser,
    HapusUser,
    Ekspor,
}

impl Aksi {
    /// Display text stored in the log
    pub fn label(&self) -> &'static str {
        match self {
            Aksi::Login => "Login",
            Aksi::Logout => "Logout",
            Aksi::TambahSuratMasuk => "Tambah surat masuk",
            Aksi::UbahSuratMasuk => "Ubah surat masuk",
            Aksi::HapusSuratMasuk => "Hapus surat masuk",
            Aksi::UnggahLampiran => "Unggah lampiran",
            Aksi::SalinDisposisi => "Salin ke disposisi",
            Aksi::TambahDisposisi => "Tambah disposisi",
            Aksi::UbahDisposisi => "Ubah disposisi",
            Aksi::HapusDisposisi => "Hapus disposisi",
            Aksi::TambahSuratKeluar => "Tambah surat keluar",
            Aksi::UbahSuratKeluar => "Ubah surat keluar",
            Aksi::HapusSuratKeluar => "Hapus surat keluar",
            Aksi::TambahSuratTamu => "Tambah surat tamu",
            Aksi::HapusSuratTamu => "Hapus surat tamu",
            Aksi::TambahUser => "Tambah user",
            Aksi::UbahUser => "Ubah user",
            Aksi::HapusUser => "Hapus user",
            Aksi::Ekspor => "Ekspor data",
        }
    }
}

/// Outcome of the logged action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hasil {
    Berhasil,
    Gagal,
}

impl Hasil {
    pub fn label(&self) -> &'static str {
        match self {
            Hasil::Berhasil => "Berhasil",
            Hasil::Gagal => "Gagal",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "log_aktivitas")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub waktu: DateTimeUtc,

    #[sea_orm(column_type = "String(Some(128))")]
    pub user_email: String,

    #[sea_orm(column_type = "String(Some(64))")]
    pub aksi: String,

    #[sea_orm(column_type = "Text")]
    pub deskripsi: String,

    #[sea_orm(column_type = "String(Some(16))")]
    pub hasil: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
