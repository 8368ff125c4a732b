//! Entity module - SeaORM entity definitions

pub mod disposisi;
pub mod log_aktivitas;
pub mod surat_keluar;
pub mod surat_masuk;
pub mod surat_tamu;
pub mod user;
