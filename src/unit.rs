//! Organizational units of the secretariat (bagian / sub bagian)

use serde::{Deserialize, Serialize};

use crate::tujuan::{Tujuan, TujuanError};

/// A first-level unit and its sub-units
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bagian {
    pub name: String,
    #[serde(default, alias = "sub_bagian")]
    pub sub_bagian: Vec<String>,
}

impl Bagian {
    pub fn new(name: &str, sub_bagian: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            sub_bagian: sub_bagian.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Whether a disposition to this unit must name a sub-unit
    pub fn requires_sub_bagian(&self) -> bool {
        !self.sub_bagian.is_empty()
    }

    pub fn has_sub_bagian(&self, name: &str) -> bool {
        self.sub_bagian.iter().any(|s| s == name)
    }
}

/// Errors from resolving a target against the catalog
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    #[error("bagian \"{0}\" tidak dikenal")]
    UnknownBagian(String),

    #[error("sub bagian \"{sub}\" tidak ada di {bagian}")]
    UnknownSubBagian { bagian: String, sub: String },

    #[error("{0} memerlukan sub bagian")]
    SubBagianRequired(String),

    #[error("{0} tidak memiliki sub bagian")]
    SubBagianNotAllowed(String),

    #[error(transparent)]
    Tujuan(#[from] TujuanError),
}

/// Two-level unit tree
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UnitCatalog {
    units: Vec<Bagian>,
}

impl UnitCatalog {
    pub fn new(units: Vec<Bagian>) -> Self {
        Self { units }
    }

    pub fn units(&self) -> &[Bagian] {
        &self.units
    }

    pub fn find(&self, name: &str) -> Option<&Bagian> {
        self.units.iter().find(|b| b.name == name)
    }

    /// Check that a target names a known unit, and a known sub-unit exactly
    /// when the unit has any.
    pub fn validate(&self, tujuan: &Tujuan) -> Result<(), UnitError> {
        let bagian = self
            .find(&tujuan.bagian)
            .ok_or_else(|| UnitError::UnknownBagian(tujuan.bagian.clone()))?;

        match (&tujuan.sub_bagian, bagian.requires_sub_bagian()) {
            (None, false) => Ok(()),
            (None, true) => Err(UnitError::SubBagianRequired(bagian.name.clone())),
            (Some(_), false) => Err(UnitError::SubBagianNotAllowed(bagian.name.clone())),
            (Some(sub), true) if bagian.has_sub_bagian(sub) => Ok(()),
            (Some(sub), true) => Err(UnitError::UnknownSubBagian {
                bagian: bagian.name.clone(),
                sub: sub.clone(),
            }),
        }
    }

    /// Parse a stored target string and validate it
    pub fn resolve(&self, raw: &str) -> Result<Tujuan, UnitError> {
        let tujuan = Tujuan::parse(raw)?;
        self.validate(&tujuan)?;
        Ok(tujuan)
    }

    /// Reject names that could not survive a round trip through the target codec
    pub fn check_names(&self) -> Result<(), UnitError> {
        for bagian in &self.units {
            Tujuan::bagian(&bagian.name)?;
            for sub in &bagian.sub_bagian {
                Tujuan::new(&bagian.name, Some(sub))?;
            }
        }
        Ok(())
    }
}

impl Default for UnitCatalog {
    fn default() -> Self {
        Self::new(vec![
            Bagian::new("Sekretaris DPRD", &[]),
            Bagian::new(
                "Bagian Umum dan Keuangan",
                &[
                    "Sub Bagian Tata Usaha dan Kepegawaian",
                    "Sub Bagian Rumah Tangga dan Perlengkapan",
                    "Sub Bagian Keuangan",
                ],
            ),
            Bagian::new(
                "Bagian Persidangan dan Perundang-undangan",
                &[
                    "Sub Bagian Kajian Perundang-undangan",
                    "Sub Bagian Persidangan dan Risalah",
                ],
            ),
            Bagian::new(
                "Bagian Fasilitasi Penganggaran dan Pengawasan",
                &[
                    "Sub Bagian Fasilitasi Penganggaran",
                    "Sub Bagian Fasilitasi Pengawasan",
                    "Sub Bagian Kerja Sama dan Aspirasi",
                ],
            ),
        ])
    }
}
