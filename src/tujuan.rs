//! Disposition target codec
//!
//! A disposition target is stored as a single string: the bare unit name
//! (`"Bagian Umum"`) or unit and sub-unit joined by [`SEPARATOR`]
//! (`"Bagian Umum - Sub Bagian Rumah Tangga"`). Every place that builds or
//! reads `tujuan_disposisi` goes through this module.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between unit and sub-unit
pub const SEPARATOR: &str = " - ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TujuanError {
    #[error("tujuan disposisi tidak boleh kosong")]
    Empty,

    #[error("sub bagian tidak boleh kosong")]
    EmptySubBagian,

    /// A name contains the separator, so the encoded form could not be read back.
    #[error("nama \"{0}\" tidak boleh mengandung \" - \"")]
    AmbiguousSeparator(String),
}

/// Target unit of a disposition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tujuan {
    pub bagian: String,
    pub sub_bagian: Option<String>,
}

impl Tujuan {
    /// Build a target, rejecting blank names and names containing the separator.
    pub fn new(bagian: &str, sub_bagian: Option<&str>) -> Result<Self, TujuanError> {
        let bagian = check_part(bagian, TujuanError::Empty)?;
        let sub_bagian = match sub_bagian {
            Some(sub) => Some(check_part(sub, TujuanError::EmptySubBagian)?),
            None => None,
        };
        Ok(Self { bagian, sub_bagian })
    }

    pub fn bagian(bagian: &str) -> Result<Self, TujuanError> {
        Self::new(bagian, None)
    }

    pub fn encode(&self) -> String {
        match &self.sub_bagian {
            Some(sub) => format!("{}{}{}", self.bagian, SEPARATOR, sub),
            None => self.bagian.clone(),
        }
    }

    /// Parse a stored target. The first separator splits unit from sub-unit;
    /// a second one is rejected because the split would be a guess.
    pub fn parse(raw: &str) -> Result<Self, TujuanError> {
        match raw.trim().split_once(SEPARATOR) {
            Some((bagian, sub)) => Self::new(bagian, Some(sub)),
            None => Self::bagian(raw),
        }
    }
}

fn check_part(part: &str, empty: TujuanError) -> Result<String, TujuanError> {
    let trimmed = part.trim();
    if trimmed.is_empty() {
        return Err(empty);
    }
    if trimmed.contains(SEPARATOR) {
        return Err(TujuanError::AmbiguousSeparator(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

impl fmt::Display for Tujuan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Tujuan {
    type Err = TujuanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_bagian_only() {
        let t = Tujuan::bagian("Bagian Umum").unwrap();
        assert_eq!(t.encode(), "Bagian Umum");
    }

    #[test]
    fn test_encode_with_sub_bagian() {
        let t = Tujuan::new("Bagian Umum", Some("Sub Bagian Rumah Tangga")).unwrap();
        assert_eq!(t.encode(), "Bagian Umum - Sub Bagian Rumah Tangga");
    }

    #[test]
    fn test_parse_back() {
        let t = Tujuan::parse("Bagian Persidangan - Sub Bagian Risalah").unwrap();
        assert_eq!(t.bagian, "Bagian Persidangan");
        assert_eq!(t.sub_bagian.as_deref(), Some("Sub Bagian Risalah"));

        let t = Tujuan::parse("Sekretaris DPRD").unwrap();
        assert_eq!(t.bagian, "Sekretaris DPRD");
        assert!(t.sub_bagian.is_none());
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let cases = [
            ("Bagian Umum", None),
            ("Bagian Umum", Some("Sub Bagian Tata Usaha")),
            ("Bagian Keuangan-Aset", Some("Sub-Bagian Verifikasi")),
        ];
        for (bagian, sub) in cases {
            let t = Tujuan::new(bagian, sub).unwrap();
            assert_eq!(Tujuan::parse(&t.encode()).unwrap(), t);
        }
    }

    #[test]
    fn test_hyphen_without_spaces_is_not_a_separator() {
        let t = Tujuan::parse("Bagian Keuangan-Aset").unwrap();
        assert_eq!(t.bagian, "Bagian Keuangan-Aset");
        assert!(t.sub_bagian.is_none());
    }

    #[test]
    fn test_separator_in_name_is_rejected() {
        let err = Tujuan::new("Bagian A - B", None).unwrap_err();
        assert!(matches!(err, TujuanError::AmbiguousSeparator(_)));

        let err = Tujuan::parse("Bagian A - Sub B - C").unwrap_err();
        assert!(matches!(err, TujuanError::AmbiguousSeparator(_)));
    }

    #[test]
    fn test_blank_parts_are_rejected() {
        assert_eq!(Tujuan::parse("   ").unwrap_err(), TujuanError::Empty);
        assert_eq!(
            Tujuan::new("Bagian Umum", Some(" ")).unwrap_err(),
            TujuanError::EmptySubBagian
        );
    }

    #[test]
    fn test_names_are_trimmed() {
        let t = Tujuan::new("  Bagian Umum ", Some(" Sub Bagian Perlengkapan")).unwrap();
        assert_eq!(t.encode(), "Bagian Umum - Sub Bagian Perlengkapan");
    }
}
