//! Copy-to-disposisi dialog as a state machine
//!
//! `Closed -> SelectingUnit -> [SelectingSubUnit] -> Confirm`. The unit
//! choice is only turned into a target string through [`Tujuan`], so the
//! dialog and the server agree on the `"Bagian - Sub Bagian"` format.

use chrono::NaiveDate;

use super::list::{ListController, ListSource};
use super::{ApiClient, ClientError};
use crate::entity::disposisi;
use crate::handlers::surat_masuk::CopyDisposisiRequest;
use crate::tujuan::Tujuan;
use crate::unit::{Bagian, UnitCatalog, UnitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStep {
    Closed,
    SelectingUnit,
    SelectingSubUnit,
    Confirm,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("Pilih tujuan disposisi terlebih dahulu")]
    UnitRequired,

    #[error("Pilih sub bagian terlebih dahulu")]
    SubUnitRequired,

    #[error("Dialog salin disposisi belum dibuka")]
    NotOpen,

    #[error(transparent)]
    Unit(#[from] UnitError),
}

impl From<FlowError> for ClientError {
    fn from(err: FlowError) -> Self {
        ClientError::Validation(err.to_string())
    }
}

pub struct CopyDisposisiFlow {
    units: UnitCatalog,
    step: CopyStep,
    surat_id: Option<i64>,
    bagian: Option<String>,
    sub_bagian: Option<String>,
    tanggal: NaiveDate,
    keterangan: String,
    /// Last validation or server message
    error: Option<String>,
}

impl CopyDisposisiFlow {
    pub fn new(units: UnitCatalog, today: NaiveDate) -> Self {
        Self {
            units,
            step: CopyStep::Closed,
            surat_id: None,
            bagian: None,
            sub_bagian: None,
            tanggal: today,
            keterangan: String::new(),
            error: None,
        }
    }

    pub fn step(&self) -> CopyStep {
        self.step
    }

    pub fn surat_id(&self) -> Option<i64> {
        self.surat_id
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected_unit(&self) -> Option<&Bagian> {
        self.bagian.as_deref().and_then(|name| self.units.find(name))
    }

    pub fn selected_sub_unit(&self) -> Option<&str> {
        self.sub_bagian.as_deref()
    }

    /// Choices for the current step
    pub fn options(&self) -> Vec<&str> {
        match self.step {
            CopyStep::SelectingUnit => self.units.units().iter().map(|b| b.name.as_str()).collect(),
            CopyStep::SelectingSubUnit => self
                .selected_unit()
                .map(|b| b.sub_bagian.iter().map(String::as_str).collect())
                .unwrap_or_default(),
            CopyStep::Closed | CopyStep::Confirm => Vec::new(),
        }
    }

    /// Start the dialog for one incoming letter, dropping any earlier choice
    pub fn open(&mut self, surat_id: i64, today: NaiveDate) {
        self.surat_id = Some(surat_id);
        self.bagian = None;
        self.sub_bagian = None;
        self.tanggal = today;
        self.keterangan.clear();
        self.error = None;
        self.step = CopyStep::SelectingUnit;
    }

    pub fn close(&mut self) {
        self.step = CopyStep::Closed;
        self.surat_id = None;
        self.bagian = None;
        self.sub_bagian = None;
        self.error = None;
    }

    pub fn select_unit(&mut self, name: &str) -> Result<CopyStep, FlowError> {
        if self.step == CopyStep::Closed {
            return Err(FlowError::NotOpen);
        }
        let bagian = self
            .units
            .find(name)
            .ok_or_else(|| UnitError::UnknownBagian(name.to_string()))?;

        self.step = if bagian.requires_sub_bagian() {
            CopyStep::SelectingSubUnit
        } else {
            CopyStep::Confirm
        };
        self.bagian = Some(bagian.name.clone());
        self.sub_bagian = None;
        self.error = None;
        Ok(self.step)
    }

    pub fn select_sub_unit(&mut self, name: &str) -> Result<CopyStep, FlowError> {
        let bagian = self.selected_unit().ok_or(FlowError::UnitRequired)?;
        if !bagian.has_sub_bagian(name) {
            return Err(UnitError::UnknownSubBagian {
                bagian: bagian.name.clone(),
                sub: name.to_string(),
            }
            .into());
        }
        self.sub_bagian = Some(name.to_string());
        self.step = CopyStep::Confirm;
        self.error = None;
        Ok(self.step)
    }

    /// One step back; the choice made at the step left is cleared
    pub fn back(&mut self) -> CopyStep {
        self.step = match self.step {
            CopyStep::Confirm if self.sub_bagian.is_some() => {
                self.sub_bagian = None;
                CopyStep::SelectingSubUnit
            }
            CopyStep::Confirm | CopyStep::SelectingSubUnit => {
                self.bagian = None;
                self.sub_bagian = None;
                CopyStep::SelectingUnit
            }
            other => other,
        };
        self.step
    }

    pub fn set_tanggal(&mut self, tanggal: NaiveDate) {
        self.tanggal = tanggal;
    }

    pub fn set_keterangan(&mut self, keterangan: impl Into<String>) {
        self.keterangan = keterangan.into();
    }

    /// Build the request, or say what is still missing
    pub fn confirm(&mut self) -> Result<(i64, CopyDisposisiRequest), FlowError> {
        let result = self.build();
        if let Err(e) = &result {
            self.error = Some(e.to_string());
        }
        result
    }

    fn build(&self) -> Result<(i64, CopyDisposisiRequest), FlowError> {
        let surat_id = self.surat_id.ok_or(FlowError::NotOpen)?;
        let bagian = self.selected_unit().ok_or(FlowError::UnitRequired)?;
        if bagian.requires_sub_bagian() && self.sub_bagian.is_none() {
            return Err(FlowError::SubUnitRequired);
        }

        let tujuan = Tujuan::new(&bagian.name, self.sub_bagian.as_deref()).map_err(UnitError::from)?;
        self.units.validate(&tujuan)?;

        let keterangan = self.keterangan.trim();
        Ok((
            surat_id,
            CopyDisposisiRequest {
                tujuan_disposisi: tujuan.encode(),
                tanggal_disposisi: self.tanggal,
                keterangan: (!keterangan.is_empty()).then(|| keterangan.to_string()),
            },
        ))
    }

    /// Confirm and post. Success closes the dialog and reloads the list;
    /// a server error stays in the dialog.
    pub async fn submit<S: ListSource>(
        &mut self,
        client: &ApiClient,
        list: &ListController<S>,
    ) -> Result<disposisi::Model, ClientError> {
        let (surat_id, req) = self.confirm()?;
        match client.copy_disposisi(surat_id, &req).await {
            Ok(created) => {
                self.close();
                list.reload();
                Ok(created)
            }
            Err(e) => {
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }
}
