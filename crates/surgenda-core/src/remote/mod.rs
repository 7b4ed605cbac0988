//! Remote store contract.
//!
//! The spreadsheet-backed remote store is the single source of truth for slot
//! data; this module defines the operations the client depends on, the raw
//! row format, and the error taxonomy. Every call carries the operator's
//! session token. [`mock::MockRemote`] provides the in-memory implementation
//! used by tests and offline development.

pub mod mock;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    format_date_key, parse_date_key, procedures_to_wire, truthy_flag, AuthUser, ContractClass,
    MonthKey, Occupancy, ProcedurePayload, SessionToken, Slot, SlotId, SlotStatus,
    SpecialtyCatalog,
};

/// Remote store errors. A transport loss and an explicit rejection are
/// handled identically by the booking layer.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Remote store rejected the request: {0}")]
    Rejected(String),

    #[error("Invalid response payload: {0}")]
    InvalidPayload(String),

    #[error("Token rejected by the remote store")]
    InvalidToken,
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Raw slot row as exchanged with the remote store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSlotRecord {
    pub id: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub doctor: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub patient: String,
    #[serde(default)]
    pub record: String,
    #[serde(default)]
    pub contract: String,
    #[serde(default, deserialize_with = "truthy_flag")]
    pub regulated: bool,
    #[serde(default)]
    pub procedure: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub eye: String,
    #[serde(default)]
    pub created_by: String,
}

impl RawSlotRecord {
    /// Decode into a typed slot. Rows without a usable id, date, or status
    /// are skipped, mirroring what the original client ignored.
    pub fn decode(&self) -> Option<Slot> {
        if self.id.trim().is_empty() {
            return None;
        }
        let date = parse_date_key(&self.date)?;
        let status = SlotStatus::parse(&self.status)?;

        let occupancy = (status == SlotStatus::Occupied).then(|| Occupancy {
            patient: self.patient.clone(),
            record: self.record.clone(),
            contract: ContractClass::parse(&self.contract),
            procedures: ProcedurePayload::from_wire(&self.procedure).decode(self.regulated),
            regulated: self.regulated,
            detail: self.detail.clone(),
            eye: self.eye.clone(),
            booked_by: self.created_by.clone(),
        });

        Some(Slot {
            id: SlotId::new(self.id.clone()),
            date,
            time: self.time.clone(),
            room: self.room.clone(),
            location: self.location.clone(),
            doctor: self.doctor.clone(),
            specialty: self.specialty.clone(),
            status,
            occupancy,
        })
    }

    /// Encode a typed slot back into the wire row shape.
    pub fn from_slot(slot: &Slot) -> Self {
        let occupancy = slot.occupancy.clone().unwrap_or_default();
        Self {
            id: slot.id.as_str().to_string(),
            date: format_date_key(slot.date),
            time: slot.time.clone(),
            room: slot.room.clone(),
            location: slot.location.clone(),
            doctor: slot.doctor.clone(),
            specialty: slot.specialty.clone(),
            status: slot.status.wire_name().to_string(),
            patient: occupancy.patient,
            record: occupancy.record,
            contract: occupancy
                .contract
                .map(|c| c.wire_name().to_string())
                .unwrap_or_default(),
            regulated: occupancy.regulated,
            procedure: procedures_to_wire(&occupancy.procedures),
            detail: occupancy.detail,
            eye: occupancy.eye,
            created_by: occupancy.booked_by,
        }
    }
}

/// Field set of a single-slot update write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotUpdate {
    pub id: String,
    pub status: String,
    pub patient: String,
    pub record: String,
    pub contract: String,
    pub regulated: Option<bool>,
    pub procedure: String,
    pub detail: String,
    pub eye: String,
    pub created_by: String,
}

impl SlotUpdate {
    /// Update claiming or editing a slot with an occupancy payload.
    pub fn occupy(id: &SlotId, occupancy: &Occupancy) -> Self {
        Self {
            id: id.as_str().to_string(),
            status: SlotStatus::Occupied.wire_name().to_string(),
            patient: occupancy.patient.clone(),
            record: occupancy.record.clone(),
            contract: occupancy
                .contract
                .map(|c| c.wire_name().to_string())
                .unwrap_or_default(),
            regulated: Some(occupancy.regulated),
            procedure: procedures_to_wire(&occupancy.procedures),
            detail: occupancy.detail.clone(),
            eye: occupancy.eye.clone(),
            created_by: occupancy.booked_by.clone(),
        }
    }

    /// Update releasing a slot back to free, clearing the payload.
    pub fn release(id: &SlotId, by: &str) -> Self {
        Self {
            id: id.as_str().to_string(),
            status: SlotStatus::Free.wire_name().to_string(),
            patient: String::new(),
            record: String::new(),
            contract: String::new(),
            regulated: None,
            procedure: String::new(),
            detail: String::new(),
            eye: String::new(),
            created_by: by.to_string(),
        }
    }
}

/// Mutating action understood by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WriteAction {
    Update(SlotUpdate),
    CreateBulk { data: Vec<RawSlotRecord> },
    Delete { id: String },
    DeleteBulk { ids: Vec<String> },
}

/// Acknowledgment of an accepted write. Rejections surface as
/// [`RemoteError::Rejected`] instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Rows affected, when the remote store reports it.
    pub count: Option<u32>,
}

/// Verification result for a session token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VerifyOutcome {
    pub valid: bool,
    pub user: Option<AuthUser>,
}

/// Operations the client depends on; the remote store owns the exact schema.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read every slot row for one calendar date.
    async fn read_day(
        &self,
        date: NaiveDate,
        token: &SessionToken,
    ) -> RemoteResult<Vec<RawSlotRecord>>;

    /// Read every slot row for one month.
    async fn read_month(
        &self,
        month: MonthKey,
        token: &SessionToken,
    ) -> RemoteResult<Vec<RawSlotRecord>>;

    /// Submit a mutating action.
    async fn write(&self, action: &WriteAction, token: &SessionToken)
        -> RemoteResult<WriteReceipt>;

    /// Verify a session token and fetch the identity behind it.
    async fn verify(&self, token: &SessionToken) -> RemoteResult<VerifyOutcome>;

    /// Fetch the specialty → allowed-procedures catalog.
    async fn procedures_catalog(&self, token: &SessionToken) -> RemoteResult<SpecialtyCatalog>;
}

// Shared handles delegate, so several client contexts can sit on one store.
#[async_trait]
impl<T: RemoteStore + ?Sized> RemoteStore for std::sync::Arc<T> {
    async fn read_day(
        &self,
        date: NaiveDate,
        token: &SessionToken,
    ) -> RemoteResult<Vec<RawSlotRecord>> {
        (**self).read_day(date, token).await
    }

    async fn read_month(
        &self,
        month: MonthKey,
        token: &SessionToken,
    ) -> RemoteResult<Vec<RawSlotRecord>> {
        (**self).read_month(month, token).await
    }

    async fn write(
        &self,
        action: &WriteAction,
        token: &SessionToken,
    ) -> RemoteResult<WriteReceipt> {
        (**self).write(action, token).await
    }

    async fn verify(&self, token: &SessionToken) -> RemoteResult<VerifyOutcome> {
        (**self).verify(token).await
    }

    async fn procedures_catalog(&self, token: &SessionToken) -> RemoteResult<SpecialtyCatalog> {
        (**self).procedures_catalog(token).await
    }
}
