//! Slot records and their lifecycle.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::calendar::MonthKey;
use super::contract::ContractClass;
use super::procedure::ProcedureEntry;

/// Opaque slot identifier, stable across fetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Mint a locally-unique identifier: UUID v7, a millisecond timestamp
    /// plus a random component, so ids minted in the same tick never collide.
    pub fn mint() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status (wire values `LIVRE`, `OCUPADO`, `EXCLUIDO`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    Free,
    Occupied,
    /// Deleted on the remote store; filtered at ingest, never cached.
    Deleted,
}

impl SlotStatus {
    /// Parse a wire status string.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "LIVRE" => Some(Self::Free),
            "OCUPADO" => Some(Self::Occupied),
            "EXCLUIDO" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Canonical wire name.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Free => "LIVRE",
            Self::Occupied => "OCUPADO",
            Self::Deleted => "EXCLUIDO",
        }
    }
}

/// Occupancy payload, meaningful only while a slot is occupied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Occupancy {
    /// Patient name
    pub patient: String,
    /// Medical-record identifier
    pub record: String,
    /// Contract class; legacy rows may lack one
    pub contract: Option<ContractClass>,
    /// Canonical procedure entry list (decoded once at ingest)
    pub procedures: Vec<ProcedureEntry>,
    /// Legacy slot-level regulated flag; counting fallback when the
    /// procedure list is empty
    pub regulated: bool,
    /// Free-text detail
    pub detail: String,
    /// Eye/side indicator
    pub eye: String,
    /// User who last wrote the slot
    pub booked_by: String,
}

/// One bookable appointment unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    /// Calendar date; also the storage bucket key
    pub date: NaiveDate,
    /// Time of day, `HH:MM` as on the wire
    pub time: String,
    pub room: String,
    /// Facility/location name
    pub location: String,
    /// Attending staff name
    pub doctor: String,
    /// Specialty/category group
    pub specialty: String,
    pub status: SlotStatus,
    pub occupancy: Option<Occupancy>,
}

impl Slot {
    /// Create a free slot (the shape bulk generation mints).
    pub fn free(
        id: SlotId,
        date: NaiveDate,
        time: impl Into<String>,
        room: impl Into<String>,
    ) -> Self {
        Self {
            id,
            date,
            time: time.into(),
            room: room.into(),
            location: String::new(),
            doctor: String::new(),
            specialty: String::new(),
            status: SlotStatus::Free,
            occupancy: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.status == SlotStatus::Free
    }

    pub fn month_key(&self) -> MonthKey {
        MonthKey::of(self.date)
    }

    /// Procedure entries; empty while the slot is free.
    pub fn procedures(&self) -> &[ProcedureEntry] {
        self.occupancy
            .as_ref()
            .map(|occ| occ.procedures.as_slice())
            .unwrap_or(&[])
    }

    /// Overwrite the fields a remote row is allowed to change, keeping the
    /// immutable placement fields from the first sighting.
    pub(crate) fn absorb_remote(&mut self, other: Slot) {
        self.status = other.status;
        self.occupancy = other.occupancy;
    }

    pub(crate) fn apply(&mut self, patch: &SlotPatch) {
        match patch {
            SlotPatch::Occupy(occupancy) => {
                self.status = SlotStatus::Occupied;
                self.occupancy = Some(occupancy.clone());
            }
            SlotPatch::Release => {
                self.status = SlotStatus::Free;
                self.occupancy = None;
            }
        }
    }
}

/// Patch applied by a booking transaction to one slot's mutable fields.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotPatch {
    /// Claim or edit: occupy with the given payload.
    Occupy(Occupancy),
    /// Release back to free, clearing the payload.
    Release,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_slot() -> Slot {
        Slot::free(
            SlotId::new("s1"),
            NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
            "07:30",
            "2",
        )
    }

    #[test]
    fn test_minted_ids_are_unique() {
        let a = SlotId::mint();
        let b = SlotId::mint();
        assert_ne!(a, b);
    }

    #[test]
    fn test_status_wire_roundtrip() {
        for status in [SlotStatus::Free, SlotStatus::Occupied, SlotStatus::Deleted] {
            assert_eq!(SlotStatus::parse(status.wire_name()), Some(status));
        }
        assert_eq!(SlotStatus::parse("livre"), Some(SlotStatus::Free));
        assert_eq!(SlotStatus::parse("PENDING"), None);
    }

    #[test]
    fn test_occupy_then_release() {
        let mut slot = make_slot();
        let occupancy = Occupancy {
            patient: "Maria Silva".into(),
            record: "12345".into(),
            ..Occupancy::default()
        };

        slot.apply(&SlotPatch::Occupy(occupancy));
        assert_eq!(slot.status, SlotStatus::Occupied);
        assert_eq!(slot.occupancy.as_ref().unwrap().patient, "Maria Silva");

        slot.apply(&SlotPatch::Release);
        assert!(slot.is_free());
        assert!(slot.occupancy.is_none());
        assert!(slot.procedures().is_empty());
    }

    #[test]
    fn test_absorb_remote_keeps_placement_fields() {
        let mut slot = make_slot();
        let mut incoming = make_slot();
        incoming.time = "09:00".into();
        incoming.status = SlotStatus::Occupied;
        incoming.occupancy = Some(Occupancy::default());

        slot.absorb_remote(incoming);
        assert_eq!(slot.time, "07:30");
        assert_eq!(slot.status, SlotStatus::Occupied);
    }
}
