//! Optimistic booking transactions.
//!
//! Claiming a free slot runs open → background revalidation → confirm: the
//! edit surface opens on the cached copy without touching the network, a
//! forced month refetch then re-checks the slot, and the confirmed patch is
//! committed locally before the remote write is dispatched. A rejected or
//! lost write reports a conflict and is reconciled by an awaited corrective
//! refetch, never by rolling the optimistic write back.

mod batch;
mod quota;

pub use batch::{BatchError, BatchReport, BulkPlan};
pub use quota::{QuotaPolicy, QuotaWarning};

use thiserror::Error;
use tracing::warn;

use crate::models::{
    ContractClass, MonthKey, Occupancy, ProcedureEntry, SessionError, SessionToken, Slot, SlotId,
    SlotPatch, SpecialtyCatalog,
};
use crate::remote::{RemoteError, RemoteStore, SlotUpdate, WriteAction};
use crate::store::StoreError;
use crate::AgendaContext;

/// Booking protocol errors.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Slot {0} is not in the local cache")]
    UnknownSlot(SlotId),

    #[error("No booking surface is open")]
    NoOpenTransaction,

    #[error("Confirm attempted before revalidation completed")]
    NotRevalidated,

    #[error("Slot is not occupied")]
    NotOccupied,

    #[error("Target slot is not free")]
    TargetTaken,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownSlot(id) => Self::UnknownSlot(id),
        }
    }
}

/// Pre-network form validation failures; nothing is mutated and no call is
/// made when one of these fires.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Patient name is required")]
    MissingPatient,

    #[error("Medical record number is required")]
    MissingRecord,

    #[error("Contract class is required")]
    MissingContract,

    #[error("Eye/side indicator is required")]
    MissingEye,

    #[error("At least one procedure is required")]
    NoProcedures,

    #[error("Procedure entries must be named")]
    UnnamedProcedure,

    #[error("Internal procedure '{0}' needs an emergency/scheduled classification")]
    MissingInternalType(String),

    #[error("Regulated entries do not apply to municipal contracts")]
    RegulatedUnderMunicipal,

    #[error("Procedure '{procedure}' is not offered under specialty '{specialty}'")]
    ProcedureNotAllowed {
        specialty: String,
        procedure: String,
    },
}

/// Booking form captured from the edit surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingForm {
    pub patient: String,
    pub record: String,
    pub contract: Option<ContractClass>,
    pub procedures: Vec<ProcedureEntry>,
    pub detail: String,
    pub eye: String,
}

impl BookingForm {
    fn validate(
        &self,
        catalog: Option<&SpecialtyCatalog>,
        specialty: &str,
    ) -> Result<ContractClass, ValidationError> {
        if self.patient.trim().is_empty() {
            return Err(ValidationError::MissingPatient);
        }
        if self.record.trim().is_empty() {
            return Err(ValidationError::MissingRecord);
        }
        if self.eye.trim().is_empty() {
            return Err(ValidationError::MissingEye);
        }
        let contract = self.contract.ok_or(ValidationError::MissingContract)?;
        if self.procedures.is_empty() {
            return Err(ValidationError::NoProcedures);
        }

        for entry in &self.procedures {
            if entry.name.trim().is_empty() {
                return Err(ValidationError::UnnamedProcedure);
            }
            if contract.is_municipal() {
                if entry.regulated {
                    return Err(ValidationError::RegulatedUnderMunicipal);
                }
            } else if !entry.regulated && entry.internal_type.is_none() {
                return Err(ValidationError::MissingInternalType(entry.name.clone()));
            }
            if let Some(catalog) = catalog {
                if !catalog.is_allowed(specialty, &entry.name) {
                    return Err(ValidationError::ProcedureNotAllowed {
                        specialty: specialty.to_string(),
                        procedure: entry.name.clone(),
                    });
                }
            }
        }

        Ok(contract)
    }

    fn to_occupancy(&self, booked_by: &str) -> Occupancy {
        Occupancy {
            patient: self.patient.clone(),
            record: self.record.clone(),
            contract: self.contract,
            regulated: self.procedures.iter().any(|entry| entry.regulated),
            procedures: self.procedures.clone(),
            detail: self.detail.clone(),
            eye: self.eye.clone(),
            booked_by: booked_by.to_string(),
        }
    }
}

/// Kind of open transaction. Claims race against other users for a free
/// slot; edits of an already-occupied slot do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnKind {
    Claim { revalidated: bool },
    Edit,
}

/// One open booking attempt (the edit surface the operator sees).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingTransaction {
    id: SlotId,
    kind: TxnKind,
}

impl BookingTransaction {
    pub fn slot_id(&self) -> &SlotId {
        &self.id
    }

    pub fn is_claim(&self) -> bool {
        matches!(self.kind, TxnKind::Claim { .. })
    }

    /// Edits are born revalidated; claims must pass the background check.
    pub fn is_revalidated(&self) -> bool {
        match self.kind {
            TxnKind::Claim { revalidated } => revalidated,
            TxnKind::Edit => true,
        }
    }

    fn mark_revalidated(&mut self) {
        if let TxnKind::Claim { revalidated } = &mut self.kind {
            *revalidated = true;
        }
    }
}

/// Why a transaction aborted during revalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Slot vanished from the remote store.
    NotFound,
    /// Slot was claimed by another user first.
    AlreadyTaken,
}

/// Result of the background revalidation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revalidation {
    /// Still bookable; the edit surface stays open unchanged.
    Clear,
    /// The edit surface must close with the given reason.
    Aborted(AbortReason),
}

/// Result of submitting an optimistic write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Remote accepted the write; local and remote agree.
    Confirmed,
    /// Remote rejected the write or the network failed; local state was
    /// reconciled by the corrective refetch.
    Conflicted,
}

impl<R: RemoteStore> AgendaContext<R> {
    /// Open the booking surface for a slot from the cached copy only; no
    /// network, perceived latency zero.
    pub fn open_booking(&mut self, id: &SlotId) -> Result<&Slot, BookingError> {
        let slot = self
            .store
            .find_by_id(id)
            .ok_or_else(|| BookingError::UnknownSlot(id.clone()))?;
        let kind = if slot.is_free() {
            TxnKind::Claim { revalidated: false }
        } else {
            TxnKind::Edit
        };
        self.open_txn = Some(BookingTransaction {
            id: id.clone(),
            kind,
        });
        self.store
            .find_by_id(id)
            .ok_or_else(|| BookingError::UnknownSlot(id.clone()))
    }

    pub fn open_transaction(&self) -> Option<&BookingTransaction> {
        self.open_txn.as_ref()
    }

    /// Close the edit surface without submitting. Any response still in
    /// flight for the abandoned transaction is ignored for UI purposes.
    pub fn abandon_booking(&mut self) {
        self.open_txn = None;
    }

    /// Background revalidation: force a real refetch of the slot's month and
    /// re-check the slot by id. Claim transactions must pass here before a
    /// confirm is accepted.
    pub async fn revalidate_booking(&mut self) -> Result<Revalidation, BookingError> {
        let txn = self
            .open_txn
            .clone()
            .ok_or(BookingError::NoOpenTransaction)?;

        let date = self
            .store
            .find_by_id(&txn.id)
            .map(|slot| slot.date)
            .unwrap_or(self.selected_date);
        let month = MonthKey::of(date);

        self.sync.invalidate(month);
        let token = self.session.token()?.clone();
        self.sync
            .fetch_month(
                &self.remote,
                &token,
                &mut self.store,
                &mut self.aggregates,
                month,
                self.selected_date,
            )
            .await?;

        match self.store.find_by_id(&txn.id) {
            None => {
                self.open_txn = None;
                Ok(Revalidation::Aborted(AbortReason::NotFound))
            }
            Some(slot) if txn.is_claim() && !slot.is_free() => {
                self.open_txn = None;
                Ok(Revalidation::Aborted(AbortReason::AlreadyTaken))
            }
            Some(_) => {
                if let Some(txn) = self.open_txn.as_mut() {
                    txn.mark_revalidated();
                }
                Ok(Revalidation::Clear)
            }
        }
    }

    /// Validate and commit the open booking: local cache first, remote write
    /// second, so the list and KPIs reflect the booking instantly.
    pub async fn confirm_booking(&mut self, form: &BookingForm) -> Result<SubmitOutcome, BookingError> {
        let txn = self
            .open_txn
            .clone()
            .ok_or(BookingError::NoOpenTransaction)?;
        if !txn.is_revalidated() {
            return Err(BookingError::NotRevalidated);
        }

        let slot = self
            .store
            .find_by_id(&txn.id)
            .ok_or_else(|| BookingError::UnknownSlot(txn.id.clone()))?;
        form.validate(self.catalog.as_ref(), &slot.specialty)?;

        let token = self.session.token()?.clone();
        let booked_by = self
            .session
            .user()
            .map(|user| user.name.clone())
            .unwrap_or_default();
        let occupancy = form.to_occupancy(&booked_by);

        // Optimistic commit
        let date = self
            .store
            .apply_local_mutation(&txn.id, &SlotPatch::Occupy(occupancy.clone()))?;
        let month = MonthKey::of(date);
        self.aggregates.recompute(&self.store, month);
        self.open_txn = None;

        let action = WriteAction::Update(SlotUpdate::occupy(&txn.id, &occupancy));
        self.submit(action, &token, month).await
    }

    /// Release an occupied slot: optimistic clear, then remote confirm.
    /// No pre-open revalidation; an occupied slot is not subject to the
    /// free/claimed race.
    pub async fn release_slot(&mut self, id: &SlotId) -> Result<SubmitOutcome, BookingError> {
        let token = self.session.token()?.clone();
        let by = self
            .session
            .user()
            .map(|user| user.name.clone())
            .unwrap_or_default();

        let date = self.store.apply_local_mutation(id, &SlotPatch::Release)?;
        let month = MonthKey::of(date);
        self.aggregates.recompute(&self.store, month);
        if self.open_txn.as_ref().is_some_and(|txn| &txn.id == id) {
            self.open_txn = None;
        }

        let action = WriteAction::Update(SlotUpdate::release(id, &by));
        self.submit(action, &token, month).await
    }

    /// Move a patient: claim the target slot with the origin's payload, then
    /// release the origin once the claim is confirmed remotely. A conflicted
    /// claim leaves the origin untouched.
    pub async fn relocate_patient(
        &mut self,
        origin: &SlotId,
        target: &SlotId,
    ) -> Result<SubmitOutcome, BookingError> {
        let occupancy = self
            .store
            .find_by_id(origin)
            .ok_or_else(|| BookingError::UnknownSlot(origin.clone()))?
            .occupancy
            .clone()
            .ok_or(BookingError::NotOccupied)?;

        let target_slot = self
            .store
            .find_by_id(target)
            .ok_or_else(|| BookingError::UnknownSlot(target.clone()))?;
        if !target_slot.is_free() {
            return Err(BookingError::TargetTaken);
        }

        let form = BookingForm {
            patient: occupancy.patient,
            record: occupancy.record,
            contract: occupancy.contract,
            procedures: occupancy.procedures,
            detail: occupancy.detail,
            eye: occupancy.eye,
        };

        self.open_booking(target)?;
        match self.revalidate_booking().await? {
            Revalidation::Aborted(AbortReason::NotFound) => {
                return Err(BookingError::UnknownSlot(target.clone()))
            }
            Revalidation::Aborted(AbortReason::AlreadyTaken) => {
                return Err(BookingError::TargetTaken)
            }
            Revalidation::Clear => {}
        }

        match self.confirm_booking(&form).await? {
            SubmitOutcome::Confirmed => self.release_slot(origin).await,
            SubmitOutcome::Conflicted => Ok(SubmitOutcome::Conflicted),
        }
    }

    /// Dispatch a write; on failure run the awaited corrective refetch so a
    /// forced refresh, not a rollback, restores ground truth.
    async fn submit(
        &mut self,
        action: WriteAction,
        token: &SessionToken,
        month: MonthKey,
    ) -> Result<SubmitOutcome, BookingError> {
        match self.remote.write(&action, token).await {
            Ok(_) => Ok(SubmitOutcome::Confirmed),
            Err(err) => {
                warn!(error = %err, "remote write failed, running corrective refetch");
                self.sync.invalidate(month);
                if let Err(refetch) = self
                    .sync
                    .fetch_month(
                        &self.remote,
                        token,
                        &mut self.store,
                        &mut self.aggregates,
                        month,
                        self.selected_date,
                    )
                    .await
                {
                    warn!(error = %refetch, "corrective refetch failed, month left stale");
                }
                Ok(SubmitOutcome::Conflicted)
            }
        }
    }
}
