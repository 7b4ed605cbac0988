//! Surgenda core library
//!
//! Client-side cache and optimistic-booking layer for surgical-slot ("vaga")
//! scheduling backed by a remote spreadsheet-style store.
//!
//! # Architecture
//!
//! ```text
//! UI events ──► AgendaContext
//!                   │
//!       ┌───────────┼──────────────┬─────────────────┐
//!       ▼           ▼              ▼                 ▼
//!  Booking      SlotStore    AggregateCache    SyncController
//!  protocol    (date-bucket   (per-month        (month state
//!  + batches     cache)       dashboard)         machine)
//!       │                                           │
//!       └────────────── RemoteStore ◄───────────────┘
//!                  (spreadsheet web app)
//! ```
//!
//! # Core principle
//!
//! **Local state is updated before the remote store confirms.** Conflicts
//! between concurrent users are detected by background revalidation and
//! corrected by a forced refetch, never by rolling back the optimistic write.
//!
//! # Modules
//!
//! - [`models`]: domain types (Slot, contracts, procedures, aggregates, session)
//! - [`store`]: in-memory slot store and derived monthly aggregates
//! - [`sync`]: month freshness state machine and remote fetch orchestration
//! - [`booking`]: optimistic booking transactions, quota gauge, batch mutation
//! - [`remote`]: remote store contract, wire records, in-memory mock

pub mod booking;
pub mod models;
pub mod remote;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use booking::{
    AbortReason, BatchError, BatchReport, BookingError, BookingForm, BookingTransaction, BulkPlan,
    QuotaPolicy, QuotaWarning, Revalidation, SubmitOutcome, ValidationError,
};
pub use models::{
    AuthUser, ContractClass, InternalType, MonthKey, MonthlyAggregate, Occupancy, ProcedureEntry,
    Role, Session, SessionError, SessionToken, Slot, SlotId, SlotStatus, SpecialtyCatalog,
};
pub use remote::{
    mock::MockRemote, RawSlotRecord, RemoteError, RemoteStore, VerifyOutcome, WriteAction,
};
pub use store::{AggregateCache, SlotStore, StoreError};
pub use sync::{FetchMode, MonthFetch, MonthState, SyncController};

use chrono::NaiveDate;
use thiserror::Error;

// =========================================================================
// Top-Level Error Type
// =========================================================================

/// Unified error type for the context facade.
#[derive(Debug, Error)]
pub enum AgendaError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AgendaResult<T> = Result<T, AgendaError>;

// =========================================================================
// Application Context
// =========================================================================

/// Application context owning every piece of client-side state.
///
/// All mutation funnels through `&mut self` methods. The UI event loop is the
/// single writer, so the caches carry no internal locking; cross-session
/// consistency comes only from remote re-fetches.
pub struct AgendaContext<R: RemoteStore> {
    pub(crate) remote: R,
    pub(crate) store: SlotStore,
    pub(crate) aggregates: AggregateCache,
    pub(crate) sync: SyncController,
    pub(crate) session: Session,
    pub(crate) catalog: Option<SpecialtyCatalog>,
    pub(crate) selected_date: NaiveDate,
    pub(crate) open_txn: Option<BookingTransaction>,
}

impl<R: RemoteStore> AgendaContext<R> {
    /// Create a context over a remote store, positioned on an initial date.
    pub fn new(remote: R, initial_date: NaiveDate) -> Self {
        Self {
            remote,
            store: SlotStore::new(),
            aggregates: AggregateCache::new(),
            sync: SyncController::new(),
            session: Session::new(),
            catalog: None,
            selected_date: initial_date,
            open_txn: None,
        }
    }

    // =====================================================================
    // Session
    // =====================================================================

    /// Verify a token against the remote store and establish the session.
    pub async fn login(&mut self, token: SessionToken) -> AgendaResult<AuthUser> {
        let outcome = self.remote.verify(&token).await?;
        let user = match outcome.user {
            Some(user) if outcome.valid => user,
            _ => return Err(SessionError::Rejected.into()),
        };
        self.session.establish(token, user.clone());
        Ok(user)
    }

    /// Drop the session (logout or strict re-prompt policy).
    pub fn logout(&mut self) {
        self.session.clear();
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Handle to the remote store (shared mocks use this to script races).
    pub fn remote(&self) -> &R {
        &self.remote
    }

    // =====================================================================
    // Procedures Catalog
    // =====================================================================

    /// Fetch the specialty procedures catalog from the remote store.
    pub async fn load_catalog(&mut self) -> AgendaResult<&SpecialtyCatalog> {
        let token = self.session.token()?.clone();
        let catalog = self.remote.procedures_catalog(&token).await?;
        Ok(&*self.catalog.insert(catalog))
    }

    pub fn catalog(&self) -> Option<&SpecialtyCatalog> {
        self.catalog.as_ref()
    }

    // =====================================================================
    // Navigation & Sync
    // =====================================================================

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    /// Move the selection and make sure its month is loaded (a no-op when the
    /// month is already fresh).
    pub async fn select_date(&mut self, date: NaiveDate) -> AgendaResult<MonthFetch> {
        self.selected_date = date;
        self.fetch_month(MonthKey::of(date)).await
    }

    /// Fetch one day from the remote store. Returns whether the day's slot
    /// list changed.
    pub async fn fetch_day(&mut self, date: NaiveDate, mode: FetchMode) -> AgendaResult<bool> {
        let token = self.session.token()?.clone();
        Ok(self
            .sync
            .fetch_day(
                &self.remote,
                &token,
                &mut self.store,
                &mut self.aggregates,
                date,
                mode,
            )
            .await?)
    }

    /// Fetch a whole month (no-op when fresh).
    pub async fn fetch_month(&mut self, month: MonthKey) -> AgendaResult<MonthFetch> {
        let token = self.session.token()?.clone();
        Ok(self
            .sync
            .fetch_month(
                &self.remote,
                &token,
                &mut self.store,
                &mut self.aggregates,
                month,
                self.selected_date,
            )
            .await?)
    }

    /// Manual refresh: invalidate the selected month and fetch it again.
    pub async fn refresh(&mut self) -> AgendaResult<MonthFetch> {
        let month = MonthKey::of(self.selected_date);
        self.sync.invalidate(month);
        self.fetch_month(month).await
    }

    pub fn month_state(&self, month: MonthKey) -> MonthState {
        self.sync.state(month)
    }

    // =====================================================================
    // Cache Reads
    // =====================================================================

    /// Slots for a date: `None` when never fetched, `Some(&[])` when fetched
    /// and empty.
    pub fn slots_for_date(&self, date: NaiveDate) -> Option<&[Slot]> {
        self.store.slots_for_date(date)
    }

    pub fn slots_for_month(&self, month: MonthKey) -> Vec<&Slot> {
        self.store.slots_for_month(month)
    }

    pub fn find_slot(&self, id: &SlotId) -> Option<&Slot> {
        self.store.find_by_id(id)
    }

    /// Dashboard aggregate for a month; zero-valued when no data is cached.
    pub fn aggregate(&mut self, month: MonthKey) -> MonthlyAggregate {
        *self.aggregates.get(&self.store, month)
    }
}
