//! In-memory remote store for tests and offline development.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{
    RawSlotRecord, RemoteError, RemoteResult, RemoteStore, VerifyOutcome, WriteAction,
    WriteReceipt,
};
use crate::models::{
    format_date_key, AuthUser, MonthKey, Role, SessionToken, Slot, SpecialtyCatalog,
};

#[derive(Default)]
struct MockState {
    rows: Vec<RawSlotRecord>,
    tokens: HashMap<String, AuthUser>,
    catalog: SpecialtyCatalog,
    fail_reads: bool,
    fail_writes: bool,
    fail_next_write: bool,
    fail_write_at: Option<u32>,
    arbitrate_claims: bool,
    write_count: u32,
    day_reads: u32,
    month_reads: u32,
    writes: Vec<WriteAction>,
}

/// Scriptable in-memory [`RemoteStore`].
///
/// Tests seed rows, authorize tokens, and inject failures or concurrent
/// writes between the client's calls to exercise the conflict paths.
#[derive(Default)]
pub struct MockRemote {
    state: Mutex<MockState>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a token the mock will accept.
    pub fn authorize(&self, token: &str, name: &str, role: Role) {
        self.state().tokens.insert(
            token.to_string(),
            AuthUser {
                name: name.to_string(),
                role,
            },
        );
    }

    /// Seed raw rows as if they already existed remotely.
    pub fn seed_rows(&self, rows: Vec<RawSlotRecord>) {
        self.state().rows.extend(rows);
    }

    /// Seed a typed slot.
    pub fn seed_slot(&self, slot: &Slot) {
        self.state().rows.push(RawSlotRecord::from_slot(slot));
    }

    /// Install the procedures catalog the mock serves.
    pub fn set_catalog(&self, catalog: SpecialtyCatalog) {
        self.state().catalog = catalog;
    }

    /// Fail every read with a transport error until reset.
    pub fn set_fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    /// Fail every write with a transport error until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Reject only the next write, then recover.
    pub fn fail_next_write(&self) {
        self.state().fail_next_write = true;
    }

    /// Reject the n-th write (1-based) counted from now, then recover.
    pub fn fail_write_at(&self, nth: u32) {
        let mut state = self.state();
        let at = state.write_count + nth;
        state.fail_write_at = Some(at);
    }

    /// Arbitrate write-write races the way the real backend does: an occupy
    /// update against a row another user already occupies is rejected.
    pub fn set_arbitrate_claims(&self, arbitrate: bool) {
        self.state().arbitrate_claims = arbitrate;
    }

    /// Simulate another user's booking landing remotely: mark a row occupied
    /// without going through this client.
    pub fn occupy_row(&self, id: &str, patient: &str, by: &str) {
        let mut state = self.state();
        if let Some(row) = state.rows.iter_mut().find(|row| row.id == id) {
            row.status = "OCUPADO".to_string();
            row.patient = patient.to_string();
            row.created_by = by.to_string();
        }
    }

    /// Simulate a remote-side deletion of a row.
    pub fn remove_row(&self, id: &str) {
        self.state().rows.retain(|row| row.id != id);
    }

    /// Snapshot of the current remote rows.
    pub fn rows(&self) -> Vec<RawSlotRecord> {
        self.state().rows.clone()
    }

    /// Every write action received, in order.
    pub fn writes(&self) -> Vec<WriteAction> {
        self.state().writes.clone()
    }

    pub fn day_reads(&self) -> u32 {
        self.state().day_reads
    }

    pub fn month_reads(&self) -> u32 {
        self.state().month_reads
    }

    fn check_token(state: &MockState, token: &SessionToken) -> RemoteResult<()> {
        if state.tokens.contains_key(token.as_str()) {
            Ok(())
        } else {
            Err(RemoteError::InvalidToken)
        }
    }

    fn apply_write(state: &mut MockState, action: &WriteAction) -> RemoteResult<WriteReceipt> {
        let arbitrate = state.arbitrate_claims;
        match action {
            WriteAction::Update(update) => {
                let row = state
                    .rows
                    .iter_mut()
                    .find(|row| row.id == update.id)
                    .ok_or_else(|| RemoteError::Rejected(format!("unknown id {}", update.id)))?;
                if arbitrate
                    && update.status == "OCUPADO"
                    && row.status == "OCUPADO"
                    && row.created_by != update.created_by
                {
                    return Err(RemoteError::Rejected("slot already taken".into()));
                }
                row.status = update.status.clone();
                row.patient = update.patient.clone();
                row.record = update.record.clone();
                row.contract = update.contract.clone();
                row.regulated = update.regulated.unwrap_or(false);
                row.procedure = update.procedure.clone();
                row.detail = update.detail.clone();
                row.eye = update.eye.clone();
                row.created_by = update.created_by.clone();
                Ok(WriteReceipt { count: Some(1) })
            }
            WriteAction::CreateBulk { data } => {
                state.rows.extend(data.iter().cloned());
                Ok(WriteReceipt {
                    count: Some(data.len() as u32),
                })
            }
            WriteAction::Delete { id } => {
                let before = state.rows.len();
                state.rows.retain(|row| &row.id != id);
                if state.rows.len() == before {
                    return Err(RemoteError::Rejected(format!("unknown id {}", id)));
                }
                Ok(WriteReceipt { count: Some(1) })
            }
            WriteAction::DeleteBulk { ids } => {
                let before = state.rows.len();
                state.rows.retain(|row| !ids.contains(&row.id));
                Ok(WriteReceipt {
                    count: Some((before - state.rows.len()) as u32),
                })
            }
        }
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn read_day(
        &self,
        date: NaiveDate,
        token: &SessionToken,
    ) -> RemoteResult<Vec<RawSlotRecord>> {
        let mut state = self.state();
        Self::check_token(&state, token)?;
        state.day_reads += 1;
        if state.fail_reads {
            return Err(RemoteError::Transport("simulated read failure".into()));
        }
        let key = format_date_key(date);
        Ok(state
            .rows
            .iter()
            .filter(|row| row.date == key)
            .cloned()
            .collect())
    }

    async fn read_month(
        &self,
        month: MonthKey,
        token: &SessionToken,
    ) -> RemoteResult<Vec<RawSlotRecord>> {
        let mut state = self.state();
        Self::check_token(&state, token)?;
        state.month_reads += 1;
        if state.fail_reads {
            return Err(RemoteError::Transport("simulated read failure".into()));
        }
        let prefix = format!("{}-", month);
        Ok(state
            .rows
            .iter()
            .filter(|row| row.date.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn write(
        &self,
        action: &WriteAction,
        token: &SessionToken,
    ) -> RemoteResult<WriteReceipt> {
        let mut state = self.state();
        Self::check_token(&state, token)?;
        state.writes.push(action.clone());
        state.write_count += 1;
        if state.fail_writes {
            return Err(RemoteError::Transport("simulated write failure".into()));
        }
        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(RemoteError::Rejected("simulated rejection".into()));
        }
        if state.fail_write_at == Some(state.write_count) {
            state.fail_write_at = None;
            return Err(RemoteError::Rejected("simulated rejection".into()));
        }
        Self::apply_write(&mut state, action)
    }

    async fn verify(&self, token: &SessionToken) -> RemoteResult<VerifyOutcome> {
        let state = self.state();
        Ok(match state.tokens.get(token.as_str()) {
            Some(user) => VerifyOutcome {
                valid: true,
                user: Some(user.clone()),
            },
            None => VerifyOutcome {
                valid: false,
                user: None,
            },
        })
    }

    async fn procedures_catalog(&self, token: &SessionToken) -> RemoteResult<SpecialtyCatalog> {
        let state = self.state();
        Self::check_token(&state, token)?;
        Ok(state.catalog.clone())
    }
}
